mod common;

use common::{fixture_sources, utf8_options};
use niche_analyzer::{
    config::AnalysisConfig,
    loader, pipeline, report,
    table::{Align, render_aligned, render_table},
};

#[test]
fn render_table_normalizes_control_characters() {
    let headers = vec!["Запрос".to_string()];
    let rows = vec![vec!["рюкзак\nгородской\tчёрный".to_string()]];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "рюкзак городской чёрный");
}

#[test]
fn emoji_labels_do_not_skew_following_columns() {
    let headers = vec!["Метка".to_string(), "N".to_string()];
    let rows = vec![
        vec!["⚠️ Выход".to_string(), "1".to_string()],
        vec!["Мониторинг".to_string(), "2".to_string()],
    ];

    let rendered = render_aligned(&headers, &rows, &[Align::Left, Align::Right]);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[2], "⚠️ Выход     1");
    assert_eq!(lines[3], "Мониторинг  2");
}

#[test]
fn subject_table_right_aligns_numbers() {
    let raw = loader::load_sources(&fixture_sources(), &utf8_options()).unwrap();
    let analysis = pipeline::analyze(&raw, &AnalysisConfig::default()).unwrap();
    let (headers, rows, aligns) = report::subject_table(&analysis.rows);

    assert_eq!(headers.len(), rows[0].len());
    assert_eq!(rows[0][2], "10 000 000");
    assert_eq!(rows[0][1], "—");
    assert_eq!(rows[0][6], "—");
    assert_eq!(rows[2][7], "3.00");
    assert_eq!(rows[2][8], "87.50");

    let rendered = render_aligned(&headers, &rows, &aligns);
    let hats = rendered
        .lines()
        .find(|line| line.starts_with("Шапки"))
        .expect("hats row");
    assert!(hats.ends_with("⏸ Не сейчас"));
    assert!(hats.contains("   500 000  "));
}
