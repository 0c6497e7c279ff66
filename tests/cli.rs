mod common;

use std::fs;

use assert_cmd::Command;
use common::{MARKET, QUERIES, SALES_CR, SALES_MS, TestWorkspace, fixture_path};
use niche_analyzer::config::AnalysisConfig;
use predicates::prelude::*;
use predicates::str::contains;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("niche-analyzer").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn analyze() -> Command {
    let mut cmd = bin();
    cmd.arg("analyze")
        .arg("--market")
        .arg(fixture_path(MARKET))
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .arg("--sales")
        .arg(fixture_path(SALES_CR))
        .arg("--sales")
        .arg(fixture_path(SALES_MS));
    cmd
}

#[test]
fn analyze_prints_recommendation_table() {
    analyze()
        .assert()
        .success()
        .stdout(contains("Рекомендация"))
        .stdout(contains("Кроссовки"))
        .stdout(contains("✅ Вход"))
        .stdout(contains("🚀 Усиление"))
        .stdout(contains("10 000 000"))
        .stdout(contains("МС, ЦР"));
}

#[test]
fn recommendation_filter_limits_rows() {
    analyze()
        .args(["--recommendation", "exit-review"])
        .assert()
        .success()
        .stdout(contains("Зонты"))
        .stdout(contains("Кроссовки").not())
        .stdout(contains("Рюкзаки").not());
}

#[test]
fn entity_selection_changes_the_join() {
    analyze()
        .args(["--entity", "МС", "--recommendation", "reinforce"])
        .assert()
        .success()
        .stdout(contains("Рюкзаки"))
        .stdout(contains("20 000"));
}

#[test]
fn unknown_entity_fails_with_available_list() {
    analyze()
        .args(["--entity", "ИП"])
        .assert()
        .failure()
        .stderr(contains("error:"))
        .stderr(contains("МС, ЦР"));
}

#[test]
fn missing_sales_file_warns_and_continues() {
    let workspace = TestWorkspace::new();
    bin()
        .arg("analyze")
        .arg("--market")
        .arg(fixture_path(MARKET))
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .arg("--sales")
        .arg(fixture_path(SALES_CR))
        .arg("--sales")
        .arg(workspace.file("ИП_Продажи.tsv"))
        .assert()
        .success()
        .stderr(contains("not found; skipping"))
        .stdout(contains("Рюкзаки"));
}

#[test]
fn no_sales_file_is_fatal() {
    let workspace = TestWorkspace::new();
    bin()
        .arg("analyze")
        .arg("--market")
        .arg(fixture_path(MARKET))
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .arg("--sales")
        .arg(workspace.file("ИП_Продажи.tsv"))
        .assert()
        .failure()
        .stderr(contains("error:"))
        .stderr(contains("sales"));
}

#[test]
fn missing_market_file_is_fatal() {
    let workspace = TestWorkspace::new();
    bin()
        .arg("analyze")
        .arg("--market")
        .arg(workspace.file("market.tsv"))
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .arg("--sales")
        .arg(fixture_path(SALES_CR))
        .assert()
        .failure()
        .stderr(contains("market"));
}

#[test]
fn csv_export_keeps_raw_numbers_and_plain_labels() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("niches.csv");
    analyze()
        .args(["--sort", "orders", "--descending", "--limit", "2", "--output"])
        .arg(&output)
        .assert()
        .success();

    let contents = fs::read_to_string(&output).expect("read export");
    let lines = contents.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Предмет,Юрлица,\"Выручка, руб.\""));
    assert_eq!(
        lines[1],
        "Рюкзаки,\"МС, ЦР\",4000000,20000,30,150,120000,3,87.5,Усиление"
    );
    assert!(lines[2].starts_with("Зонты,МС,"));
    assert!(lines[2].ends_with("Выход / Анализ"));
}

#[test]
fn json_export_serializes_rows() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("niches.json");
    analyze()
        .args(["--recommendation", "enter", "--output"])
        .arg(&output)
        .assert()
        .success();

    let contents = fs::read_to_string(&output).expect("read export");
    let rows: serde_json::Value = serde_json::from_str(&contents).expect("parse json");
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["subject_id"], "Кроссовки");
    assert_eq!(rows[0]["recommendation"], "enter");
    assert_eq!(rows[0]["query_count"], 150_000);
}

#[test]
fn windows_1251_export_round_trips() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("niches.tsv");
    analyze()
        .args(["--output-encoding", "windows-1251", "--recommendation", "monitor", "--output"])
        .arg(&output)
        .assert()
        .success();

    let bytes = fs::read(&output).expect("read export");
    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1251.decode(&bytes);
    assert!(!had_errors);
    assert!(decoded.contains("Перчатки\tЦР\t"));
    assert!(decoded.contains("Мониторинг"));
}

#[test]
fn config_file_thresholds_apply() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("niche.yml", "thresholds:\n  min_query_count: 200000\n");
    analyze()
        .arg("--config")
        .arg(&config)
        .args(["--recommendation", "enter"])
        .assert()
        .success()
        .stdout(contains("Кроссовки").not());
}

#[test]
fn invalid_config_is_rejected() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("niche.yml", "thresholds:\n  min_grow_pct: 5\n");
    analyze()
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn queries_lists_phrases_by_orders() {
    let assert = bin()
        .arg("queries")
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .args(["--subject", "Кроссовки"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf-8 stdout");
    let women = stdout.find("кроссовки женские").expect("women row");
    let men = stdout.find("кроссовки мужские").expect("men row");
    assert!(women < men);
    assert!(!stdout.contains("шапка"));
}

#[test]
fn queries_export_encodes_windows_1251() {
    let workspace = TestWorkspace::new();
    let output = workspace.file("queries.csv");
    bin()
        .arg("queries")
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .args(["--subject", "Кроссовки", "--output-encoding", "windows-1251", "--output"])
        .arg(&output)
        .assert()
        .success();

    let bytes = fs::read(&output).expect("read export");
    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1251.decode(&bytes);
    assert!(!had_errors);
    let lines = decoded.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("\"Изменение запросов, %\""));
    assert!(lines[0].contains("\"Изменение заказов, %\""));
    assert!(lines[1].starts_with("кроссовки женские,60000,50000,20,1500,1600,-6.2,"));
}

#[test]
fn queries_for_unknown_subject_prints_nothing() {
    bin()
        .arg("queries")
        .arg("--queries")
        .arg(fixture_path(QUERIES))
        .args(["--subject", "Сумки"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("No search queries"));
}

#[test]
fn entities_lists_file_prefixes() {
    bin()
        .arg("entities")
        .arg("--sales")
        .arg(fixture_path(SALES_CR))
        .arg("--sales")
        .arg(fixture_path(SALES_MS))
        .assert()
        .success()
        .stdout(contains("МС"))
        .stdout(contains("ЦР"));
}

#[test]
fn init_config_writes_defaults_and_refuses_to_overwrite() {
    let workspace = TestWorkspace::new();
    let path = workspace.file("niche.yml");
    bin()
        .arg("init-config")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();
    let config = AnalysisConfig::load(&path).expect("load written config");
    assert_eq!(config, AnalysisConfig::default());

    bin()
        .arg("init-config")
        .arg("--output")
        .arg(&path)
        .assert()
        .failure()
        .stderr(contains("--force"));

    bin()
        .arg("init-config")
        .arg("--output")
        .arg(&path)
        .arg("--force")
        .assert()
        .success();
}
