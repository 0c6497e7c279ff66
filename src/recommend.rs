//! Recommendation rules.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{config::Thresholds, join::SubjectRecord};

/// Fixed buyout cutoff below which an existing position is flagged for exit.
/// Independent of [`Thresholds::min_buyout_pct`].
pub const EXIT_BUYOUT_PCT: f64 = 70.0;
/// Market share under which an existing position is worth reinforcing.
pub const REINFORCE_MAX_SHARE_PCT: f64 = 5.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Recommendation {
    Enter,
    Reinforce,
    ExitReview,
    Monitor,
    Wait,
    Undetermined,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::Enter => "✅ Вход",
            Recommendation::Reinforce => "🚀 Усиление",
            Recommendation::ExitReview => "⚠️ Выход / Анализ",
            Recommendation::Monitor => "📊 Мониторинг",
            Recommendation::Wait => "⏸ Не сейчас",
            Recommendation::Undetermined => "❓ Не определено",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn at_least(value: Option<f64>, bound: f64) -> bool {
    value.is_some_and(|v| v >= bound)
}

fn at_most(value: Option<f64>, bound: f64) -> bool {
    value.is_some_and(|v| v <= bound)
}

fn below(value: Option<f64>, bound: f64) -> bool {
    value.is_some_and(|v| v < bound)
}

/// Classifies one subject. First matching rule wins; every comparison with a
/// missing value is false.
pub fn classify(record: &SubjectRecord, thresholds: &Thresholds) -> Recommendation {
    if !record.my_orders_amount.is_finite() {
        return Recommendation::Undetermined;
    }
    let growth_ok = at_least(record.revenue_growth_pct, thresholds.min_growth_pct);

    if record.my_orders_amount == 0.0 {
        let enter = record.query_count >= thresholds.min_query_count
            && at_most(record.monopolization_pct, thresholds.max_monopolization_pct)
            && growth_ok
            && at_most(record.turnover_days, thresholds.max_turnover_days);
        return if enter {
            Recommendation::Enter
        } else {
            Recommendation::Wait
        };
    }

    let buyout = Some(record.my_buyout_pct).filter(|v| v.is_finite());
    if below(record.my_market_share_pct, REINFORCE_MAX_SHARE_PCT)
        && growth_ok
        && at_least(buyout, thresholds.min_buyout_pct)
    {
        Recommendation::Reinforce
    } else if below(buyout, EXIT_BUYOUT_PCT) {
        Recommendation::ExitReview
    } else {
        Recommendation::Monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::market_share_pct;

    fn newcomer() -> SubjectRecord {
        SubjectRecord {
            subject_id: "Shoes".into(),
            seller_count: Some(120),
            seller_count_with_orders: Some(80),
            monopolization_pct: Some(50.0),
            revenue: Some(10_000_000.0),
            revenue_growth_pct: Some(20.0),
            avg_ticket: Some(1_500.0),
            turnover_days: Some(30.0),
            market_buyout_pct: Some(75.0),
            query_count: 100_000,
            my_orders_amount: 0.0,
            my_buyout_amount: 0.0,
            my_item_count: 0,
            my_buyout_pct: 0.0,
            legal_entities: "—".into(),
            my_market_share_pct: Some(0.0),
        }
    }

    fn incumbent(buyout_pct: f64) -> SubjectRecord {
        SubjectRecord {
            revenue: Some(25_000.0),
            revenue_growth_pct: Some(25.0),
            my_orders_amount: 1_000.0,
            my_item_count: 3,
            my_buyout_pct: buyout_pct,
            my_market_share_pct: Some(market_share_pct(1_000.0, 25_000.0)),
            legal_entities: "A".into(),
            ..newcomer()
        }
    }

    #[test]
    fn enter_is_inclusive_at_every_boundary() {
        assert_eq!(
            classify(&newcomer(), &Thresholds::default()),
            Recommendation::Enter
        );
    }

    #[test]
    fn one_query_short_of_threshold_waits() {
        let record = SubjectRecord {
            query_count: 99_999,
            ..newcomer()
        };
        assert_eq!(classify(&record, &Thresholds::default()), Recommendation::Wait);
    }

    #[test]
    fn missing_market_column_blocks_entry() {
        let record = SubjectRecord {
            monopolization_pct: None,
            ..newcomer()
        };
        assert_eq!(classify(&record, &Thresholds::default()), Recommendation::Wait);
    }

    #[test]
    fn incumbents_split_by_buyout() {
        let thresholds = Thresholds::default();
        assert_eq!(incumbent(85.0).my_market_share_pct, Some(4.0));
        assert_eq!(classify(&incumbent(85.0), &thresholds), Recommendation::Reinforce);
        assert_eq!(classify(&incumbent(60.0), &thresholds), Recommendation::ExitReview);
        assert_eq!(classify(&incumbent(72.0), &thresholds), Recommendation::Monitor);
    }

    #[test]
    fn exit_cutoff_ignores_configured_min_buyout() {
        let thresholds = Thresholds {
            min_buyout_pct: 90.0,
            ..Thresholds::default()
        };
        // Fails the reinforce bar but stays above the fixed exit cutoff.
        assert_eq!(classify(&incumbent(85.0), &thresholds), Recommendation::Monitor);
        let lenient = Thresholds {
            min_buyout_pct: 50.0,
            ..Thresholds::default()
        };
        assert_eq!(classify(&incumbent(60.0), &lenient), Recommendation::Reinforce);
    }

    #[test]
    fn large_share_is_monitored_not_reinforced() {
        let record = SubjectRecord {
            my_market_share_pct: Some(5.0),
            ..incumbent(95.0)
        };
        assert_eq!(classify(&record, &Thresholds::default()), Recommendation::Monitor);
    }

    #[test]
    fn unusable_order_amount_is_undetermined() {
        let record = SubjectRecord {
            my_orders_amount: f64::NAN,
            ..newcomer()
        };
        assert_eq!(
            classify(&record, &Thresholds::default()),
            Recommendation::Undetermined
        );
    }
}
