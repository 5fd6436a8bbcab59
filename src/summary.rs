//! Per-period averages over summed daily counts.

use crate::infra::sqlite::PeriodSumRow;
use serde::Serialize;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean ridership per period across the dates of a summary.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct PeriodMeans {
    pub days: usize,
    pub graveyard: f64,
    pub morning: f64,
    pub afternoon: f64,
    pub night: f64,
}

pub fn period_means(rows: &[PeriodSumRow]) -> PeriodMeans {
    let column = |f: fn(&PeriodSumRow) -> i64| -> f64 {
        mean(&rows.iter().map(|r| f(r) as f64).collect::<Vec<_>>())
    };

    PeriodMeans {
        days: rows.len(),
        graveyard: column(|r| r.graveyard),
        morning: column(|r| r.morning),
        afternoon: column(|r| r.afternoon),
        night: column(|r| r.night),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_period_means() {
        let rows = vec![
            PeriodSumRow {
                date: "2019/06/03".into(),
                graveyard: 10,
                morning: 100,
                afternoon: 80,
                night: 40,
            },
            PeriodSumRow {
                date: "2019/06/04".into(),
                graveyard: 20,
                morning: 300,
                afternoon: 60,
                night: 40,
            },
        ];

        let means = period_means(&rows);

        assert_eq!(means.days, 2);
        assert_eq!(means.graveyard, 15.0);
        assert_eq!(means.morning, 200.0);
        assert_eq!(means.afternoon, 70.0);
        assert_eq!(means.night, 40.0);
    }

    #[test]
    fn test_period_means_empty() {
        assert_eq!(period_means(&[]), PeriodMeans::default());
    }
}
