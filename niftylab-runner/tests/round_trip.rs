//! Writing the daily file and reading it back keeps every numeric field at
//! two-decimal precision.

use chrono::{Duration, NaiveDate};
use niftylab_core::numeric::round2;
use niftylab_core::{CanonicalRow, CanonicalSeries, DailyBar, RawTable};
use niftylab_runner::export::{parse_daily_table, write_daily_csv};
use proptest::prelude::*;

fn arb_row() -> impl Strategy<Value = (f64, f64, f64, f64, Option<u64>, Option<f64>)> {
    (
        (1000.0..30000.0_f64).prop_map(round2),
        (1000.0..30000.0_f64).prop_map(round2),
        (1000.0..30000.0_f64).prop_map(round2),
        (1000.0..30000.0_f64).prop_map(round2),
        prop::option::of(0..5_000_000_000_u64),
        prop::option::of((5.0..90.0_f64).prop_map(round2)),
    )
}

proptest! {
    #[test]
    fn daily_csv_round_trip(rows in prop::collection::vec(arb_row(), 1..40), has_volume in any::<bool>()) {
        let base = NaiveDate::from_ymd_opt(1995, 11, 3).unwrap();
        let rows: Vec<CanonicalRow> = rows
            .into_iter()
            .enumerate()
            .map(|(i, (open, high, low, close, volume, vix))| {
                let mut row = CanonicalRow::derive(DailyBar {
                    date: base + Duration::days(i as i64 * 3),
                    open,
                    high,
                    low,
                    close,
                    volume: volume.filter(|_| has_volume),
                })
                .unwrap();
                row.volatility = vix;
                row
            })
            .collect();
        let series = CanonicalSeries::new(rows, has_volume).unwrap();

        let mut buf = Vec::new();
        write_daily_csv(&mut buf, &series, "India_VIX").unwrap();
        let table = RawTable::from_reader(buf.as_slice()).unwrap();
        let back = parse_daily_table(&table).unwrap();

        prop_assert_eq!(back.series, series);
    }
}
