//! End-to-end consolidation: raw tables through normalize, merge, volatility
//! join and yearly aggregation.

use chrono::NaiveDate;
use niftylab_core::{
    aggregate_yearly, attach_volatility, merge_sources, normalize, MergeError, RawTable,
    SchemaError, SourceTag, VolatilityPoint,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn archive(rows: &[&[&str]]) -> RawTable {
    RawTable::from_rows(&["Date", "Open", "High", "Low", "Close"], rows)
}

fn live(rows: &[&[&str]]) -> RawTable {
    RawTable::from_rows(&["Date", "Open", "High", "Low", "Close", "Volume"], rows)
}

#[test]
fn disjoint_sources_merge_in_date_order() {
    let a = normalize(&archive(&[&["10-09-2007", "99", "101", "98", "100"]]), SourceTag::Archive).unwrap();
    let l = normalize(
        &live(&[&["2007-09-17", "105", "112", "104", "110", "250000"]]),
        SourceTag::Live,
    )
    .unwrap();

    let (series, report) = merge_sources(&[a, l]).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.rows()[0].date(), date("2007-09-10"));
    assert_eq!(series.rows()[0].bar.close, 100.0);
    assert_eq!(series.rows()[1].date(), date("2007-09-17"));
    assert_eq!(series.rows()[1].bar.close, 110.0);
    assert_eq!(series.rows()[1].bar.volume, Some(250_000));
    assert_eq!(series.rows()[0].bar.volume, None);
    assert!(series.has_volume());
    assert!(report.coercion_drops.is_empty());
    assert_eq!(report.duplicates_removed, 0);
}

#[test]
fn archive_wins_overlapping_date() {
    let a = normalize(&archive(&[&["2008-01-01", "95", "105", "90", "100"]]), SourceTag::Archive).unwrap();
    let l = normalize(
        &live(&[&["2008-01-01", "990", "1000", "980", "999", "1"]]),
        SourceTag::Live,
    )
    .unwrap();

    let (series, report) = merge_sources(&[a, l]).unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series.rows()[0].bar.close, 100.0);
    assert_eq!(series.rows()[0].point_change, 5.0);
    assert_eq!(series.rows()[0].percent_change, 5.26);
    assert_eq!(report.cross_source_overlaps, 1);
}

#[test]
fn yearly_statistics_follow_date_order() {
    let a = normalize(
        &archive(&[
            &["2008-03-01", "140", "150", "130", "150"],
            &["2008-01-01", "100", "110", "95", "100"],
            &["2008-12-31", "125", "130", "118", "120"],
        ]),
        SourceTag::Archive,
    )
    .unwrap();

    let (series, _) = merge_sources(&[a]).unwrap();
    let report = aggregate_yearly(&series).unwrap();
    let y = report.get(2008).unwrap();

    assert_eq!(y.start_close, 100.0);
    assert_eq!(y.end_close, 120.0);
    assert_eq!(y.return_pct, 20.0);
    assert_eq!(y.start_end_pct, 20.0);
    assert_eq!(y.high, 150.0);
    assert_eq!(y.low, 95.0);
    assert_eq!(y.start_mid_pct, 50.0);
}

#[test]
fn archive_is_clipped_at_cutover_before_merge() {
    let cutover = date("2007-09-17");
    let a = normalize(
        &archive(&[
            &["2007-09-14", "1", "1", "1", "1"],
            &["2007-09-17", "2", "2", "2", "2"],
        ]),
        SourceTag::Archive,
    )
    .unwrap()
    .clip_before(cutover);
    let l = normalize(&live(&[&["2007-09-17", "3", "3", "3", "3", "10"]]), SourceTag::Live).unwrap();

    let (series, _) = merge_sources(&[a, l]).unwrap();

    assert_eq!(series.get(cutover).unwrap().bar.close, 3.0);
}

#[test]
fn missing_column_aborts_before_merge() {
    let table = RawTable::from_rows(&["Date", "Open", "High", "Close"], &[&["2020-01-01", "1", "1", "1"]]);
    let err = normalize(&table, SourceTag::Archive).unwrap_err();
    assert_eq!(
        err,
        SchemaError::MissingColumn {
            column: "Low".into(),
            origin: SourceTag::Archive,
        }
    );
}

#[test]
fn all_rows_non_numeric_is_empty_merge() {
    let a = normalize(&archive(&[&["2020-01-01", "-", "-", "-", "-"]]), SourceTag::Archive).unwrap();
    let err = merge_sources(&[a]).unwrap_err();
    assert!(matches!(err, MergeError::Empty { rows_in: 1, coercion_drops: 1 }));
}

#[test]
fn volatility_join_leaves_gaps_missing() {
    let a = normalize(
        &archive(&[
            &["2020-01-01", "1", "1", "1", "1"],
            &["2020-01-02", "1", "1", "1", "1"],
        ]),
        SourceTag::Archive,
    )
    .unwrap();
    let (series, _) = merge_sources(&[a]).unwrap();

    let joined = attach_volatility(
        &series,
        &[
            VolatilityPoint { date: date("2020-01-02"), index_value: 14.5 },
            VolatilityPoint { date: date("2020-02-01"), index_value: 99.0 },
        ],
    );

    assert_eq!(joined.len(), series.len());
    assert_eq!(joined.rows()[0].volatility, None);
    assert_eq!(joined.rows()[1].volatility, Some(14.5));
    assert_eq!(joined.volatility_coverage(), 1);
}
