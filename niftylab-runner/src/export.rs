//! Published file formats: the canonical daily CSV, the yearly summary CSV,
//! and an optional Parquet mirror of the daily series.
//!
//! Prices and changes are written with two decimals and dates as
//! `YYYY-MM-DD`. Missing volume or volatility values are empty cells, never
//! zero.

use chrono::{Datelike, NaiveDate};
use niftylab_core::analytics::YearlyReport;
use niftylab_core::data::RawTable;
use niftylab_core::numeric::parse_number;
use niftylab_core::{CanonicalRow, CanonicalSeries, DailyBar, SeriesError};
use polars::prelude::{Column, DataFrame, DataType, ParquetWriter};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub const DAILY_HEADERS: [&str; 5] = ["Date", "Open", "High", "Low", "Close"];
pub const VOLUME_HEADER: &str = "Volume";
pub const CHANGE_HEADERS: [&str; 2] = ["Point_Change", "Percentage_Change"];

pub const YEARLY_HEADERS: [&str; 15] = [
    "Year",
    "Yearly_Starting_Price",
    "Yearly_End_Price",
    "Yearly_High",
    "Yearly_Low",
    "Yearly_Return_Percentage",
    "Yearly_Points_Change",
    "Yearly_High_to_Low_Change_Percentage",
    "Yearly_High_to_Low_Points_Change",
    "Yearly_Starting_to_Low_Points_Change",
    "Yearly_Starting_to_Low_Percentage_Change",
    "Yearly_Starting_to_High_Points_Change",
    "Yearly_Starting_to_High_Percentage_Change",
    "Yearly_Start_to_End_Percentage_Change",
    "Yearly_Start_to_Mid_Percentage_Change",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("daily file has no '{0}' column")]
    MissingColumn(String),

    #[error("daily file row {row}: {message}")]
    Row { row: usize, message: String },

    #[error("daily file is not in date order: {0}")]
    Series(#[from] SeriesError),
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Header row of the daily file for a given series layout.
pub fn daily_headers(has_volume: bool, volatility_column: &str) -> Vec<String> {
    let mut headers: Vec<String> = DAILY_HEADERS.iter().map(|h| h.to_string()).collect();
    if has_volume {
        headers.push(VOLUME_HEADER.into());
    }
    headers.extend(CHANGE_HEADERS.iter().map(|h| h.to_string()));
    headers.push(volatility_column.into());
    headers
}

/// Write the canonical daily series as CSV.
pub fn write_daily_csv<W: Write>(
    writer: W,
    series: &CanonicalSeries,
    volatility_column: &str,
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(daily_headers(series.has_volume(), volatility_column))?;

    for row in series.rows() {
        let bar = &row.bar;
        let mut record = vec![
            bar.date.format("%Y-%m-%d").to_string(),
            money(bar.open),
            money(bar.high),
            money(bar.low),
            money(bar.close),
        ];
        if series.has_volume() {
            record.push(optional(bar.volume));
        }
        record.push(money(row.point_change));
        record.push(money(row.percent_change));
        record.push(row.volatility.map(money).unwrap_or_default());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the yearly summary as CSV, one row per year.
pub fn write_yearly_csv<W: Write>(writer: W, report: &YearlyReport) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(YEARLY_HEADERS)?;

    for m in &report.metrics {
        wtr.write_record([
            m.year.to_string(),
            money(m.start_close),
            money(m.end_close),
            money(m.high),
            money(m.low),
            money(m.return_pct),
            money(m.points_change),
            money(m.high_low_pct),
            money(m.high_low_points),
            money(m.start_low_points),
            money(m.start_low_pct),
            money(m.start_high_points),
            money(m.start_high_pct),
            money(m.start_end_pct),
            money(m.start_mid_pct),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the canonical daily series as Parquet, with the same column names
/// as the CSV and `Date` stored as a date column.
pub fn write_daily_parquet(
    path: &Path,
    series: &CanonicalSeries,
    volatility_column: &str,
) -> Result<(), ExportError> {
    let rows = series.rows();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| r.date().num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();
    let price = |f: fn(&CanonicalRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();

    let mut columns = vec![
        Column::new("Date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| ExportError::Parquet(format!("date cast: {e}")))?,
        Column::new("Open".into(), price(|r| r.bar.open)),
        Column::new("High".into(), price(|r| r.bar.high)),
        Column::new("Low".into(), price(|r| r.bar.low)),
        Column::new("Close".into(), price(|r| r.bar.close)),
    ];
    if series.has_volume() {
        let volumes: Vec<Option<u64>> = rows.iter().map(|r| r.bar.volume).collect();
        columns.push(Column::new(VOLUME_HEADER.into(), volumes));
    }
    columns.push(Column::new("Point_Change".into(), price(|r| r.point_change)));
    columns.push(Column::new("Percentage_Change".into(), price(|r| r.percent_change)));
    let volatility: Vec<Option<f64>> = rows.iter().map(|r| r.volatility).collect();
    columns.push(Column::new(volatility_column.into(), volatility));

    let mut df = DataFrame::new(columns)
        .map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))?;
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| ExportError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// A published daily file read back into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyFile {
    pub series: CanonicalSeries,
    /// Name of the column after `Percentage_Change`, if the file has one.
    pub volatility_column: Option<String>,
}

/// Parse a canonical daily CSV back into a [`CanonicalSeries`].
///
/// The stored changes are taken as written; ordering is re-validated.
pub fn read_daily_csv(path: &Path) -> Result<DailyFile, ExportError> {
    let table = RawTable::from_path(path)?;
    parse_daily_table(&table)
}

pub fn parse_daily_table(table: &RawTable) -> Result<DailyFile, ExportError> {
    let col = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| ExportError::MissingColumn(name.to_string()))
    };
    let date_col = col("Date")?;
    let open_col = col("Open")?;
    let high_col = col("High")?;
    let low_col = col("Low")?;
    let close_col = col("Close")?;
    let points_col = col("Point_Change")?;
    let pct_col = col("Percentage_Change")?;
    let volume_col = table.column_index(VOLUME_HEADER);
    let volatility_col = (pct_col + 1 < table.headers().len()).then_some(pct_col + 1);

    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let bad = |message: String| ExportError::Row {
            row: row + 1,
            message,
        };
        let number = |c: usize| -> Result<f64, ExportError> {
            let cell = table.cell(row, c);
            cell.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| bad(format!("'{cell}' in column {} is not a number", table.headers()[c])))
        };

        let raw_date = table.cell(row, date_col);
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| bad(format!("bad date '{raw_date}': {e}")))?;
        let volume = match volume_col.map(|c| table.cell(row, c)) {
            None | Some("") => None,
            Some(cell) => Some(
                parse_number(cell)
                    .filter(|v| *v >= 0.0)
                    .map(|v| v.round() as u64)
                    .ok_or_else(|| bad(format!("bad volume '{cell}'")))?,
            ),
        };
        let volatility = match volatility_col.map(|c| table.cell(row, c)) {
            None | Some("") => None,
            Some(_) => volatility_col.map(number).transpose()?,
        };

        rows.push(CanonicalRow {
            bar: DailyBar {
                date,
                open: number(open_col)?,
                high: number(high_col)?,
                low: number(low_col)?,
                close: number(close_col)?,
                volume,
            },
            point_change: number(points_col)?,
            percent_change: number(pct_col)?,
            volatility,
        });
    }

    Ok(DailyFile {
        series: CanonicalSeries::new(rows, volume_col.is_some())?,
        volatility_column: volatility_col.map(|c| table.headers()[c].clone()),
    })
}

/// Render the last `n` rows of a series as an aligned text table.
pub fn format_tail(series: &CanonicalSeries, n: usize, volatility_column: &str) -> String {
    let rows = series.rows();
    let start = rows.len().saturating_sub(n);
    let headers = daily_headers(series.has_volume(), volatility_column);
    let mut out = headers
        .iter()
        .map(|h| format!("{h:>14}"))
        .collect::<Vec<_>>()
        .join("");
    out.push('\n');

    for row in &rows[start..] {
        let bar = &row.bar;
        let mut cells = vec![
            bar.date.to_string(),
            money(bar.open),
            money(bar.high),
            money(bar.low),
            money(bar.close),
        ];
        if series.has_volume() {
            cells.push(optional(bar.volume));
        }
        cells.push(money(row.point_change));
        cells.push(money(row.percent_change));
        cells.push(row.volatility.map(money).unwrap_or_else(|| "-".into()));
        out.push_str(&cells.iter().map(|c| format!("{c:>14}")).collect::<Vec<_>>().join(""));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use niftylab_core::domain::YearlyMetrics;

    fn series(has_volume: bool) -> CanonicalSeries {
        let mk = |d: u32, close: f64, volume: Option<u64>, vix: Option<f64>| {
            let mut row = CanonicalRow::derive(DailyBar {
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                open: 100.0,
                high: 110.5,
                low: 95.25,
                close,
                volume,
            })
            .unwrap();
            row.volatility = vix;
            row
        };
        CanonicalSeries::new(
            vec![mk(1, 101.1, None, None), mk(2, 99.0, Some(1200), Some(14.07))],
            has_volume,
        )
        .unwrap()
    }

    fn to_string(series: &CanonicalSeries) -> String {
        let mut buf = Vec::new();
        write_daily_csv(&mut buf, series, "India_VIX").unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn daily_csv_layout_with_volume() {
        let text = to_string(&series(true));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Date,Open,High,Low,Close,Volume,Point_Change,Percentage_Change,India_VIX"
        );
        assert_eq!(lines[1], "2024-01-01,100.00,110.50,95.25,101.10,,1.10,1.10,");
        assert_eq!(lines[2], "2024-01-02,100.00,110.50,95.25,99.00,1200,-1.00,-1.00,14.07");
    }

    #[test]
    fn daily_csv_omits_volume_column_when_absent() {
        let text = to_string(&series(false));
        assert!(text.starts_with("Date,Open,High,Low,Close,Point_Change,Percentage_Change,India_VIX\n"));
    }

    #[test]
    fn daily_csv_reads_back() {
        let original = series(true);
        let table = RawTable::from_reader(to_string(&original).as_bytes()).unwrap();
        let file = parse_daily_table(&table).unwrap();

        assert_eq!(file.series, original);
        assert_eq!(file.volatility_column.as_deref(), Some("India_VIX"));
    }

    #[test]
    fn reading_rejects_bad_numbers() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close", "Point_Change", "Percentage_Change"],
            &[&["2024-01-01", "x", "1", "1", "1", "0", "0"]],
        );
        let err = parse_daily_table(&table).unwrap_err();
        assert!(matches!(err, ExportError::Row { row: 1, .. }));
    }

    #[test]
    fn reading_accepts_float_volume_cells() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close", "Volume", "Point_Change", "Percentage_Change", "India_VIX"],
            &[
                &["2007-09-17", "4494.65", "4550.25", "4482.85", "4546.20", "0.0", "51.55", "1.15", ""],
                &["2007-09-18", "4546.20", "4551.80", "4481.55", "4732.35", "250400.0", "186.15", "4.09", "23.50"],
            ],
        );
        let file = parse_daily_table(&table).unwrap();
        let rows = file.series.rows();
        assert_eq!(rows[0].bar.volume, Some(0));
        assert_eq!(rows[1].bar.volume, Some(250_400));
        assert_eq!(rows[0].volatility, None);
    }

    #[test]
    fn reading_rejects_negative_volume() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close", "Volume", "Point_Change", "Percentage_Change"],
            &[&["2024-01-01", "1", "1", "1", "1", "-5.0", "0", "0"]],
        );
        assert!(matches!(parse_daily_table(&table), Err(ExportError::Row { row: 1, .. })));
    }

    #[test]
    fn reading_rejects_unordered_rows() {
        let table = RawTable::from_rows(
            &["Date", "Open", "High", "Low", "Close", "Point_Change", "Percentage_Change"],
            &[
                &["2024-01-02", "1", "1", "1", "1", "0", "0"],
                &["2024-01-01", "1", "1", "1", "1", "0", "0"],
            ],
        );
        assert!(matches!(parse_daily_table(&table), Err(ExportError::Series(_))));
    }

    #[test]
    fn yearly_csv_layout() {
        let report = YearlyReport {
            metrics: vec![YearlyMetrics {
                year: 2008,
                start_close: 100.0,
                end_close: 120.0,
                high: 150.0,
                low: 90.0,
                return_pct: 20.0,
                points_change: 20.0,
                high_low_pct: 66.67,
                high_low_points: 60.0,
                start_low_points: -10.0,
                start_low_pct: -10.0,
                start_high_points: 50.0,
                start_high_pct: 50.0,
                start_end_pct: 20.0,
                start_mid_pct: 50.0,
            }],
            skipped: Vec::new(),
        };
        let mut buf = Vec::new();
        write_yearly_csv(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], YEARLY_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "2008,100.00,120.00,150.00,90.00,20.00,20.00,66.67,60.00,-10.00,-10.00,50.00,50.00,20.00,50.00"
        );
    }

    #[test]
    fn parquet_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.parquet");
        write_daily_parquet(&path, &series(true), "India_VIX").unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn tail_shows_last_rows_and_missing_marker() {
        let text = format_tail(&series(false), 1, "India_VIX");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("2024-01-02"));
        assert!(!text.contains("2024-01-01"));
    }
}
