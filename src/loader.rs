use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::types::{Dataset, WorkOrder};
use crate::util::{parse_date_safe, parse_f64_safe, serial_to_date};

pub const PRODUCTION_MARKER: &str = "Record Production";
pub const POSTED_STATUS: &str = "Posted";
const COST_LINES: [&str; 2] = ["CONVERTING COST", "SLITTING COST"];

// Fixed column layout, A..J.
const COL_WO_NUM: usize = 0;
const COL_PART_NUM: usize = 1;
const COL_PART_DESC: usize = 2;
const COL_TYPE: usize = 3;
const COL_STATUS: usize = 4;
const COL_POST_DATE: usize = 5;
const COL_DUE_DATE: usize = 6;
const COL_QTY: usize = 7;
const COL_MARKER: usize = 8;
const COL_COMPONENTS: usize = 9;

static COMPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?) -").expect("component pattern is valid"));

/// One source row with its cells converted to typed values but not yet
/// checked for inclusion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-based row number in the source.
    pub row: usize,
    pub wo_num: Option<String>,
    pub part_num: Option<String>,
    pub part_desc: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub post_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub qty: Option<f64>,
    pub marker: Option<String>,
    pub components: Option<String>,
}

impl RawRow {
    pub fn is_production_record(&self) -> bool {
        self.marker.as_deref() == Some(PRODUCTION_MARKER)
            && self.status.as_deref() == Some(POSTED_STATUS)
            && self.kind.is_some()
    }
}

/// Outcome of reading one segment of a component descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentParse {
    Component(String),
    CostLine,
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSegment {
    pub row: usize,
    pub segment: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub included_rows: usize,
    pub unreadable_rows: usize,
    pub skipped_segments: Vec<SkippedSegment>,
}

pub fn parse_segment(segment: &str) -> SegmentParse {
    let Some(caps) = COMPONENT_RE.captures(segment) else {
        return SegmentParse::Skipped("no ' -' separator".to_string());
    };
    let name = caps[1].trim();
    if COST_LINES.contains(&name) {
        SegmentParse::CostLine
    } else {
        SegmentParse::Component(name.to_string())
    }
}

/// Split a descriptor like `FILM A - 12.5, SLITTING COST - 3` into its
/// component names, returning the segments that did not parse alongside.
pub fn parse_components(row: usize, descriptor: &str) -> (Vec<String>, Vec<SkippedSegment>) {
    let mut components = Vec::new();
    let mut skipped = Vec::new();
    if descriptor.is_empty() {
        return (components, skipped);
    }
    for segment in descriptor.split([',', ';']) {
        match parse_segment(segment) {
            SegmentParse::Component(name) => components.push(name),
            SegmentParse::CostLine => {}
            SegmentParse::Skipped(reason) => {
                skipped.push(SkippedSegment {
                    row,
                    segment: segment.to_string(),
                    reason,
                });
            }
        }
    }
    (components, skipped)
}

/// Apply the inclusion rules and build the dataset.
///
/// Rows that are not posted production records are ignored. An included row
/// without a post date, due date or quantity is a structural error and stops
/// the run.
pub fn extract(rows: Vec<RawRow>) -> Result<(Dataset, LoadReport), ReportError> {
    let mut report = LoadReport {
        total_rows: rows.len(),
        ..Default::default()
    };
    let mut records = Vec::new();

    for row in rows {
        if !row.is_production_record() {
            continue;
        }
        let missing = |column| ReportError::MissingField { row: row.row, column };
        let post_date = row.post_date.ok_or_else(|| missing("post date"))?;
        let due_date = row.due_date.ok_or_else(|| missing("due date"))?;
        let qty = row.qty.ok_or_else(|| missing("quantity"))?;

        let (components, skipped) =
            parse_components(row.row, row.components.as_deref().unwrap_or(""));
        report.skipped_segments.extend(skipped);

        let late_duration = WorkOrder::late_duration(post_date, due_date);
        records.push(WorkOrder {
            wo_num: row.wo_num.unwrap_or_default(),
            part_num: row.part_num.unwrap_or_default(),
            part_desc: row.part_desc.unwrap_or_default(),
            kind: row.kind.unwrap_or_default(),
            status: row.status.unwrap_or_default(),
            post_date,
            due_date,
            qty,
            components,
            late_duration,
            is_late: late_duration > 0,
        });
    }

    report.included_rows = records.len();
    Ok((Dataset::from_records(records), report))
}

/// Load the work orders from `path`. A `.csv` file is read positionally;
/// anything else goes through the spreadsheet reader using its first sheet.
pub fn load(path: &Path) -> Result<(Dataset, LoadReport), ReportError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let (rows, unreadable_rows) = if is_csv {
        read_csv_rows(path)?
    } else {
        (read_workbook_rows(path)?, 0)
    };

    let (dataset, mut report) = extract(rows)?;
    report.unreadable_rows = unreadable_rows;
    if unreadable_rows > 0 {
        warn!(unreadable_rows, "some csv rows could not be read");
    }
    for s in &report.skipped_segments {
        debug!(row = s.row, segment = %s.segment, reason = %s.reason, "skipped component segment");
    }
    if !report.skipped_segments.is_empty() {
        warn!(
            skipped = report.skipped_segments.len(),
            "component segments without a ' -' separator were ignored"
        );
    }
    info!(
        path = %path.display(),
        total_rows = report.total_rows,
        included_rows = report.included_rows,
        years = ?dataset.years_seen,
        "loaded work orders"
    );
    Ok((dataset, report))
}

fn read_workbook_rows(path: &Path) -> Result<Vec<RawRow>, ReportError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| ReportError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::NoSheets(path.to_path_buf()))?
        .map_err(|e| ReportError::Sheet {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let Some((end_row, _)) = range.end() else {
        return Ok(Vec::new());
    };
    let mut rows = Vec::with_capacity(end_row as usize + 1);
    for r in 0..=end_row {
        let cell = |col: usize| range.get_value((r, col as u32));
        rows.push(RawRow {
            row: r as usize + 1,
            wo_num: cell(COL_WO_NUM).and_then(cell_text),
            part_num: cell(COL_PART_NUM).and_then(cell_text),
            part_desc: cell(COL_PART_DESC).and_then(cell_text),
            kind: cell(COL_TYPE).and_then(cell_text),
            status: cell(COL_STATUS).and_then(cell_text),
            post_date: cell(COL_POST_DATE).and_then(cell_date),
            due_date: cell(COL_DUE_DATE).and_then(cell_date),
            qty: cell(COL_QTY).and_then(cell_number),
            marker: cell(COL_MARKER).and_then(cell_text),
            components: cell(COL_COMPONENTS).and_then(cell_text),
        });
    }
    Ok(rows)
}

fn read_csv_rows(path: &Path) -> Result<(Vec<RawRow>, usize), ReportError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ReportError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut rows = Vec::new();
    let mut unreadable = 0usize;
    for (idx, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(row = idx + 1, error = %e, "unreadable csv row");
                unreadable += 1;
                continue;
            }
        };
        let text = |col: usize| record.get(col).filter(|s| !s.is_empty()).map(str::to_string);
        rows.push(RawRow {
            row: idx + 1,
            wo_num: text(COL_WO_NUM),
            part_num: text(COL_PART_NUM),
            part_desc: text(COL_PART_DESC),
            kind: text(COL_TYPE),
            status: text(COL_STATUS),
            post_date: parse_date_safe(record.get(COL_POST_DATE)),
            due_date: parse_date_safe(record.get(COL_DUE_DATE)),
            qty: parse_f64_safe(record.get(COL_QTY)),
            marker: text(COL_MARKER),
            components: text(COL_COMPONENTS),
        });
    }
    Ok((rows, unreadable))
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            (!s.is_empty()).then(|| s.clone())
        }
        // Numeric identifiers come through as floats; drop the `.0`.
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Data::Float(n) => Some(n.to_string()),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.to_string()),
        Data::Error(e) => Some(format!("#{:?}", e)),
    }
}

fn cell_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|d| d.date()),
        Data::DateTimeIso(s) | Data::String(s) => parse_date_safe(Some(s.as_str())),
        Data::Float(n) => serial_to_date(*n),
        Data::Int(n) => serial_to_date(*n as f64),
        _ => None,
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(n) => Some(*n),
        Data::Int(n) => Some(*n as f64),
        Data::String(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}
