//! Fixed-layout "Results" sheet.
//!
//! The sheet is a stack of blocks, each starting two rows below the previous
//! block's last row:
//!
//! ```text
//! monthly      | November-2024 | December-2024 | ...   one column per (month, year)
//! components   | November-2024 | ...                   top 3 late components
//! annual       | 2024          | 2025          | ...   one column per year
//! last month   | January 2025  | Rolling_3mo   | %_change
//! ```
//!
//! Every row position lives in one of the ordered tables below. Side headings
//! and values are written from the same table entry, so a heading can never
//! drift away from its figure.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::debug;

use crate::error::ReportError;
use crate::types::{
    Bucket, Metric, PeriodStats, RollingComparison, Stats, YearComponents, YearSummary,
};
use crate::util::round_to;

pub const RESULTS_SHEET: &str = "Results";
const BLOCK_GAP: u32 = 2;
const FIRST_VALUE_COL: u16 = 1;

/// A table row: offset from the block's header row, side heading, and the
/// accessor producing its value.
pub struct MetricRow<T> {
    pub offset: u32,
    pub label: &'static str,
    pub value: fn(&T) -> Option<f64>,
}

/// What to write when an accessor has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    Zero,
    Blank,
}

/// The two per-kind summaries of one month, side by side.
#[derive(Debug, Clone, Copy)]
pub struct MonthColumn {
    pub slit: PeriodStats,
    pub convert: PeriodStats,
}

fn count(s: Option<Stats>) -> Option<f64> {
    s.map(|s| s.wo_count as f64)
}

fn sum(s: Option<Stats>) -> Option<f64> {
    s.map(|s| s.sum)
}

fn avg(s: Option<Stats>) -> Option<f64> {
    s.map(|s| s.avg)
}

fn median(s: Option<Stats>) -> Option<f64> {
    s.map(|s| s.median)
}

/// Late work orders as a whole percentage of all work orders.
fn late_ratio(p: &PeriodStats) -> Option<f64> {
    let all = p.qtys?;
    let late = p.late_qtys?;
    Some(round_to(late.wo_count as f64 / all.wo_count as f64 * 100.0, 0))
}

pub static MONTHLY_ROWS: [MetricRow<MonthColumn>; 22] = [
    MetricRow { offset: 1, label: "Slit WO Count", value: |c| count(c.slit.qtys) },
    MetricRow { offset: 2, label: "Slit Qty", value: |c| sum(c.slit.qtys) },
    MetricRow { offset: 3, label: "Slit Avg Qty", value: |c| avg(c.slit.qtys) },
    MetricRow { offset: 4, label: "Slit Median Qty", value: |c| median(c.slit.qtys) },
    MetricRow { offset: 5, label: "Late Slit Count", value: |c| count(c.slit.late_qtys) },
    MetricRow { offset: 6, label: "Late Slit Qty", value: |c| sum(c.slit.late_qtys) },
    MetricRow { offset: 7, label: "Late Slit Avg Qty", value: |c| avg(c.slit.late_qtys) },
    MetricRow { offset: 8, label: "Late Slit Median Qty", value: |c| median(c.slit.late_qtys) },
    MetricRow { offset: 9, label: "Late Slit Avg Duration", value: |c| avg(c.slit.late_durations) },
    MetricRow { offset: 10, label: "Late Slit Median Duration", value: |c| median(c.slit.late_durations) },
    MetricRow { offset: 11, label: "Late Slit Ratio (%)", value: |c| late_ratio(&c.slit) },
    MetricRow { offset: 12, label: "Convert WO Count", value: |c| count(c.convert.qtys) },
    MetricRow { offset: 13, label: "Convert Qty", value: |c| sum(c.convert.qtys) },
    MetricRow { offset: 14, label: "Convert Avg Qty", value: |c| avg(c.convert.qtys) },
    MetricRow { offset: 15, label: "Convert Median Qty", value: |c| median(c.convert.qtys) },
    MetricRow { offset: 16, label: "Late Convert Count", value: |c| count(c.convert.late_qtys) },
    MetricRow { offset: 17, label: "Late Convert Qty", value: |c| sum(c.convert.late_qtys) },
    MetricRow { offset: 18, label: "Late Convert Avg Qty", value: |c| avg(c.convert.late_qtys) },
    MetricRow { offset: 19, label: "Late Convert Median Qty", value: |c| median(c.convert.late_qtys) },
    MetricRow { offset: 20, label: "Late Convert Avg Duration", value: |c| avg(c.convert.late_durations) },
    MetricRow { offset: 21, label: "Late Convert Median Duration", value: |c| median(c.convert.late_durations) },
    MetricRow { offset: 22, label: "Late Convert Ratio (%)", value: |c| late_ratio(&c.convert) },
];

pub static ANNUAL_ROWS: [MetricRow<YearSummary>; 30] = [
    MetricRow { offset: 1, label: "WO Count", value: |y| Some(y.stats.wo_count as f64) },
    MetricRow { offset: 2, label: "Total Qty", value: |y| sum(y.stats.qtys) },
    MetricRow { offset: 3, label: "Avg Qty", value: |y| avg(y.stats.qtys) },
    MetricRow { offset: 4, label: "Median Qty", value: |y| median(y.stats.qtys) },
    MetricRow { offset: 5, label: "Late WO Count", value: |y| count(y.stats.late_qtys) },
    MetricRow { offset: 6, label: "Late Qty", value: |y| sum(y.stats.late_qtys) },
    MetricRow { offset: 7, label: "Late Avg Qty", value: |y| avg(y.stats.late_qtys) },
    MetricRow { offset: 8, label: "Late Median Qty", value: |y| median(y.stats.late_qtys) },
    MetricRow { offset: 9, label: "Late Avg Duration", value: |y| avg(y.stats.late_durations) },
    MetricRow { offset: 10, label: "Late Median Duration", value: |y| median(y.stats.late_durations) },
    MetricRow { offset: 11, label: "Slit WO Count", value: |y| count(y.slit.stats.qtys) },
    MetricRow { offset: 12, label: "Slit Qty", value: |y| sum(y.slit.stats.qtys) },
    MetricRow { offset: 13, label: "Slit Avg Qty", value: |y| avg(y.slit.stats.qtys) },
    MetricRow { offset: 14, label: "Slit Median Qty", value: |y| median(y.slit.stats.qtys) },
    MetricRow { offset: 15, label: "Late Slit WO Count", value: |y| count(y.slit.stats.late_qtys) },
    MetricRow { offset: 16, label: "Late Slit Qty", value: |y| sum(y.slit.stats.late_qtys) },
    MetricRow { offset: 17, label: "Late Slit Avg Qty", value: |y| avg(y.slit.stats.late_qtys) },
    MetricRow { offset: 18, label: "Late Slit Median Qty", value: |y| median(y.slit.stats.late_qtys) },
    MetricRow { offset: 19, label: "Late Slit Avg Duration", value: |y| avg(y.slit.stats.late_durations) },
    MetricRow { offset: 20, label: "Late Slit Median Duration", value: |y| median(y.slit.stats.late_durations) },
    MetricRow { offset: 21, label: "Convert WO Count", value: |y| count(y.convert.stats.qtys) },
    MetricRow { offset: 22, label: "Convert Qty", value: |y| sum(y.convert.stats.qtys) },
    MetricRow { offset: 23, label: "Convert Avg Qty", value: |y| avg(y.convert.stats.qtys) },
    MetricRow { offset: 24, label: "Convert Median Qty", value: |y| median(y.convert.stats.qtys) },
    MetricRow { offset: 25, label: "Late Convert WO Count", value: |y| count(y.convert.stats.late_qtys) },
    MetricRow { offset: 26, label: "Late Convert Qty", value: |y| sum(y.convert.stats.late_qtys) },
    MetricRow { offset: 27, label: "Late Convert Avg Qty", value: |y| avg(y.convert.stats.late_qtys) },
    MetricRow { offset: 28, label: "Late Convert Median Qty", value: |y| median(y.convert.stats.late_qtys) },
    MetricRow { offset: 29, label: "Late Convert Avg Duration", value: |y| avg(y.convert.stats.late_durations) },
    MetricRow { offset: 30, label: "Late Convert Median Duration", value: |y| median(y.convert.stats.late_durations) },
];

/// Name and count rows for one ranked component.
pub struct RankRow {
    pub name_offset: u32,
    pub name_label: &'static str,
    pub count_offset: u32,
    pub count_label: &'static str,
}

pub static TOP_COMPONENT_ROWS: [RankRow; 3] = [
    RankRow { name_offset: 1, name_label: "Component 1", count_offset: 2, count_label: "Component 1 Count" },
    RankRow { name_offset: 3, name_label: "Component 2", count_offset: 4, count_label: "Component 2 Count" },
    RankRow { name_offset: 5, name_label: "Component 3", count_offset: 6, count_label: "Component 3 Count" },
];

/// Rows per bucket in the last-month block; buckets stack in `Bucket::ALL` order.
pub const COMPARISON_BUCKET_STRIDE: u32 = 6;

pub static COMPARISON_ROWS: [(u32, Metric); 6] = [
    (1, Metric::WoCount),
    (2, Metric::TotalQty),
    (3, Metric::AvgQty),
    (4, Metric::LateWoCount),
    (5, Metric::LateAvgQty),
    (6, Metric::LateAvgDuration),
];

/// Worksheet wrapper that remembers the lowest row written so far.
struct ResultsSheet<'a> {
    sheet: &'a mut Worksheet,
    bold: Format,
    last_row: u32,
}

impl<'a> ResultsSheet<'a> {
    fn new(sheet: &'a mut Worksheet) -> Self {
        Self {
            sheet,
            bold: Format::new().set_bold(),
            last_row: 0,
        }
    }

    fn touch(&mut self, row: u32) {
        self.last_row = self.last_row.max(row);
    }

    fn next_block(&self) -> u32 {
        self.last_row + BLOCK_GAP
    }

    fn heading(&mut self, row: u32, col: u16, text: &str) -> Result<(), ReportError> {
        self.sheet.write_string_with_format(row, col, text, &self.bold)?;
        self.touch(row);
        Ok(())
    }

    fn text(&mut self, row: u32, col: u16, text: &str) -> Result<(), ReportError> {
        self.sheet.write_string(row, col, text)?;
        self.touch(row);
        Ok(())
    }

    fn number(&mut self, row: u32, col: u16, value: Option<f64>, missing: Missing) -> Result<(), ReportError> {
        match (value, missing) {
            (Some(v), _) => {
                self.sheet.write_number(row, col, v)?;
            }
            (None, Missing::Zero) => {
                self.sheet.write_number(row, col, 0.0)?;
            }
            (None, Missing::Blank) => {}
        }
        self.touch(row);
        Ok(())
    }

    fn side_headings<T>(&mut self, origin: u32, rows: &[MetricRow<T>]) -> Result<(), ReportError> {
        for row in rows {
            self.heading(origin + row.offset, 0, row.label)?;
        }
        Ok(())
    }

    fn metric_column<T>(
        &mut self,
        origin: u32,
        col: u16,
        rows: &[MetricRow<T>],
        item: &T,
        missing: Missing,
    ) -> Result<(), ReportError> {
        for row in rows {
            self.number(origin + row.offset, col, (row.value)(item), missing)?;
        }
        Ok(())
    }
}

fn write_monthly(out: &mut ResultsSheet<'_>, summary: &[YearSummary]) -> Result<(), ReportError> {
    let origin = 0;
    out.side_headings(origin, &MONTHLY_ROWS)?;
    let mut col = FIRST_VALUE_COL;
    for year in summary {
        for (slit, convert) in year.slit.months.iter().zip(&year.convert.months) {
            out.heading(origin, col, &format!("{}-{}", slit.month, year.year))?;
            let column = MonthColumn {
                slit: slit.stats,
                convert: convert.stats,
            };
            out.metric_column(origin, col, &MONTHLY_ROWS, &column, Missing::Zero)?;
            col += 1;
        }
    }
    Ok(())
}

fn write_components(out: &mut ResultsSheet<'_>, components: &[YearComponents]) -> Result<(), ReportError> {
    let origin = out.next_block();
    for rank in &TOP_COMPONENT_ROWS {
        out.heading(origin + rank.name_offset, 0, rank.name_label)?;
        out.heading(origin + rank.count_offset, 0, rank.count_label)?;
    }
    let mut col = FIRST_VALUE_COL;
    for year in components {
        for month in &year.months {
            out.heading(origin, col, &format!("{}-{}", month.month, year.year))?;
            for (rank, entry) in TOP_COMPONENT_ROWS.iter().zip(&month.ranking) {
                out.text(origin + rank.name_offset, col, &entry.name)?;
                out.number(origin + rank.count_offset, col, Some(entry.count as f64), Missing::Blank)?;
            }
            col += 1;
        }
    }
    Ok(())
}

fn write_annual(out: &mut ResultsSheet<'_>, summary: &[YearSummary]) -> Result<(), ReportError> {
    let origin = out.next_block();
    out.side_headings(origin, &ANNUAL_ROWS)?;
    for (col, year) in (FIRST_VALUE_COL..).zip(summary) {
        out.sheet.write_number_with_format(origin, col, year.year as f64, &out.bold)?;
        out.touch(origin);
        out.metric_column(origin, col, &ANNUAL_ROWS, year, Missing::Blank)?;
    }
    Ok(())
}

fn write_comparison(out: &mut ResultsSheet<'_>, cmp: &RollingComparison) -> Result<(), ReportError> {
    let origin = out.next_block();
    let periods = [cmp.last_month_label.as_str(), cmp.rolling_label.as_str(), "%_change"];
    for (col, period) in (FIRST_VALUE_COL..).zip(periods) {
        out.heading(origin, col, period)?;
    }
    for (stride, bucket) in (0..).zip(Bucket::ALL) {
        let b = cmp.bucket(bucket);
        for &(offset, metric) in &COMPARISON_ROWS {
            let row = origin + offset + stride * COMPARISON_BUCKET_STRIDE;
            out.heading(row, 0, &format!("{} {}", bucket.label(), metric.label()))?;
            out.number(row, FIRST_VALUE_COL, Some(metric.pick(&b.last_month)), Missing::Zero)?;
            out.number(row, FIRST_VALUE_COL + 1, Some(metric.pick(&b.rolling)), Missing::Zero)?;
            out.number(row, FIRST_VALUE_COL + 2, metric.pick(&b.percent_change), Missing::Blank)?;
        }
    }
    Ok(())
}

/// Build a workbook holding a freshly written "Results" sheet.
pub fn build_results_workbook(
    summary: &[YearSummary],
    components: &[YearComponents],
    comparison: Option<&RollingComparison>,
) -> Result<Workbook, ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(RESULTS_SHEET)?;

    let mut out = ResultsSheet::new(sheet);
    write_monthly(&mut out, summary)?;
    write_components(&mut out, components)?;
    write_annual(&mut out, summary)?;
    if let Some(cmp) = comparison {
        write_comparison(&mut out, cmp)?;
    }
    debug!(last_row = out.last_row, "results sheet laid out");
    Ok(workbook)
}

pub fn save_results(
    path: &Path,
    summary: &[YearSummary],
    components: &[YearComponents],
    comparison: Option<&RollingComparison>,
) -> Result<(), ReportError> {
    let mut workbook = build_results_workbook(summary, components, comparison)?;
    workbook.save(path)?;
    Ok(())
}
