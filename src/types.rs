use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use tabled::Tabled;

/// The two work-order categories reported on, matched as case-insensitive
/// substrings of the free-text type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOrderKind {
    Slit,
    Convert,
}

impl WorkOrderKind {
    pub fn needle(self) -> &'static str {
        match self {
            WorkOrderKind::Slit => "slit",
            WorkOrderKind::Convert => "convert",
        }
    }
}

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Move by `months` calendar months (negative goes back).
    pub fn shift(self, months: i32) -> Self {
        let idx = self.year * 12 + self.month as i32 - 1 + months;
        Self::new(idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One posted production work order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrder {
    pub wo_num: String,
    pub part_num: String,
    pub part_desc: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub post_date: NaiveDate,
    pub due_date: NaiveDate,
    pub qty: f64,
    pub components: Vec<String>,
    pub late_duration: i64,
    pub is_late: bool,
}

impl WorkOrder {
    /// Days between due and post date; negative when posted early.
    pub fn late_duration(post_date: NaiveDate, due_date: NaiveDate) -> i64 {
        (post_date - due_date).num_days()
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.post_date)
    }
}

/// The extracted work orders plus the bounds later stages iterate over.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    pub raw: Vec<WorkOrder>,
    pub years_seen: Vec<i32>,
    pub first_date_seen: Option<NaiveDate>,
    pub last_date_seen: Option<NaiveDate>,
}

impl Dataset {
    pub fn from_records(raw: Vec<WorkOrder>) -> Self {
        let mut years_seen = Vec::new();
        for wo in &raw {
            let year = wo.post_date.year();
            if !years_seen.contains(&year) {
                years_seen.push(year);
            }
        }
        let first_date_seen = raw.iter().map(|wo| wo.post_date).min();
        let last_date_seen = raw.iter().map(|wo| wo.post_date).max();
        Self {
            raw,
            years_seen,
            first_date_seen,
            last_date_seen,
        }
    }

    /// True when `ym` lies between the months of the first and last post dates.
    pub fn month_in_range(&self, ym: YearMonth) -> bool {
        match (self.first_date_seen, self.last_date_seen) {
            (Some(first), Some(last)) => YearMonth::of(first) <= ym && ym <= YearMonth::of(last),
            _ => false,
        }
    }
}

/// Count/sum/mean/median over a non-empty list of numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub wo_count: usize,
    pub sum: f64,
    pub avg: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodStats {
    pub wo_count: usize,
    pub qtys: Option<Stats>,
    pub late_count: usize,
    pub late_qtys: Option<Stats>,
    pub late_durations: Option<Stats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: &'static str,
    pub month_num: u32,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSummary {
    #[serde(flatten)]
    pub stats: PeriodStats,
    pub months: Vec<MonthSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    #[serde(flatten)]
    pub stats: PeriodStats,
    pub slit: TypeSummary,
    pub convert: TypeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthComponents {
    pub month: &'static str,
    pub month_num: u32,
    pub ranking: Vec<ComponentCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearComponents {
    pub year: i32,
    pub months: Vec<MonthComponents>,
    pub components: Vec<ComponentCount>,
}

/// The six figures compared between last month and the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComparisonMetrics<T> {
    #[serde(rename = "WO Count")]
    pub wo_count: T,
    #[serde(rename = "Total Qty")]
    pub total_qty: T,
    #[serde(rename = "Avg Qty")]
    pub avg_qty: T,
    #[serde(rename = "Late WO Count")]
    pub late_wo_count: T,
    #[serde(rename = "Late Avg Qty")]
    pub late_avg_qty: T,
    #[serde(rename = "Late Avg Duration")]
    pub late_avg_duration: T,
}

impl<T> ComparisonMetrics<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            wo_count: f(Metric::WoCount),
            total_qty: f(Metric::TotalQty),
            avg_qty: f(Metric::AvgQty),
            late_wo_count: f(Metric::LateWoCount),
            late_avg_qty: f(Metric::LateAvgQty),
            late_avg_duration: f(Metric::LateAvgDuration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    WoCount,
    TotalQty,
    AvgQty,
    LateWoCount,
    LateAvgQty,
    LateAvgDuration,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::WoCount,
        Metric::TotalQty,
        Metric::AvgQty,
        Metric::LateWoCount,
        Metric::LateAvgQty,
        Metric::LateAvgDuration,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::WoCount => "WO Count",
            Metric::TotalQty => "Total Qty",
            Metric::AvgQty => "Avg Qty",
            Metric::LateWoCount => "Late WO Count",
            Metric::LateAvgQty => "Late Avg Qty",
            Metric::LateAvgDuration => "Late Avg Duration",
        }
    }

    pub fn pick<T: Copy>(self, m: &ComparisonMetrics<T>) -> T {
        match self {
            Metric::WoCount => m.wo_count,
            Metric::TotalQty => m.total_qty,
            Metric::AvgQty => m.avg_qty,
            Metric::LateWoCount => m.late_wo_count,
            Metric::LateAvgQty => m.late_avg_qty,
            Metric::LateAvgDuration => m.late_avg_duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Total,
    Slit,
    Convert,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Total, Bucket::Slit, Bucket::Convert];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Total => "total",
            Bucket::Slit => "slit",
            Bucket::Convert => "convert",
        }
    }

    pub fn kind(self) -> Option<WorkOrderKind> {
        match self {
            Bucket::Total => None,
            Bucket::Slit => Some(WorkOrderKind::Slit),
            Bucket::Convert => Some(WorkOrderKind::Convert),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketComparison {
    pub last_month: ComparisonMetrics<f64>,
    pub rolling: ComparisonMetrics<f64>,
    #[serde(rename = "%_change")]
    pub percent_change: ComparisonMetrics<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingComparison {
    pub reference_date: NaiveDate,
    pub rolling_months: u32,
    pub last_month: YearMonth,
    pub window_start: YearMonth,
    pub window_end: YearMonth,
    pub last_month_label: String,
    pub rolling_label: String,
    pub total: BucketComparison,
    pub slit: BucketComparison,
    pub convert: BucketComparison,
}

impl RollingComparison {
    pub fn bucket(&self, bucket: Bucket) -> &BucketComparison {
        match bucket {
            Bucket::Total => &self.total,
            Bucket::Slit => &self.slit,
            Bucket::Convert => &self.convert,
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct ComparisonPreviewRow {
    #[tabled(rename = "Bucket")]
    pub bucket: String,
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "LastMonth")]
    pub last_month: String,
    #[tabled(rename = "Rolling")]
    pub rolling: String,
    #[tabled(rename = "Change")]
    pub change: String,
}
