use chrono::NaiveDate;

use crate::filter::Filter;
use crate::stats::{analyze_late_duration, analyze_qty};
use crate::types::{
    Bucket, BucketComparison, ComparisonMetrics, ComparisonPreviewRow, Dataset, Metric,
    RollingComparison, WorkOrder, YearMonth,
};
use crate::util::{format_number, month_name, round_to};

pub const DEFAULT_ROLLING_MONTHS: u32 = 3;

/// `months` consecutive calendar months ending with the last full month
/// before the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    pub start: YearMonth,
    pub last_month: YearMonth,
    pub months: u32,
}

impl RollingWindow {
    pub fn ending_before(reference: NaiveDate, months: u32) -> Self {
        let months = months.max(1);
        let last_month = YearMonth::of(reference).shift(-1);
        Self {
            start: last_month.shift(1 - months as i32),
            last_month,
            months,
        }
    }

    pub fn contains(&self, ym: YearMonth) -> bool {
        self.start <= ym && ym <= self.last_month
    }
}

/// `(current - baseline) / baseline` to three decimals; undefined for a zero baseline.
pub fn percent_change(current: f64, baseline: f64) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    Some(round_to((current - baseline) / baseline, 3))
}

fn period_metrics(records: &[&WorkOrder], bucket: Bucket) -> ComparisonMetrics<f64> {
    let filter = match bucket.kind() {
        Some(kind) => Filter::new().kind(kind.needle()),
        None => Filter::new(),
    };
    let all = filter.apply(records.iter().copied());
    let late = filter.late_only().apply(all.iter().copied());

    let qty = analyze_qty(&all);
    let late_qty = analyze_qty(&late);
    let late_duration = analyze_late_duration(&late);
    ComparisonMetrics {
        wo_count: qty.map_or(0.0, |s| s.wo_count as f64),
        total_qty: qty.map_or(0.0, |s| s.sum),
        avg_qty: qty.map_or(0.0, |s| s.avg),
        late_wo_count: late_qty.map_or(0.0, |s| s.wo_count as f64),
        late_avg_qty: late_qty.map_or(0.0, |s| s.avg),
        late_avg_duration: late_duration.map_or(0.0, |s| s.avg),
    }
}

fn compare_bucket(
    last_month: &[&WorkOrder],
    rolling: &[&WorkOrder],
    bucket: Bucket,
    months: u32,
) -> BucketComparison {
    let current = period_metrics(last_month, bucket);
    let mut baseline = period_metrics(rolling, bucket);
    // Volumes become a per-month rate; averages already are one.
    let per_month = |v: f64| round_to(v / months as f64, 0);
    baseline.wo_count = per_month(baseline.wo_count);
    baseline.total_qty = per_month(baseline.total_qty);
    baseline.late_wo_count = per_month(baseline.late_wo_count);

    BucketComparison {
        last_month: current,
        rolling: baseline,
        percent_change: ComparisonMetrics::from_fn(|m| {
            percent_change(m.pick(&current), m.pick(&baseline))
        }),
    }
}

/// Compare the last full calendar month before `reference` against the
/// trailing `months`-month window, for all work orders and per kind.
pub fn compare_last_month(data: &Dataset, reference: NaiveDate, months: u32) -> RollingComparison {
    let window = RollingWindow::ending_before(reference, months);
    let last_month: Vec<&WorkOrder> = data
        .raw
        .iter()
        .filter(|wo| wo.year_month() == window.last_month)
        .collect();
    let rolling: Vec<&WorkOrder> = data
        .raw
        .iter()
        .filter(|wo| window.contains(wo.year_month()))
        .collect();

    let bucket = |b| compare_bucket(&last_month, &rolling, b, window.months);
    RollingComparison {
        reference_date: reference,
        rolling_months: window.months,
        last_month: window.last_month,
        window_start: window.start,
        window_end: window.last_month,
        last_month_label: format!(
            "{} {}",
            month_name(window.last_month.month),
            window.last_month.year
        ),
        rolling_label: format!("Rolling_{}mo", window.months),
        total: bucket(Bucket::Total),
        slit: bucket(Bucket::Slit),
        convert: bucket(Bucket::Convert),
    }
}

/// Flatten a comparison into console table rows.
pub fn preview_rows(cmp: &RollingComparison) -> Vec<ComparisonPreviewRow> {
    let mut rows = Vec::with_capacity(Bucket::ALL.len() * Metric::ALL.len());
    for bucket in Bucket::ALL {
        let b = cmp.bucket(bucket);
        for metric in Metric::ALL {
            rows.push(ComparisonPreviewRow {
                bucket: bucket.label().to_string(),
                metric: metric.label().to_string(),
                last_month: format_number(metric.pick(&b.last_month), 0),
                rolling: format_number(metric.pick(&b.rolling), 0),
                change: match metric.pick(&b.percent_change) {
                    Some(p) => format!("{:+.1}%", p * 100.0),
                    None => "n/a".to_string(),
                },
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::wo;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            wo("a", "SLIT COST", (2024, 11, 10), (2024, 11, 5), 100.0),
            wo("b", "CONVERT COST", (2024, 12, 3), (2024, 12, 10), 200.0),
            wo("c", "SLIT COST", (2025, 1, 8), (2025, 1, 2), 300.0),
            wo("d", "CONVERT COST", (2025, 1, 20), (2025, 1, 25), 50.0),
            wo("e", "SLIT COST", (2024, 10, 30), (2024, 10, 1), 999.0),
            wo("f", "SLIT COST", (2025, 2, 3), (2025, 1, 1), 999.0),
        ])
    }

    #[test]
    fn window_excludes_the_current_partial_month() {
        let window = RollingWindow::ending_before(date(2025, 2, 15), 3);
        assert_eq!(window.last_month, YearMonth::new(2025, 1));
        assert_eq!(window.start, YearMonth::new(2024, 11));
        assert!(window.contains(YearMonth::new(2024, 11)));
        assert!(window.contains(YearMonth::new(2024, 12)));
        assert!(window.contains(YearMonth::new(2025, 1)));
        assert!(!window.contains(YearMonth::new(2024, 10)));
        assert!(!window.contains(YearMonth::new(2025, 2)));
    }

    #[test]
    fn window_crosses_year_boundary_in_january() {
        let window = RollingWindow::ending_before(date(2025, 1, 1), 3);
        assert_eq!(window.last_month, YearMonth::new(2024, 12));
        assert_eq!(window.start, YearMonth::new(2024, 10));
    }

    #[test]
    fn percent_change_over_zero_is_absent() {
        assert_eq!(percent_change(5.0, 0.0), None);
        assert_eq!(percent_change(6.0, 4.0), Some(0.5));
        assert_eq!(percent_change(1.0, 3.0), Some(-0.667));
    }

    #[test]
    fn compares_last_month_to_rolling_rate() {
        let cmp = compare_last_month(&dataset(), date(2025, 2, 15), 3);
        assert_eq!(cmp.last_month_label, "January 2025");
        assert_eq!(cmp.rolling_label, "Rolling_3mo");

        let total = &cmp.total;
        assert_eq!(
            total.last_month,
            ComparisonMetrics {
                wo_count: 2.0,
                total_qty: 350.0,
                avg_qty: 175.0,
                late_wo_count: 1.0,
                late_avg_qty: 300.0,
                late_avg_duration: 6.0,
            }
        );
        assert_eq!(
            total.rolling,
            ComparisonMetrics {
                wo_count: 1.0,
                total_qty: 217.0,
                avg_qty: 162.0,
                late_wo_count: 1.0,
                late_avg_qty: 200.0,
                late_avg_duration: 6.0,
            }
        );
        assert_eq!(total.percent_change.wo_count, Some(1.0));
        assert_eq!(total.percent_change.total_qty, Some(0.613));
        assert_eq!(total.percent_change.avg_qty, Some(0.08));
        assert_eq!(total.percent_change.late_wo_count, Some(0.0));
        assert_eq!(total.percent_change.late_avg_qty, Some(0.5));
    }

    #[test]
    fn zero_rolling_values_leave_change_undefined() {
        let cmp = compare_last_month(&dataset(), date(2025, 2, 15), 3);
        let convert = &cmp.convert;
        assert_eq!(convert.rolling.wo_count, 1.0);
        assert_eq!(convert.rolling.total_qty, 83.0);
        assert_eq!(convert.rolling.late_wo_count, 0.0);
        assert_eq!(convert.percent_change.late_wo_count, None);
        assert_eq!(convert.percent_change.late_avg_duration, None);
        assert_eq!(cmp.slit.rolling.total_qty, 133.0);
    }

    #[test]
    fn empty_dataset_compares_to_zeros() {
        let cmp = compare_last_month(&Dataset::default(), date(2025, 2, 15), 3);
        assert_eq!(cmp.total.last_month, ComparisonMetrics::default());
        assert_eq!(cmp.total.percent_change, ComparisonMetrics::default());
    }

    #[test]
    fn preview_has_a_row_per_bucket_metric() {
        let cmp = compare_last_month(&dataset(), date(2025, 2, 15), 3);
        let rows = preview_rows(&cmp);
        assert_eq!(rows.len(), 18);
        assert_eq!(rows[0].bucket, "total");
        assert_eq!(rows[0].metric, "WO Count");
        assert_eq!(rows[0].change, "+100.0%");
        assert_eq!(rows[15].change, "n/a");
    }
}
