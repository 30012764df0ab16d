use crate::types::{Stats, WorkOrder};
use crate::util::round_to;

/// Count, sum, mean and median of `values`, or `None` when there is nothing
/// to aggregate.
///
/// The mean is rounded half-to-even to a whole number. The median is the
/// element at index `n / 2` of the sorted values, i.e. the upper of the two
/// middle elements for even-length input rather than their average.
pub fn aggregate(mut values: Vec<f64>) -> Option<Stats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let wo_count = values.len();
    let sum: f64 = values.iter().sum();
    Some(Stats {
        wo_count,
        sum,
        avg: round_to(sum / wo_count as f64, 0),
        median: values[wo_count / 2],
    })
}

pub fn analyze_qty(records: &[&WorkOrder]) -> Option<Stats> {
    aggregate(records.iter().map(|wo| wo.qty).collect())
}

pub fn analyze_late_duration(records: &[&WorkOrder]) -> Option<Stats> {
    aggregate(records.iter().map(|wo| wo.late_duration as f64).collect())
}
