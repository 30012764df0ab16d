use chrono::Datelike;

use crate::types::WorkOrder;

/// Composable work-order predicates. Every unset field means "no constraint",
/// so `Filter::default()` keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    kind: Option<String>,
    late_only: bool,
    year: Option<i32>,
    month: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep records whose type contains `needle`, ignoring case.
    pub fn kind(mut self, needle: impl Into<String>) -> Self {
        self.kind = Some(needle.into().to_lowercase());
        self
    }

    pub fn late_only(mut self) -> Self {
        self.late_only = true;
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn matches(&self, wo: &WorkOrder) -> bool {
        if self.year.is_some_and(|y| wo.post_date.year() != y) {
            return false;
        }
        if self.month.is_some_and(|m| wo.post_date.month() != m) {
            return false;
        }
        if self.late_only && !wo.is_late {
            return false;
        }
        match &self.kind {
            Some(needle) => wo.kind.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a WorkOrder>
    where
        I: IntoIterator<Item = &'a WorkOrder>,
    {
        records.into_iter().filter(|wo| self.matches(wo)).collect()
    }
}

/// Positional form of [`Filter`] for call sites that carry optional arguments.
pub fn filter_records<'a>(
    records: &'a [WorkOrder],
    type_substr: Option<&str>,
    late_only: bool,
    year: Option<i32>,
    month: Option<u32>,
) -> Vec<&'a WorkOrder> {
    let mut filter = Filter::new();
    if let Some(needle) = type_substr {
        filter = filter.kind(needle);
    }
    if late_only {
        filter = filter.late_only();
    }
    if let Some(y) = year {
        filter = filter.year(y);
    }
    if let Some(m) = month {
        filter = filter.month(m);
    }
    filter.apply(records)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn wo(num: &str, kind: &str, post: (i32, u32, u32), due: (i32, u32, u32), qty: f64) -> WorkOrder {
        let post_date = NaiveDate::from_ymd_opt(post.0, post.1, post.2).unwrap();
        let due_date = NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap();
        let late_duration = WorkOrder::late_duration(post_date, due_date);
        WorkOrder {
            wo_num: num.to_string(),
            part_num: format!("P-{num}"),
            part_desc: "test part".to_string(),
            kind: kind.to_string(),
            status: "Posted".to_string(),
            post_date,
            due_date,
            qty,
            components: Vec::new(),
            late_duration,
            is_late: late_duration > 0,
        }
    }

    fn sample() -> Vec<WorkOrder> {
        vec![
            wo("1", "SLIT COST", (2024, 1, 10), (2024, 1, 5), 100.0),
            wo("2", "Convert Cost", (2024, 1, 12), (2024, 1, 20), 50.0),
            wo("3", "SLIT COST", (2024, 2, 3), (2024, 2, 3), 75.0),
            wo("4", "CONVERT COST", (2025, 1, 9), (2025, 1, 2), 20.0),
        ]
    }

    fn nums(records: &[&WorkOrder]) -> Vec<String> {
        records.iter().map(|wo| wo.wo_num.clone()).collect()
    }

    #[test]
    fn no_constraints_is_identity() {
        let data = sample();
        let out = filter_records(&data, None, false, None, None);
        assert_eq!(out.len(), data.len());
        assert!(out.iter().zip(&data).all(|(a, b)| *a == b));
    }

    #[test]
    fn type_match_ignores_case() {
        let data = sample();
        assert_eq!(nums(&Filter::new().kind("convert").apply(&data)), vec!["2", "4"]);
        assert_eq!(nums(&Filter::new().kind("SLIT").apply(&data)), vec!["1", "3"]);
    }

    #[test]
    fn year_month_and_lateness_narrow() {
        let data = sample();
        assert_eq!(nums(&filter_records(&data, None, false, Some(2024), Some(1))), vec!["1", "2"]);
        assert_eq!(nums(&filter_records(&data, None, true, None, None)), vec!["1", "4"]);
        assert_eq!(nums(&filter_records(&data, Some("slit"), true, Some(2024), None)), vec!["1"]);
    }

    #[test]
    fn predicates_commute() {
        let data = sample();
        let a = Filter::new().late_only().apply(Filter::new().year(2024).apply(&data));
        let b = Filter::new().year(2024).apply(Filter::new().late_only().apply(&data));
        assert_eq!(nums(&a), nums(&b));

        let c = Filter::new().kind("convert").apply(Filter::new().month(1).apply(&data));
        let d = Filter::new().month(1).apply(Filter::new().kind("convert").apply(&data));
        assert_eq!(nums(&c), nums(&d));
    }

    #[test]
    fn on_time_record_is_not_late() {
        let data = sample();
        assert_eq!(data[2].late_duration, 0);
        assert!(!data[2].is_late);
        assert_eq!(data[1].late_duration, -8);
        assert!(!data[1].is_late);
        assert_eq!(data[0].late_duration, 5);
        assert!(data[0].is_late);
    }
}
