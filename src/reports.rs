use std::collections::HashMap;

use crate::filter::{filter_records, Filter};
use crate::stats::{analyze_late_duration, analyze_qty};
use crate::types::{
    ComponentCount, Dataset, MonthComponents, MonthSummary, PeriodStats, TypeSummary,
    WorkOrder, WorkOrderKind, YearComponents, YearMonth, YearSummary,
};
use crate::util::month_name;

impl PeriodStats {
    /// Volume and lateness figures for the records `filter` selects.
    pub fn collect(records: &[WorkOrder], filter: &Filter) -> Self {
        let all = filter.apply(records);
        let late = filter.clone().late_only().apply(all.iter().copied());
        Self {
            wo_count: all.len(),
            qtys: analyze_qty(&all),
            late_count: late.len(),
            late_qtys: analyze_qty(&late),
            late_durations: analyze_late_duration(&late),
        }
    }
}

/// Months of `year` that fall inside the dataset's observed date range.
fn months_in_range(data: &Dataset, year: i32) -> impl Iterator<Item = u32> + '_ {
    (1..=12).filter(move |&m| data.month_in_range(YearMonth::new(year, m)))
}

fn summarize_kind(data: &Dataset, year: i32, kind: WorkOrderKind) -> TypeSummary {
    let base = Filter::new().kind(kind.needle()).year(year);
    let months = months_in_range(data, year)
        .map(|m| MonthSummary {
            month: month_name(m),
            month_num: m,
            stats: PeriodStats::collect(&data.raw, &base.clone().month(m)),
        })
        .collect();
    TypeSummary {
        stats: PeriodStats::collect(&data.raw, &base),
        months,
    }
}

/// Per-year totals, split by work-order kind and then by month.
pub fn summarize(data: &Dataset) -> Vec<YearSummary> {
    data.years_seen
        .iter()
        .map(|&year| YearSummary {
            year,
            stats: PeriodStats::collect(&data.raw, &Filter::new().year(year)),
            slit: summarize_kind(data, year, WorkOrderKind::Slit),
            convert: summarize_kind(data, year, WorkOrderKind::Convert),
        })
        .collect()
}

/// Occurrence counter that remembers first-seen order.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    counts: Vec<ComponentCount>,
}

impl Tally {
    fn add(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.counts[i].count += 1,
            None => {
                self.index.insert(name.to_string(), self.counts.len());
                self.counts.push(ComponentCount {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    /// Descending by count; the stable sort keeps ties in first-seen order.
    fn into_ranking(self) -> Vec<ComponentCount> {
        let mut counts = self.counts;
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }
}

/// Rank the components of late work orders per month and per year.
pub fn summarize_late_components(data: &Dataset) -> Vec<YearComponents> {
    data.years_seen
        .iter()
        .map(|&year| {
            let mut yearly = Tally::default();
            let months = months_in_range(data, year)
                .map(|m| {
                    let mut monthly = Tally::default();
                    let late = filter_records(&data.raw, None, true, Some(year), Some(m));
                    for component in late.iter().copied().flat_map(|wo| wo.components.iter()) {
                        monthly.add(component);
                        yearly.add(component);
                    }
                    MonthComponents {
                        month: month_name(m),
                        month_num: m,
                        ranking: monthly.into_ranking(),
                    }
                })
                .collect();
            YearComponents {
                year,
                months,
                components: yearly.into_ranking(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::wo;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        // Two years, two kinds, two late and three on time.
        Dataset::from_records(vec![
            wo("1", "SLIT COST", (2024, 11, 5), (2024, 11, 1), 100.0),
            wo("2", "SLIT COST", (2024, 11, 20), (2024, 11, 25), 300.0),
            wo("3", "CONVERT COST", (2024, 12, 2), (2024, 12, 2), 40.0),
            wo("4", "CONVERT COST", (2025, 1, 15), (2025, 1, 5), 60.0),
            wo("5", "SLIT COST", (2025, 1, 30), (2025, 2, 1), 80.0),
        ])
    }

    fn counts(names: &[(&str, usize)]) -> Vec<ComponentCount> {
        names
            .iter()
            .map(|(n, c)| ComponentCount {
                name: n.to_string(),
                count: *c,
            })
            .collect()
    }

    #[test]
    fn summarize_builds_one_entry_per_year() {
        let data = dataset();
        let summary = summarize(&data);
        assert_eq!(summary.len(), 2);

        let y2024 = &summary[0];
        assert_eq!(y2024.year, 2024);
        assert_eq!(y2024.stats.wo_count, 3);
        assert_eq!(y2024.stats.late_count, 1);
        // qtys sorted [40, 100, 300] -> index 1
        assert_eq!(y2024.stats.qtys.unwrap().median, 100.0);
        assert_eq!(y2024.slit.stats.wo_count, 2);
        // even length: sorted [100, 300] -> index 1
        assert_eq!(y2024.slit.stats.qtys.unwrap().median, 300.0);
        assert_eq!(y2024.slit.stats.late_durations.unwrap().sum, 4.0);
        assert_eq!(y2024.convert.stats.late_qtys, None);

        let y2025 = &summary[1];
        assert_eq!(y2025.year, 2025);
        assert_eq!(y2025.stats.wo_count, 2);
        assert_eq!(y2025.stats.late_count, 1);
        assert_eq!(y2025.stats.qtys.unwrap().median, 80.0);
        assert_eq!(y2025.convert.stats.late_durations.unwrap().avg, 10.0);
    }

    #[test]
    fn months_outside_observed_range_are_skipped() {
        let summary = summarize(&dataset());
        let months_2024: Vec<u32> = summary[0].slit.months.iter().map(|m| m.month_num).collect();
        let months_2025: Vec<u32> = summary[1].convert.months.iter().map(|m| m.month_num).collect();
        assert_eq!(months_2024, vec![11, 12]);
        assert_eq!(months_2025, vec![1]);

        let december = &summary[0].slit.months[1];
        assert_eq!(december.month, "December");
        assert_eq!(december.stats.wo_count, 0);
        assert_eq!(december.stats.qtys, None);
    }

    #[test]
    fn empty_dataset_summarizes_to_nothing() {
        let data = Dataset::default();
        assert!(summarize(&data).is_empty());
        assert!(summarize_late_components(&data).is_empty());
    }

    #[test]
    fn tally_ranks_by_count_keeping_first_seen_ties() {
        let mut tally = Tally::default();
        for name in ["A", "B", "C", "B", "A", "C", "B"] {
            tally.add(name);
        }
        assert_eq!(tally.into_ranking(), counts(&[("B", 3), ("A", 2), ("C", 2)]));
    }

    #[test]
    fn late_components_are_counted_per_month_and_year() {
        let mut records = vec![
            wo("1", "SLIT", (2024, 3, 9), (2024, 3, 1), 1.0),
            wo("2", "SLIT", (2024, 3, 12), (2024, 3, 10), 1.0),
            wo("3", "SLIT", (2024, 3, 14), (2024, 3, 20), 1.0),
            wo("4", "CONVERT", (2024, 4, 2), (2024, 4, 1), 1.0),
        ];
        records[0].components = vec!["FILM".into(), "CORE".into()];
        records[1].components = vec!["CORE".into()];
        records[2].components = vec!["FILM".into(), "FILM".into()];
        records[3].components = vec!["FILM".into()];
        let tally = summarize_late_components(&Dataset::from_records(records));

        assert_eq!(tally.len(), 1);
        let year = &tally[0];
        assert_eq!(year.months.len(), 2);
        assert_eq!(year.months[0].month, "March");
        assert_eq!(year.months[0].ranking, counts(&[("CORE", 2), ("FILM", 1)]));
        assert_eq!(year.months[1].ranking, counts(&[("FILM", 1)]));
        assert_eq!(year.components, counts(&[("FILM", 2), ("CORE", 2)]));
    }
}
