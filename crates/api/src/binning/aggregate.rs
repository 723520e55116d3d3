//! Per-bin, per-category aggregation.
//!
//! Reduces a fetched record set into `(bin, category) -> value` totals.
//! Set-valued categories fan out: a record labeled {A, B} contributes its
//! full value to both A and B, so per-category totals may overlap and can
//! exceed the overall total. Accumulation is ordered (BTreeMap) so output
//! is deterministic for identical input.

use std::collections::BTreeMap;

/// Aggregate to compute per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Number of records.
    Count,
    /// Sum of a numeric field; records with a missing value are excluded
    /// from the sum (not treated as zero).
    Sum,
}

/// Group records by `(bin, category)` and reduce with `metric`.
///
/// `categories_of` returns every category label of a record; an empty list
/// groups the record under the `None` category.
pub fn aggregate<R, K, FB, FC, FV>(
    records: &[R],
    bin_of: FB,
    categories_of: FC,
    value_of: FV,
    metric: Metric,
) -> BTreeMap<(K, Option<String>), i64>
where
    K: Ord + Clone,
    FB: Fn(&R) -> K,
    FC: Fn(&R) -> Vec<String>,
    FV: Fn(&R) -> Option<i64>,
{
    let mut totals: BTreeMap<(K, Option<String>), i64> = BTreeMap::new();

    for record in records {
        let bin = bin_of(record);

        let categories = categories_of(record);
        let categories: Vec<Option<String>> = if categories.is_empty() {
            vec![None]
        } else {
            categories.into_iter().map(Some).collect()
        };

        let contribution = match metric {
            Metric::Count => Some(1),
            Metric::Sum => value_of(record),
        };
        let Some(contribution) = contribution else {
            continue;
        };

        for category in categories {
            *totals.entry((bin.clone(), category)).or_insert(0) += contribution;
        }
    }

    totals
}

/// Group records by bin only (no category dimension).
pub fn aggregate_by_bin<R, K, FB, FV>(
    records: &[R],
    bin_of: FB,
    value_of: FV,
    metric: Metric,
) -> BTreeMap<K, i64>
where
    K: Ord + Clone,
    FB: Fn(&R) -> K,
    FV: Fn(&R) -> Option<i64>,
{
    aggregate(records, bin_of, |_| Vec::new(), value_of, metric)
        .into_iter()
        .map(|((bin, _), value)| (bin, value))
        .collect()
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Rec {
        bin: u32,
        categories: Vec<&'static str>,
        value: Option<i64>,
    }

    fn rec(bin: u32, categories: &[&'static str], value: Option<i64>) -> Rec {
        Rec {
            bin,
            categories: categories.to_vec(),
            value,
        }
    }

    fn run(records: &[Rec], metric: Metric) -> BTreeMap<(u32, Option<String>), i64> {
        aggregate(
            records,
            |r| r.bin,
            |r| r.categories.iter().map(|c| (*c).to_string()).collect(),
            |r| r.value,
            metric,
        )
    }

    #[test]
    fn counts_group_by_bin_and_category() {
        let records = [
            rec(1, &["forestry"], None),
            rec(1, &["forestry"], None),
            rec(2, &["energy"], None),
        ];
        let totals = run(&records, Metric::Count);
        assert_eq!(totals[&(1, Some("forestry".to_string()))], 2);
        assert_eq!(totals[&(2, Some("energy".to_string()))], 1);
    }

    #[test]
    fn multi_category_records_fan_out() {
        let records = [rec(1, &["A", "B"], Some(1))];
        let totals = run(&records, Metric::Count);
        // One record increments both categories by 1, not 0.5 each.
        assert_eq!(totals[&(1, Some("A".to_string()))], 1);
        assert_eq!(totals[&(1, Some("B".to_string()))], 1);
    }

    #[test]
    fn missing_values_excluded_from_sums() {
        let records = [
            rec(1, &["A"], Some(10)),
            rec(1, &["A"], None),
            rec(1, &["A"], Some(5)),
        ];
        let totals = run(&records, Metric::Sum);
        assert_eq!(totals[&(1, Some("A".to_string()))], 15);
    }

    #[test]
    fn missing_values_still_counted() {
        let records = [rec(1, &["A"], None), rec(1, &["A"], Some(3))];
        let totals = run(&records, Metric::Count);
        assert_eq!(totals[&(1, Some("A".to_string()))], 2);
    }

    #[test]
    fn uncategorized_records_group_under_none() {
        let records = [rec(1, &[], Some(7))];
        let totals = run(&records, Metric::Sum);
        assert_eq!(totals[&(1, None)], 7);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let totals = run(&[], Metric::Count);
        assert!(totals.is_empty());
    }

    #[test]
    fn output_is_deterministic() {
        let records = [
            rec(2, &["B"], Some(1)),
            rec(1, &["A"], Some(1)),
            rec(2, &["A"], Some(1)),
        ];
        let a: Vec<_> = run(&records, Metric::Count).into_iter().collect();
        let b: Vec<_> = run(&records, Metric::Count).into_iter().collect();
        assert_eq!(a, b);
        // Keys come out ordered by (bin, category).
        assert_eq!(a[0].0.0, 1);
    }

    #[test]
    fn by_bin_collapses_categories() {
        let records = [rec(1, &[], Some(10)), rec(1, &[], Some(5))];
        let totals = aggregate_by_bin(&records, |r| r.bin, |r| r.value, Metric::Sum);
        assert_eq!(totals[&1], 15);
    }
}
