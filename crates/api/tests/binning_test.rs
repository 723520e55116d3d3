#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Binning and aggregation engine integration tests.

use chrono::{Days, NaiveDate};
use offsetsdb_api::binning::{
    BinLabel, Freq, Metric, aggregate, aggregate_by_bin, date_bins, numeric_bins,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// -------------------------------------------------------------------------
// Date binner properties
// -------------------------------------------------------------------------

#[test]
fn frequency_bins_cover_the_range_contiguously() {
    let min = d(2018, 11, 23);
    let max = d(2021, 2, 7);

    for freq in [Freq::Day, Freq::Week, Freq::Month, Freq::Year] {
        let bins = date_bins(min, max, Some(freq), None).unwrap();
        let bounds = bins.boundaries();

        // First boundary at-or-before min, last strictly after max.
        assert!(bounds[0] <= min);
        assert!(*bounds.last().unwrap() > max);

        // Contiguous and non-overlapping: every consecutive pair shares
        // exactly one boundary and increases strictly.
        for pair in bounds.windows(2) {
            assert!(pair[0] < pair[1]);
        }

        // Every single day of the data range lands in a real bin.
        let mut probe = min;
        while probe <= max {
            match bins.assign(Some(probe)) {
                BinLabel::Bin(start) => {
                    assert!(start <= probe);
                    let end = bins.period_end(start).unwrap();
                    assert!(probe <= end, "{freq:?}: {probe} past end {end}");
                }
                other => panic!("{freq:?}: {probe} fell into {other:?}"),
            }
            probe = probe + Days::new(1);
        }
    }
}

#[test]
fn final_bin_extends_to_calendar_period_end() {
    // Data ends 2020-05-20; the trailing month bin still covers all of May.
    let bins = date_bins(d(2020, 2, 10), d(2020, 5, 20), Some(Freq::Month), None).unwrap();
    let last_start = *bins.starts().last().unwrap();
    assert_eq!(last_start, d(2020, 5, 1));
    assert_eq!(bins.period_end(last_start), Some(d(2020, 5, 31)));

    // Year bins end Dec 31, not at the data maximum.
    let bins = date_bins(d(2019, 3, 1), d(2020, 6, 15), Some(Freq::Year), None).unwrap();
    let last_start = *bins.starts().last().unwrap();
    assert_eq!(last_start, d(2020, 1, 1));
    assert_eq!(bins.period_end(last_start), Some(d(2020, 12, 31)));
}

#[test]
fn degenerate_range_yields_exactly_one_bin() {
    let day = d(2021, 8, 9);
    let bins = date_bins(day, day, Some(Freq::Year), None).unwrap();
    assert_eq!(bins.starts().len(), 1);
    assert_eq!(bins.assign(Some(day)), BinLabel::Bin(day));
}

#[test]
fn conflicting_bin_spec_is_rejected() {
    assert!(date_bins(d(2020, 1, 1), d(2021, 1, 1), Some(Freq::Month), Some(6)).is_err());
    assert!(date_bins(d(2020, 1, 1), d(2021, 1, 1), None, None).is_err());
}

#[test]
fn count_mode_produces_requested_bin_count() {
    let bins = date_bins(d(2020, 1, 1), d(2020, 12, 31), None, Some(6)).unwrap();
    assert_eq!(bins.starts().len(), 6);
    // Boundaries are day-aligned and cover the range.
    assert_eq!(bins.boundaries()[0], d(2020, 1, 1));
    assert_eq!(*bins.boundaries().last().unwrap(), d(2020, 12, 31));
}

// -------------------------------------------------------------------------
// Numeric binner properties
// -------------------------------------------------------------------------

#[test]
fn auto_width_matches_order_of_magnitude() {
    // Range 42 → floor(log10) = 1 → width 10^0 = 1.
    let bins = numeric_bins(5, 47, None).unwrap();
    assert_eq!(bins.width(), 1);

    // Range 899 → floor(log10) = 2 → width 10, boundaries 100..=1000.
    let bins = numeric_bins(100, 999, None).unwrap();
    assert_eq!(bins.width(), 10);
    assert_eq!(bins.boundaries().first(), Some(&100));
    assert_eq!(bins.boundaries().last(), Some(&1000));
    let starts = bins.starts();
    assert_eq!(starts.len(), 90);
}

#[test]
fn numeric_range_endpoints_are_interior_to_the_span() {
    let bins = numeric_bins(103, 957, None).unwrap();
    assert!(matches!(bins.assign(Some(103)), BinLabel::Bin(_)));
    assert!(matches!(bins.assign(Some(957)), BinLabel::Bin(_)));
}

#[test]
fn numeric_degenerate_range_is_one_boundary() {
    let bins = numeric_bins(500, 500, None).unwrap();
    assert_eq!(bins.boundaries(), &[500]);
    assert_eq!(bins.assign(Some(500)), BinLabel::Bin(500));
}

// -------------------------------------------------------------------------
// Aggregator properties
// -------------------------------------------------------------------------

struct Project {
    listed_at: Option<NaiveDate>,
    categories: Vec<&'static str>,
}

#[test]
fn category_fan_out_counts_full_value_per_category() {
    let bins = date_bins(d(2020, 1, 1), d(2020, 12, 31), Some(Freq::Year), None).unwrap();
    let projects = [
        Project {
            listed_at: Some(d(2020, 3, 1)),
            categories: vec!["forestry", "energy"],
        },
        Project {
            listed_at: Some(d(2020, 4, 1)),
            categories: vec!["forestry"],
        },
    ];

    let totals = aggregate(
        &projects,
        |p| bins.assign(p.listed_at),
        |p| p.categories.iter().map(|c| (*c).to_string()).collect(),
        |_| None,
        Metric::Count,
    );

    let year = BinLabel::Bin(d(2020, 1, 1));
    // The two-category project counts once in each bucket.
    assert_eq!(totals[&(year, Some("forestry".to_string()))], 2);
    assert_eq!(totals[&(year, Some("energy".to_string()))], 1);
}

#[test]
fn null_dates_bucket_separately_from_real_bins() {
    let bins = date_bins(d(2020, 1, 1), d(2020, 12, 31), Some(Freq::Year), None).unwrap();
    let projects = [
        Project {
            listed_at: Some(d(2020, 3, 1)),
            categories: vec!["forestry"],
        },
        Project {
            listed_at: None,
            categories: vec!["forestry"],
        },
    ];

    let totals = aggregate(
        &projects,
        |p| bins.assign(p.listed_at),
        |p| p.categories.iter().map(|c| (*c).to_string()).collect(),
        |_| None,
        Metric::Count,
    );

    assert_eq!(
        totals[&(BinLabel::Bin(d(2020, 1, 1)), Some("forestry".to_string()))],
        1
    );
    assert_eq!(totals[&(BinLabel::Null, Some("forestry".to_string()))], 1);
}

struct Credit {
    transaction_date: Option<NaiveDate>,
    quantity: Option<i64>,
}

#[test]
fn sums_skip_missing_values_and_span_bins() {
    let bins = date_bins(d(2019, 1, 1), d(2020, 12, 31), Some(Freq::Year), None).unwrap();
    let credits = [
        Credit {
            transaction_date: Some(d(2019, 5, 1)),
            quantity: Some(100),
        },
        Credit {
            transaction_date: Some(d(2019, 9, 1)),
            quantity: Some(50),
        },
        Credit {
            transaction_date: Some(d(2020, 2, 2)),
            quantity: None,
        },
        Credit {
            transaction_date: Some(d(2020, 7, 7)),
            quantity: Some(25),
        },
    ];

    let totals = aggregate_by_bin(
        &credits,
        |c| bins.assign(c.transaction_date),
        |c| c.quantity,
        Metric::Sum,
    );

    assert_eq!(totals[&BinLabel::Bin(d(2019, 1, 1))], 150);
    // The None-quantity record contributes nothing, not zero.
    assert_eq!(totals[&BinLabel::Bin(d(2020, 1, 1))], 25);
}

#[test]
fn aggregation_over_empty_input_is_empty_not_an_error() {
    let bins = date_bins(d(2020, 1, 1), d(2020, 12, 31), Some(Freq::Month), None).unwrap();
    let credits: [Credit; 0] = [];
    let totals = aggregate_by_bin(
        &credits,
        |c| bins.assign(c.transaction_date),
        |c| c.quantity,
        Metric::Sum,
    );
    assert!(totals.is_empty());
}

#[test]
fn chart_ordering_is_chronological_then_catch_all() {
    let bins = date_bins(d(2019, 1, 1), d(2020, 12, 31), Some(Freq::Year), None).unwrap();
    let credits = [
        Credit {
            transaction_date: None,
            quantity: Some(1),
        },
        Credit {
            transaction_date: Some(d(2020, 6, 1)),
            quantity: Some(1),
        },
        Credit {
            transaction_date: Some(d(2019, 6, 1)),
            quantity: Some(1),
        },
    ];

    let totals = aggregate_by_bin(
        &credits,
        |c| bins.assign(c.transaction_date),
        |c| c.quantity,
        Metric::Sum,
    );

    let keys: Vec<_> = totals.keys().cloned().collect();
    assert_eq!(
        keys,
        vec![
            BinLabel::Bin(d(2019, 1, 1)),
            BinLabel::Bin(d(2020, 1, 1)),
            BinLabel::Null,
        ]
    );
}
