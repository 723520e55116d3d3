//! Calendar-aligned date binning.
//!
//! Produces a sequence of boundary dates covering a data range, either at a
//! fixed calendar frequency or as a fixed number of equal-width bins. Bin
//! membership is right-open: a record falls in `[b[i], b[i+1])`.

use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::error::{ApiError, ApiResult};

/// Binning frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freq {
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for Freq {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D" => Ok(Freq::Day),
            "W" => Ok(Freq::Week),
            "M" => Ok(Freq::Month),
            "Y" => Ok(Freq::Year),
            other => Err(format!("unknown frequency '{other}', expected D, W, M or Y")),
        }
    }
}

/// Bin assignment for one record.
///
/// Variant order gives the serialization order: real bins first
/// (chronological), then the `other` catch-all, then the `null` bin for
/// records with no binning attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BinLabel<T> {
    Bin(T),
    Other,
    Null,
}

impl<T> BinLabel<T> {
    pub fn as_bin(&self) -> Option<&T> {
        match self {
            BinLabel::Bin(v) => Some(v),
            BinLabel::Other | BinLabel::Null => None,
        }
    }
}

/// A computed set of date bins.
#[derive(Debug, Clone)]
pub struct DateBins {
    /// Strictly increasing boundary dates. `n` boundaries form `n - 1`
    /// bins; a single boundary is the degenerate single-value bin.
    boundaries: Vec<NaiveDate>,
    freq: Option<Freq>,
}

/// Compute date bins covering `[min, max]`.
///
/// Exactly one of `freq` or `num_bins` must be supplied. Frequency mode
/// aligns the first boundary to the enclosing calendar period of `min` and
/// always closes with a full trailing period, so the last bin is never
/// truncated at `max`. Count mode spreads `num_bins` equal-width,
/// day-aligned bins across the range.
pub fn date_bins(
    min: NaiveDate,
    max: NaiveDate,
    freq: Option<Freq>,
    num_bins: Option<u32>,
) -> ApiResult<DateBins> {
    let boundaries = match (freq, num_bins) {
        (Some(_), Some(_)) => {
            return Err(ApiError::ConflictingBinSpec(
                "freq and num_bins are mutually exclusive".to_string(),
            ));
        }
        (None, None) => {
            return Err(ApiError::ConflictingBinSpec(
                "either freq or num_bins is required".to_string(),
            ));
        }
        _ if min >= max => vec![min],
        (Some(freq), None) => {
            let mut boundaries = vec![period_start(min, freq)];
            loop {
                // boundaries is never empty; the loop extends the last start
                // until max is covered, then one full trailing period closes
                // the sequence.
                let Some(last) = boundaries.last().copied() else {
                    break;
                };
                let next = step(last, freq);
                boundaries.push(next);
                if next > max {
                    break;
                }
            }
            boundaries
        }
        (None, Some(n)) => {
            if n == 0 {
                return Err(ApiError::ConflictingBinSpec(
                    "num_bins must be positive".to_string(),
                ));
            }
            let span = (max - min).num_days();
            let mut boundaries = Vec::with_capacity(n as usize + 1);
            for i in 0..=i64::from(n) {
                let offset = (span * i) / i64::from(n);
                let boundary = min + Days::new(offset.unsigned_abs());
                if boundaries.last() != Some(&boundary) {
                    boundaries.push(boundary);
                }
            }
            boundaries
        }
    };

    Ok(DateBins { boundaries, freq })
}

impl DateBins {
    /// Boundary dates, strictly increasing.
    pub fn boundaries(&self) -> &[NaiveDate] {
        &self.boundaries
    }

    /// Start dates of the bins, in chronological order.
    pub fn starts(&self) -> Vec<NaiveDate> {
        if self.boundaries.len() == 1 {
            self.boundaries.clone()
        } else {
            self.boundaries[..self.boundaries.len() - 1].to_vec()
        }
    }

    /// Assign a record's date to a bin.
    pub fn assign(&self, value: Option<NaiveDate>) -> BinLabel<NaiveDate> {
        let Some(value) = value else {
            return BinLabel::Null;
        };

        match self.boundaries.as_slice() {
            [single] => {
                if value == *single {
                    BinLabel::Bin(*single)
                } else {
                    BinLabel::Other
                }
            }
            [first, .., last] => {
                if value < *first || value >= *last {
                    return BinLabel::Other;
                }
                let idx = self.boundaries.partition_point(|b| *b <= value) - 1;
                BinLabel::Bin(self.boundaries[idx])
            }
            [] => BinLabel::Other,
        }
    }

    /// Reported (inclusive) end date for a bin start.
    ///
    /// Frequency bins report the end of their calendar period (last day of
    /// month, Dec 31); day/week bins report the next period start. Count
    /// mode reports the next boundary.
    pub fn period_end(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self.freq {
            Some(Freq::Day) => Some(start + Days::new(1)),
            Some(Freq::Week) => Some(start + Days::new(7)),
            Some(Freq::Month) => Some(step(start, Freq::Month) - Days::new(1)),
            Some(Freq::Year) => Some(step(start, Freq::Year) - Days::new(1)),
            None => {
                let idx = self.boundaries.iter().position(|b| *b == start)?;
                self.boundaries.get(idx + 1).copied()
            }
        }
    }
}

/// Start of the calendar period enclosing `d`.
fn period_start(d: NaiveDate, freq: Freq) -> NaiveDate {
    match freq {
        Freq::Day => d,
        Freq::Week => d - Days::new(u64::from(d.weekday().num_days_from_monday())),
        Freq::Month => NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d),
        Freq::Year => NaiveDate::from_ymd_opt(d.year(), 1, 1).unwrap_or(d),
    }
}

/// Advance a period start by one period.
fn step(d: NaiveDate, freq: Freq) -> NaiveDate {
    match freq {
        Freq::Day => d + Days::new(1),
        Freq::Week => d + Days::new(7),
        Freq::Month => d + Months::new(1),
        Freq::Year => d + Months::new(12),
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn conflicting_spec_rejected() {
        let err = date_bins(d(2020, 1, 1), d(2021, 1, 1), Some(Freq::Year), Some(4));
        assert!(matches!(err, Err(ApiError::ConflictingBinSpec(_))));

        let err = date_bins(d(2020, 1, 1), d(2021, 1, 1), None, None);
        assert!(matches!(err, Err(ApiError::ConflictingBinSpec(_))));
    }

    #[test]
    fn year_bins_align_to_january_first() {
        let bins = date_bins(d(2019, 6, 15), d(2021, 3, 2), Some(Freq::Year), None).unwrap();
        assert_eq!(
            bins.boundaries(),
            &[d(2019, 1, 1), d(2020, 1, 1), d(2021, 1, 1), d(2022, 1, 1)]
        );
    }

    #[test]
    fn month_bins_align_to_first_of_month() {
        let bins = date_bins(d(2020, 1, 15), d(2020, 3, 10), Some(Freq::Month), None).unwrap();
        assert_eq!(
            bins.boundaries(),
            &[d(2020, 1, 1), d(2020, 2, 1), d(2020, 3, 1), d(2020, 4, 1)]
        );
    }

    #[test]
    fn week_bins_start_on_monday() {
        // 2020-01-15 is a Wednesday; the enclosing week starts Monday 13th.
        let bins = date_bins(d(2020, 1, 15), d(2020, 1, 21), Some(Freq::Week), None).unwrap();
        assert_eq!(bins.boundaries()[0], d(2020, 1, 13));
        for pair in bins.boundaries().windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
    }

    #[test]
    fn bins_cover_range_without_gaps_or_overlap() {
        let min = d(2019, 6, 15);
        let max = d(2021, 3, 2);
        for freq in [Freq::Day, Freq::Week, Freq::Month, Freq::Year] {
            let bins = date_bins(min, max, Some(freq), None).unwrap();
            let bounds = bins.boundaries();
            assert!(bounds[0] <= min, "first boundary at-or-before min");
            assert!(*bounds.last().unwrap() > max, "last boundary after max");
            for pair in bounds.windows(2) {
                assert!(pair[0] < pair[1], "strictly increasing");
            }
            // Every date in [min, max] lands in a real bin.
            let mut probe = min;
            while probe <= max {
                assert!(matches!(bins.assign(Some(probe)), BinLabel::Bin(_)));
                probe = probe + Days::new(7);
            }
        }
    }

    #[test]
    fn trailing_bin_is_a_full_calendar_period() {
        let bins = date_bins(d(2020, 1, 1), d(2020, 5, 20), Some(Freq::Month), None).unwrap();
        // max falls mid-May; the last bin still runs through end of May.
        let last_start = *bins.starts().last().unwrap();
        assert_eq!(last_start, d(2020, 5, 1));
        assert_eq!(bins.period_end(last_start), Some(d(2020, 5, 31)));
    }

    #[test]
    fn year_period_end_is_december_31() {
        let bins = date_bins(d(2020, 3, 1), d(2020, 9, 1), Some(Freq::Year), None).unwrap();
        assert_eq!(bins.period_end(d(2020, 1, 1)), Some(d(2020, 12, 31)));
    }

    #[test]
    fn degenerate_range_yields_single_bin() {
        let day = d(2020, 7, 4);
        let bins = date_bins(day, day, Some(Freq::Month), None).unwrap();
        assert_eq!(bins.boundaries(), &[day]);
        assert_eq!(bins.starts(), vec![day]);
        assert_eq!(bins.assign(Some(day)), BinLabel::Bin(day));
        assert_eq!(bins.assign(Some(day + Days::new(1))), BinLabel::Other);
    }

    #[test]
    fn null_dates_go_to_the_null_bin() {
        let bins = date_bins(d(2020, 1, 1), d(2020, 12, 31), Some(Freq::Year), None).unwrap();
        assert_eq!(bins.assign(None), BinLabel::Null);
    }

    #[test]
    fn out_of_range_dates_go_to_other() {
        let bins = date_bins(d(2020, 1, 1), d(2020, 12, 31), Some(Freq::Year), None).unwrap();
        assert_eq!(bins.assign(Some(d(2019, 12, 31))), BinLabel::Other);
        assert_eq!(bins.assign(Some(d(2022, 1, 1))), BinLabel::Other);
    }

    #[test]
    fn assignment_is_right_open() {
        let bins = date_bins(d(2020, 1, 1), d(2020, 3, 31), Some(Freq::Month), None).unwrap();
        assert_eq!(bins.assign(Some(d(2020, 1, 31))), BinLabel::Bin(d(2020, 1, 1)));
        assert_eq!(bins.assign(Some(d(2020, 2, 1))), BinLabel::Bin(d(2020, 2, 1)));
    }

    #[test]
    fn count_mode_spreads_bins_evenly() {
        let bins = date_bins(d(2020, 1, 1), d(2020, 1, 21), None, Some(4)).unwrap();
        assert_eq!(
            bins.boundaries(),
            &[d(2020, 1, 1), d(2020, 1, 6), d(2020, 1, 11), d(2020, 1, 16), d(2020, 1, 21)]
        );
        assert_eq!(bins.period_end(d(2020, 1, 6)), Some(d(2020, 1, 11)));
    }

    #[test]
    fn count_mode_rejects_zero() {
        assert!(date_bins(d(2020, 1, 1), d(2020, 2, 1), None, Some(0)).is_err());
    }

    #[test]
    fn bin_labels_order_bins_before_other_before_null() {
        let mut labels = vec![
            BinLabel::Null,
            BinLabel::Other,
            BinLabel::Bin(d(2020, 1, 1)),
            BinLabel::Bin(d(2019, 1, 1)),
        ];
        labels.sort();
        assert_eq!(
            labels,
            vec![
                BinLabel::Bin(d(2019, 1, 1)),
                BinLabel::Bin(d(2020, 1, 1)),
                BinLabel::Other,
                BinLabel::Null,
            ]
        );
    }

    #[test]
    fn freq_parse() {
        assert_eq!("M".parse::<Freq>().unwrap(), Freq::Month);
        assert!("q".parse::<Freq>().is_err());
    }
}
