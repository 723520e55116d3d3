//! Binning and aggregation engine.
//!
//! Buckets continuous attributes (dates or numeric totals) into contiguous
//! bins and reduces category-grouped metrics within each bin. All of it is
//! pure, synchronous computation over records the caller already fetched.

pub mod aggregate;
pub mod date;
pub mod numeric;

pub use aggregate::{Metric, aggregate, aggregate_by_bin};
pub use date::{BinLabel, DateBins, Freq, date_bins};
pub use numeric::{NumericBins, numeric_bins};
