//! Indicator math and the weighted daily/weekly technical scorer.

pub mod indicators;
pub mod scorer;


pub use indicators::*;
pub use scorer::*;
