//! Statement-driven company analysis: the yearly series aligner, the
//! EVA/EFV valuation and the Fleuriet/Z-score capital-structure health model.

pub mod accounts;
pub mod health;
pub mod statements;
pub mod valuation;

pub use health::*;
pub use statements::*;
pub use valuation::*;
