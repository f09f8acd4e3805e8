//! Tax computation for SPT calculations.
//!
//! [`RateScheme::for_category`] picks the method for a category,
//! [`TaxComputationEngine`] applies it, and the result carries a
//! [`CalculationBreakdown`] that records exactly which parameters were used.

pub mod breakdown;
pub mod common;
pub mod engine;
pub mod rate_scheme;

pub use breakdown::{BreakdownError, BreakdownMismatch, CalculationBreakdown, RederivedAmounts};
pub use engine::{TaxComputation, TaxComputationEngine};
pub use rate_scheme::{RateScheme, SchemeKind, TaxBracket};
