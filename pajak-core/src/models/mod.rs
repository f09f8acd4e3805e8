mod actor;
mod calculation_status;
mod calculation_type;
mod tax_calculation;
mod tax_category;
mod tax_inputs;

pub use actor::{Actor, ActorRole};
pub use calculation_status::CalculationStatus;
pub use calculation_type::CalculationType;
pub use tax_calculation::{CalculationFilter, CalculationUpdate, NewTaxCalculation, TaxCalculation};
pub use tax_category::TaxCategory;
pub use tax_inputs::{InputChanges, TaxInputs, parse_amount};
