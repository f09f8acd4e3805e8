//! Resolution of a tax category to the method its tax is computed with.
//!
//! | Category          | Method      | Parameters                                    |
//! |-------------------|-------------|-----------------------------------------------|
//! | `PPH_21`          | progressive | ≤60M 5%, ≤250M 15%, ≤500M 25%, ≤5B 30%, 35%   |
//! | `PPN`             | flat        | 11%                                           |
//! | `PPH_23`          | flat        | 2%                                            |
//! | `PPH_25`          | installment | 25% a year, paid in 12 monthly installments   |
//! | `PBB`             | flat        | 0.5%                                          |
//! | `BPHTB`           | flat        | 5%                                            |
//! | `PAJAK_KENDARAAN` | progressive | ≤100M 1%, ≤250M 1.5%, ≤500M 2%, 2.5%          |
//! | anything else     | default     | 10%                                           |

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::TaxCategory;

/// One tier of a progressive schedule.
///
/// A bracket covers every taxable income up to and including `max_income`.
/// The last bracket of a schedule has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    #[serde(rename = "max")]
    pub max_income: Option<Decimal>,
    #[serde(rename = "rate")]
    pub tax_rate: Decimal,
}

impl TaxBracket {
    pub fn contains(
        &self,
        taxable_income: Decimal,
    ) -> bool {
        self.max_income.is_none_or(|max| taxable_income <= max)
    }
}

/// Rate of the first bracket whose upper bound is at least `taxable_income`.
/// Falls back to the last bracket, and to zero for an empty table.
pub fn marginal_rate(
    brackets: &[TaxBracket],
    taxable_income: Decimal,
) -> Decimal {
    brackets
        .iter()
        .find(|b| b.contains(taxable_income))
        .or(brackets.last())
        .map_or(Decimal::ZERO, |b| b.tax_rate)
}

pub const PPH_21_BRACKETS: &[TaxBracket] = &[
    TaxBracket {
        max_income: Some(dec!(60000000)),
        tax_rate: dec!(0.05),
    },
    TaxBracket {
        max_income: Some(dec!(250000000)),
        tax_rate: dec!(0.15),
    },
    TaxBracket {
        max_income: Some(dec!(500000000)),
        tax_rate: dec!(0.25),
    },
    TaxBracket {
        max_income: Some(dec!(5000000000)),
        tax_rate: dec!(0.30),
    },
    TaxBracket {
        max_income: None,
        tax_rate: dec!(0.35),
    },
];

pub const PAJAK_KENDARAAN_BRACKETS: &[TaxBracket] = &[
    TaxBracket {
        max_income: Some(dec!(100000000)),
        tax_rate: dec!(0.01),
    },
    TaxBracket {
        max_income: Some(dec!(250000000)),
        tax_rate: dec!(0.015),
    },
    TaxBracket {
        max_income: Some(dec!(500000000)),
        tax_rate: dec!(0.02),
    },
    TaxBracket {
        max_income: None,
        tax_rate: dec!(0.025),
    },
];

pub const PPN_RATE: Decimal = dec!(0.11);
pub const PPH_23_RATE: Decimal = dec!(0.02);
pub const PPH_25_ANNUAL_RATE: Decimal = dec!(0.25);
pub const PPH_25_INSTALLMENTS: u32 = 12;
pub const PBB_RATE: Decimal = dec!(0.005);
pub const BPHTB_RATE: Decimal = dec!(0.05);
pub const DEFAULT_RATE: Decimal = dec!(0.10);

/// How the gross tax of a category is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScheme {
    /// One marginal rate, picked by the bracket containing the taxable
    /// income, applied to the whole taxable income.
    Progressive { brackets: &'static [TaxBracket] },
    Flat { rate: Decimal },
    /// An annual rate spread evenly over `periods` installments.
    Installment { annual_rate: Decimal, periods: u32 },
    /// Flat rate for categories without a dedicated scheme.
    Default { rate: Decimal },
}

impl RateScheme {
    /// Resolves the scheme for `category`. Total: unknown categories get the
    /// default scheme.
    pub fn for_category(category: &TaxCategory) -> Self {
        match category {
            TaxCategory::Pph21 => Self::Progressive {
                brackets: PPH_21_BRACKETS,
            },
            TaxCategory::Ppn => Self::Flat { rate: PPN_RATE },
            TaxCategory::Pph23 => Self::Flat { rate: PPH_23_RATE },
            TaxCategory::Pph25 => Self::Installment {
                annual_rate: PPH_25_ANNUAL_RATE,
                periods: PPH_25_INSTALLMENTS,
            },
            TaxCategory::Pbb => Self::Flat { rate: PBB_RATE },
            TaxCategory::Bphtb => Self::Flat { rate: BPHTB_RATE },
            TaxCategory::PajakKendaraan => Self::Progressive {
                brackets: PAJAK_KENDARAAN_BRACKETS,
            },
            TaxCategory::Other(_) => Self::Default { rate: DEFAULT_RATE },
        }
    }

    pub fn kind(&self) -> SchemeKind {
        match self {
            Self::Progressive { .. } => SchemeKind::Progressive,
            Self::Flat { .. } => SchemeKind::Flat,
            Self::Installment { .. } => SchemeKind::Installment,
            Self::Default { .. } => SchemeKind::Default,
        }
    }

    /// Human-readable account of the method, stored with every breakdown.
    pub fn describe(
        &self,
        category: &TaxCategory,
    ) -> String {
        match self {
            Self::Progressive { .. } => format!(
                "{category}: progressive rate, the bracket containing the taxable income sets the rate for the whole amount"
            ),
            Self::Flat { rate } => {
                format!("{category}: flat rate of {}% on taxable income", percent(*rate))
            }
            Self::Installment {
                annual_rate,
                periods,
            } => format!(
                "{category}: annual rate of {}% on taxable income, divided into {periods} installments",
                percent(*annual_rate)
            ),
            Self::Default { rate } => format!(
                "{category}: no dedicated scheme, default flat rate of {}%",
                percent(*rate)
            ),
        }
    }
}

/// Tag of a [`RateScheme`], as recorded in breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    Progressive,
    Flat,
    Installment,
    Default,
}

impl SchemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progressive => "progressive",
            Self::Flat => "flat",
            Self::Installment => "installment",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn percent(rate: Decimal) -> Decimal {
    (rate * Decimal::ONE_HUNDRED).normalize()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_known_category_has_a_dedicated_scheme() {
        for category in TaxCategory::KNOWN {
            assert_ne!(
                RateScheme::for_category(&category).kind(),
                SchemeKind::Default,
                "{category} fell through to the default scheme"
            );
        }
    }

    #[test]
    fn unknown_category_resolves_to_default() {
        let scheme = RateScheme::for_category(&TaxCategory::parse("XYZ"));

        assert_eq!(scheme, RateScheme::Default { rate: dec!(0.10) });
    }

    #[test]
    fn flat_rates_match_statute() {
        let cases = [
            (TaxCategory::Ppn, dec!(0.11)),
            (TaxCategory::Pph23, dec!(0.02)),
            (TaxCategory::Pbb, dec!(0.005)),
            (TaxCategory::Bphtb, dec!(0.05)),
        ];

        for (category, rate) in cases {
            assert_eq!(RateScheme::for_category(&category), RateScheme::Flat { rate });
        }
    }

    #[test]
    fn pph25_is_monthly_installment() {
        assert_eq!(
            RateScheme::for_category(&TaxCategory::Pph25),
            RateScheme::Installment {
                annual_rate: dec!(0.25),
                periods: 12,
            }
        );
    }

    #[test]
    fn bracket_tables_are_ascending_and_end_unbounded() {
        for brackets in [PPH_21_BRACKETS, PAJAK_KENDARAAN_BRACKETS] {
            let bounds: Vec<_> = brackets.iter().map(|b| b.max_income).collect();
            let (last, bounded) = bounds.split_last().unwrap();

            assert_eq!(*last, None);
            assert!(bounded.iter().all(Option::is_some));
            assert!(bounded.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn bracket_upper_bound_is_inclusive() {
        let first = PPH_21_BRACKETS[0];

        assert!(first.contains(dec!(60000000)));
        assert!(!first.contains(dec!(60000000.01)));
    }

    #[test]
    fn describe_mentions_category_and_rate() {
        let description = RateScheme::for_category(&TaxCategory::Ppn).describe(&TaxCategory::Ppn);

        assert_eq!(description, "PPN: flat rate of 11% on taxable income");
    }

    #[test]
    fn describe_default_names_unknown_category() {
        let category = TaxCategory::parse("XYZ");
        let description = RateScheme::for_category(&category).describe(&category);

        assert_eq!(description, "XYZ: no dedicated scheme, default flat rate of 10%");
    }

    #[test]
    fn scheme_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SchemeKind::Installment).unwrap(),
            "\"installment\""
        );
    }
}
