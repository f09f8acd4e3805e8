use std::fmt;

use serde::{Deserialize, Serialize};

/// Filing cadence of a calculation. Informational only: it never changes the
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationType {
    Monthly,
    Quarterly,
    SemiAnnual,
    #[default]
    Annual,
    Special,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::SemiAnnual => "SEMI_ANNUAL",
            Self::Annual => "ANNUAL",
            Self::Special => "SPECIAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "SEMI_ANNUAL" => Some(Self::SemiAnnual),
            "ANNUAL" => Some(Self::Annual),
            "SPECIAL" => Some(Self::Special),
            _ => None,
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
