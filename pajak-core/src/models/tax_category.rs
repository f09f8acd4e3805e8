use std::fmt;

use serde::{Deserialize, Serialize};

/// Tax category a calculation is filed under.
///
/// The known categories map onto fixed rate schemes. Any other code is kept
/// verbatim in [`TaxCategory::Other`] so records filed under a category this
/// build does not know about still load and compute under the default scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaxCategory {
    /// Employment income tax (PPh 21).
    Pph21,
    /// Value-added tax (PPN).
    Ppn,
    /// Withholding tax on services, dividends and royalties (PPh 23).
    Pph23,
    /// Monthly income-tax installment (PPh 25).
    Pph25,
    /// Land and building tax (PBB).
    Pbb,
    /// Land and building transfer duty (BPHTB).
    Bphtb,
    /// Motor vehicle tax.
    PajakKendaraan,
    Other(String),
}

impl TaxCategory {
    /// Every category with a dedicated rate scheme.
    pub const KNOWN: [TaxCategory; 7] = [
        TaxCategory::Pph21,
        TaxCategory::Ppn,
        TaxCategory::Pph23,
        TaxCategory::Pph25,
        TaxCategory::Pbb,
        TaxCategory::Bphtb,
        TaxCategory::PajakKendaraan,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pph21 => "PPH_21",
            Self::Ppn => "PPN",
            Self::Pph23 => "PPH_23",
            Self::Pph25 => "PPH_25",
            Self::Pbb => "PBB",
            Self::Bphtb => "BPHTB",
            Self::PajakKendaraan => "PAJAK_KENDARAAN",
            Self::Other(code) => code,
        }
    }

    /// Parses a category code. Never fails: unrecognised codes become
    /// [`TaxCategory::Other`].
    pub fn parse(s: &str) -> Self {
        match s {
            "PPH_21" => Self::Pph21,
            "PPN" => Self::Ppn,
            "PPH_23" => Self::Pph23,
            "PPH_25" => Self::Pph25,
            "PBB" => Self::Pbb,
            "BPHTB" => Self::Bphtb,
            "PAJAK_KENDARAAN" => Self::PajakKendaraan,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TaxCategory {
    fn from(code: String) -> Self {
        Self::parse(&code)
    }
}

impl From<TaxCategory> for String {
    fn from(category: TaxCategory) -> Self {
        category.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn known_codes_parse_to_their_variant() {
        for category in TaxCategory::KNOWN {
            assert_eq!(TaxCategory::parse(category.as_str()), category);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        let category = TaxCategory::parse("XYZ");

        assert_eq!(category, TaxCategory::Other("XYZ".to_string()));
        assert_eq!(category.as_str(), "XYZ");
        assert!(!category.is_known());
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!(
            TaxCategory::parse("ppn"),
            TaxCategory::Other("ppn".to_string())
        );
    }

    #[test]
    fn serializes_as_plain_code() {
        let json = serde_json::to_string(&TaxCategory::PajakKendaraan).unwrap();

        assert_eq!(json, "\"PAJAK_KENDARAAN\"");
    }

    #[test]
    fn deserializes_unknown_code_without_error() {
        let category: TaxCategory = serde_json::from_str("\"PAJAK_HIBURAN\"").unwrap();

        assert_eq!(category, TaxCategory::Other("PAJAK_HIBURAN".to_string()));
    }
}
