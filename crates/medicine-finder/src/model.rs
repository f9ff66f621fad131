use serde::{Deserialize, Serialize};

use medfinder_common::api::SourceRef;

/// One branded/generic pairing from the catalog (e.g. "Lipitor" / "Atorvastatin").
///
/// Records are built once when the catalog loads and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRecord {
    pub brand_name: String,
    pub generic_name: String,
    /// Average price of one branded fill.
    pub average_brand_price: f64,
    /// Average price of one generic fill, same currency unit as the brand price.
    pub average_generic_price: f64,
    /// Dosage form, e.g. "Tablet"
    pub form: String,
    /// Strength, e.g. "20 mg"
    pub strength: String,
    /// Condition names, in catalog order
    pub indications: Vec<String>,
    pub notes: Option<String>,
    pub sources: Vec<SourceRef>,
}

/// Which tier a search hit landed in. Exact hits always rank first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// Query is a substring of the brand or generic name.
    Exact,
    /// Query is within the edit-distance tolerance of a name.
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Fuzzy => "fuzzy",
        }
    }
}

/// A search hit: the catalog record plus its locality-adjusted savings.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicineMatch<'a> {
    pub record: &'a MedicineRecord,
    pub kind: MatchKind,
    /// Adjusted brand price minus adjusted generic price. May be negative.
    pub savings: f64,
}
