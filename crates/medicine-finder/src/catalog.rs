/// Catalog store: the in-memory list of medicine records.
///
/// The source is a JSON array of objects. Each object needs `brand_name` and
/// `generic_name`; every other field is optional. Malformed rows are skipped with a
/// warning log and loading never panics. The catalog is immutable once built.
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::model::MedicineRecord;
use crate::savings::round_cents;
use medfinder_common::api::{CatalogStats, SourceRef};

const BUNDLED_CATALOG: &str = include_str!("../data/medicines.json");

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]").expect("valid regex"));

/// Lowercase and strip everything but ASCII letters and digits.
///
/// "Advair Diskus" and "advair-diskus" both normalize to "advairdiskus".
pub fn normalize(value: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&value.to_lowercase(), "")
        .into_owned()
}

/// A record together with its precomputed normalized names.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub record: MedicineRecord,
    pub brand_key: String,
    pub generic_key: String,
}

#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    fingerprint: String,
}

/// Row shape as found in the source file, before validation.
#[derive(Debug, Deserialize)]
struct RawRecord {
    brand_name: Option<String>,
    generic_name: Option<String>,
    #[serde(default)]
    average_brand_price: Option<f64>,
    #[serde(default)]
    average_generic_price: Option<f64>,
    #[serde(default)]
    form: Option<String>,
    #[serde(default)]
    strength: Option<String>,
    #[serde(default)]
    indications: Vec<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    sources: Vec<SourceRef>,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json("bundled catalog", BUNDLED_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&path.display().to_string(), &content)
    }

    /// Parse catalog JSON. Fails only when the document is not a JSON array.
    pub fn from_json(source_name: &str, content: &str) -> Result<Self, AppError> {
        let rows: Vec<serde_json::Value> =
            serde_json::from_str(content).map_err(|e| AppError::data(source_name, e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let raw = match serde_json::from_value::<RawRecord>(row) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(index, error = %e, "malformed catalog row, skipping");
                    continue;
                }
            };
            match validate(raw) {
                Ok(record) => {
                    if record.average_generic_price > record.average_brand_price {
                        debug!(
                            brand = %record.brand_name,
                            "generic price exceeds brand price, keeping as-is"
                        );
                    }
                    entries.push(CatalogEntry {
                        brand_key: normalize(&record.brand_name),
                        generic_key: normalize(&record.generic_name),
                        record,
                    });
                }
                Err(reason) => warn!(index, reason, "invalid catalog row, skipping"),
            }
        }

        let fingerprint = format!("{:x}", Sha256::digest(content.as_bytes()));

        Ok(Self {
            entries,
            fingerprint,
        })
    }

    #[cfg(test)]
    pub fn from_records(records: Vec<MedicineRecord>) -> Self {
        let mut hasher = Sha256::new();
        let entries = records
            .into_iter()
            .map(|record| {
                hasher.update(record.brand_name.as_bytes());
                hasher.update(b"|");
                CatalogEntry {
                    brand_key: normalize(&record.brand_name),
                    generic_key: normalize(&record.generic_name),
                    record,
                }
            })
            .collect();
        Self {
            entries,
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn records(&self) -> impl Iterator<Item = &MedicineRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 of the source document, used as the catalog version.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// First record whose brand name equals `brand_name` after normalization.
    pub fn find_by_brand(&self, brand_name: &str) -> Option<&MedicineRecord> {
        let key = normalize(brand_name);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.brand_key == key)
            .map(|e| &e.record)
    }

    /// First record whose brand or generic name equals `name` after normalization.
    /// Brand matches win over generic matches.
    pub fn find_by_name(&self, name: &str) -> Option<&MedicineRecord> {
        let key = normalize(name);
        if key.is_empty() {
            return None;
        }
        self.find_by_brand(name).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.generic_key == key)
                .map(|e| &e.record)
        })
    }

    /// Landing-page figures over records that carry both prices.
    pub fn summary_stats(&self) -> CatalogStats {
        let priced: Vec<(f64, f64)> = self
            .records()
            .filter(|r| r.average_brand_price > 0.0 && r.average_generic_price > 0.0)
            .map(|r| (r.average_brand_price, r.average_generic_price))
            .collect();

        if priced.is_empty() {
            return CatalogStats {
                total_medicines: self.len(),
                average_brand_price: None,
                average_generic_price: None,
                average_savings: None,
            };
        }

        let n = priced.len() as f64;
        let avg_brand = round_cents(priced.iter().map(|p| p.0).sum::<f64>() / n);
        let avg_generic = round_cents(priced.iter().map(|p| p.1).sum::<f64>() / n);

        CatalogStats {
            total_medicines: self.len(),
            average_brand_price: Some(avg_brand),
            average_generic_price: Some(avg_generic),
            average_savings: Some(round_cents(avg_brand - avg_generic)),
        }
    }
}

fn validate(raw: RawRecord) -> Result<MedicineRecord, &'static str> {
    let brand_name = raw
        .brand_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or("missing brand_name")?;
    let generic_name = raw
        .generic_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or("missing generic_name")?;

    let average_brand_price = raw.average_brand_price.unwrap_or(0.0);
    let average_generic_price = raw.average_generic_price.unwrap_or(0.0);
    for price in [average_brand_price, average_generic_price] {
        if !price.is_finite() || price < 0.0 {
            return Err("prices must be finite and non-negative");
        }
    }

    Ok(MedicineRecord {
        brand_name,
        generic_name,
        average_brand_price,
        average_generic_price,
        form: raw.form.unwrap_or_default(),
        strength: raw.strength.unwrap_or_default(),
        indications: raw.indications,
        notes: raw.notes,
        sources: raw.sources,
    })
}
