/// Locality adjuster: regional price multipliers and currency labels.
///
/// Lookups never fail. An absent, empty or unknown locality key leaves prices unchanged.
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppError;
use medfinder_common::api::CurrencyInfo;

const BUNDLED_LOCALITIES: &str = include_str!("../data/localities.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityEntry {
    pub key: String,
    pub label: String,
    pub multiplier: f64,
}

/// Read-only multiplier table, keyed by lowercase locality code ("us-ny", "online-in").
#[derive(Debug, Clone, Default)]
pub struct LocalityTable {
    entries: Vec<LocalityEntry>,
    index: HashMap<String, usize>,
}

impl LocalityTable {
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json("bundled locality table", BUNDLED_LOCALITIES)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&path.display().to_string(), &content)
    }

    pub fn from_json(source_name: &str, content: &str) -> Result<Self, AppError> {
        let entries: Vec<LocalityEntry> =
            serde_json::from_str(content).map_err(|e| AppError::data(source_name, e))?;
        Self::from_entries(entries).map_err(|e| AppError::data(source_name, e))
    }

    /// Build a table, rejecting empty keys and multipliers that are not positive.
    /// A repeated key replaces the earlier entry.
    pub fn from_entries(entries: Vec<LocalityEntry>) -> Result<Self, String> {
        let mut table = Self::default();
        for mut entry in entries {
            entry.key = normalize_key(&entry.key);
            if entry.key.is_empty() {
                return Err("locality key must not be empty".to_string());
            }
            if !entry.multiplier.is_finite() || entry.multiplier <= 0.0 {
                return Err(format!(
                    "multiplier for '{}' must be a positive number",
                    entry.key
                ));
            }
            if let Some(&existing) = table.index.get(&entry.key) {
                warn!(key = %entry.key, "duplicate locality entry, keeping the later one");
                table.entries[existing] = entry;
            } else {
                table.index.insert(entry.key.clone(), table.entries.len());
                table.entries.push(entry);
            }
        }
        Ok(table)
    }

    /// Multiplier for `locality`, or 1.0 when the key is absent or unknown.
    pub fn multiplier(&self, locality: Option<&str>) -> f64 {
        locality
            .map(normalize_key)
            .and_then(|key| self.index.get(&key))
            .map(|&i| self.entries[i].multiplier)
            .unwrap_or(1.0)
    }

    /// Apply the locality multiplier to `price`. No rounding.
    pub fn adjust(&self, price: f64, locality: Option<&str>) -> f64 {
        price * self.multiplier(locality)
    }

    /// Entries in table order, for locality pickers.
    pub fn known(&self) -> &[LocalityEntry] {
        &self.entries
    }
}

pub fn normalize_key(locality: &str) -> String {
    locality.trim().to_lowercase()
}

/// Country code of a locality key: "us-ny" → "us", "online-in" → "in".
pub fn country_of(locality: &str) -> Option<String> {
    let key = normalize_key(locality);
    if key.is_empty() {
        return None;
    }
    let mut parts = key.split('-');
    let first = parts.next()?;
    if first == "online" {
        return parts.next().map(str::to_string);
    }
    Some(first.to_string())
}

/// Currency used for display in a locality. Unknown and absent localities use USD.
pub fn currency_for(locality: Option<&str>) -> CurrencyInfo {
    let (code, symbol) = match locality.and_then(country_of).as_deref() {
        Some("in") => ("INR", "₹"),
        Some("ca") => ("CAD", "$"),
        _ => ("USD", "$"),
    };
    CurrencyInfo {
        code: code.to_string(),
        symbol: symbol.to_string(),
    }
}
