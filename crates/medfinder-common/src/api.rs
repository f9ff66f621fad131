use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Tool / request parameters ---

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchMedicinesParams {
    /// Branded or generic name to look for (at least two characters).
    pub query: String,
    /// Locality or region code such as "us-ny" or "in-ka".
    pub locality: Option<String>,
    /// Language code for advice text (default: "en").
    pub lang: Option<String>,
    /// Maximum number of results to return (default: 10, max: 50).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetMedicineParams {
    /// Exact brand name, e.g. "Lipitor".
    pub brand_name: String,
    pub locality: Option<String>,
}

/// Savings comparison between two explicit prices.
///
/// Numeric fields are optional so that missing values surface as validation
/// errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CalculateSavingsParams {
    /// Price of one branded fill.
    pub brand_price: Option<f64>,
    /// Price of one generic fill.
    pub generic_price: Option<f64>,
    /// Fills per year (positive integer, default: 12).
    pub prescriptions_per_year: Option<f64>,
    /// Optional label echoed back in the response.
    pub medicine_name: Option<String>,
    /// Language code for the disclaimer (default: "en").
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EstimateSavingsParams {
    /// Brand or generic name of a catalog medicine.
    pub medicine: String,
    /// Months on therapy (default: 12).
    pub months: Option<i64>,
    /// Packs filled per month (default: 1.0).
    pub monthly_quantity: Option<f64>,
    pub locality: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindOffersParams {
    /// Brand or generic name of a catalog medicine.
    pub medicine: String,
    pub locality: Option<String>,
    pub lang: Option<String>,
    /// Maximum number of offers (default: 5).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindPharmaciesParams {
    /// ZIP code, city or address.
    pub location: String,
    /// Search radius in miles (default: 5.0).
    pub radius_miles: Option<f64>,
    /// Maximum number of pharmacies (default: 10).
    pub limit: Option<u32>,
    /// Pricing tier filter: "low", "medium" or "high".
    pub pricing: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListEducationParams {
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetEducationParams {
    /// Module topic ("diabetes", "hypertension", "asthma") or guide slug
    /// ("generic-medicines", "chronic-conditions").
    pub topic: String,
    pub lang: Option<String>,
}

// --- Catalog views ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceRef {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CurrencyInfo {
    pub code: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MedicineView {
    pub brand_name: String,
    pub generic_name: String,
    pub form: String,
    pub strength: String,
    pub indications: Vec<String>,
    /// Catalog price after the locality multiplier, rounded to cents.
    pub average_brand_price: f64,
    pub average_generic_price: f64,
    /// Brand minus generic price after the locality multiplier, rounded to cents.
    pub savings: f64,
    /// Multiplier applied for the requested locality (1.0 when unknown).
    pub locality_multiplier: f64,
    /// "exact" or "fuzzy" for search results; absent for direct lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<String>,
    pub notes: Option<String>,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchMedicinesResponse {
    pub results: Vec<MedicineView>,
    pub count: usize,
    pub advice: String,
    pub currency: CurrencyInfo,
}

/// A selectable locality with its price multiplier and display currency.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocalityInfo {
    pub key: String,
    pub label: String,
    pub multiplier: f64,
    pub currency: CurrencyInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogStats {
    pub total_medicines: usize,
    pub average_brand_price: Option<f64>,
    pub average_generic_price: Option<f64>,
    pub average_savings: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub catalog_version: String,
    pub medicines: usize,
}

// --- Savings ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SavingsResponse {
    pub medicine_name: Option<String>,
    pub prescriptions_per_year: u32,
    pub brand_annual_cost: f64,
    pub generic_annual_cost: f64,
    pub annual_savings: f64,
    pub percentage_saved: f64,
    pub disclaimer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SavingsEstimateResponse {
    pub medicine: String,
    pub generic: String,
    pub months: u32,
    pub monthly_quantity: f64,
    pub monthly_brand_cost: f64,
    pub monthly_generic_cost: f64,
    pub monthly_savings: f64,
    pub total_savings: f64,
    pub percent_savings: f64,
    pub currency: CurrencyInfo,
    pub advice: String,
    pub assumptions: String,
}

// --- Offers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Retail,
    Online,
}

/// One row of a partner feed: a dispensing partner serving a locality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PartnerListing {
    pub partner: String,
    pub kind: ListingKind,
    /// Locality key such as "us-ny" or "online-in".
    pub locality: String,
    pub address: String,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default = "default_multiplier")]
    pub price_multiplier: f64,
    #[serde(default)]
    pub delivery: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfferView {
    pub partner: String,
    #[serde(rename = "type")]
    pub kind: ListingKind,
    pub price: f64,
    pub currency: CurrencyInfo,
    pub address: String,
    pub distance_km: Option<f64>,
    pub delivery: Option<String>,
    pub last_updated: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfferSummary {
    pub count: usize,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OffersResponse {
    pub medicine: String,
    pub generic: String,
    pub locality: Option<String>,
    pub offers: Vec<OfferView>,
    pub summary: OfferSummary,
    pub advice: String,
}

// --- Pharmacy directory ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PharmacyView {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub distance_miles: f64,
    pub distance_display: String,
    pub services: Vec<String>,
    pub pricing_tier: String,
    pub accepts_insurance: bool,
    pub estimated_savings: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PharmaciesResponse {
    pub pharmacies: Vec<PharmacyView>,
    pub count: usize,
    pub search_location: String,
    pub radius_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PharmacyDetail {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub services: Vec<String>,
    pub pricing_tier: String,
    pub accepts_insurance: bool,
    pub estimated_savings: String,
    pub hours: String,
    pub website: Option<String>,
}

// --- Education ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EducationModuleView {
    pub topic: String,
    pub title: String,
    pub summary: String,
    pub conditions: Vec<String>,
    pub featured_medicines: Vec<String>,
    pub tips: Vec<String>,
    /// Language the module was requested in, after normalization.
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EducationModulesResponse {
    pub language: String,
    pub modules: Vec<EducationModuleView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GuideSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EducationGuideView {
    pub slug: String,
    pub title: String,
    pub sections: Vec<GuideSection>,
    pub disclaimer: String,
    pub language: String,
}

/// Either a module or a guide, never both.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EducationContentResponse {
    /// "module" or "guide".
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<EducationModuleView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<EducationGuideView>,
}

// --- Translations ---

/// A translated entry: either a single string or an ordered list (tips).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TranslationValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LanguageInfo {
    pub code: String,
    pub label: String,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LanguageMetadata {
    pub language: String,
    pub generated_at: String,
    pub supported: Vec<LanguageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranslationsResponse {
    pub metadata: LanguageMetadata,
    pub strings: BTreeMap<String, TranslationValue>,
}
