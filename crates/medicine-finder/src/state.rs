/// Shared application state and the operations both surfaces call.
///
/// Everything here is built once at startup and read-only afterwards, so the MCP
/// server and the REST router hold the same `Arc<AppState>` without locking.
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::Catalog;
use crate::config::{Config, MAX_SEARCH_LIMIT};
use crate::education::EducationLibrary;
use crate::error::AppError;
use crate::i18n::Translations;
use crate::locality::{currency_for, LocalityTable};
use crate::model::{MatchKind, MedicineRecord};
use crate::offers::{summarize, OfferGenerator, OfferSource};
use crate::pharmacies::{PharmacyDirectory, DEFAULT_PHARMACY_LIMIT, DEFAULT_RADIUS_MILES};
use crate::savings::{self, round_cents};
use crate::search::Matcher;
use medfinder_common::api::{
    CalculateSavingsParams, CatalogStats, EducationContentResponse, EducationModulesResponse,
    EstimateSavingsParams, FindOffersParams, FindPharmaciesParams, HealthResponse, LanguageInfo,
    LocalityInfo, MedicineView, OffersResponse, PharmaciesResponse, PharmacyDetail,
    SavingsEstimateResponse, SavingsResponse, SearchMedicinesParams, SearchMedicinesResponse,
    TranslationsResponse,
};

pub const MIN_QUERY_CHARS: usize = 2;
const DEFAULT_OFFER_LIMIT: usize = 5;
const MAX_OFFER_LIMIT: usize = 20;
const MAX_PHARMACY_LIMIT: usize = 50;
const DEFAULT_MONTHS: i64 = 12;
const DEFAULT_MONTHLY_QUANTITY: f64 = 1.0;

pub struct AppState {
    catalog: Arc<Catalog>,
    localities: Arc<LocalityTable>,
    translations: Arc<Translations>,
    matcher: Matcher,
    offers: OfferGenerator,
    education: EducationLibrary,
    pharmacies: PharmacyDirectory,
    default_frequency: u32,
    search_limit: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        catalog: Catalog,
        localities: LocalityTable,
        translations: Translations,
        offer_source: Arc<dyn OfferSource>,
        pharmacies: PharmacyDirectory,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let localities = Arc::new(localities);
        let translations = Arc::new(translations);

        Self {
            matcher: Matcher::new(Arc::clone(&catalog), Arc::clone(&localities)),
            offers: OfferGenerator::new(
                Arc::clone(&catalog),
                Arc::clone(&localities),
                offer_source,
            ),
            education: EducationLibrary::new(Arc::clone(&catalog), Arc::clone(&translations)),
            catalog,
            localities,
            translations,
            pharmacies,
            default_frequency: config.default_frequency,
            search_limit: config.search_limit,
        }
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            ok: true,
            catalog_version: self.catalog.fingerprint().to_string(),
            medicines: self.catalog.len(),
        }
    }

    pub fn stats(&self) -> CatalogStats {
        self.catalog.summary_stats()
    }

    pub fn search(&self, params: &SearchMedicinesParams) -> Result<SearchMedicinesResponse, AppError> {
        let query = params.query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(AppError::invalid(format!(
                "query must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        let limit = params
            .limit
            .map(|l| (l as usize).clamp(1, MAX_SEARCH_LIMIT))
            .unwrap_or(self.search_limit);
        let locality = non_empty(params.locality.as_deref());

        let results: Vec<MedicineView> = self
            .matcher
            .search(query, locality)
            .into_iter()
            .take(limit)
            .map(|hit| self.medicine_view(hit.record, locality, Some(hit.kind)))
            .collect();

        Ok(SearchMedicinesResponse {
            count: results.len(),
            results,
            advice: self.translations.text(params.lang.as_deref(), "advice"),
            currency: currency_for(locality),
        })
    }

    pub fn medicine(&self, brand_name: &str, locality: Option<&str>) -> Result<MedicineView, AppError> {
        let record = self
            .catalog
            .find_by_brand(brand_name)
            .ok_or_else(|| AppError::not_found(format!("medicine not found: '{}'", brand_name.trim())))?;
        Ok(self.medicine_view(record, non_empty(locality), None))
    }

    /// Annual comparison for two explicit prices. Missing prices are invalid input;
    /// a missing frequency uses the configured default.
    pub fn calculate_savings(&self, params: &CalculateSavingsParams) -> Result<SavingsResponse, AppError> {
        let brand_price = params
            .brand_price
            .ok_or_else(|| AppError::invalid("brand_price is required"))?;
        let generic_price = params
            .generic_price
            .ok_or_else(|| AppError::invalid("generic_price is required"))?;
        let frequency = match params.prescriptions_per_year {
            Some(value) => savings::frequency_from(value)?,
            None => self.default_frequency,
        };

        let breakdown = savings::calculate(brand_price, generic_price, frequency)?;

        Ok(SavingsResponse {
            medicine_name: params.medicine_name.clone().filter(|n| !n.trim().is_empty()),
            prescriptions_per_year: frequency,
            brand_annual_cost: round_cents(breakdown.brand_total),
            generic_annual_cost: round_cents(breakdown.generic_total),
            annual_savings: round_cents(breakdown.absolute_savings),
            percentage_saved: round_cents(breakdown.percent_savings),
            disclaimer: self.translations.text(params.lang.as_deref(), "savings.disclaimer"),
        })
    }

    pub fn estimate_savings(
        &self,
        params: &EstimateSavingsParams,
    ) -> Result<SavingsEstimateResponse, AppError> {
        let name = params.medicine.trim();
        if name.is_empty() {
            return Err(AppError::invalid("medicine must not be empty"));
        }
        let record = self
            .catalog
            .find_by_name(name)
            .ok_or_else(|| AppError::not_found(format!("medicine not found: '{name}'")))?;
        let locality = non_empty(params.locality.as_deref());
        let lang = params.lang.as_deref();

        let estimate = savings::estimate(
            record,
            params.months.unwrap_or(DEFAULT_MONTHS),
            params.monthly_quantity.unwrap_or(DEFAULT_MONTHLY_QUANTITY),
            &self.localities,
            locality,
        )?;

        Ok(SavingsEstimateResponse {
            medicine: record.brand_name.clone(),
            generic: record.generic_name.clone(),
            months: estimate.months,
            monthly_quantity: estimate.monthly_quantity,
            monthly_brand_cost: round_cents(estimate.monthly_brand_cost),
            monthly_generic_cost: round_cents(estimate.monthly_generic_cost),
            monthly_savings: round_cents(estimate.monthly_savings),
            total_savings: round_cents(estimate.totals.absolute_savings),
            percent_savings: round_cents(estimate.totals.percent_savings),
            currency: currency_for(locality),
            advice: self.translations.text(lang, "advice"),
            assumptions: self.translations.text(lang, "savings.assumptions"),
        })
    }

    pub fn offers(&self, params: &FindOffersParams, as_of: DateTime<Utc>) -> Result<OffersResponse, AppError> {
        let name = params.medicine.trim();
        if name.is_empty() {
            return Err(AppError::invalid("medicine must not be empty"));
        }
        let limit = params
            .limit
            .map(|l| (l as usize).clamp(1, MAX_OFFER_LIMIT))
            .unwrap_or(DEFAULT_OFFER_LIMIT);
        let locality = non_empty(params.locality.as_deref());

        let found = self.offers.offers_for(name, locality, limit, as_of)?;
        Ok(OffersResponse {
            medicine: found.record.brand_name.clone(),
            generic: found.record.generic_name.clone(),
            locality: locality.map(str::to_string),
            summary: summarize(&found.offers),
            offers: found.offers,
            advice: self.translations.text(params.lang.as_deref(), "advice"),
        })
    }

    pub fn pharmacies(&self, params: &FindPharmaciesParams) -> Result<PharmaciesResponse, AppError> {
        let radius_miles = params.radius_miles.unwrap_or(DEFAULT_RADIUS_MILES);
        let limit = params
            .limit
            .map(|l| (l as usize).clamp(1, MAX_PHARMACY_LIMIT))
            .unwrap_or(DEFAULT_PHARMACY_LIMIT);
        let pharmacies =
            self.pharmacies
                .nearby(&params.location, radius_miles, limit, params.pricing.as_deref())?;

        Ok(PharmaciesResponse {
            count: pharmacies.len(),
            pharmacies,
            search_location: params.location.trim().to_string(),
            radius_miles,
        })
    }

    pub fn pharmacy(&self, name: &str) -> Result<PharmacyDetail, AppError> {
        self.pharmacies.details(name)
    }

    pub fn education_modules(&self, lang: Option<&str>) -> EducationModulesResponse {
        self.education.modules(lang)
    }

    pub fn education_content(
        &self,
        topic: &str,
        lang: Option<&str>,
    ) -> Result<EducationContentResponse, AppError> {
        self.education.content(topic, lang).map(Into::into)
    }

    pub fn localities(&self) -> Vec<LocalityInfo> {
        self.localities
            .known()
            .iter()
            .map(|entry| LocalityInfo {
                key: entry.key.clone(),
                label: entry.label.clone(),
                multiplier: entry.multiplier,
                currency: currency_for(Some(&entry.key)),
            })
            .collect()
    }

    pub fn translations(&self, lang: Option<&str>) -> TranslationsResponse {
        TranslationsResponse {
            metadata: self.translations.metadata(lang),
            strings: self.translations.strings(lang),
        }
    }

    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.translations.supported()
    }

    fn medicine_view(
        &self,
        record: &MedicineRecord,
        locality: Option<&str>,
        kind: Option<MatchKind>,
    ) -> MedicineView {
        let brand = self.localities.adjust(record.average_brand_price, locality);
        let generic = self.localities.adjust(record.average_generic_price, locality);
        MedicineView {
            brand_name: record.brand_name.clone(),
            generic_name: record.generic_name.clone(),
            form: record.form.clone(),
            strength: record.strength.clone(),
            indications: record.indications.clone(),
            average_brand_price: round_cents(brand),
            average_generic_price: round_cents(generic),
            savings: round_cents(brand - generic),
            locality_multiplier: self.localities.multiplier(locality),
            match_kind: kind.map(|k| k.as_str().to_string()),
            notes: record.notes.clone(),
            sources: record.sources.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::offers::StaticOfferSource;

    pub(crate) fn bundled_state() -> AppState {
        let config = Config::from_vars(|_| None).unwrap();
        AppState::new(
            &config,
            Catalog::bundled().unwrap(),
            LocalityTable::bundled().unwrap(),
            Translations::bundled().unwrap(),
            Arc::new(StaticOfferSource::bundled().unwrap()),
            PharmacyDirectory::bundled().unwrap(),
        )
    }

    fn search_params(query: &str) -> SearchMedicinesParams {
        SearchMedicinesParams {
            query: query.to_string(),
            locality: None,
            lang: None,
            limit: None,
        }
    }

    #[test]
    fn search_returns_rounded_views() {
        let state = bundled_state();
        let response = state.search(&search_params("lipitor")).unwrap();
        assert_eq!(response.count, 1);
        let lipitor = &response.results[0];
        assert_eq!(lipitor.savings, 177.5);
        assert_eq!(lipitor.match_kind.as_deref(), Some("exact"));
        assert_eq!(lipitor.locality_multiplier, 1.0);
        assert_eq!(response.currency.code, "USD");
    }

    #[test]
    fn search_rejects_short_queries() {
        let state = bundled_state();
        assert!(matches!(state.search(&search_params(" a ")), Err(AppError::InvalidInput(_))));
        assert!(matches!(state.search(&search_params("")), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn search_respects_limit_and_language() {
        let state = bundled_state();
        let mut params = search_params("statin");
        params.limit = Some(1);
        params.lang = Some("es".to_string());
        let response = state.search(&params).unwrap();
        assert_eq!(response.count, 1);
        assert!(response.advice.starts_with("Siempre"));
    }

    #[test]
    fn locality_changes_prices_and_currency() {
        let state = bundled_state();
        let mut params = search_params("lipitor");
        params.locality = Some("in-ka".to_string());
        let response = state.search(&params).unwrap();
        assert_eq!(response.currency.code, "INR");
        assert_eq!(response.results[0].locality_multiplier, 0.42);
        assert_eq!(response.results[0].average_brand_price, 79.8);
    }

    #[test]
    fn medicine_lookup_by_brand() {
        let state = bundled_state();
        assert_eq!(state.medicine("LIPITOR", None).unwrap().generic_name, "Atorvastatin");
        assert!(matches!(state.medicine("Nonexistent", None), Err(AppError::NotFound(_))));
    }

    #[test]
    fn calculate_savings_defaults_frequency() {
        let state = bundled_state();
        let response = state
            .calculate_savings(&CalculateSavingsParams {
                brand_price: Some(190.0),
                generic_price: Some(12.5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(response.prescriptions_per_year, 12);
        assert_eq!(response.brand_annual_cost, 2280.0);
        assert_eq!(response.generic_annual_cost, 150.0);
        assert_eq!(response.annual_savings, 2130.0);
        assert_eq!(response.percentage_saved, 93.42);
        assert!(response.disclaimer.starts_with("Estimates use"));
    }

    #[test]
    fn calculate_savings_disclaimer_follows_language() {
        let state = bundled_state();
        let params = |lang: &str| CalculateSavingsParams {
            brand_price: Some(30.0),
            generic_price: Some(10.0),
            lang: Some(lang.to_string()),
            ..Default::default()
        };
        let es = state.calculate_savings(&params("es")).unwrap();
        assert!(es.disclaimer.starts_with("Las estimaciones"));
        // no Hindi disclaimer, English fills in
        let hi = state.calculate_savings(&params("hi")).unwrap();
        assert!(hi.disclaimer.starts_with("Estimates use"));
    }

    #[test]
    fn calculate_savings_requires_prices() {
        let state = bundled_state();
        let missing = state.calculate_savings(&CalculateSavingsParams {
            brand_price: Some(10.0),
            ..Default::default()
        });
        assert!(matches!(missing, Err(AppError::InvalidInput(_))));

        let fractional = state.calculate_savings(&CalculateSavingsParams {
            brand_price: Some(10.0),
            generic_price: Some(5.0),
            prescriptions_per_year: Some(1.5),
            ..Default::default()
        });
        assert!(matches!(fractional, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn estimate_uses_catalog_prices() {
        let state = bundled_state();
        let response = state
            .estimate_savings(&EstimateSavingsParams {
                medicine: "atorvastatin".to_string(),
                months: Some(6),
                monthly_quantity: None,
                locality: None,
                lang: Some("hi".to_string()),
            })
            .unwrap();
        assert_eq!(response.medicine, "Lipitor");
        assert_eq!(response.total_savings, 1065.0);
        // no Hindi assumptions text, English fills in
        assert!(response.assumptions.starts_with("Average prices"));
    }

    #[test]
    fn offers_include_summary_and_advice() {
        let state = bundled_state();
        let response = state
            .offers(
                &FindOffersParams {
                    medicine: "Lipitor".to_string(),
                    locality: Some("us-ny".to_string()),
                    lang: None,
                    limit: None,
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(response.summary.count, response.offers.len());
        assert_eq!(response.locality.as_deref(), Some("us-ny"));
        assert!(response.offers.windows(2).all(|w| w[0].price <= w[1].price));
    }

    #[test]
    fn pharmacy_limit_is_clamped() {
        let state = bundled_state();
        let params = |limit: u32| FindPharmaciesParams {
            location: "10001".to_string(),
            radius_miles: Some(100.0),
            limit: Some(limit),
            pricing: None,
        };
        assert_eq!(state.pharmacies(&params(0)).unwrap().count, 1);
        assert_eq!(state.pharmacies(&params(u32::MAX)).unwrap().count, 6);
    }
}
