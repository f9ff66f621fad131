use serde::Deserialize;

use crate::error::AppError;
use medfinder_common::api::{PharmacyDetail, PharmacyView};

const BUNDLED_PHARMACIES: &str = include_str!("../data/pharmacies.json");

pub const DEFAULT_RADIUS_MILES: f64 = 5.0;
pub const DEFAULT_PHARMACY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingTier {
    Low,
    Medium,
    High,
}

impl PricingTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn estimated_savings(self) -> &'static str {
        match self {
            Self::Low => "Up to 80% savings on generics",
            Self::Medium => "Up to 60% savings on generics",
            Self::High => "Competitive generic pricing",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Pharmacy {
    name: String,
    address: String,
    phone: String,
    distance_miles: f64,
    services: Vec<String>,
    pricing_tier: PricingTier,
    #[serde(default = "default_accepts_insurance")]
    accepts_insurance: bool,
    hours: String,
    #[serde(default)]
    website: Option<String>,
}

fn default_accepts_insurance() -> bool {
    true
}

/// Mock pharmacy directory. Distances are fixed per pharmacy; the search location is
/// echoed back but never geocoded.
#[derive(Debug, Clone)]
pub struct PharmacyDirectory {
    pharmacies: Vec<Pharmacy>,
}

impl PharmacyDirectory {
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json("bundled pharmacy directory", BUNDLED_PHARMACIES)
    }

    pub fn from_json(source_name: &str, content: &str) -> Result<Self, AppError> {
        let pharmacies: Vec<Pharmacy> =
            serde_json::from_str(content).map_err(|e| AppError::data(source_name, e))?;
        Ok(Self { pharmacies })
    }

    pub fn len(&self) -> usize {
        self.pharmacies.len()
    }

    /// Pharmacies within `radius_miles`, nearest first.
    pub fn nearby(
        &self,
        location: &str,
        radius_miles: f64,
        limit: usize,
        pricing_tier: Option<&str>,
    ) -> Result<Vec<PharmacyView>, AppError> {
        if location.trim().is_empty() {
            return Err(AppError::invalid("location must not be empty"));
        }
        if !radius_miles.is_finite() || radius_miles <= 0.0 {
            return Err(AppError::invalid("radius must be a positive number"));
        }
        let tier = match pricing_tier.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => Some(PricingTier::parse(raw).ok_or_else(|| {
                AppError::invalid(format!(
                    "unknown pricing tier '{raw}', expected low, medium or high"
                ))
            })?),
            None => None,
        };

        let mut matches: Vec<&Pharmacy> = self
            .pharmacies
            .iter()
            .filter(|p| tier.is_none_or(|t| p.pricing_tier == t))
            .filter(|p| p.distance_miles <= radius_miles)
            .collect();
        matches.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|p| PharmacyView {
                name: p.name.clone(),
                address: p.address.clone(),
                phone: p.phone.clone(),
                distance_miles: p.distance_miles,
                distance_display: format!("{:.1} miles", p.distance_miles),
                services: p.services.clone(),
                pricing_tier: p.pricing_tier.as_str().to_string(),
                accepts_insurance: p.accepts_insurance,
                estimated_savings: p.pricing_tier.estimated_savings().to_string(),
            })
            .collect())
    }

    /// Case-insensitive lookup by full pharmacy name.
    pub fn details(&self, name: &str) -> Result<PharmacyDetail, AppError> {
        let wanted = name.trim().to_lowercase();
        let p = self
            .pharmacies
            .iter()
            .find(|p| p.name.to_lowercase() == wanted)
            .ok_or_else(|| AppError::not_found(format!("pharmacy not found: '{}'", name.trim())))?;

        Ok(PharmacyDetail {
            name: p.name.clone(),
            address: p.address.clone(),
            phone: p.phone.clone(),
            services: p.services.clone(),
            pricing_tier: p.pricing_tier.as_str().to_string(),
            accepts_insurance: p.accepts_insurance,
            estimated_savings: p.pricing_tier.estimated_savings().to_string(),
            hours: p.hours.clone(),
            website: p.website.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> PharmacyDirectory {
        PharmacyDirectory::bundled().unwrap()
    }

    #[test]
    fn nearby_sorts_by_distance() {
        let found = directory().nearby("10001", DEFAULT_RADIUS_MILES, 10, None).unwrap();
        assert_eq!(found.len(), 6);
        assert_eq!(found[0].name, "Walmart Pharmacy");
        assert_eq!(found[0].distance_display, "0.3 miles");
        assert!(found.windows(2).all(|w| w[0].distance_miles <= w[1].distance_miles));
    }

    #[test]
    fn nearby_filters_by_radius_tier_and_limit() {
        let d = directory();
        let close = d.nearby("Austin", 0.5, 10, None).unwrap();
        assert_eq!(close.len(), 2);

        let low = d.nearby("Austin", 5.0, 10, Some("LOW")).unwrap();
        assert!(low.iter().all(|p| p.pricing_tier == "low"));
        assert_eq!(low[0].estimated_savings, "Up to 80% savings on generics");

        assert_eq!(d.nearby("Austin", 5.0, 3, None).unwrap().len(), 3);
    }

    #[test]
    fn nearby_rejects_bad_input() {
        let d = directory();
        assert!(matches!(d.nearby("  ", 5.0, 10, None), Err(AppError::InvalidInput(_))));
        assert!(matches!(d.nearby("10001", 0.0, 10, None), Err(AppError::InvalidInput(_))));
        assert!(matches!(
            d.nearby("10001", 5.0, 10, Some("premium")),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn details_lookup_is_case_insensitive() {
        let d = directory();
        let cvs = d.details("cvs pharmacy").unwrap();
        assert_eq!(cvs.hours, "24 hours");
        assert_eq!(cvs.website.as_deref(), Some("https://www.cvs.com/store-locator"));
        assert!(matches!(d.details("Nowhere Drugs"), Err(AppError::NotFound(_))));
    }
}
