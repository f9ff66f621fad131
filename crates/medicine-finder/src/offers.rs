/// Offer generator: partner listings priced for a medicine and locality.
///
/// Listings come from an `OfferSource`. Rows with an unusable distance or price
/// multiplier are dropped with a warning when the source is built.
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::locality::{country_of, currency_for, normalize_key, LocalityTable};
use crate::model::MedicineRecord;
use crate::savings::round_cents;
use medfinder_common::api::{ListingKind, OfferSummary, OfferView, PartnerListing};

const BUNDLED_OFFERS: &str = include_str!("../data/offers.json");

/// Where partner listings come from. Implementations must be cheap to call per request.
pub trait OfferSource: Send + Sync {
    fn listings(&self, record: &MedicineRecord, locality: Option<&str>) -> Vec<PartnerListing>;
}

/// Fixed set of listings, either bundled or fetched once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticOfferSource {
    listings: Vec<PartnerListing>,
}

impl StaticOfferSource {
    pub fn new(listings: Vec<PartnerListing>) -> Self {
        let listings = listings
            .into_iter()
            .enumerate()
            .filter_map(|(index, listing)| match validate(&listing) {
                Ok(()) => Some(listing),
                Err(reason) => {
                    warn!(index, partner = %listing.partner, reason, "invalid partner listing, skipping");
                    None
                }
            })
            .collect();
        Self { listings }
    }

    pub fn bundled() -> Result<Self, AppError> {
        let listings: Vec<PartnerListing> = serde_json::from_str(BUNDLED_OFFERS)
            .map_err(|e| AppError::data("bundled partner listings", e))?;
        Ok(Self::new(listings))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }
}

fn validate(listing: &PartnerListing) -> Result<(), &'static str> {
    if listing.partner.trim().is_empty() {
        return Err("partner must not be empty");
    }
    if !listing.price_multiplier.is_finite() || listing.price_multiplier <= 0.0 {
        return Err("price_multiplier must be a positive number");
    }
    if let Some(d) = listing.distance_km {
        if !d.is_finite() || d < 0.0 {
            return Err("distance_km must be a non-negative number");
        }
    }
    Ok(())
}

impl OfferSource for StaticOfferSource {
    /// Listings for the exact locality or its country; online listings when nothing
    /// local serves it. Without a locality every listing is returned.
    fn listings(&self, _record: &MedicineRecord, locality: Option<&str>) -> Vec<PartnerListing> {
        let requested = locality.map(normalize_key).unwrap_or_default();
        if requested.is_empty() {
            return self.listings.clone();
        }
        let country = country_of(&requested);

        let local: Vec<PartnerListing> = self
            .listings
            .iter()
            .filter(|l| {
                let key = normalize_key(&l.locality);
                key == requested || (country.is_some() && country_of(&key) == country)
            })
            .cloned()
            .collect();
        if !local.is_empty() {
            return local;
        }

        self.listings
            .iter()
            .filter(|l| l.kind == ListingKind::Online)
            .cloned()
            .collect()
    }
}

/// Offers for one catalog medicine.
#[derive(Debug)]
pub struct MedicineOffers<'a> {
    pub record: &'a MedicineRecord,
    pub offers: Vec<OfferView>,
}

pub struct OfferGenerator {
    catalog: Arc<Catalog>,
    localities: Arc<LocalityTable>,
    source: Arc<dyn OfferSource>,
}

impl OfferGenerator {
    pub fn new(
        catalog: Arc<Catalog>,
        localities: Arc<LocalityTable>,
        source: Arc<dyn OfferSource>,
    ) -> Self {
        Self {
            catalog,
            localities,
            source,
        }
    }

    /// Price every listing serving `locality` for the medicine called `name`.
    ///
    /// Prices are the locality-adjusted generic price times the listing multiplier.
    /// Offers are sorted by price (ties keep listing order) and cut to `limit`.
    pub fn offers_for(
        &self,
        name: &str,
        locality: Option<&str>,
        limit: usize,
        as_of: DateTime<Utc>,
    ) -> Result<MedicineOffers<'_>, AppError> {
        let record = self
            .catalog
            .find_by_name(name)
            .ok_or_else(|| AppError::not_found(format!("medicine not found: '{}'", name.trim())))?;

        let base_price = self.localities.adjust(record.average_generic_price, locality);
        let currency = currency_for(locality);

        let mut priced: Vec<(f64, OfferView)> = self
            .source
            .listings(record, locality)
            .into_iter()
            .map(|listing| {
                let price = base_price * listing.price_multiplier;
                let distance_km = match (listing.distance_km, listing.kind) {
                    (Some(d), _) => Some(d),
                    (None, ListingKind::Retail) => Some(synthesized_distance_km(&listing.partner)),
                    (None, ListingKind::Online) => None,
                };
                let offer = OfferView {
                    last_updated: last_updated(as_of, distance_km),
                    partner: listing.partner,
                    kind: listing.kind,
                    price: round_cents(price),
                    currency: currency.clone(),
                    address: listing.address,
                    distance_km,
                    delivery: listing.delivery,
                    url: listing.url,
                };
                (price, offer)
            })
            .collect();

        priced.sort_by(|a, b| a.0.total_cmp(&b.0));
        priced.truncate(limit);

        debug!(
            medicine = %record.brand_name,
            locality = locality.unwrap_or(""),
            offers = priced.len(),
            "offers generated"
        );

        Ok(MedicineOffers {
            record,
            offers: priced.into_iter().map(|(_, offer)| offer).collect(),
        })
    }
}

/// Stable pseudo-distance for retail partners that publish none: 0.5 to 9.9 km.
fn synthesized_distance_km(partner: &str) -> f64 {
    let digest = Sha256::digest(partner.as_bytes());
    let bucket = u16::from_be_bytes([digest[0], digest[1]]) % 95;
    0.5 + f64::from(bucket) / 10.0
}

/// Listings further away are treated as refreshed longer ago, one minute per km.
fn last_updated(as_of: DateTime<Utc>, distance_km: Option<f64>) -> String {
    let seconds = (distance_km.unwrap_or(0.0) * 60.0).round() as i64;
    let stamp = TimeDelta::try_seconds(seconds)
        .and_then(|delta| as_of.checked_sub_signed(delta))
        .unwrap_or(as_of);
    stamp.format("%Y-%m-%dT%H:%MZ").to_string()
}

pub fn summarize(offers: &[OfferView]) -> OfferSummary {
    let min_price = offers.iter().map(|o| o.price).min_by(f64::total_cmp);
    let max_price = offers.iter().map(|o| o.price).max_by(f64::total_cmp);
    OfferSummary {
        count: offers.len(),
        min_price,
        max_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::record;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn generator(source: StaticOfferSource) -> OfferGenerator {
        let catalog = Catalog::from_records(vec![
            record("Lipitor", "Atorvastatin", 190.0, 10.0),
            record("Freebie", "Nothing", 0.0, 0.0),
        ]);
        OfferGenerator::new(
            Arc::new(catalog),
            Arc::new(LocalityTable::default()),
            Arc::new(source),
        )
    }

    fn partners(offers: &[OfferView]) -> Vec<&str> {
        offers.iter().map(|o| o.partner.as_str()).collect()
    }

    #[test]
    fn locality_selects_country_listings_sorted_by_price() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        let result = g.offers_for("lipitor", Some("us-ny"), 5, as_of()).unwrap();
        assert_eq!(result.record.brand_name, "Lipitor");
        assert_eq!(
            partners(&result.offers),
            vec!["CareKart", "Hudson Script", "CityCare Pharmacy"]
        );
        assert_eq!(result.offers[2].price, 10.8);
        assert!(result.offers.iter().all(|o| o.currency.code == "USD"));
    }

    #[test]
    fn unknown_locality_falls_back_to_online_partners() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        let result = g.offers_for("Atorvastatin", Some("zz-top"), 5, as_of()).unwrap();
        assert_eq!(partners(&result.offers), vec!["Wellbeing Online", "CareKart"]);
        assert!(result.offers.iter().all(|o| o.kind == ListingKind::Online));
    }

    #[test]
    fn no_locality_returns_every_listing_up_to_limit() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        assert_eq!(g.offers_for("lipitor", None, 10, as_of()).unwrap().offers.len(), 6);
        let limited = g.offers_for("lipitor", None, 2, as_of()).unwrap().offers;
        assert_eq!(partners(&limited), vec!["Wellbeing Online", "MediPlus Koramangala"]);
    }

    #[test]
    fn indian_locality_prices_in_rupees() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        let result = g.offers_for("lipitor", Some("in-ka"), 5, as_of()).unwrap();
        assert_eq!(result.offers.len(), 3);
        assert!(result.offers.iter().all(|o| o.currency.code == "INR"));
    }

    #[test]
    fn last_updated_steps_back_one_minute_per_km() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        let result = g.offers_for("lipitor", Some("us-ny"), 5, as_of()).unwrap();
        let stamps: Vec<&str> = result.offers.iter().map(|o| o.last_updated.as_str()).collect();
        // CareKart has no distance, Hudson is 5.6 km, CityCare 1.4 km
        assert_eq!(stamps, vec!["2024-01-01T12:00Z", "2024-01-01T11:54Z", "2024-01-01T11:58Z"]);
    }

    #[test]
    fn retail_without_distance_gets_stable_synthetic_distance() {
        let listing = PartnerListing {
            partner: "Corner Chemist".to_string(),
            kind: ListingKind::Retail,
            locality: "us-tx".to_string(),
            address: "Austin, TX".to_string(),
            distance_km: None,
            price_multiplier: 1.0,
            delivery: None,
            url: None,
        };
        let g = generator(StaticOfferSource::new(vec![listing]));
        let first = g.offers_for("lipitor", Some("us-tx"), 5, as_of()).unwrap().offers;
        let second = g.offers_for("lipitor", Some("us-tx"), 5, as_of()).unwrap().offers;
        let distance = first[0].distance_km.unwrap();
        assert!((0.5..=9.9).contains(&distance));
        assert_eq!(second[0].distance_km, Some(distance));
    }

    fn listing(partner: &str, distance_km: Option<f64>, price_multiplier: f64) -> PartnerListing {
        PartnerListing {
            partner: partner.to_string(),
            kind: ListingKind::Retail,
            locality: "us-ny".to_string(),
            address: "New York, NY".to_string(),
            distance_km,
            price_multiplier,
            delivery: None,
            url: None,
        }
    }

    #[test]
    fn invalid_feed_rows_are_dropped() {
        let source = StaticOfferSource::new(vec![
            listing("Far Away", Some(1e12), 1.0),
            listing("Negative", Some(1.0), -2.0),
            listing("Not A Number", Some(1.0), f64::NAN),
            listing("Behind You", Some(-3.0), 1.0),
            listing("Good Neighbour", Some(2.0), 1.1),
        ]);
        assert_eq!(source.len(), 2);

        let g = generator(source);
        let offers = g.offers_for("lipitor", Some("us-ny"), 5, as_of()).unwrap().offers;
        assert_eq!(partners(&offers), vec!["Far Away", "Good Neighbour"]);
        assert_eq!(offers[0].price, 10.0);
        assert_eq!(offers[0].last_updated, "2024-01-01T12:00Z");
        assert_eq!(offers[1].price, 11.0);
        assert!(offers.iter().all(|o| o.price > 0.0));
    }

    #[test]
    fn last_updated_saturates_instead_of_overflowing() {
        assert_eq!(last_updated(as_of(), Some(1e12)), "2024-01-01T12:00Z");
        assert_eq!(last_updated(as_of(), Some(f64::MAX)), "2024-01-01T12:00Z");
    }

    #[test]
    fn unknown_medicine_is_not_found() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        assert!(matches!(
            g.offers_for("unobtainium", None, 5, as_of()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn empty_source_yields_no_offers() {
        let g = generator(StaticOfferSource::default());
        let result = g.offers_for("freebie", Some("us-ny"), 5, as_of()).unwrap();
        assert!(result.offers.is_empty());
        let summary = summarize(&result.offers);
        assert_eq!(summary.count, 0);
        assert!(summary.min_price.is_none());
    }

    #[test]
    fn summary_reports_price_range() {
        let g = generator(StaticOfferSource::bundled().unwrap());
        let offers = g.offers_for("lipitor", None, 10, as_of()).unwrap().offers;
        let summary = summarize(&offers);
        assert_eq!(summary.count, 6);
        assert_eq!(summary.min_price, Some(8.2));
        assert_eq!(summary.max_price, Some(10.8));
    }
}
