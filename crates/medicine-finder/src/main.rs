mod catalog;
mod config;
mod education;
mod error;
mod http;
mod i18n;
mod locality;
mod model;
mod offers;
mod pharmacies;
mod savings;
mod search;
mod server;
mod state;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalog::Catalog;
use config::{Config, Transport};
use i18n::Translations;
use locality::LocalityTable;
use medfinder_common::partner_feed::{PartnerFeedClient, PartnerFeedConfig};
use offers::StaticOfferSource;
use pharmacies::PharmacyDirectory;
use server::MedicineFinderServer;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries MCP JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting medicine-finder");

    let config = Config::from_env()?;
    info!(
        transport = ?config.transport,
        catalog = ?config.catalog_path,
        localities = ?config.localities_path,
        partner_feeds = config.partner_feed_urls.len(),
        "configuration loaded"
    );

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::bundled()?,
    };
    info!(
        medicines = catalog.len(),
        version = %catalog.fingerprint(),
        "catalog loaded"
    );
    if catalog.is_empty() {
        warn!("catalog is empty, searches will return no results");
    }

    let localities = match &config.localities_path {
        Some(path) => LocalityTable::load(path)?,
        None => LocalityTable::bundled()?,
    };
    info!(localities = localities.known().len(), "locality table loaded");

    let translations = Translations::bundled()?;
    let pharmacies = PharmacyDirectory::bundled()?;
    let offer_source = load_offer_source(&config).await?;
    info!(
        languages = translations.supported().len(),
        pharmacies = pharmacies.len(),
        partner_listings = offer_source.len(),
        "reference data loaded"
    );

    let state = Arc::new(AppState::new(
        &config,
        catalog,
        localities,
        translations,
        Arc::new(offer_source),
        pharmacies,
    ));

    match config.transport {
        Transport::Http => {
            http::serve(&config.http_addr, state).await?;
        }
        Transport::Stdio => {
            info!("MCP server ready, serving on stdio");
            let service = MedicineFinderServer::new(state)
                .serve(stdio())
                .await
                .inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
            service.waiting().await?;
        }
    }

    info!("medicine-finder shut down");
    Ok(())
}

/// Partner listings from the configured feeds, or the bundled set when no feed is
/// configured or none of them returned anything.
async fn load_offer_source(config: &Config) -> anyhow::Result<StaticOfferSource> {
    if config.partner_feed_urls.is_empty() {
        return Ok(StaticOfferSource::bundled()?);
    }

    let client = PartnerFeedClient::new(PartnerFeedConfig::from_env())?;
    let listings = client.fetch_all(&config.partner_feed_urls).await;
    if listings.is_empty() {
        warn!("partner feeds returned no listings, using bundled listings");
        return Ok(StaticOfferSource::bundled()?);
    }

    info!(listings = listings.len(), "partner feeds fetched");
    Ok(StaticOfferSource::new(listings))
}
