/// MCP server for the medicine finder.
///
/// Exposes eight tools:
/// - `search_medicines`: Match a brand or generic name against the catalog
/// - `get_medicine`: Look up one medicine by brand name
/// - `calculate_savings`: Annual savings for two explicit prices
/// - `estimate_medicine_savings`: Therapy-length savings for a catalog medicine
/// - `find_offers`: Priced partner offers for a medicine and locality
/// - `find_pharmacies`: Nearby pharmacies from the directory
/// - `list_education_modules`: All condition modules in a language
/// - `get_education_content`: One module or guide
use std::sync::Arc;

use chrono::Utc;
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;
use medfinder_common::api::{
    CalculateSavingsParams, EducationContentResponse, EducationModulesResponse, EstimateSavingsParams,
    FindOffersParams, FindPharmaciesParams, GetEducationParams, GetMedicineParams,
    ListEducationParams, MedicineView, OffersResponse, PharmaciesResponse, SavingsEstimateResponse,
    SavingsResponse, SearchMedicinesParams, SearchMedicinesResponse,
};

#[derive(Clone)]
pub struct MedicineFinderServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<MedicineFinderServer>,
}

impl MedicineFinderServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

/// Tool errors are plain messages; only unexpected failures are logged.
fn tool_error(tool: &str, err: AppError) -> String {
    match err {
        AppError::InvalidInput(_) | AppError::NotFound(_) => err.to_string(),
        other => {
            warn!(tool, error = %other, "tool failed");
            format!("{tool} failed: {other}")
        }
    }
}

#[tool_router]
impl MedicineFinderServer {
    #[tool(description = "Search the medicine catalog by brand or generic name. Exact substring matches rank before close misspellings. Savings are adjusted for the optional locality (e.g. 'us-ny', 'in-ka').")]
    async fn search_medicines(
        &self,
        Parameters(params): Parameters<SearchMedicinesParams>,
    ) -> Result<Json<SearchMedicinesResponse>, String> {
        let response = self
            .state
            .search(&params)
            .map_err(|e| tool_error("search_medicines", e))?;
        info!(query = %params.query.trim(), results = response.count, "search_medicines");
        Ok(Json(response))
    }

    #[tool(description = "Get one medicine by its brand name (e.g. 'Lipitor'), with prices and savings for the optional locality.")]
    async fn get_medicine(
        &self,
        Parameters(params): Parameters<GetMedicineParams>,
    ) -> Result<Json<MedicineView>, String> {
        let brand_name = params.brand_name.trim();
        if brand_name.is_empty() {
            return Err("brand_name must not be empty".to_string());
        }
        self.state
            .medicine(brand_name, params.locality.as_deref())
            .map(Json)
            .map_err(|e| tool_error("get_medicine", e))
    }

    #[tool(description = "Compare yearly costs of a branded and a generic medicine from per-fill prices. prescriptions_per_year defaults to 12.")]
    async fn calculate_savings(
        &self,
        Parameters(params): Parameters<CalculateSavingsParams>,
    ) -> Result<Json<SavingsResponse>, String> {
        self.state
            .calculate_savings(&params)
            .map(Json)
            .map_err(|e| tool_error("calculate_savings", e))
    }

    #[tool(description = "Estimate savings from switching a catalog medicine to its generic over a number of months, at locality-adjusted prices.")]
    async fn estimate_medicine_savings(
        &self,
        Parameters(params): Parameters<EstimateSavingsParams>,
    ) -> Result<Json<SavingsEstimateResponse>, String> {
        self.state
            .estimate_savings(&params)
            .map(Json)
            .map_err(|e| tool_error("estimate_medicine_savings", e))
    }

    #[tool(description = "List pharmacy and online partner offers for a medicine's generic, cheapest first. Partners are chosen by locality; online partners are used when no local partner serves it.")]
    async fn find_offers(
        &self,
        Parameters(params): Parameters<FindOffersParams>,
    ) -> Result<Json<OffersResponse>, String> {
        self.state
            .offers(&params, Utc::now())
            .map(Json)
            .map_err(|e| tool_error("find_offers", e))
    }

    #[tool(description = "Find pharmacies near a ZIP code, city or address, nearest first. Optionally filter by pricing tier ('low', 'medium', 'high').")]
    async fn find_pharmacies(
        &self,
        Parameters(params): Parameters<FindPharmaciesParams>,
    ) -> Result<Json<PharmaciesResponse>, String> {
        self.state
            .pharmacies(&params)
            .map(Json)
            .map_err(|e| tool_error("find_pharmacies", e))
    }

    #[tool(description = "List the patient education modules (diabetes, hypertension, asthma) in the requested language.")]
    async fn list_education_modules(
        &self,
        Parameters(params): Parameters<ListEducationParams>,
    ) -> Result<Json<EducationModulesResponse>, String> {
        Ok(Json(self.state.education_modules(params.lang.as_deref())))
    }

    #[tool(description = "Get one education module by topic ('diabetes', 'hypertension', 'asthma') or a guide by slug ('generic-medicines', 'chronic-conditions').")]
    async fn get_education_content(
        &self,
        Parameters(params): Parameters<GetEducationParams>,
    ) -> Result<Json<EducationContentResponse>, String> {
        self.state
            .education_content(&params.topic, params.lang.as_deref())
            .map(Json)
            .map_err(|e| tool_error("get_education_content", e))
    }
}

#[tool_handler]
impl ServerHandler for MedicineFinderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "medicine-finder".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Generic medicine finder. Use search_medicines to match brand or generic \
                 names, calculate_savings or estimate_medicine_savings to compare costs, \
                 find_offers and find_pharmacies for where to buy, and the education tools \
                 for condition guides. Prices are estimates; always defer to a healthcare \
                 provider."
                    .to_string(),
            ),
        }
    }
}
