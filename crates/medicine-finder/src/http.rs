/// REST surface for the browser client.
///
/// Every error body is `{"error": "..."}`. Invalid input maps to 400, unknown
/// resources to 404 and everything else to 500.
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::AppError;
use crate::state::AppState;
use medfinder_common::api::{
    CalculateSavingsParams, CatalogStats, EducationContentResponse, EducationModulesResponse,
    EstimateSavingsParams, FindOffersParams, FindPharmaciesParams, HealthResponse, LanguageInfo,
    LocalityInfo, MedicineView, OffersResponse, PharmaciesResponse, PharmacyDetail,
    SavingsEstimateResponse, SavingsResponse, SearchMedicinesParams, SearchMedicinesResponse,
    TranslationsResponse,
};

pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            other => {
                error!(error = %other, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
struct MedicinesQuery {
    q: Option<String>,
    locality: Option<String>,
    lang: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LocalityQuery {
    locality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OffersQuery {
    medicine: Option<String>,
    locality: Option<String>,
    lang: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PharmaciesQuery {
    location: Option<String>,
    radius: Option<f64>,
    limit: Option<u32>,
    pricing: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(stats))
        .route("/api/localities", get(localities))
        .route("/api/medicines", get(search_medicines))
        .route("/api/medicines/{brand_name}", get(get_medicine))
        .route("/api/calculate-savings", post(calculate_savings))
        .route("/api/savings/estimate", post(estimate_savings))
        .route("/api/offers", get(find_offers))
        .route("/api/pharmacies", get(find_pharmacies))
        .route("/api/pharmacies/{name}", get(get_pharmacy))
        .route("/api/education", get(list_education))
        .route("/api/education/{topic}", get(get_education))
        .route("/api/i18n", get(translations))
        .route("/api/languages", get(languages))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(state.health())
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<CatalogStats> {
    Json(state.stats())
}

async fn localities(State(state): State<Arc<AppState>>) -> Json<Vec<LocalityInfo>> {
    Json(state.localities())
}

async fn search_medicines(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MedicinesQuery>, QueryRejection>,
) -> ApiResult<SearchMedicinesResponse> {
    let Query(query) = query?;
    let params = SearchMedicinesParams {
        query: query.q.unwrap_or_default(),
        locality: query.locality,
        lang: query.lang,
        limit: query.limit,
    };
    Ok(Json(state.search(&params)?))
}

async fn get_medicine(
    State(state): State<Arc<AppState>>,
    Path(brand_name): Path<String>,
    query: Result<Query<LocalityQuery>, QueryRejection>,
) -> ApiResult<MedicineView> {
    let Query(query) = query?;
    Ok(Json(state.medicine(&brand_name, query.locality.as_deref())?))
}

async fn calculate_savings(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CalculateSavingsParams>, JsonRejection>,
) -> ApiResult<SavingsResponse> {
    let Json(params) = body?;
    Ok(Json(state.calculate_savings(&params)?))
}

async fn estimate_savings(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EstimateSavingsParams>, JsonRejection>,
) -> ApiResult<SavingsEstimateResponse> {
    let Json(params) = body?;
    Ok(Json(state.estimate_savings(&params)?))
}

async fn find_offers(
    State(state): State<Arc<AppState>>,
    query: Result<Query<OffersQuery>, QueryRejection>,
) -> ApiResult<OffersResponse> {
    let Query(query) = query?;
    let params = FindOffersParams {
        medicine: query.medicine.unwrap_or_default(),
        locality: query.locality,
        lang: query.lang,
        limit: query.limit,
    };
    Ok(Json(state.offers(&params, Utc::now())?))
}

async fn find_pharmacies(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PharmaciesQuery>, QueryRejection>,
) -> ApiResult<PharmaciesResponse> {
    let Query(query) = query?;
    let params = FindPharmaciesParams {
        location: query.location.unwrap_or_default(),
        radius_miles: query.radius,
        limit: query.limit,
        pricing: query.pricing,
    };
    Ok(Json(state.pharmacies(&params)?))
}

async fn get_pharmacy(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<PharmacyDetail> {
    Ok(Json(state.pharmacy(&name)?))
}

async fn list_education(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LangQuery>,
) -> Json<EducationModulesResponse> {
    Json(state.education_modules(query.lang.as_deref()))
}

async fn get_education(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(query): Query<LangQuery>,
) -> ApiResult<EducationContentResponse> {
    Ok(Json(state.education_content(&topic, query.lang.as_deref())?))
}

async fn translations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LangQuery>,
) -> Json<TranslationsResponse> {
    Json(state.translations(query.lang.as_deref()))
}

async fn languages(State(state): State<Arc<AppState>>) -> Json<Vec<LanguageInfo>> {
    Json(state.languages())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::state::tests::bundled_state;

    fn app() -> Router {
        router(Arc::new(bundled_state()))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(uri: &str, body: &str) -> (StatusCode, Value) {
        send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    #[tokio::test]
    async fn health_reports_catalog_version() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["catalog_version"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn localities_carry_currency() {
        let (status, body) = get_json("/api/localities").await;
        assert_eq!(status, StatusCode::OK);
        let karnataka = body
            .as_array()
            .unwrap()
            .iter()
            .find(|l| l["key"] == "in-ka")
            .unwrap();
        assert_eq!(karnataka["currency"]["code"], "INR");
        assert_eq!(karnataka["multiplier"], 0.42);
    }

    #[tokio::test]
    async fn search_finds_lipitor() {
        let (status, body) = get_json("/api/medicines?q=lipitor").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["results"][0]["brand_name"], "Lipitor");
        assert_eq!(body["results"][0]["savings"], 177.5);
        assert_eq!(body["results"][0]["match_kind"], "exact");
    }

    #[tokio::test]
    async fn short_query_is_bad_request() {
        let (status, body) = get_json("/api/medicines?q=a").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("at least 2"));

        let (status, _) = get_json("/api/medicines").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_limit_is_json_bad_request() {
        let (status, body) = get_json("/api/medicines?q=lipitor&limit=many").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn medicine_detail_and_not_found() {
        let (status, body) = get_json("/api/medicines/Lipitor?locality=us-ny").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locality_multiplier"], 1.18);

        let (status, body) = get_json("/api/medicines/Unobtainium").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn calculate_savings_rounds_for_display() {
        let (status, body) = post_json(
            "/api/calculate-savings",
            r#"{"brand_price": 190.0, "generic_price": 12.5, "prescriptions_per_year": 12}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["annual_savings"], 2130.0);
        assert_eq!(body["percentage_saved"], 93.42);
    }

    #[tokio::test]
    async fn calculate_savings_rejects_bad_bodies() {
        let (status, _) = post_json("/api/calculate-savings", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            "/api/calculate-savings",
            r#"{"brand_price": -5, "generic_price": 1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json("/api/calculate-savings", r#"{"generic_price": 1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn estimate_endpoint_uses_catalog() {
        let (status, body) = post_json(
            "/api/savings/estimate",
            r#"{"medicine": "Lipitor", "months": 6, "monthly_quantity": 1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_savings"], 1065.0);

        let (status, _) = post_json("/api/savings/estimate", r#"{"medicine": "Unobtainium"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn offers_are_sorted_with_summary() {
        let (status, body) = get_json("/api/offers?medicine=Lipitor&locality=in-ka").await;
        assert_eq!(status, StatusCode::OK);
        let offers = body["offers"].as_array().unwrap();
        assert_eq!(offers.len(), 3);
        assert_eq!(offers[0]["currency"]["code"], "INR");
        assert_eq!(body["summary"]["count"], 3);
        assert_eq!(body["summary"]["min_price"], offers[0]["price"]);

        let (status, _) = get_json("/api/offers?medicine=Unobtainium").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pharmacy_routes() {
        let (status, body) = get_json("/api/pharmacies?location=10001&pricing=low").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (status, _) = get_json("/api/pharmacies").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json("/api/pharmacies/Walgreens").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pricing_tier"], "medium");

        let (status, _) = get_json("/api/pharmacies/Nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn education_routes_fall_back_to_english() {
        let (status, body) = get_json("/api/education?lang=fr").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "en");
        assert_eq!(body["modules"].as_array().unwrap().len(), 3);

        let (status, body) = get_json("/api/education/asthma?lang=es-MX").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "module");
        assert_eq!(body["module"]["language"], "es");

        let (status, _) = get_json("/api/education/nonexistent-topic").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn translation_routes() {
        let (status, body) = get_json("/api/i18n?lang=hi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["metadata"]["language"], "hi");
        assert!(body["strings"]["advice"].is_string());

        let (status, body) = get_json("/api/languages").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }
}
