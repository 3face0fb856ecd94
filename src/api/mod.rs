use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::VolumaticError;
use crate::analysis::AnalysisSnapshot;
use crate::dataset::{Suggestion, SuggestionKind};
use crate::models::{CityRecord, MatchStrategy, WaterStatus};
use crate::session::{ActionOutcome, GeolocationFix, Session};

#[derive(Serialize, Deserialize)]
pub struct ApiCity {
    pub id: String,
    pub name: String,
    pub name_urdu: String,
    pub status: WaterStatus,
}

impl From<&CityRecord> for ApiCity {
    fn from(city: &CityRecord) -> Self {
        Self {
            id: city.id.clone(),
            name: city.name.clone(),
            name_urdu: city.name_urdu.clone(),
            status: city.status,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ApiResolution {
    pub city: CityRecord,
    pub distance_km: f64,
    pub is_exact_match: bool,
    pub status_label: String,
    pub disclaimer: Option<String>,
    pub strategy: MatchStrategy,
    pub live_query: String,
    pub analysis_generation: u64,
    pub selected_city: Option<String>,
}

impl From<ActionOutcome> for ApiResolution {
    fn from(outcome: ActionOutcome) -> Self {
        let result = &outcome.resolution.result;
        Self {
            status_label: result.status_label().to_string(),
            disclaimer: result.disclaimer(),
            distance_km: result.distance_km,
            is_exact_match: result.is_exact_match,
            city: outcome.resolution.result.city,
            strategy: outcome.resolution.strategy,
            live_query: outcome.resolution.live_query,
            analysis_generation: outcome.analysis_generation,
            selected_city: outcome.selected_city,
        }
    }
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub name: String,
    #[serde(default)]
    pub parent_city: Option<String>,
}

impl From<SelectRequest> for Suggestion {
    fn from(request: SelectRequest) -> Self {
        let kind = if request.parent_city.is_some() {
            SuggestionKind::Area
        } else {
            SuggestionKind::City
        };
        Self {
            name: request.name,
            kind,
            parent_city: request.parent_city,
        }
    }
}

/// Either `{latitude, longitude}` or `{denied: true}`
#[derive(Deserialize)]
pub struct LocateRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub denied: bool,
}

impl TryFrom<LocateRequest> for GeolocationFix {
    type Error = VolumaticError;

    fn try_from(request: LocateRequest) -> Result<Self, Self::Error> {
        if request.denied {
            return Ok(GeolocationFix::Denied);
        }
        match (request.latitude, request.longitude) {
            (Some(latitude), Some(longitude)) => Ok(GeolocationFix::Coordinates {
                latitude,
                longitude,
            }),
            _ => Err(VolumaticError::validation(
                "Both latitude and longitude are required",
            )),
        }
    }
}

#[derive(Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Maps crate errors onto HTTP responses
pub struct ApiError(VolumaticError);

impl From<VolumaticError> for ApiError {
    fn from(error: VolumaticError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VolumaticError::Validation { .. } => StatusCode::BAD_REQUEST,
            VolumaticError::NotFound { .. } => StatusCode::NOT_FOUND,
            VolumaticError::GeolocationDenied { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            other => {
                error!(error = %other, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            message: self.0.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/cities", get(get_cities))
        .route("/suggestions", get(get_suggestions))
        .route("/search", post(search))
        .route("/select", post(select))
        .route("/locate", post(locate))
        .route("/analysis", get(get_analysis))
        .with_state(session)
}

async fn get_cities(State(session): State<Arc<Session>>) -> Json<Vec<ApiCity>> {
    Json(session.cities().iter().map(ApiCity::from).collect())
}

async fn get_suggestions(
    State(session): State<Arc<Session>>,
    Query(query): Query<SuggestionQuery>,
) -> Json<Vec<Suggestion>> {
    Json(session.suggest(&query.q))
}

async fn search(
    State(session): State<Arc<Session>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<ApiResolution>, ApiError> {
    let outcome = session.search(&request.query).await?;
    Ok(Json(outcome.into()))
}

async fn select(
    State(session): State<Arc<Session>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<ApiResolution>, ApiError> {
    let outcome = session.select_suggestion(&request.into())?;
    Ok(Json(outcome.into()))
}

async fn locate(
    State(session): State<Arc<Session>>,
    Json(request): Json<LocateRequest>,
) -> Result<Json<ApiResolution>, ApiError> {
    let outcome = session.locate(request.try_into()?)?;
    Ok(Json(outcome.into()))
}

async fn get_analysis(State(session): State<Arc<Session>>) -> Json<AnalysisSnapshot> {
    Json(session.analysis())
}
