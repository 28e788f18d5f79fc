use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::Error as CommonError;
use engine::{HashRateOverride, Ranking};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::service::{ProfitService, RefreshReport};

pub type SharedService = Arc<RwLock<ProfitService>>;

// Create a wrapper for our common::Error type
pub struct ApiError(CommonError);

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        ApiError(err)
    }
}

// Convert our API error wrapper to an Axum response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            CommonError::ProviderUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            CommonError::HttpError(e) => (
                StatusCode::BAD_GATEWAY,
                format!("External API request failed: {}", e),
            ),
            CommonError::ParseError(msg) => (StatusCode::BAD_REQUEST, msg),
            CommonError::InvalidPriceData(msg) | CommonError::InvalidNetworkData(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            CommonError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            CommonError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// What-if parameters: both or neither
#[derive(Debug, Default, Deserialize)]
pub struct RankQuery {
    pub algorithm: Option<String>,
    /// Mh/s
    pub hashrate: Option<f64>,
}

impl RankQuery {
    fn overrides(self) -> Result<Vec<HashRateOverride>, CommonError> {
        match (self.algorithm, self.hashrate) {
            (Some(algorithm), Some(hash_rate)) => Ok(vec![HashRateOverride { algorithm, hash_rate }]),
            (None, None) => Ok(Vec::new()),
            _ => Err(CommonError::ParseError(
                "algorithm and hashrate must be given together".to_string(),
            )),
        }
    }
}

// Fetch all sources and replace the snapshot
pub async fn refresh(State(service): State<SharedService>) -> Result<Json<RefreshReport>, ApiError> {
    let refreshed = service.read().await.refresh().await?;
    let report = service.write().await.install(refreshed);
    Ok(Json(report))
}

// Report of the refresh behind the current snapshot
pub async fn last_refresh(State(service): State<SharedService>) -> Result<Json<RefreshReport>, ApiError> {
    let service = service.read().await;
    let report = service
        .last_report()
        .cloned()
        .ok_or_else(|| CommonError::NotFound("No refresh has completed yet".to_string()))?;
    Ok(Json(report))
}

// Rank every coin of interest
pub async fn list_coins(
    State(service): State<SharedService>,
    Query(query): Query<RankQuery>,
) -> Result<Json<Ranking>, ApiError> {
    let overrides = query.overrides()?;
    let service = service.read().await;
    let ranking = service.rank(overrides).await?;
    debug!("Returning {} ranked coins", ranking.len());
    Ok(Json(ranking))
}

// Ranked entries for one tag
pub async fn get_coin(
    State(service): State<SharedService>,
    Path(tag): Path<String>,
    Query(query): Query<RankQuery>,
) -> Result<Json<Ranking>, ApiError> {
    let overrides = query.overrides()?;
    let service = service.read().await;
    let ranking = service.rank_tag(&tag, overrides).await?;
    Ok(Json(ranking))
}
