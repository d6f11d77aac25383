//! HTTP surface: thin handlers over the storage and the poll queue.

use crate::{
    config::ApiConfig,
    models::{App, AppId, Review},
    polling::PollQueue,
    storage::StorageService,
    GatewayError, Result,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

const ROUTE_APPS: &str = "/apps";
const ROUTE_REVIEWS_BY_APP: &str = "/reviews/{app_id}";
const ROUTE_HEALTH: &str = "/health";

#[derive(Clone)]
pub struct ApiServer {
    config: ApiConfig,
    storage: Arc<StorageService>,
    queue: Arc<PollQueue>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetAppsResponse {
    pub items: Vec<App>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetReviewsResponse {
    pub items: Vec<Review>,
}

#[derive(Debug, Deserialize)]
pub struct GetReviewsQuery {
    pub updated_min: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiServer {
    pub fn new(config: ApiConfig, storage: Arc<StorageService>, queue: Arc<PollQueue>) -> Self {
        Self {
            config,
            storage,
            queue,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let app = self.build_router();

        let listener =
            tokio::net::TcpListener::bind(format!("{}:{}", self.config.host, self.config.port))
                .await
                .map_err(|e| GatewayError::Internal(e.into()))?;

        info!(
            "API server listening on {}:{}",
            self.config.host, self.config.port
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;

        Ok(())
    }

    pub fn build_router(&self) -> Router {
        let cors_layer = CorsLayer::new()
            .allow_origin(
                self.config
                    .cors_origins
                    .iter()
                    .filter_map(|origin| origin.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([axum::http::Method::GET])
            .allow_headers([axum::http::header::CONTENT_TYPE]);

        let routes = Router::new()
            .route(ROUTE_APPS, get(get_apps))
            .route(ROUTE_REVIEWS_BY_APP, get(get_reviews))
            .route(ROUTE_HEALTH, get(health))
            .with_state(self.clone());

        Router::new().nest(&self.config.prefix, routes).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
    }
}

/// Get current apps from the storage.
async fn get_apps(State(server): State<ApiServer>) -> Json<GetAppsResponse> {
    let items = server.storage.get_app_list().await;
    debug!("Got {} apps", items.len());
    Json(GetAppsResponse { items })
}

/// Get reviews for a given app id.
///
/// Known apps are served from the cache immediately; the push refreshes the
/// cache for later requests. An unknown app has nothing cached, so the
/// handler waits for its first poll to finish. Coalescing in the queue makes
/// simultaneous requests for one app cost a single upstream fetch.
async fn get_reviews(
    State(server): State<ApiServer>,
    Path(app_id): Path<AppId>,
    Query(query): Query<GetReviewsQuery>,
) -> std::result::Result<Json<GetReviewsResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!("Handle reviews request for app: {}", app_id);

    if server.storage.get_app(app_id).await.is_some() {
        debug!("Existing app is requested: {}", app_id);
        server.queue.push(app_id, false).await;
    } else {
        debug!("Unknown app is requested: {}; waiting for reviews", app_id);
        let task = server.queue.push(app_id, false).await;
        task.await_completion().await;

        // the worker normally creates the app; both paths are idempotent
        if server.storage.get_app(app_id).await.is_none() {
            server
                .storage
                .create_app(App { id: app_id })
                .await
                .map_err(internal_error)?;
        }
    }

    let items = server
        .storage
        .get_review_list(app_id, query.updated_min)
        .await;
    Ok(Json(GetReviewsResponse { items }))
}

async fn health() {}

fn internal_error(e: GatewayError) -> (StatusCode, Json<ErrorResponse>) {
    warn!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests;
