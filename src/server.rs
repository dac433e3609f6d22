use crate::error::AppError;
use crate::parser::{parse_plan, DietPlan};
use crate::planner::{GeneratedPlan, Planner};
use crate::profile::{ProfileError, ProfileForm};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub planner: Planner,
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/generate-diet", post(handle_generate_diet))
        .route("/api/parse", post(handle_parse))
        .route("/api/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[instrument(skip_all)]
async fn handle_generate_diet(
    State(state): State<SharedState>,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<Json<GeneratedPlan>, AppError> {
    let Json(form) = payload.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(err) => ProfileError::Malformed(err.body_text()).into(),
        other => invalid_body(other),
    })?;
    let profile = form.validate()?;
    info!(goal = %profile.goal, identity = %profile.dietary_identity, "Diet plan request received");

    let generated = state.planner.generate(&profile).await?;
    Ok(Json(generated))
}

#[derive(Debug, Deserialize)]
struct ParseRequest {
    content: String,
}

#[instrument(skip_all)]
async fn handle_parse(
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<DietPlan>, AppError> {
    let Json(request) = payload.map_err(invalid_body)?;
    if request.content.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Missing required field: content".to_string(),
        ));
    }
    Ok(Json(parse_plan(&request.content)))
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::InvalidRequest(rejection.body_text())
}

async fn handle_health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.planner.model(),
    }))
}
