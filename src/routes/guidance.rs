use axum::{Json, extract::State};

use crate::{
    error::AppError,
    routes::AppJson,
    message::{SymptomGuidanceRequest, SymptomGuidanceResponse},
    services::guidance::get_specialty_guidance,
    state::SharedState,
};

pub async fn guidance_handler(
    State(state): State<SharedState>,
    AppJson(payload): AppJson<SymptomGuidanceRequest>,
) -> Result<Json<SymptomGuidanceResponse>, AppError> {
    let result = get_specialty_guidance(state.model.as_ref(), &payload).await;
    state.metrics.record_guidance(&result).await;
    Ok(Json(result?))
}
