use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;

use crate::admission::admit_json;
use crate::client_ip::{ClientIp, limit_key};
use crate::error::{AdmissionError, AdmissionResult};
use crate::metrics::HANDLER_LATENCY;
use crate::models::{Artifact, NewArtifact};
use crate::state::AppState;
use crate::store::make_artifact_id;

pub const NAMESPACE: &str = "artifacts:POST";

pub async fn create_artifact(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Body,
) -> AdmissionResult<(StatusCode, Json<Artifact>)> {
    // observed on drop, so rejections are timed too
    let _timer = HANDLER_LATENCY.start_timer();
    let key = limit_key(NAMESPACE, &ip);
    let new: NewArtifact =
        admit_json(&state.limiter, &key, state.config.limits.artifacts, &headers, body).await?;

    if new.name.trim().is_empty() {
        return Err(AdmissionError::MalformedBody("artifact name is required".to_string()));
    }

    let artifact = Artifact {
        id: make_artifact_id(&new.name, &new.content),
        name: new.name,
        content: new.content,
        tags: new.tags,
        created_at: chrono::Utc::now(),
    };
    state
        .content
        .artifacts
        .insert(artifact.id.clone(), artifact.clone());
    tracing::debug!(id = %artifact.id, %ip, "artifact stored");

    Ok((StatusCode::CREATED, Json(artifact)))
}
