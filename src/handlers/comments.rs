use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;

use crate::admission::{admit_json, admit_optional_json};
use crate::client_ip::{ClientIp, limit_key, resource_key};
use crate::error::{AdmissionError, AdmissionResult};
use crate::metrics::HANDLER_LATENCY;
use crate::models::{Comment, NewComment, UpvoteRequest, UpvoteResponse};
use crate::state::AppState;

pub const NAMESPACE: &str = "comments:POST";
pub const UPVOTE_NAMESPACE: &str = "comments:upvote";

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Body,
) -> AdmissionResult<(StatusCode, Json<Comment>)> {
    let _timer = HANDLER_LATENCY.start_timer();
    let key = limit_key(NAMESPACE, &ip);
    let new: NewComment =
        admit_json(&state.limiter, &key, state.config.limits.comments, &headers, body).await?;

    if new.body.trim().is_empty() {
        return Err(AdmissionError::MalformedBody("comment body is required".to_string()));
    }

    let comment = Comment {
        id: state.content.next_comment_id(),
        skill: new.skill,
        author: new.author,
        body: new.body,
        upvotes: 0,
        created_at: chrono::Utc::now(),
    };
    state
        .content
        .comments
        .insert(comment.id.clone(), comment.clone());
    tracing::debug!(id = %comment.id, %ip, "comment stored");

    Ok((StatusCode::CREATED, Json(comment)))
}

// One upvote per comment per client per window: the key carries both
// the client and the comment.
pub async fn upvote_comment(
    State(state): State<Arc<AppState>>,
    Path(comment_id): Path<String>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Body,
) -> AdmissionResult<Json<UpvoteResponse>> {
    let _timer = HANDLER_LATENCY.start_timer();
    let key = resource_key(UPVOTE_NAMESPACE, &ip, &comment_id);
    let vote: UpvoteRequest = admit_optional_json(
        &state.limiter,
        &key,
        state.config.limits.comment_upvotes,
        &headers,
        body,
    )
    .await?;

    let mut comment = state
        .content
        .comments
        .get_mut(&comment_id)
        .ok_or_else(|| AdmissionError::NotFound(format!("comment {comment_id}")))?;
    comment.upvotes += 1;
    let upvotes = comment.upvotes;
    drop(comment);
    tracing::debug!(%comment_id, %ip, source = ?vote.source, "comment upvoted");

    Ok(Json(UpvoteResponse {
        comment_id,
        upvotes,
    }))
}
