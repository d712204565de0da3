use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// POST /api/artifacts
#[derive(Deserialize, Clone, Debug)]
pub struct NewArtifact {
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// POST /api/comments
#[derive(Deserialize, Clone, Debug)]
pub struct NewComment {
    pub skill: String,
    pub author: String,
    pub body: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub skill: String,
    pub author: String,
    pub body: String,
    pub upvotes: u64,
    pub created_at: DateTime<Utc>,
}

// POST /api/comments/{id}/upvote - body is optional
#[derive(Deserialize, Default, Clone, Debug)]
pub struct UpvoteRequest {
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct UpvoteResponse {
    pub comment_id: String,
    pub upvotes: u64,
}

// Only the fields we look at; the rest of the event stays in `raw`
#[derive(Deserialize, Clone, Debug)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Clone, Debug)]
pub struct WebhookEvent {
    pub event_type: String,
    pub raw: String,
    pub received_at: DateTime<Utc>,
}

// For a duplicate, `event_type` and `first_received_at` describe the first delivery
#[derive(Serialize, Clone, Debug)]
pub struct WebhookAck {
    pub received: bool,
    pub duplicate: bool,
    pub event_type: String,
    pub first_received_at: DateTime<Utc>,
}

// POST /api/views
#[derive(Deserialize, Clone, Debug)]
pub struct ViewEvent {
    pub slug: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct ViewCount {
    pub slug: String,
    pub views: u64,
}

// POST /api/subscriptions
#[derive(Deserialize, Clone, Debug)]
pub struct NewSubscription {
    pub email: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct Subscription {
    pub email: String,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}
