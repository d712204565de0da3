use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{Artifact, Comment, Subscription, WebhookEvent};

// In-memory stand-in for the content backend the write routes feed
#[derive(Default)]
pub struct ContentStore {
    pub artifacts: DashMap<String, Artifact>,
    pub comments: DashMap<String, Comment>,
    pub webhook_events: DashMap<String, WebhookEvent>,
    pub views: DashMap<String, u64>,
    pub subscriptions: DashMap<String, Subscription>,
    next_comment: AtomicU64,
}

impl ContentStore {
    pub fn next_comment_id(&self) -> String {
        let n = self.next_comment.fetch_add(1, Ordering::Relaxed) + 1;
        format!("c-{n}")
    }
}

// Artifact id (hash of name + content)
pub fn make_artifact_id(name: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name);
    // separator so ("ab", "c") and ("a", "bc") differ
    hasher.update([0u8]);
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
