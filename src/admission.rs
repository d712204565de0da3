//! The fixed order every protected write goes through: rate limit on the
//! caller's key, then the size-bounded body read. The body is never
//! touched for a caller who is already over quota.

use axum::{body::Body, http::HeaderMap};
use serde::de::DeserializeOwned;

use crate::body_limit::{read_json_limited, read_optional_json_limited, read_text_limited};
use crate::config::RouteLimit;
use crate::error::{AdmissionError, AdmissionResult};
use crate::metrics::{LIMITER_KEYS, REQUESTS_ADMITTED};
use crate::rate_limit::{Decision, RateLimiterStore, RateRule};

pub fn enforce_rate_limit(
    limiter: &RateLimiterStore,
    key: &str,
    rule: RateRule,
) -> AdmissionResult<()> {
    let decision = limiter.check(key, rule);
    LIMITER_KEYS.set(limiter.len() as f64);
    match decision {
        Decision::Allowed => Ok(()),
        Decision::Limited { retry_after_secs } => {
            Err(AdmissionError::RateLimited { retry_after_secs })
        }
    }
}

pub async fn admit_json<T: DeserializeOwned>(
    limiter: &RateLimiterStore,
    key: &str,
    limit: RouteLimit,
    headers: &HeaderMap,
    body: Body,
) -> AdmissionResult<T> {
    enforce_rate_limit(limiter, key, limit.rate)?;
    let parsed = read_json_limited(headers, body, limit.max_body_bytes).await?;
    REQUESTS_ADMITTED.inc();
    Ok(parsed)
}

pub async fn admit_optional_json<T: DeserializeOwned + Default>(
    limiter: &RateLimiterStore,
    key: &str,
    limit: RouteLimit,
    headers: &HeaderMap,
    body: Body,
) -> AdmissionResult<T> {
    enforce_rate_limit(limiter, key, limit.rate)?;
    let parsed = read_optional_json_limited(headers, body, limit.max_body_bytes).await?;
    REQUESTS_ADMITTED.inc();
    Ok(parsed)
}

pub async fn admit_text(
    limiter: &RateLimiterStore,
    key: &str,
    limit: RouteLimit,
    headers: &HeaderMap,
    body: Body,
) -> AdmissionResult<String> {
    enforce_rate_limit(limiter, key, limit.rate)?;
    let text = read_text_limited(headers, body, limit.max_body_bytes).await?;
    REQUESTS_ADMITTED.inc();
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use serde_json::Value;

    #[tokio::test]
    async fn limited_caller_body_is_never_read() {
        let limiter = RateLimiterStore::new(100);
        let limit = RouteLimit::new(RateRule::per_hour(1), 1_024);

        let first: Value = admit_json(&limiter, "k", limit, &HeaderMap::new(), Body::from("{}"))
            .await
            .unwrap();
        assert_eq!(first, serde_json::json!({}));

        // a read here would surface as MalformedBody
        let poisoned = Body::from_stream(futures_util::stream::once(async {
            Err::<Bytes, _>(std::io::Error::other("body was read"))
        }));
        let err = admit_json::<Value>(&limiter, "k", limit, &HeaderMap::new(), poisoned)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::RateLimited { retry_after_secs } if retry_after_secs >= 1
        ));
    }

    #[tokio::test]
    async fn oversized_body_still_costs_a_slot() {
        let limiter = RateLimiterStore::new(100);
        let limit = RouteLimit::new(RateRule::per_minute(1), 4);

        let err = admit_text(&limiter, "k", limit, &HeaderMap::new(), Body::from("too long"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::PayloadTooLarge { .. }));

        let err = admit_text(&limiter, "k", limit, &HeaderMap::new(), Body::from("ok"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn optional_json_accepts_empty_body() {
        let limiter = RateLimiterStore::new(100);
        let limit = RouteLimit::new(RateRule::per_minute(5), 16);
        let value: Option<Value> =
            admit_optional_json(&limiter, "k", limit, &HeaderMap::new(), Body::empty())
                .await
                .unwrap();
        assert!(value.is_none());
    }
}
