use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::rate_limit::RateRule;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "admission-gate")]
#[command(about = "Write endpoints behind a fixed-window rate limiter and body-size guard")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Use X-Forwarded-For / X-Real-IP to identify clients.
    // Turn off when not running behind a trusted proxy.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub trust_forwarded: bool,

    // Limiter keys held before an opportunistic prune kicks in
    #[arg(long, default_value_t = 10_000)]
    pub prune_high_water: usize,

    // Background sweep interval in seconds (0 disables)
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // JSON file overriding per-route limits
    #[arg(long)]
    pub limits: Option<PathBuf>,
}

// Runtime settings that handlers need to see
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub trust_forwarded: bool,
    pub prune_high_water: usize,
    pub limits: Limits,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            trust_forwarded: true,
            prune_high_water: 10_000,
            limits: Limits::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read limits file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid limits file: {0}")]
    Parse(#[from] serde_json::Error),
}

// Rate rule plus body ceiling for one protected route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RouteLimit {
    pub rate: RateRule,
    pub max_body_bytes: usize,
}

impl RouteLimit {
    pub const fn new(rate: RateRule, max_body_bytes: usize) -> Self {
        Self {
            rate,
            max_body_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub artifacts: RouteLimit,
    pub comments: RouteLimit,
    pub comment_upvotes: RouteLimit,
    pub webhooks: RouteLimit,
    pub views: RouteLimit,
    pub subscriptions: RouteLimit,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            artifacts: RouteLimit::new(RateRule::per_minute(20), 512_000),
            comments: RouteLimit::new(RateRule::per_minute(10), 2_000),
            comment_upvotes: RouteLimit::new(RateRule::per_hour(1), 1_024),
            webhooks: RouteLimit::new(RateRule::per_minute(60), 600_000),
            views: RouteLimit::new(RateRule::per_minute(240), 1_024),
            subscriptions: RouteLimit::new(RateRule::per_hour(5), 2_000),
        }
    }
}

impl Limits {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        // zero windows or maxima fail inside RateRule's deserializer
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

impl Args {
    pub fn gate_config(&self) -> Result<GateConfig, ConfigError> {
        let limits = match &self.limits {
            Some(path) => Limits::load(path)?,
            None => Limits::default(),
        };
        Ok(GateConfig {
            trust_forwarded: self.trust_forwarded,
            prune_high_water: self.prune_high_water,
            limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_shapes() {
        let limits = Limits::default();
        assert_eq!(limits.artifacts.rate, RateRule::new(60_000, 20));
        assert_eq!(limits.comment_upvotes.rate, RateRule::new(3_600_000, 1));
        assert_eq!(limits.webhooks.rate.max(), 60);
        assert_eq!(limits.views.rate.max(), 240);
        assert_eq!(limits.comment_upvotes.max_body_bytes, 1_024);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let limits = Limits::from_json(
            r#"{"views": {"rate": {"window_ms": 1000, "max": 5}, "max_body_bytes": 256}}"#,
        )
        .unwrap();
        assert_eq!(limits.views, RouteLimit::new(RateRule::new(1_000, 5), 256));
        assert_eq!(limits.artifacts, Limits::default().artifacts);
    }

    #[test]
    fn zero_window_or_max_is_rejected() {
        let err = Limits::from_json(
            r#"{"comments": {"rate": {"window_ms": 0, "max": 5}, "max_body_bytes": 10}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("must both be positive"));
    }

    #[test]
    fn cli_defaults() {
        let args = Args::parse_from(["admission-gate"]);
        assert_eq!(args.port, 8080);
        assert!(args.trust_forwarded);
        let config = args.gate_config().unwrap();
        assert_eq!(config.limits, Limits::default());

        let args = Args::parse_from(["admission-gate", "--trust-forwarded", "false"]);
        assert!(!args.trust_forwarded);
    }
}
