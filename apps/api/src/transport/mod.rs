#![allow(dead_code)]

//! Transport Resolver — the client-side trigger for server-side job
//! processing.
//!
//! Routing between the proxy and the direct processing endpoint is unreliable
//! across deployment environments, so triggering walks an ordered list of
//! (endpoint, method) tiers and stops at the first 2xx. This compensates for
//! infrastructure-level reachability, not for generation errors: on
//! exhaustion the job row is left untouched and the caller may retry.
//!
//! Consumed by clients of this API; the server never calls it on itself.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Acknowledgement returned by a processing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingAck {
    pub success: bool,
}

#[derive(Debug, Error)]
pub enum TierError {
    /// 401/403 — eligible for exactly one token-refresh retry on this tier.
    #[error("unauthorized")]
    Unauthorized,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("network: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
#[error("all {attempted} transport tiers exhausted")]
pub struct TransportExhausted {
    pub attempted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMethod {
    Post,
    Get,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOrigin {
    Proxy,
    Direct,
}

/// One (endpoint, method) combination the resolver may try.
#[derive(Debug, Clone, Copy)]
pub struct TransportTier {
    pub name: &'static str,
    pub origin: TierOrigin,
    pub path: &'static str,
    pub method: TierMethod,
}

/// Tiers in the order they are attempted. First success wins.
pub const PROCESSING_TIERS: [TransportTier; 4] = [
    TransportTier {
        name: "proxy-post",
        origin: TierOrigin::Proxy,
        path: "/api/v1/proxy-process-job",
        method: TierMethod::Post,
    },
    TransportTier {
        name: "proxy-get",
        origin: TierOrigin::Proxy,
        path: "/api/v1/proxy-process-job",
        method: TierMethod::Get,
    },
    TransportTier {
        name: "direct-post",
        origin: TierOrigin::Direct,
        path: "/api/v1/personalize-content/process",
        method: TierMethod::Post,
    },
    TransportTier {
        name: "direct-get",
        origin: TierOrigin::Direct,
        path: "/api/v1/personalize-content/process",
        method: TierMethod::Get,
    },
];

/// Issues a single request for one tier. The production implementation is
/// `HttpTierCaller`; tests script per-tier outcomes.
#[async_trait]
pub trait TierCaller: Send + Sync {
    async fn call(
        &self,
        tier: &TransportTier,
        job_id: Uuid,
        token: &str,
    ) -> Result<ProcessingAck, TierError>;
}

/// Supplies the bearer token, and optionally a fresh one after a 401.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> String;

    /// A freshly fetched token, or `None` when the session cannot refresh.
    async fn refresh(&self) -> Option<String>;
}

/// Walks the tiers in order and returns the first acknowledgement.
///
/// A tier that answers 401 gets exactly one same-tier retry with a refreshed
/// token before falling through. Exhaustion leaves the job untouched.
pub async fn trigger(
    caller: &dyn TierCaller,
    tokens: &dyn TokenSource,
    tiers: &[TransportTier],
    job_id: Uuid,
) -> Result<ProcessingAck, TransportExhausted> {
    let mut token = tokens.token().await;

    for tier in tiers {
        match caller.call(tier, job_id, &token).await {
            Ok(ack) => {
                info!(tier = tier.name, %job_id, "Processing trigger accepted");
                return Ok(ack);
            }
            Err(TierError::Unauthorized) => {
                warn!(tier = tier.name, %job_id, "Processing trigger rejected: unauthorized");
                if let Some(fresh) = tokens.refresh().await {
                    token = fresh;
                    match caller.call(tier, job_id, &token).await {
                        Ok(ack) => {
                            info!(tier = tier.name, %job_id,
                                "Processing trigger accepted after token refresh");
                            return Ok(ack);
                        }
                        Err(e) => {
                            warn!(tier = tier.name, %job_id,
                                "Retry with refreshed token failed: {e}");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(tier = tier.name, %job_id, "Processing trigger failed: {e}");
            }
        }
    }

    Err(TransportExhausted {
        attempted: tiers.len(),
    })
}

/// Base URLs for the two origins a tier can target.
#[derive(Debug, Clone)]
pub struct TransportEndpoints {
    pub proxy_base: String,
    pub api_base: String,
}

/// reqwest-backed tier caller. POST carries the job id and a cache-busting
/// timestamp in the body; GET carries them as query parameters with
/// no-cache headers.
pub struct HttpTierCaller {
    client: Client,
    endpoints: TransportEndpoints,
}

impl HttpTierCaller {
    pub fn new(endpoints: TransportEndpoints) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            endpoints,
        }
    }

    fn url_for(&self, tier: &TransportTier) -> String {
        let base = match tier.origin {
            TierOrigin::Proxy => &self.endpoints.proxy_base,
            TierOrigin::Direct => &self.endpoints.api_base,
        };
        format!("{}{}", base.trim_end_matches('/'), tier.path)
    }
}

#[async_trait]
impl TierCaller for HttpTierCaller {
    async fn call(
        &self,
        tier: &TransportTier,
        job_id: Uuid,
        token: &str,
    ) -> Result<ProcessingAck, TierError> {
        let url = self.url_for(tier);
        let ts = Utc::now().timestamp_millis();

        let request = match tier.method {
            TierMethod::Post => self
                .client
                .post(&url)
                .bearer_auth(token)
                .json(&json!({ "job_id": job_id, "ts": ts })),
            TierMethod::Get => self
                .client
                .get(&url)
                .bearer_auth(token)
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache")
                .query(&[("job_id", job_id.to_string()), ("ts", ts.to_string())]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| TierError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TierError::Unauthorized);
        }
        if !status.is_success() {
            return Err(TierError::Status(status.as_u16()));
        }

        response
            .json::<ProcessingAck>()
            .await
            .map_err(|e| TierError::Network(e.to_string()))
    }
}
