//! External generative oracles
//!
//! Naming, discovery and analysis are delegated to an asynchronous oracle
//! that may fail or stall. Every call goes through a wrapper here that bounds
//! it with a timeout and substitutes a deterministic fallback on failure, so
//! oracle trouble never blocks a state change.
//!
//! # Implementations
//!
//! - [`ClaudeOracle`] - Claude Messages API (feature `oracle`)
//! - [`OfflineOracle`] - always unavailable; every call falls back

pub mod fallback;
pub mod response;

#[cfg(feature = "oracle")]
mod client;

#[cfg(feature = "oracle")]
pub use client::ClaudeOracle;

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sky::body::{BodyProfile, CelestialBody};
use crate::util::vec2::Vec2;

/// Oracle failures. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle not configured")]
    NotConfigured,
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse oracle response: {0}")]
    Parse(String),
    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),
}

/// Generates constellation names, keyed only by cluster size
pub trait NamingOracle: Send + Sync {
    fn constellation_name(
        &self,
        cluster_size: usize,
    ) -> impl Future<Output = Result<String, OracleError>> + Send;
}

/// Generates body metadata and analysis text
pub trait DiscoveryOracle: Send + Sync {
    fn describe_body(
        &self,
        position: Vec2,
        existing_count: usize,
    ) -> impl Future<Output = Result<BodyProfile, OracleError>> + Send;

    fn analyze_body(
        &self,
        body: &CelestialBody,
    ) -> impl Future<Output = Result<String, OracleError>> + Send;
}

/// Oracle that is never available
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

impl NamingOracle for OfflineOracle {
    async fn constellation_name(&self, _cluster_size: usize) -> Result<String, OracleError> {
        Err(OracleError::NotConfigured)
    }
}

impl DiscoveryOracle for OfflineOracle {
    async fn describe_body(
        &self,
        _position: Vec2,
        _existing_count: usize,
    ) -> Result<BodyProfile, OracleError> {
        Err(OracleError::NotConfigured)
    }

    async fn analyze_body(&self, _body: &CelestialBody) -> Result<String, OracleError> {
        Err(OracleError::NotConfigured)
    }
}

/// Where a generated value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Oracle,
    Fallback,
}

impl Provenance {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Provenance::Fallback)
    }
}

/// Run an oracle call with a deadline
async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, OracleError>>,
) -> Result<T, OracleError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(timeout)),
    }
}

/// Constellation name from the oracle, or the deterministic fallback for
/// `sequence`. Blank oracle answers count as failures.
pub async fn constellation_name_or_fallback<N: NamingOracle>(
    namer: &N,
    cluster_size: usize,
    sequence: u64,
    timeout: Duration,
) -> (String, Provenance) {
    debug!("Requesting constellation name (size {})", cluster_size);

    match with_timeout(timeout, namer.constellation_name(cluster_size)).await {
        Ok(name) if !name.trim().is_empty() => (name.trim().to_string(), Provenance::Oracle),
        Ok(_) => {
            warn!("Naming oracle returned a blank name, using fallback");
            (fallback::constellation_name(sequence, cluster_size), Provenance::Fallback)
        }
        Err(e) => {
            warn!("Naming oracle failed: {}. Using fallback name", e);
            (fallback::constellation_name(sequence, cluster_size), Provenance::Fallback)
        }
    }
}

/// Body profile from the oracle, or a placeholder.
///
/// The placeholder is rolled before the call so the rng stream (and thus
/// every later scan position under a fixed seed) does not depend on whether
/// the oracle answered.
pub async fn describe_or_placeholder<D: DiscoveryOracle, R: Rng>(
    oracle: &D,
    position: Vec2,
    existing_count: usize,
    timeout: Duration,
    rng: &mut R,
) -> (BodyProfile, Provenance) {
    let placeholder = fallback::placeholder_profile(rng, existing_count);

    match with_timeout(timeout, oracle.describe_body(position, existing_count)).await {
        Ok(profile) => (profile, Provenance::Oracle),
        Err(e) => {
            warn!("Discovery oracle failed: {}. Using placeholder body", e);
            (placeholder, Provenance::Fallback)
        }
    }
}

/// Analysis text from the oracle, or the canned fallback
pub async fn analysis_or_fallback<D: DiscoveryOracle>(
    oracle: &D,
    body: &CelestialBody,
    timeout: Duration,
) -> (String, Provenance) {
    match with_timeout(timeout, oracle.analyze_body(body)).await {
        Ok(text) if !text.trim().is_empty() => (text, Provenance::Oracle),
        Ok(_) => (fallback::analysis_text(body), Provenance::Fallback),
        Err(e) => {
            warn!("Analysis oracle failed for {}: {}", body.name, e);
            (fallback::analysis_text(body), Provenance::Fallback)
        }
    }
}
