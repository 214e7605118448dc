//! Shared HTTP plumbing for the service clients
//!
//! Uses synchronous HTTP (ureq) so sync routines stay executor-agnostic.

use anyhow::{Context, Result};
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

use crate::error::SyncError;
use crate::models::Service;

/// Build an agent that hands back non-2xx responses instead of erroring,
/// so callers can read error bodies and classify them.
pub(crate) fn agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Resolve `path` against a service base URL
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let base = Url::parse(base).with_context(|| format!("Invalid base URL: {}", base))?;
    base.join(path)
        .with_context(|| format!("Invalid endpoint path: {}", path))
}

/// Whether a status means the credential was rejected
pub(crate) fn is_auth_failure(status: u16) -> bool {
    status == 401 || status == 403
}

/// Turn a non-2xx response into a [`SyncError`]
///
/// 401/403 map to `LoginRequired`; everything else to `Http`.
pub(crate) fn require_success(
    service: Service,
    what: &str,
    response: Response<Body>,
) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }
    if is_auth_failure(status) {
        return Err(SyncError::LoginRequired { service }.into());
    }
    Err(SyncError::Http {
        service,
        status,
        what: what.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_absolute_path() {
        let url = endpoint("https://decksofkeyforge.com", "/api/decks/abc/import-and-add").unwrap();
        assert_eq!(
            url.as_str(),
            "https://decksofkeyforge.com/api/decks/abc/import-and-add"
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(endpoint("nope", "/api").is_err());
    }

    #[test]
    fn test_auth_failure_statuses() {
        assert!(is_auth_failure(401));
        assert!(is_auth_failure(403));
        assert!(!is_auth_failure(404));
        assert!(!is_auth_failure(429));
    }
}
