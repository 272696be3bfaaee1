//! Client configuration (defaults + environment overrides).

use core::num::NonZeroUsize;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use invoiceflow_core::TenantId;
use invoiceflow_invoicing::DEFAULT_PAGE_SIZE;

use crate::session::Session;

pub const ENV_API_URL: &str = "INVOICEFLOW_API_URL";
pub const ENV_AUTH_TOKEN: &str = "INVOICEFLOW_AUTH_TOKEN";
pub const ENV_TENANT_ID: &str = "INVOICEFLOW_TENANT_ID";
pub const ENV_PAGE_SIZE: &str = "INVOICEFLOW_PAGE_SIZE";
pub const ENV_DISPATCH_POLICY: &str = "INVOICEFLOW_DISPATCH_POLICY";

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// What to do when an operation is dispatched while a previous dispatch of
/// the same kind is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// Let both run; whichever completes last decides the final state.
    #[default]
    Concurrent,
    /// Refuse the second dispatch until the first completes.
    SingleFlight,
}

impl FromStr for DispatchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concurrent" => Ok(DispatchPolicy::Concurrent),
            "single-flight" | "single_flight" => Ok(DispatchPolicy::SingleFlight),
            _ => Err(ConfigError::InvalidDispatchPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("INVOICEFLOW_PAGE_SIZE must be a positive integer, got {0:?}")]
    InvalidPageSize(String),

    #[error("INVOICEFLOW_DISPATCH_POLICY must be `concurrent` or `single-flight`, got {0:?}")]
    InvalidDispatchPolicy(String),

    #[error("INVOICEFLOW_TENANT_ID is not a valid tenant id: {0}")]
    InvalidTenantId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub page_size: NonZeroUsize,
    pub dispatch_policy: DispatchPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            tenant_id: None,
            page_size: DEFAULT_PAGE_SIZE,
            dispatch_policy: DispatchPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `INVOICEFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = present(ENV_API_URL) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }

        config.auth_token = present(ENV_AUTH_TOKEN);

        if let Some(raw) = present(ENV_TENANT_ID) {
            let tenant_id = raw
                .trim()
                .parse::<TenantId>()
                .map_err(|e| ConfigError::InvalidTenantId(e.to_string()))?;
            config.tenant_id = Some(tenant_id);
        }

        if let Some(raw) = present(ENV_PAGE_SIZE) {
            config.page_size = raw
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| ConfigError::InvalidPageSize(raw.clone()))?;
        }

        if let Some(raw) = present(ENV_DISPATCH_POLICY) {
            config.dispatch_policy = raw.parse()?;
        }

        Ok(config)
    }

    /// Session for the configured token; a fresh tenant id when none is set.
    pub fn session(&self) -> Session {
        let tenant_id = self.tenant_id.unwrap_or_default();
        match &self.auth_token {
            Some(token) => Session::with_token(tenant_id, token.clone()),
            None => Session::anonymous(tenant_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size.get(), 3);
        assert_eq!(config.dispatch_policy, DispatchPolicy::Concurrent);
        assert!(!config.session().is_authenticated());
    }

    #[test]
    fn environment_overrides_defaults() {
        let tenant = TenantId::new();
        let tenant_str = tenant.to_string();
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://billing.example.com/api/"),
            (ENV_AUTH_TOKEN, "abc"),
            (ENV_TENANT_ID, tenant_str.as_str()),
            (ENV_PAGE_SIZE, "10"),
            (ENV_DISPATCH_POLICY, "single-flight"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://billing.example.com/api");
        assert_eq!(config.page_size.get(), 10);
        assert_eq!(config.dispatch_policy, DispatchPolicy::SingleFlight);

        let session = config.session();
        assert_eq!(session.token(), Some("abc"));
        assert_eq!(session.tenant_id(), tenant);
    }

    #[test]
    fn zero_or_garbage_page_size_is_rejected() {
        for raw in ["0", "-1", "three"] {
            let err = ClientConfig::from_lookup(lookup(&[(ENV_PAGE_SIZE, raw)])).unwrap_err();
            assert_eq!(err, ConfigError::InvalidPageSize(raw.to_string()));
        }
    }

    #[test]
    fn unknown_dispatch_policy_is_rejected() {
        let err =
            ClientConfig::from_lookup(lookup(&[(ENV_DISPATCH_POLICY, "queue")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDispatchPolicy(_)));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_AUTH_TOKEN, "  ")])).unwrap();
        assert_eq!(config.auth_token, None);
    }
}
