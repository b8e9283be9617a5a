//! Service configuration.
//!
//! Read from the environment (a `.env` file is loaded first when present).

use anyhow::{anyhow, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Runtime configuration. Not `Debug` so the service key never lands in logs.
#[derive(Clone)]
pub struct ServiceConfig {
    pub supabase_url: String,
    pub service_role_key: String,
    pub bind_addr: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let supabase_url = get("SUPABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("SUPABASE_URL not set"))?;
        let service_role_key = get("SUPABASE_SERVICE_ROLE_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("SUPABASE_SERVICE_ROLE_KEY not set"))?;
        let bind_addr = get("BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            supabase_url: supabase_url.trim().trim_end_matches('/').to_string(),
            service_role_key: service_role_key.trim().to_string(),
            bind_addr,
        })
    }
}
