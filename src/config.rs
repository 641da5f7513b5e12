use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::guard::FailurePolicy;
use crate::portal::{LandingPreference, PortalPolicy, PortalType};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    // counters live in this process
    Memory,
    // counters live in an external counter service
    Remote,
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "portal-guard")]
#[command(about = "Login rate limiting and portal access resolution for the customer/team portal")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORTAL_GUARD_PORT", default_value_t = 8080)]
    pub port: u16,

    // Max login attempts per client per window
    #[arg(long, env = "PORTAL_GUARD_LOGIN_LIMIT", default_value_t = 5)]
    pub login_limit: u32,

    // Login window in seconds
    #[arg(long, env = "PORTAL_GUARD_LOGIN_WINDOW", default_value_t = 60)]
    pub login_window: u64,

    // Where rate limit counters are kept
    #[arg(long, env = "PORTAL_GUARD_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    // Base url of the counter service (required with --store remote)
    // Example: "ratelimit.internal:7000"
    #[arg(long, env = "PORTAL_GUARD_STORE_URL")]
    pub store_url: Option<String>,

    // Max time to wait on the store, in milliseconds
    #[arg(long, env = "PORTAL_GUARD_STORE_TIMEOUT_MS", default_value_t = 500)]
    pub store_timeout_ms: u64,

    // What to do with login attempts when the store is down
    #[arg(long, env = "PORTAL_GUARD_FAILURE_POLICY", value_enum, default_value_t = FailurePolicy::Open)]
    pub failure_policy: FailurePolicy,

    // Expired record sweep interval in seconds (memory store)
    #[arg(long, env = "PORTAL_GUARD_SWEEP_INTERVAL", default_value_t = 30)]
    pub sweep_interval: u64,

    // Only enable behind a reverse proxy that overwrites X-Forwarded-For / X-Real-IP
    #[arg(long, env = "PORTAL_GUARD_TRUST_PROXY_HEADERS", default_value_t = false)]
    pub trust_proxy_headers: bool,

    // Portal granted to identities without access rows
    #[arg(long, env = "PORTAL_GUARD_DEFAULT_PORTAL", value_enum, default_value_t = PortalType::Client)]
    pub default_portal: PortalType,

    // Landing portal for identities with both portals
    #[arg(long, env = "PORTAL_GUARD_LANDING", value_enum, default_value_t = LandingPreference::ClientFirst)]
    pub landing: LandingPreference,
}

impl Args {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.login_limit == 0 {
            anyhow::bail!("--login-limit must be at least 1");
        }
        if self.login_window == 0 {
            anyhow::bail!("--login-window must be at least 1 second");
        }
        if self.store == StoreKind::Remote && self.store_url.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("--store remote requires --store-url (or PORTAL_GUARD_STORE_URL)");
        }
        Ok(())
    }

    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.login_window)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn portal_policy(&self) -> PortalPolicy {
        PortalPolicy {
            default_portal_when_unset: self.default_portal,
            landing: self.landing,
        }
    }
}
