use std::env;

use chrono::Duration;
use cpg_common::Secret;
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use xendit_tools::XenditConfig as XenditApiConfig;

const DEFAULT_CPG_HOST: &str = "127.0.0.1";
const DEFAULT_CPG_PORT: u16 = 4000;
const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public base URL of this deployment, used to build the payer redirect URLs that the provider sends the
    /// shopper back to after the hosted invoice closes.
    pub base_url: String,
    pub auth: AuthConfig,
    /// The static token the provider attaches to every webhook delivery in the `x-callback-token` header.
    pub callback_token: Secret<String>,
    /// Deployment-specific additions to the provider status vocabulary, in `STATUS=Canonical,...` form.
    pub status_map_overrides: Option<String>,
    pub xendit: XenditApiConfig,
    pub notifier: NotifierConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CPG_HOST.to_string(),
            port: DEFAULT_CPG_PORT,
            database_url: String::default(),
            base_url: format!("http://{DEFAULT_CPG_HOST}:{DEFAULT_CPG_PORT}"),
            auth: AuthConfig::default(),
            callback_token: Secret::default(),
            status_map_overrides: None,
            xendit: XenditApiConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CPG_HOST").ok().unwrap_or_else(|| DEFAULT_CPG_HOST.into());
        let port = env::var("CPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CPG_PORT. {e} Using the default, {DEFAULT_CPG_PORT}, instead."
                    );
                    DEFAULT_CPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CPG_PORT);
        let database_url = env::var("CPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CPG_DATABASE_URL is not set. Please set it to the URL for the gateway database.");
            String::default()
        });
        let base_url = env::var("CPG_BASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CPG_BASE_URL is not set. Redirect URLs will point at http://{host}:{port}.");
            format!("http://{host}:{port}")
        });
        let callback_token = Secret::new(env::var("XENDIT_CALLBACK_TOKEN").unwrap_or_else(|_| {
            warn!(
                "🪛️ XENDIT_CALLBACK_TOKEN is not set. A random token has been generated; every webhook delivery \
                 will be rejected until the provider and server agree on one."
            );
            random_token()
        }));
        let status_map_overrides = env::var("CPG_STATUS_MAP").ok();
        let auth = AuthConfig::from_env_or_default();
        let xendit = XenditApiConfig::new_from_env_or_default();
        let notifier = NotifierConfig::from_env_or_default();
        Self { host, port, database_url, base_url, auth, callback_token, status_map_overrides, xendit, notifier }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 signing secret for access tokens.
    pub jwt_secret: Secret<String>,
    /// The long-lived API key an operator exchanges for a short-lived access token at `/auth`.
    pub api_key: Secret<String>,
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Secret::default(),
            api_key: Secret::default(),
            token_lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
        }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        let jwt_secret = Secret::new(env::var("CPG_JWT_SECRET").unwrap_or_else(|_| {
            warn!(
                "🪛️ CPG_JWT_SECRET is not set. A random signing secret has been generated; access tokens will not \
                 survive a restart."
            );
            random_token()
        }));
        let api_key = Secret::new(env::var("CPG_ADMIN_API_KEY").unwrap_or_else(|_| {
            warn!(
                "🪛️ CPG_ADMIN_API_KEY is not set. A random key has been generated, so the admin endpoints are \
                 effectively disabled for this run."
            );
            random_token()
        }));
        let token_lifetime = env::var("CPG_TOKEN_LIFETIME_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(Duration::hours)
            .unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));
        Self { jwt_secret, api_key, token_lifetime }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NotifierConfig {
    /// The Fonnte API token for outbound WhatsApp messages. Notifications are disabled when unset.
    pub fonnte_token: Option<Secret<String>>,
    /// The WhatsApp number that receives the "order paid" message.
    pub operator_phone: Option<String>,
}

impl NotifierConfig {
    pub fn from_env_or_default() -> Self {
        let fonnte_token = env::var("FONNTE_TOKEN").ok().map(Secret::new);
        let operator_phone = env::var("CPG_OPERATOR_PHONE").ok();
        if fonnte_token.is_none() || operator_phone.is_none() {
            info!("🪛️ FONNTE_TOKEN and/or CPG_OPERATOR_PHONE not set. Paid-order notifications are disabled.");
        }
        Self { fonnte_token, operator_phone }
    }

    pub fn is_enabled(&self) -> bool {
        self.fonnte_token.is_some() && self.operator_phone.is_some()
    }
}

fn random_token() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}
