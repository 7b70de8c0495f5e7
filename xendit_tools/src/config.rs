use cpg_common::Secret;
use log::*;

#[derive(Debug, Clone, Default)]
pub struct XenditConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// How long a hosted invoice stays payable, in seconds.
    pub invoice_duration_secs: u64,
}

impl XenditConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("XENDIT_BASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ XENDIT_BASE_URL not set, using https://api.xendit.co as default");
            "https://api.xendit.co".to_string()
        });
        let secret_key = Secret::new(std::env::var("XENDIT_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ XENDIT_SECRET_KEY not set, using (probably useless) default");
            "xnd_development_00000000000000".to_string()
        }));
        let invoice_duration_secs = std::env::var("XENDIT_INVOICE_DURATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);
        Self { base_url, secret_key, invoice_duration_secs }
    }
}
