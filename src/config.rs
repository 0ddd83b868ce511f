use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// CRM inbound-webhook URL for lead creation. Empty = demo mode.
    pub crm_webhook_url: String,
    /// Optional path to a JSON catalog file; the built-in salon fixture is
    /// used when unset.
    pub catalog_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            crm_webhook_url: env::var("CRM_WEBHOOK_URL").unwrap_or_default(),
            catalog_path: env::var("CATALOG_PATH").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.crm_webhook_url.is_empty()
    }
}
