use std::env;

/// Process-level configuration. Per-paste limits (max size, max expiration)
/// are admin-editable settings resolved from the database instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database URL (default: sqlite://data/pastebin.db?mode=rwc)
    pub database_url: String,

    /// Directory holding uploaded files (default: uploads)
    pub upload_dir: String,

    /// HS256 signing secret for session and download tokens
    pub jwt_secret: String,

    /// Session token lifetime in hours (default: 24)
    pub session_ttl_hours: i64,

    /// Download token lifetime in seconds (default: 300)
    pub download_token_ttl_secs: i64,

    /// Expiration sweep interval in seconds (default: 3600)
    pub sweep_interval_secs: u64,

    /// Hard cap on request bodies, above any paste size setting (default: 110 MB)
    pub max_request_body: usize,

    /// Failed password verifications allowed per client and paste per window
    pub verify_max_attempts: u32,

    /// Failed password verifications allowed per paste across all clients
    pub verify_max_attempts_per_paste: u32,

    /// Verification throttling window in seconds (default: 900)
    pub verify_window_secs: u64,

    /// Take the client address from `x-forwarded-for` / `x-real-ip`.
    /// Enable only behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,

    /// Allowed CORS origins; a single "*" allows any
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/pastebin.db?mode=rwc".to_string(),
            upload_dir: "uploads".to_string(),
            jwt_secret: "secret".to_string(),
            session_ttl_hours: 24,
            download_token_ttl_secs: 300,
            sweep_interval_secs: 3600,
            max_request_body: 110 * 1024 * 1024,
            verify_max_attempts: 10,
            verify_max_attempts_per_paste: 100,
            verify_window_secs: 900,
            trust_proxy_headers: false,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

fn parsed<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn origins(var: &impl Fn(&str) -> Option<String>, default: Vec<String>) -> Vec<String> {
    var("ALLOWED_ORIGINS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let default = Self::default();

        Self {
            database_url: var("DATABASE_URL").unwrap_or(default.database_url),
            upload_dir: var("UPLOAD_DIR").unwrap_or(default.upload_dir),
            jwt_secret: var("JWT_SECRET").unwrap_or(default.jwt_secret),
            session_ttl_hours: parsed(&var, "SESSION_TTL_HOURS", default.session_ttl_hours),
            download_token_ttl_secs: parsed(
                &var,
                "DOWNLOAD_TOKEN_TTL_SECS",
                default.download_token_ttl_secs,
            ),
            sweep_interval_secs: parsed(&var, "SWEEP_INTERVAL_SECS", default.sweep_interval_secs),
            max_request_body: parsed(&var, "MAX_REQUEST_BODY", default.max_request_body),
            verify_max_attempts: parsed(&var, "VERIFY_MAX_ATTEMPTS", default.verify_max_attempts),
            verify_max_attempts_per_paste: parsed(
                &var,
                "VERIFY_MAX_ATTEMPTS_PER_PASTE",
                default.verify_max_attempts_per_paste,
            ),
            verify_window_secs: parsed(&var, "VERIFY_WINDOW_SECS", default.verify_window_secs),
            trust_proxy_headers: parsed(&var, "TRUST_PROXY_HEADERS", default.trust_proxy_headers),
            allowed_origins: origins(&var, default.allowed_origins),
        }
    }

    /// Local development: frequent sweeps and any origin
    pub fn development() -> Self {
        Self {
            sweep_interval_secs: 60,
            allowed_origins: vec!["*".to_string()],
            ..Self::default()
        }
    }

    /// Production: a real JWT_SECRET is mandatory
    pub fn production() -> anyhow::Result<Self> {
        Self::production_from(|key| env::var(key).ok())
    }

    pub fn production_from(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if var("JWT_SECRET").is_none_or(|s| s.is_empty()) {
            anyhow::bail!("CRITICAL: JWT_SECRET must be set");
        }
        Ok(Self::from_vars(var))
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}
