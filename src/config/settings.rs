//! Runtime settings: per-mode defaults overridden from the environment (`.env` is loaded first).

use crate::error::ConfigError;
use axum::http::Method;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Development,
    Production,
    Test,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            "test" => Ok(Mode::Test),
            other => Err(ConfigError::Validation(format!("unknown APP_MODE '{}'", other))),
        }
    }
}

/// Knobs that shape the generated API and its documentation.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
    pub methods: Vec<Method>,
    pub allow_functions: bool,
    pub allow_patch_many: bool,
    pub results_per_page: u32,
    pub max_results_per_page: u32,
    /// Prepended to every table path; empty or starting with `/`.
    pub url_prefix: String,
    /// Mount point of `swagger.json`.
    pub swagger_url: String,
    pub exclude_columns: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            methods: vec![Method::GET, Method::POST, Method::DELETE, Method::PATCH, Method::PUT],
            allow_functions: true,
            allow_patch_many: true,
            results_per_page: 32,
            max_results_per_page: 1024,
            url_prefix: String::new(),
            swagger_url: String::new(),
            exclude_columns: vec!["utc_created".into(), "utc_updated".into()],
        }
    }
}

impl ApiConfig {
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Requested page size, falling back to the default and capped at the maximum. Never 0.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.results_per_page)
            .min(self.max_results_per_page)
            .max(1)
    }

    pub fn swagger_json_path(&self) -> String {
        format!("{}/swagger.json", self.swagger_url.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub mode: Mode,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub api: ApiConfig,
}

impl Settings {
    pub fn for_mode(mode: Mode) -> Self {
        let (database_url, host) = match mode {
            Mode::Development => ("sqlite://app.db", "127.0.0.1"),
            Mode::Production => ("sqlite://prometheus_api.db", "0.0.0.0"),
            Mode::Test => ("sqlite::memory:", "127.0.0.1"),
        };
        Settings {
            mode,
            database_url: database_url.into(),
            host: host.into(),
            port: 5000,
            api: ApiConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::Load(e.to_string()));
            }
        }
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let mode = get("APP_MODE").map(Mode::from_str).transpose()?.unwrap_or_default();
        let mut settings = Settings::for_mode(mode);

        if let Some(url) = get("DATABASE_URL") {
            settings.database_url = url.to_string();
        }
        if let Some(host) = get("HOST") {
            settings.host = host.to_string();
        }
        if let Some(port) = get("PORT") {
            settings.port = parse_number("PORT", port)?;
        }

        let api = &mut settings.api;
        if let Some(methods) = get("API_METHODS") {
            api.methods = parse_methods(methods)?;
        }
        if let Some(v) = get("API_ALLOW_FUNCTIONS") {
            api.allow_functions = parse_flag("API_ALLOW_FUNCTIONS", v)?;
        }
        if let Some(v) = get("API_ALLOW_PATCH_MANY") {
            api.allow_patch_many = parse_flag("API_ALLOW_PATCH_MANY", v)?;
        }
        if let Some(v) = get("API_RESULTS_PER_PAGE") {
            api.results_per_page = parse_number("API_RESULTS_PER_PAGE", v)?;
        }
        if let Some(v) = get("API_MAX_RESULTS_PER_PAGE") {
            api.max_results_per_page = parse_number("API_MAX_RESULTS_PER_PAGE", v)?;
        }
        if let Some(v) = vars.get("API_URL_PREFIX") {
            api.url_prefix = normalize_prefix(v);
        }
        if let Some(v) = vars.get("SWAGGER_URL") {
            api.swagger_url = normalize_prefix(v);
        }
        if let Some(v) = vars.get("SWAGGER_EXCLUDE_COLUMNS") {
            api.exclude_columns = split_list(v).map(str::to_string).collect();
        }

        if api.results_per_page == 0 || api.results_per_page > api.max_results_per_page {
            return Err(ConfigError::Validation(format!(
                "API_RESULTS_PER_PAGE must be between 1 and {}",
                api.max_results_per_page
            )));
        }
        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_methods(raw: &str) -> Result<Vec<Method>, ConfigError> {
    split_list(raw)
        .map(|m| match m.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "PUT" => Ok(Method::PUT),
            other => Err(ConfigError::Validation(format!("unsupported API method '{}'", other))),
        })
        .collect()
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Validation(format!("{} must be a boolean, got '{}'", key, raw))),
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::Validation(format!("{} must be a number, got '{}'", key, raw)))
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
