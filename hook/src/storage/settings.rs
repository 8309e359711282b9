//! Settings loaded from the process environment

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::errors::HookError;
use crate::logs::LogLevel;
use crate::models::project::{Project, ProjectRegistry};

pub const DEFAULT_BASE_URL: &str = "https://api.render.com/v1";
pub const DEFAULT_PORT: u16 = 5000;
pub const MIN_TOKEN_LEN: usize = 8;

const PROJECT_PREFIX: &str = "PROJECT__";

/// Service settings
#[derive(Debug)]
pub struct Settings {
    /// Token expected in the webhook `token` query parameter
    pub secret_token: SecretString,

    /// Configured projects
    pub projects: ProjectRegistry,

    /// Base URL of the Render API
    pub base_url: String,

    /// Minimum time between two accepted deploys of one project
    pub deploy_interval: Duration,

    /// Maximum number of deploy status checks
    pub max_poll_attempts: u32,

    /// Delay between deploy status checks
    pub poll_interval: Duration,

    /// Show only custom domains in notifications when a service has any
    pub prefer_custom_domain: bool,

    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Directory for lock and timestamp records
    pub locks_dir: PathBuf,

    /// Notification sink; notifications are only logged when unset
    pub notify_webhook_url: Option<Url>,

    /// Log level
    pub log_level: LogLevel,

    /// Emit JSON logs
    pub log_json: bool,

    /// Directory for rotated log files
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, HookError> {
        Self::from_vars(unicode_vars(std::env::vars_os()))
    }

    /// Load settings from arbitrary `(name, value)` pairs
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, HookError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let secret_token = match vars.get("SECRET_TOKEN") {
            Some(token) if !token.is_empty() => token.clone(),
            _ => return Err(config_error("SECRET_TOKEN is not set")),
        };
        if secret_token.chars().count() < MIN_TOKEN_LEN {
            return Err(config_error(format!(
                "SECRET_TOKEN must be at least {} characters",
                MIN_TOKEN_LEN
            )));
        }

        let projects = parse_projects(&vars)?;

        let base_url = vars
            .get("RENDER_API_BASE_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| config_error(format!("RENDER_API_BASE_URL is invalid: {}", e)))?;

        let notify_webhook_url = match vars.get("NOTIFY_WEBHOOK_URL").filter(|v| !v.is_empty()) {
            Some(raw) => Some(
                Url::parse(raw)
                    .map_err(|e| config_error(format!("NOTIFY_WEBHOOK_URL is invalid: {}", e)))?,
            ),
            None => None,
        };

        let log_level = match vars.get("LOG_LEVEL") {
            Some(raw) => raw.parse().map_err(|e: String| config_error(e))?,
            None => LogLevel::Info,
        };

        Ok(Self {
            secret_token: SecretString::from(secret_token),
            projects,
            base_url: base_url.trim_end_matches('/').to_string(),
            deploy_interval: Duration::from_secs(parse_var(&vars, "DEPLOY_INTERVAL", 60)?),
            max_poll_attempts: parse_var(&vars, "MAX_DEPLOY_RETRIES", 5)?,
            poll_interval: Duration::from_secs(parse_var(&vars, "DEPLOY_CHECK_INTERVAL", 60)?),
            prefer_custom_domain: parse_flag(&vars, "PREFER_CUSTOM_DOMAIN", true),
            host: vars
                .get("HOST")
                .cloned()
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&vars, "PORT", DEFAULT_PORT)?,
            locks_dir: vars
                .get("LOCKS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp/locks")),
            notify_webhook_url,
            log_level,
            log_json: parse_flag(&vars, "LOG_JSON", false),
            log_dir: vars.get("LOG_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }

    /// Whether `token` matches the configured secret
    pub fn token_matches(&self, token: &str) -> bool {
        self.secret_token.expose_secret() == token
    }
}

/// Keep the pairs that are valid Unicode; no setting is read from the others
fn unicode_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                debug!(var = %key, "Skipping environment variable with a non UTF-8 value");
                None
            }
            (Err(key), _) => {
                debug!(var = %key.to_string_lossy(), "Skipping non UTF-8 environment variable");
                None
            }
        })
}

fn config_error(msg: impl Into<String>) -> HookError {
    HookError::ConfigError(msg.into())
}

fn parse_var<T: FromStr>(
    vars: &BTreeMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, HookError>
where
    T::Err: std::fmt::Display,
{
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| config_error(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_flag(vars: &BTreeMap<String, String>, key: &str, default: bool) -> bool {
    vars.get(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Collect `PROJECT__<id>__SERVICE_NAME` / `PROJECT__<id>__API_KEY` pairs
fn parse_projects(vars: &BTreeMap<String, String>) -> Result<ProjectRegistry, HookError> {
    #[derive(Default)]
    struct Partial {
        name: Option<String>,
        api_key: Option<String>,
    }

    let mut partials: BTreeMap<String, Partial> = BTreeMap::new();

    for (key, value) in vars {
        let Some(prefix) = key.get(..PROJECT_PREFIX.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(PROJECT_PREFIX) {
            continue;
        }
        let Some((id, field)) = key[PROJECT_PREFIX.len()..].rsplit_once("__") else {
            continue;
        };

        let field = field.to_ascii_uppercase();
        if field != "SERVICE_NAME" && field != "API_KEY" {
            continue;
        }
        if !is_valid_project_id(id) {
            return Err(config_error(format!(
                "project id {:?} is invalid, only letters, digits, '_' and '-' are allowed",
                id
            )));
        }

        let partial = partials.entry(id.to_lowercase()).or_default();
        if field == "SERVICE_NAME" {
            partial.name = Some(value.clone());
        } else {
            partial.api_key = Some(value.clone());
        }
    }

    let mut projects = Vec::with_capacity(partials.len());
    for (id, partial) in partials {
        let api_key = partial
            .api_key
            .ok_or_else(|| config_error(format!("project {:?} is missing API_KEY", id)))?;
        let name = partial
            .name
            .ok_or_else(|| config_error(format!("project {:?} is missing SERVICE_NAME", id)))?;
        if api_key.trim().is_empty() {
            warn!(project = %id, "Project has an empty API key, deploys will be refused");
        }
        projects.push(Project::new(id, name, api_key));
    }

    let registry = ProjectRegistry::new(projects);
    if registry.is_empty() {
        return Err(config_error(
            "no project configured, set PROJECT__<id>__SERVICE_NAME and PROJECT__<id>__API_KEY",
        ));
    }
    Ok(registry)
}
