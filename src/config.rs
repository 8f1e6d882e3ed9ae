//! Logger configuration
//!
//! Everything the logger needs is resolved once into a [`LoggerConfig`];
//! nothing downstream reads the environment.

use chrono::{FixedOffset, Offset, Utc};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::env::*;
use crate::notify::{SmtpSettings, DEFAULT_NOTIFY_LEVELS, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use crate::retention::RetentionPolicy;

pub const DEFAULT_SHEET_NAME: &str = "Logs";
pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "service_account.json";

/// Identifier used when the caller passes an explicit URL but no id.
pub const EXPLICIT_LOGGER_ID: &str = "_explicit_";

/// Identifier used when neither URL nor id is given.
pub const DEFAULT_LOGGER_ID: &str = "default";

/// Seoul local time.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Settings for one [`SheetLogger`](crate::logger::SheetLogger).
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    /// Explicit spreadsheet URL. Never persisted.
    pub sheet_url: Option<String>,
    /// Key into the persisted URL map.
    pub logger_id: Option<String>,
    /// Tab that receives the rows; also the title of auto-created spreadsheets.
    pub sheet_name: String,
    pub service_account_file: PathBuf,
    /// `None` disables alert mail.
    pub smtp: Option<SmtpSettings>,
    pub email_recipients: Vec<String>,
    pub email_levels: BTreeSet<String>,
    /// Save auto-created URLs to the persisted map.
    pub persist: bool,
    /// Timezone of the `Timestamp` column.
    pub utc_offset: FixedOffset,
    pub retention: RetentionPolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sheet_url: None,
            logger_id: None,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            service_account_file: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_FILE),
            smtp: None,
            email_recipients: Vec::new(),
            email_levels: DEFAULT_NOTIFY_LEVELS.iter().map(|l| l.to_string()).collect(),
            persist: true,
            utc_offset: default_utc_offset(),
            retention: RetentionPolicy::default(),
        }
    }
}

fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

impl LoggerConfig {
    /// Logical identifier after defaulting.
    pub fn resolved_logger_id(&self) -> String {
        match (&self.logger_id, &self.sheet_url) {
            (Some(id), _) => id.clone(),
            (None, Some(_)) => EXPLICIT_LOGGER_ID.to_string(),
            (None, None) => DEFAULT_LOGGER_ID.to_string(),
        }
    }

    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// `SPREADSHEET_URL`, `SERVICE_ACCOUNT_FILE`, `SMTP_USER` and
    /// `SMTP_PASSWORD` are required; the error names every one that is
    /// missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = [
            SPREADSHEET_URL_ENV,
            SERVICE_ACCOUNT_FILE_ENV,
            SMTP_USER_ENV,
            SMTP_PASSWORD_ENV,
        ];
        let missing: Vec<String> = required
            .into_iter()
            .filter(|key| get(*key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let mut smtp = SmtpSettings::new(
            get(SMTP_USER_ENV).unwrap_or_default(),
            get(SMTP_PASSWORD_ENV).unwrap_or_default(),
        );
        smtp.host = get(SMTP_HOST_ENV).unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        smtp.port = match get(SMTP_PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: SMTP_PORT_ENV.to_string(),
                value: raw.clone(),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let utc_offset = match get(LOG_UTC_OFFSET_ENV) {
            Some(raw) => raw.trim().parse::<FixedOffset>().map_err(|_| ConfigError::Invalid {
                key: LOG_UTC_OFFSET_ENV.to_string(),
                value: raw.clone(),
            })?,
            None => default_utc_offset(),
        };

        let email_levels = match get(EMAIL_LEVELS_ENV) {
            Some(raw) => split_list(&raw).into_iter().map(|l| l.to_uppercase()).collect(),
            None => LoggerConfig::default().email_levels,
        };

        Ok(Self {
            sheet_url: get(SPREADSHEET_URL_ENV),
            logger_id: get(LOGGER_ID_ENV),
            sheet_name: get(SHEET_NAME_ENV).unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            service_account_file: get(SERVICE_ACCOUNT_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVICE_ACCOUNT_FILE)),
            smtp: Some(smtp),
            email_recipients: get(EMAIL_RECIPIENTS_ENV)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            email_levels,
            persist: true,
            utc_offset,
            retention: RetentionPolicy::default(),
        })
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
        move |key: &str| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (SPREADSHEET_URL_ENV, "https://docs.google.com/spreadsheets/d/abc/edit"),
            (SERVICE_ACCOUNT_FILE_ENV, "/etc/sa.json"),
            (SMTP_USER_ENV, "bot@example.com"),
            (SMTP_PASSWORD_ENV, "app-password"),
        ]
    }

    #[test]
    fn test_missing_names_every_variable() {
        let err = LoggerConfig::from_lookup(lookup(&[(SMTP_USER_ENV, "bot@example.com"), (SMTP_PASSWORD_ENV, "  ")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec![
                SPREADSHEET_URL_ENV.to_string(),
                SERVICE_ACCOUNT_FILE_ENV.to_string(),
                SMTP_PASSWORD_ENV.to_string(),
            ])
        );
        assert_eq!(
            err.to_string(),
            "missing environment variables: SPREADSHEET_URL, SERVICE_ACCOUNT_FILE, SMTP_PASSWORD"
        );
    }

    #[test]
    fn test_defaults_for_optional_values() {
        let config = LoggerConfig::from_lookup(lookup(&required())).unwrap();
        assert_eq!(config.sheet_name, DEFAULT_SHEET_NAME);
        assert!(config.email_recipients.is_empty());
        assert_eq!(
            config.email_levels,
            ["CRITICAL", "ERROR"].iter().map(|s| s.to_string()).collect::<BTreeSet<String>>()
        );
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, DEFAULT_SMTP_HOST);
        assert_eq!(smtp.port, DEFAULT_SMTP_PORT);
        assert_eq!(config.utc_offset.local_minus_utc(), DEFAULT_UTC_OFFSET_SECS);
        assert_eq!(config.service_account_file, PathBuf::from("/etc/sa.json"));
    }

    #[test]
    fn test_lists_are_split_and_normalized() {
        let mut pairs = required();
        pairs.push((EMAIL_RECIPIENTS_ENV, "ops@example.com, dev@example.com,"));
        pairs.push((EMAIL_LEVELS_ENV, "warning,error"));
        pairs.push((LOG_UTC_OFFSET_ENV, "+00:00"));
        let config = LoggerConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.email_recipients, vec!["ops@example.com", "dev@example.com"]);
        assert!(config.email_levels.contains("WARNING"));
        assert!(config.email_levels.contains("ERROR"));
        assert!(!config.email_levels.contains("CRITICAL"));
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = required();
        pairs.push((SMTP_PORT_ENV, "smtp"));
        assert!(matches!(
            LoggerConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_resolved_logger_id() {
        let mut config = LoggerConfig::default();
        assert_eq!(config.resolved_logger_id(), DEFAULT_LOGGER_ID);
        config.sheet_url = Some("https://docs.google.com/spreadsheets/d/abc".to_string());
        assert_eq!(config.resolved_logger_id(), EXPLICIT_LOGGER_ID);
        config.logger_id = Some("billing".to_string());
        assert_eq!(config.resolved_logger_id(), "billing");
    }
}
