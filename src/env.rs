/// Environment variable names read by [`LoggerConfig::from_env`].
///
/// These are purely helpers; the logger itself only ever sees the
/// resolved [`LoggerConfig`].
///
/// [`LoggerConfig::from_env`]: crate::config::LoggerConfig::from_env
/// [`LoggerConfig`]: crate::config::LoggerConfig

/// URL of the spreadsheet to log into.
pub const SPREADSHEET_URL_ENV: &str = "SPREADSHEET_URL";

/// Path to the Google service-account key file.
pub const SERVICE_ACCOUNT_FILE_ENV: &str = "SERVICE_ACCOUNT_FILE";

/// SMTP login, also used as the `From` address of alerts.
pub const SMTP_USER_ENV: &str = "SMTP_USER";

/// SMTP password (an app password for Gmail).
pub const SMTP_PASSWORD_ENV: &str = "SMTP_PASSWORD";

/// Optional comma-separated alert recipients.
pub const EMAIL_RECIPIENTS_ENV: &str = "EMAIL_RECIPIENTS";

/// Optional comma-separated levels that trigger an alert.
pub const EMAIL_LEVELS_ENV: &str = "EMAIL_LEVELS";

/// Optional tab name, `Logs` when unset.
pub const SHEET_NAME_ENV: &str = "SHEET_NAME";

/// Optional logical identifier for the persisted URL map.
pub const LOGGER_ID_ENV: &str = "LOGGER_ID";

/// Optional SMTP relay host.
pub const SMTP_HOST_ENV: &str = "SMTP_HOST";

/// Optional SMTP submission port.
pub const SMTP_PORT_ENV: &str = "SMTP_PORT";

/// Optional UTC offset for timestamps, e.g. `+09:00`.
pub const LOG_UTC_OFFSET_ENV: &str = "LOG_UTC_OFFSET";

/// Split a comma-separated value, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
