use async_trait::async_trait;
use std::path::PathBuf;

/// Handle to a resolved spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetRef {
    /// Spreadsheet key, the path segment after `/spreadsheets/d/`.
    pub id: String,
    pub url: String,
}

/// Error type returned by [`SheetBackend`] implementations.
#[derive(thiserror::Error, Debug)]
pub enum SheetError {
    #[error(
        "service account file not found: {}. Run `gsheet-init init` to create \
         service_account.json from the template, then paste in the key downloaded \
         from the Google Cloud console",
        path.display()
    )]
    MissingCredentials { path: PathBuf },

    #[error("invalid service account file {}: {reason}", path.display())]
    InvalidCredentials { path: PathBuf, reason: String },

    #[error("not a spreadsheet URL: {0}")]
    InvalidUrl(String),

    #[error("spreadsheet not found: {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("sheets API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

#[cfg(feature = "google")]
impl From<reqwest::Error> for SheetError {
    fn from(e: reqwest::Error) -> Self {
        SheetError::Transport(e.to_string())
    }
}

/// Spreadsheet API used by the logger.
///
/// Implementations own authentication and transport. Every method is
/// awaited in sequence by the caller; implementations are not expected to
/// buffer or retry.
#[async_trait]
pub trait SheetBackend: Send + Sync {
    /// Open an existing spreadsheet by its browser URL.
    async fn open_by_url(&self, url: &str) -> Result<SpreadsheetRef, SheetError>;

    /// Create a new spreadsheet titled `title`.
    async fn create(&self, title: &str) -> Result<SpreadsheetRef, SheetError>;

    /// Grant `email` writer access without sending a notification.
    async fn share(&self, sheet: &SpreadsheetRef, email: &str) -> Result<(), SheetError>;

    /// Make sure a tab named `title` exists.
    ///
    /// **Returns**
    /// - `Ok(true)` if the tab was created by this call.
    /// - `Ok(false)` if it already existed.
    async fn ensure_worksheet(&self, sheet: &SpreadsheetRef, title: &str)
        -> Result<bool, SheetError>;

    /// All rows of the tab, header included.
    async fn read_all(&self, sheet: &SpreadsheetRef, title: &str)
        -> Result<Vec<Vec<String>>, SheetError>;

    /// Append one row after the last non-empty row.
    async fn append_row(
        &self,
        sheet: &SpreadsheetRef,
        title: &str,
        row: &[String],
    ) -> Result<(), SheetError>;

    /// Clear the tab and write `rows` starting at `A1`.
    async fn replace_all(
        &self,
        sheet: &SpreadsheetRef,
        title: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetError>;
}

/// Extract the spreadsheet key from a Google Sheets URL.
///
/// Examples:
/// - "https://docs.google.com/spreadsheets/d/1AbC-x_9/edit#gid=0"
/// - "https://docs.google.com/spreadsheets/d/1AbC-x_9"
pub fn parse_spreadsheet_url(url: &str) -> Result<String, SheetError> {
    let (_, rest) = url
        .split_once("/spreadsheets/d/")
        .ok_or_else(|| SheetError::InvalidUrl(url.to_string()))?;

    let key: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if key.is_empty() {
        Err(SheetError::InvalidUrl(url.to_string()))
    } else {
        Ok(key)
    }
}

/// Browser URL for a spreadsheet key.
pub fn spreadsheet_url(id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spreadsheet_url() {
        assert_eq!(
            parse_spreadsheet_url("https://docs.google.com/spreadsheets/d/1AbC-x_9/edit#gid=0").unwrap(),
            "1AbC-x_9"
        );
        assert_eq!(
            parse_spreadsheet_url(&spreadsheet_url("k3y")).unwrap(),
            "k3y"
        );
    }

    #[test]
    fn test_parse_spreadsheet_url_rejects_other_urls() {
        assert!(matches!(
            parse_spreadsheet_url("https://example.com/doc/1"),
            Err(SheetError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_spreadsheet_url("https://docs.google.com/spreadsheets/d/"),
            Err(SheetError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_missing_credentials_message_has_remediation() {
        let err = SheetError::MissingCredentials { path: PathBuf::from("sa.json") };
        let text = err.to_string();
        assert!(text.contains("sa.json"));
        assert!(text.contains("gsheet-init init"));
    }
}
