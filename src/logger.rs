use crate::backend::{SheetBackend, SheetError, SpreadsheetRef};
use crate::config::LoggerConfig;
use crate::notify::{AlertDispatcher, Mailer};
use crate::outcome::Outcome;
use crate::record::{local_now, Context, LogRecord};
use crate::resolver::{resolve, ResolvedSheet, SheetRequest};
use crate::store::{StoreError, UrlStore};
use chrono::{FixedOffset, Utc};
use std::sync::Arc;

/// Fatal errors raised while constructing a [`SheetLogger`].
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Row counts from the startup sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub kept: usize,
    pub expired: usize,
    pub unparseable: usize,
}

/// Everything that happened while a logger was being constructed.
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub resolved: ResolvedSheet,
    /// `None` when the tab held no data rows.
    pub sweep: Option<SweepStats>,
}

/// Result of one [`SheetLogger::log`] call.
#[derive(Debug, Clone)]
pub struct LogReport {
    pub record: LogRecord,
    pub append: Outcome,
    pub alert: Outcome,
}

/// Appends log rows to a spreadsheet tab and mails alerts for selected
/// levels.
///
/// Construction resolves the spreadsheet, prepares the tab and runs the
/// retention sweep once. After that the logger is immutable; `log` never
/// returns an error.
pub struct SheetLogger {
    logger_id: String,
    sheet: SpreadsheetRef,
    sheet_name: String,
    utc_offset: FixedOffset,
    backend: Arc<dyn SheetBackend>,
    dispatcher: AlertDispatcher,
    startup: StartupReport,
}

impl SheetLogger {
    /// Build a logger on top of an explicit backend and mailer.
    ///
    /// **Parameters**
    /// - `config`: resolved [`LoggerConfig`].
    /// - `backend`: spreadsheet API implementation.
    /// - `store`: persisted identifier → URL map.
    /// - `mailer`: `None` disables alert mail.
    ///
    /// The sweep rewrites the whole tab without any locking; two processes
    /// sweeping the same tab concurrently can lose rows.
    pub async fn connect(
        config: &LoggerConfig,
        backend: Arc<dyn SheetBackend>,
        store: &UrlStore,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Result<Self, LoggerError> {
        let logger_id = config.resolved_logger_id();
        let request = SheetRequest {
            sheet_url: config.sheet_url.as_deref(),
            logger_id: &logger_id,
            sheet_name: &config.sheet_name,
            persist: config.persist,
            share_with: &config.email_recipients,
        };
        let resolved = resolve(backend.as_ref(), store, &request).await?;
        let sheet = resolved.sheet.clone();

        let rows = backend.read_all(&sheet, &config.sheet_name).await?;
        let now = local_now(Utc::now(), config.utc_offset);
        let sweep = match config.retention.sweep(rows, now) {
            Some(sweep) => {
                let stats = SweepStats {
                    kept: sweep.kept.len(),
                    expired: sweep.expired,
                    unparseable: sweep.unparseable,
                };
                backend
                    .replace_all(&sheet, &config.sheet_name, &sweep.into_rows())
                    .await?;
                // Unparseable rows are dropped without an advisory.
                if stats.expired > 0 {
                    tracing::info!(
                        logger_id = %logger_id,
                        expired = stats.expired,
                        kept = stats.kept,
                        "pruned old log rows"
                    );
                }
                Some(stats)
            }
            None => None,
        };

        let dispatcher = AlertDispatcher::new(
            config.email_levels.iter().cloned(),
            config.email_recipients.clone(),
            mailer,
        );

        Ok(Self {
            logger_id,
            sheet,
            sheet_name: config.sheet_name.clone(),
            utc_offset: config.utc_offset,
            backend,
            dispatcher,
            startup: StartupReport { resolved, sweep },
        })
    }

    /// Build a logger against Google Sheets and SMTP from `config`, using
    /// the default persisted map location.
    ///
    /// **Returns**
    /// - `Err(LoggerError::Sheet(SheetError::MissingCredentials { .. }))`
    ///   if the service-account file does not exist.
    #[cfg(all(feature = "google", feature = "smtp"))]
    pub async fn from_config(config: &LoggerConfig) -> Result<Self, LoggerError> {
        use crate::google::GoogleSheetsClient;
        use crate::notify::SmtpMailer;

        let backend = GoogleSheetsClient::from_service_account_file(&config.service_account_file)?;
        let mailer = config
            .smtp
            .clone()
            .filter(|s| !s.user.is_empty() && !s.password.is_empty())
            .map(|s| Arc::new(SmtpMailer::new(s)) as Arc<dyn Mailer>);

        Self::connect(config, Arc::new(backend), &UrlStore::default(), mailer).await
    }

    /// Append one row and, if the level is in the notify-set, send an alert.
    ///
    /// **Parameters**
    /// - `level`: any case; stored uppercased.
    /// - `message`: free text.
    /// - `context`: serialized to JSON, `{}` when `None`.
    ///
    /// Failures are logged as warnings and reported in the [`LogReport`].
    pub async fn log(&self, level: &str, message: &str, context: Option<&Context>) -> LogReport {
        let record = LogRecord::new(Utc::now(), self.utc_offset, level, message, context);

        let append = match self
            .backend
            .append_row(&self.sheet, &self.sheet_name, &record.to_row())
            .await
        {
            Ok(()) => Outcome::Done,
            Err(e) => {
                tracing::warn!(logger_id = %self.logger_id, "sheet append failed: {}", e);
                Outcome::Failed(e.to_string())
            }
        };

        let alert = self.dispatcher.dispatch(&record).await;

        LogReport { record, append, alert }
    }

    pub fn url(&self) -> &str {
        &self.sheet.url
    }

    pub fn logger_id(&self) -> &str {
        &self.logger_id
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn startup(&self) -> &StartupReport {
        &self.startup
    }
}

impl std::fmt::Debug for SheetLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetLogger")
            .field("logger_id", &self.logger_id)
            .field("url", &self.sheet.url)
            .field("sheet_name", &self.sheet_name)
            .finish()
    }
}
