//! Caller-held logger registry
//!
//! Maps logical identifiers to live loggers so that constructing a second
//! logger for the same identifier can be flagged. It never prevents the
//! construction.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::backend::SheetBackend;
use crate::config::LoggerConfig;
use crate::logger::{LoggerError, SheetLogger};
use crate::notify::Mailer;
use crate::store::UrlStore;

/// Identifier → logger, held weakly so the registry never keeps a logger
/// alive on its own.
#[derive(Debug, Default)]
pub struct LoggerRegistry {
    loggers: HashMap<String, Weak<SheetLogger>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a logger registered under `id` is still alive.
    pub fn is_live(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<Arc<SheetLogger>> {
        self.loggers.get(id).and_then(Weak::upgrade)
    }

    /// Record `logger` under its identifier, replacing any previous entry.
    ///
    /// Returns `true` and logs a warning when a live logger was already
    /// registered under the same identifier.
    pub fn register(&mut self, logger: &Arc<SheetLogger>) -> bool {
        let id = logger.logger_id().to_string();
        let duplicate = self.check_duplicate(&id);
        self.loggers.insert(id, Arc::downgrade(logger));
        duplicate
    }

    /// Construct a logger and register it.
    ///
    /// **Returns**
    /// - the new logger and whether a live logger already held its
    ///   identifier. The duplicate check runs before construction, so the
    ///   warning is emitted even if construction then fails.
    pub async fn connect(
        &mut self,
        config: &LoggerConfig,
        backend: Arc<dyn SheetBackend>,
        store: &UrlStore,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Result<(Arc<SheetLogger>, bool), LoggerError> {
        let id = config.resolved_logger_id();
        let duplicate = self.check_duplicate(&id);

        let logger = Arc::new(SheetLogger::connect(config, backend, store, mailer).await?);
        self.loggers.insert(id, Arc::downgrade(&logger));
        Ok((logger, duplicate))
    }

    fn check_duplicate(&self, id: &str) -> bool {
        let duplicate = self.is_live(id);
        if duplicate {
            tracing::warn!(logger_id = %id, "sheet logger already exists");
        }
        duplicate
    }

    /// Number of registered loggers that are still alive.
    pub fn live_count(&self) -> usize {
        self.loggers.values().filter(|w| w.strong_count() > 0).count()
    }
}
