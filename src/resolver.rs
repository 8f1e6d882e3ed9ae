//! Spreadsheet resolution
//!
//! Turns an optional explicit URL plus a logical identifier into an open
//! spreadsheet with a ready log tab.

use crate::backend::{SheetBackend, SpreadsheetRef};
use crate::logger::LoggerError;
use crate::outcome::Outcome;
use crate::record::header_row;
use crate::store::UrlStore;

/// Inputs for [`resolve`].
#[derive(Debug, Clone, Copy)]
pub struct SheetRequest<'a> {
    pub sheet_url: Option<&'a str>,
    pub logger_id: &'a str,
    pub sheet_name: &'a str,
    pub persist: bool,
    /// Addresses granted writer access to the spreadsheet.
    pub share_with: &'a [String],
}

/// What [`resolve`] found or did.
#[derive(Debug, Clone)]
pub struct ResolvedSheet {
    pub sheet: SpreadsheetRef,
    /// A new spreadsheet was created.
    pub created: bool,
    /// The new spreadsheet's URL was written to the persisted map.
    pub persisted: bool,
    /// Stored URL that differed from the explicit one, if any.
    pub stored_url_conflict: Option<String>,
    pub tab_created: bool,
    pub header_written: bool,
    pub shares: Vec<(String, Outcome)>,
}

/// Open or create the spreadsheet and prepare its log tab.
///
/// **Behavior**
/// - explicit URL: opened as-is; the persisted map is only read, to warn
///   when it holds a different URL for the same identifier.
/// - no URL: the identifier is looked up in the map; on a miss a new
///   spreadsheet titled `sheet_name` is created and, if `persist` is set,
///   recorded under the identifier.
///
/// Sharing is best-effort. Everything else that fails is fatal.
pub async fn resolve(
    backend: &dyn SheetBackend,
    store: &UrlStore,
    request: &SheetRequest<'_>,
) -> Result<ResolvedSheet, LoggerError> {
    let mut stored_url_conflict = None;

    let (sheet, created) = match request.sheet_url {
        Some(url) => {
            match store.get(request.logger_id) {
                Ok(Some(stored)) if stored != url => {
                    tracing::warn!(
                        logger_id = request.logger_id,
                        stored = %stored,
                        "logger id had a different stored URL; running with the explicit URL (not persisted)"
                    );
                    stored_url_conflict = Some(stored);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("could not read {}: {}", store.path().display(), e),
            }
            (backend.open_by_url(url).await?, false)
        }
        None => match store.get(request.logger_id)? {
            Some(stored) => {
                tracing::debug!(logger_id = request.logger_id, url = %stored, "using stored spreadsheet");
                (backend.open_by_url(&stored).await?, false)
            }
            None => (backend.create(request.sheet_name).await?, true),
        },
    };

    let persisted = created && request.persist;
    if persisted {
        store.insert(request.logger_id, &sheet.url)?;
        tracing::info!(
            logger_id = request.logger_id,
            url = %sheet.url,
            "saved spreadsheet URL to {}",
            store.path().display()
        );
    }

    let mut shares = Vec::with_capacity(request.share_with.len());
    for email in request.share_with {
        let outcome = Outcome::from(backend.share(&sheet, email).await);
        if let Outcome::Failed(reason) = &outcome {
            tracing::debug!(email = %email, "share failed: {}", reason);
        }
        shares.push((email.clone(), outcome));
    }

    let tab_created = backend.ensure_worksheet(&sheet, request.sheet_name).await?;
    let header_written = if backend.read_all(&sheet, request.sheet_name).await?.is_empty() {
        backend
            .append_row(&sheet, request.sheet_name, &header_row())
            .await?;
        true
    } else {
        false
    };

    Ok(ResolvedSheet {
        sheet,
        created,
        persisted,
        stored_url_conflict,
        tab_created,
        header_written,
        shares,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SheetError;
    use crate::memory::MemoryBackend;
    use tempfile::TempDir;

    const URL_A: &str = "https://docs.google.com/spreadsheets/d/aaa/edit";
    const URL_B: &str = "https://docs.google.com/spreadsheets/d/bbb/edit";

    fn request<'a>(url: Option<&'a str>, id: &'a str) -> SheetRequest<'a> {
        SheetRequest {
            sheet_url: url,
            logger_id: id,
            sheet_name: "Logs",
            persist: true,
            share_with: &[],
        }
    }

    #[tokio::test]
    async fn test_explicit_url_never_touches_map() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        store.insert("_explicit_", URL_B).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let backend = MemoryBackend::new();
        backend.insert_spreadsheet(URL_A, "Sheet1", Vec::new()).unwrap();

        let resolved = resolve(&backend, &store, &request(Some(URL_A), "_explicit_"))
            .await
            .unwrap();

        assert_eq!(resolved.sheet.url, URL_A);
        assert!(!resolved.created && !resolved.persisted);
        assert_eq!(resolved.stored_url_conflict.as_deref(), Some(URL_B));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_explicit_url_with_empty_map_stays_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        let backend = MemoryBackend::new();
        backend.insert_spreadsheet(URL_A, "Logs", Vec::new()).unwrap();

        resolve(&backend, &store, &request(Some(URL_A), "svc")).await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_missing_entry_creates_and_persists_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        store.insert("other", URL_B).unwrap();
        let backend = MemoryBackend::new();

        let resolved = resolve(&backend, &store, &request(None, "default")).await.unwrap();

        assert!(resolved.created && resolved.persisted);
        assert!(resolved.tab_created && resolved.header_written);
        let map = store.load().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("default"), Some(&resolved.sheet.url));
        assert_eq!(backend.title(&resolved.sheet.url).as_deref(), Some("Logs"));
        assert_eq!(backend.rows(&resolved.sheet.url, "Logs").unwrap(), vec![header_row()]);
    }

    #[tokio::test]
    async fn test_stored_entry_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        let backend = MemoryBackend::new();

        let first = resolve(&backend, &store, &request(None, "default")).await.unwrap();
        let second = resolve(&backend, &store, &request(None, "default")).await.unwrap();

        assert_eq!(first.sheet, second.sheet);
        assert!(!second.created && !second.tab_created && !second.header_written);
        assert_eq!(backend.spreadsheet_count(), 1);
    }

    #[tokio::test]
    async fn test_persist_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        let backend = MemoryBackend::new();
        let mut req = request(None, "scratch");
        req.persist = false;

        let resolved = resolve(&backend, &store, &req).await.unwrap();
        assert!(resolved.created && !resolved.persisted);
        assert!(store.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_share_failures_are_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        let backend = MemoryBackend::new();
        backend.set_fail_shares(true);
        let recipients = vec!["ops@example.com".to_string()];
        let mut req = request(None, "default");
        req.share_with = &recipients;

        let resolved = resolve(&backend, &store, &req).await.unwrap();
        assert_eq!(resolved.shares.len(), 1);
        assert!(resolved.shares[0].1.is_failed());
    }

    #[tokio::test]
    async fn test_unknown_explicit_url_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let store = UrlStore::with_path(temp_dir.path().join("config.json"));
        let backend = MemoryBackend::new();

        let err = resolve(&backend, &store, &request(Some(URL_A), "_explicit_"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::Sheet(SheetError::NotFound(_))));
    }
}
