use crate::backend::{parse_spreadsheet_url, spreadsheet_url, SheetBackend, SheetError, SpreadsheetRef};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Spreadsheet {
    title: String,
    tabs: BTreeMap<String, Vec<Vec<String>>>,
    shared_with: Vec<String>,
}

/// A backend that keeps spreadsheets in process memory.
///
/// Useful for dry runs without Google credentials, and for tests that
/// need to inspect what the logger wrote.
#[derive(Default)]
pub struct MemoryBackend {
    sheets: Mutex<HashMap<String, Spreadsheet>>,
    next_id: AtomicU64,
    fail_appends: AtomicBool,
    fail_shares: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append_row` fail with a transport error.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent `share` fail with an API error.
    pub fn set_fail_shares(&self, fail: bool) {
        self.fail_shares.store(fail, Ordering::Relaxed);
    }

    /// Register a spreadsheet under `url` with the given tab contents.
    pub fn insert_spreadsheet(&self, url: &str, tab: &str, rows: Vec<Vec<String>>) -> Result<SpreadsheetRef, SheetError> {
        let id = parse_spreadsheet_url(url)?;
        let mut sheets = self.lock();
        let sheet = sheets.entry(id.clone()).or_default();
        sheet.tabs.insert(tab.to_string(), rows);
        Ok(SpreadsheetRef { id, url: url.to_string() })
    }

    /// Snapshot of a tab, if the spreadsheet and tab exist.
    pub fn rows(&self, url: &str, tab: &str) -> Option<Vec<Vec<String>>> {
        let id = parse_spreadsheet_url(url).ok()?;
        self.lock().get(&id)?.tabs.get(tab).cloned()
    }

    pub fn shared_with(&self, url: &str) -> Vec<String> {
        parse_spreadsheet_url(url)
            .ok()
            .and_then(|id| self.lock().get(&id).map(|s| s.shared_with.clone()))
            .unwrap_or_default()
    }

    pub fn spreadsheet_count(&self) -> usize {
        self.lock().len()
    }

    pub fn title(&self, url: &str) -> Option<String> {
        let id = parse_spreadsheet_url(url).ok()?;
        self.lock().get(&id).map(|s| s.title.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Spreadsheet>> {
        // A poisoned map is still structurally valid.
        self.sheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_tab<T>(
        &self,
        sheet: &SpreadsheetRef,
        title: &str,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T, SheetError> {
        let mut sheets = self.lock();
        let spreadsheet = sheets
            .get_mut(&sheet.id)
            .ok_or_else(|| SheetError::NotFound(sheet.url.clone()))?;
        let tab = spreadsheet.tabs.get_mut(title).ok_or_else(|| SheetError::Api {
            status: 400,
            body: format!("Unable to parse range: '{}'", title),
        })?;
        Ok(f(tab))
    }
}

#[async_trait]
impl SheetBackend for MemoryBackend {
    async fn open_by_url(&self, url: &str) -> Result<SpreadsheetRef, SheetError> {
        let id = parse_spreadsheet_url(url)?;
        if self.lock().contains_key(&id) {
            Ok(SpreadsheetRef { id, url: url.to_string() })
        } else {
            Err(SheetError::NotFound(url.to_string()))
        }
    }

    async fn create(&self, title: &str) -> Result<SpreadsheetRef, SheetError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("mem-{}", n);
        let mut spreadsheet = Spreadsheet {
            title: title.to_string(),
            ..Default::default()
        };
        spreadsheet.tabs.insert("Sheet1".to_string(), Vec::new());
        self.lock().insert(id.clone(), spreadsheet);
        Ok(SpreadsheetRef { url: spreadsheet_url(&id), id })
    }

    async fn share(&self, sheet: &SpreadsheetRef, email: &str) -> Result<(), SheetError> {
        if self.fail_shares.load(Ordering::Relaxed) {
            return Err(SheetError::Api {
                status: 403,
                body: "sharing is disabled".to_string(),
            });
        }
        let mut sheets = self.lock();
        let spreadsheet = sheets
            .get_mut(&sheet.id)
            .ok_or_else(|| SheetError::NotFound(sheet.url.clone()))?;
        if !spreadsheet.shared_with.iter().any(|e| e == email) {
            spreadsheet.shared_with.push(email.to_string());
        }
        Ok(())
    }

    async fn ensure_worksheet(&self, sheet: &SpreadsheetRef, title: &str) -> Result<bool, SheetError> {
        let mut sheets = self.lock();
        let spreadsheet = sheets
            .get_mut(&sheet.id)
            .ok_or_else(|| SheetError::NotFound(sheet.url.clone()))?;
        if spreadsheet.tabs.contains_key(title) {
            return Ok(false);
        }
        spreadsheet.tabs.insert(title.to_string(), Vec::new());
        Ok(true)
    }

    async fn read_all(&self, sheet: &SpreadsheetRef, title: &str) -> Result<Vec<Vec<String>>, SheetError> {
        self.with_tab(sheet, title, |rows| rows.clone())
    }

    async fn append_row(&self, sheet: &SpreadsheetRef, title: &str, row: &[String]) -> Result<(), SheetError> {
        if self.fail_appends.load(Ordering::Relaxed) {
            return Err(SheetError::Transport("connection reset".to_string()));
        }
        self.with_tab(sheet, title, |rows| rows.push(row.to_vec()))
    }

    async fn replace_all(&self, sheet: &SpreadsheetRef, title: &str, rows: &[Vec<String>]) -> Result<(), SheetError> {
        self.with_tab(sheet, title, |tab| *tab = rows.to_vec())
    }
}
