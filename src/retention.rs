//! Log row retention
//!
//! Prunes aged-out rows from the log tab, with a shorter window for `INFO`.

use chrono::NaiveDateTime;

use crate::record::parse_timestamp;

/// Rows this many days old are dropped regardless of level.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 14;

/// `INFO` rows this many days old are dropped.
pub const DEFAULT_INFO_MAX_AGE_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_days: i64,
    pub info_max_age_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            info_max_age_days: DEFAULT_INFO_MAX_AGE_DAYS,
        }
    }
}

/// Result of one sweep over the tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    pub header: Vec<String>,
    /// Surviving data rows, in their original order.
    pub kept: Vec<Vec<String>>,
    pub expired: usize,
    pub unparseable: usize,
}

impl Sweep {
    /// Header followed by the kept rows, ready to be written back.
    pub fn into_rows(self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(self.kept.len() + 1);
        rows.push(self.header);
        rows.extend(self.kept);
        rows
    }
}

/// Whole days from `then` to `now`, rounded toward negative infinity.
pub fn age_in_days(then: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - then).num_seconds().div_euclid(86_400)
}

impl RetentionPolicy {
    pub fn is_expired(&self, level: &str, age_days: i64) -> bool {
        age_days >= self.max_age_days
            || (level.eq_ignore_ascii_case("INFO") && age_days >= self.info_max_age_days)
    }

    /// Split `rows` (header first) into kept and dropped rows.
    ///
    /// `now` is the current wall-clock time in the same timezone the
    /// timestamps were written in. Rows whose timestamp cell is missing or
    /// does not parse are dropped without a warning.
    ///
    /// **Returns**
    /// - `None` when there are no data rows, so nothing needs rewriting.
    pub fn sweep(&self, rows: Vec<Vec<String>>, now: NaiveDateTime) -> Option<Sweep> {
        if rows.len() < 2 {
            return None;
        }

        let mut rows = rows.into_iter();
        let header = rows.next().unwrap_or_default();
        let mut kept = Vec::new();
        let mut expired = 0;
        let mut unparseable = 0;

        for row in rows {
            let Some(ts) = row.first().and_then(|cell| parse_timestamp(cell)) else {
                unparseable += 1;
                continue;
            };
            let level = row.get(1).map(String::as_str).unwrap_or("");
            if self.is_expired(level, age_in_days(ts, now)) {
                expired += 1;
                continue;
            }
            kept.push(row);
        }

        Some(Sweep {
            header,
            kept,
            expired,
            unparseable,
        })
    }
}
