use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::collections::BTreeMap;

/// `strftime` pattern used for the `Timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header row written to every freshly created log tab.
pub const HEADER: [&str; 4] = ["Timestamp", "Level", "Message", "Context"];

/// Optional structured payload attached to a log call.
///
/// Keys serialize in sorted order, not insertion order, so the `Context`
/// cell of a row is the same for equal maps.
pub type Context = BTreeMap<String, serde_json::Value>;

/// One row of the log tab.
///
/// Records are immutable once appended; the only thing that ever removes
/// them is the retention sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    /// JSON text of the context map, `{}` when none was given.
    pub context: String,
}

impl LogRecord {
    /// Build a record stamped with `now`, rendered as local time in `offset`.
    pub fn new(
        now: DateTime<Utc>,
        offset: FixedOffset,
        level: &str,
        message: impl Into<String>,
        context: Option<&Context>,
    ) -> Self {
        let empty = Context::new();
        let context = serde_json::to_string(context.unwrap_or(&empty))
            .unwrap_or_else(|_| "{}".to_string());

        LogRecord {
            timestamp: format_timestamp(now, offset),
            level: normalize_level(level),
            message: message.into(),
            context,
        }
    }

    /// Cells in column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.level.clone(),
            self.message.clone(),
            self.context.clone(),
        ]
    }
}

pub fn normalize_level(level: &str) -> String {
    level.trim().to_uppercase()
}

pub fn header_row() -> Vec<String> {
    HEADER.iter().map(|h| h.to_string()).collect()
}

/// Wall-clock `now` as a naive local time in `offset`.
pub fn local_now(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    now.with_timezone(&offset).naive_local()
}

pub fn format_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    local_now(now, offset).format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(cell, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seoul() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_timestamp_uses_offset() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 30, 5).unwrap();
        assert_eq!(format_timestamp(now, seoul()), "2026-03-02 05:30:05");
    }

    #[test]
    fn test_record_normalizes_level_and_context() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let record = LogRecord::new(now, seoul(), "warning", "disk low", None);
        assert_eq!(record.level, "WARNING");
        assert_eq!(record.context, "{}");

        let mut ctx = Context::new();
        ctx.insert("user".to_string(), serde_json::json!("민수"));
        ctx.insert("attempt".to_string(), serde_json::json!(3));
        let record = LogRecord::new(now, seoul(), "Error", "login failed", Some(&ctx));
        assert_eq!(record.level, "ERROR");
        assert_eq!(record.context, r#"{"attempt":3,"user":"민수"}"#);
        assert_eq!(record.to_row().len(), HEADER.len());
    }

    #[test]
    fn test_context_keys_serialize_sorted() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut ctx = Context::new();
        ctx.insert("zone".to_string(), serde_json::json!("kr"));
        ctx.insert("b".to_string(), serde_json::json!({"y": 1, "x": 2}));
        ctx.insert("a".to_string(), serde_json::json!(null));

        let record = LogRecord::new(now, seoul(), "INFO", "ordered", Some(&ctx));
        assert_eq!(record.context, r#"{"a":null,"b":{"x":2,"y":1},"zone":"kr"}"#);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("2026-01-02 03:04:05").is_some());
        assert!(parse_timestamp("2026/01/02 03:04:05").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
