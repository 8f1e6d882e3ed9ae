use std::fmt;

/// Why a best-effort step did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The level is not in the notify-set.
    LevelNotNotified,
    /// SMTP credentials are not configured.
    MailNotConfigured,
    /// No alert recipients are configured.
    NoRecipients,
}

/// Result of a non-fatal step such as an append, a share or an alert.
///
/// Fatal problems are returned as `Err` from the constructor instead; an
/// `Outcome` never aborts the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(SkipReason),
    Failed(String),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl<E: fmt::Display> From<Result<(), E>> for Outcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Outcome::Done,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}
