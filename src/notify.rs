use crate::outcome::{Outcome, SkipReason};
use crate::record::LogRecord;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Submission port; the connection is upgraded with STARTTLS.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Levels that trigger an alert when none are configured.
pub const DEFAULT_NOTIFY_LEVELS: [&str; 2] = ["ERROR", "CRITICAL"];

/// Login and relay used for alert mail.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl SmtpSettings {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            user: user.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("smtp error: {0}")]
    Transport(String),
}

/// Plain-text alert for one log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: String,
    pub message: String,
    pub context: String,
    pub recipients: Vec<String>,
}

impl Alert {
    pub fn subject(&self) -> String {
        format!("[{}] Log Notification", self.level)
    }

    pub fn body(&self) -> String {
        format!(
            "Level: {}\nMessage: {}\nContext: {}",
            self.level, self.message, self.context
        )
    }
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `alert` as a single message addressed to all its recipients.
    async fn send(&self, alert: &Alert) -> Result<(), MailError>;
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

#[cfg(feature = "smtp")]
mod smtp {
    use super::{Alert, MailError, Mailer, SmtpSettings};
    use async_trait::async_trait;
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

    /// [`Mailer`] that submits over SMTP with STARTTLS and login auth.
    pub struct SmtpMailer {
        settings: SmtpSettings,
    }

    impl SmtpMailer {
        pub fn new(settings: SmtpSettings) -> Self {
            Self { settings }
        }

        fn mailbox(address: &str) -> Result<Mailbox, MailError> {
            address.parse::<Mailbox>().map_err(|e| MailError::Address {
                address: address.to_string(),
                reason: e.to_string(),
            })
        }

        fn build(&self, alert: &Alert) -> Result<Message, MailError> {
            let mut builder = Message::builder()
                .from(Self::mailbox(&self.settings.user)?)
                .subject(alert.subject())
                .header(ContentType::TEXT_PLAIN);
            for recipient in &alert.recipients {
                builder = builder.to(Self::mailbox(recipient)?);
            }
            builder
                .body(alert.body())
                .map_err(|e| MailError::Message(e.to_string()))
        }
    }

    #[async_trait]
    impl Mailer for SmtpMailer {
        async fn send(&self, alert: &Alert) -> Result<(), MailError> {
            let message = self.build(alert)?;

            let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .port(self.settings.port)
                .credentials(Credentials::new(
                    self.settings.user.clone(),
                    self.settings.password.clone(),
                ))
                .build();

            transport
                .send(message)
                .await
                .map_err(|e| MailError::Transport(e.to_string()))?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn alert(recipients: &[&str]) -> Alert {
            Alert {
                level: "ERROR".to_string(),
                message: "db down".to_string(),
                context: "{}".to_string(),
                recipients: recipients.iter().map(|r| r.to_string()).collect(),
            }
        }

        #[test]
        fn test_build_rejects_bad_recipient() {
            let mailer = SmtpMailer::new(SmtpSettings::new("bot@example.com", "pw"));
            let err = mailer.build(&alert(&["not an address"])).unwrap_err();
            assert!(matches!(err, MailError::Address { .. }));
        }

        #[test]
        fn test_build_addresses_all_recipients() {
            let mailer = SmtpMailer::new(SmtpSettings::new("bot@example.com", "pw"));
            let message = mailer.build(&alert(&["a@example.com", "b@example.com"])).unwrap();
            assert_eq!(message.envelope().to().len(), 2);
            let text = String::from_utf8(message.formatted()).unwrap();
            assert!(text.contains("Subject: [ERROR] Log Notification"));
        }
    }
}

/// Decides whether a record warrants an alert and sends it.
pub struct AlertDispatcher {
    levels: BTreeSet<String>,
    recipients: Vec<String>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl AlertDispatcher {
    /// `mailer` is `None` when SMTP credentials are not configured.
    pub fn new(
        levels: impl IntoIterator<Item = String>,
        recipients: Vec<String>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            levels: levels.into_iter().map(|l| l.to_uppercase()).collect(),
            recipients,
            mailer,
        }
    }

    pub fn notifies(&self, level: &str) -> bool {
        self.levels.contains(level)
    }

    /// Send at most one alert for `record`.
    ///
    /// Missing configuration is a skip, not an error. Send failures are
    /// logged and returned as [`Outcome::Failed`].
    pub async fn dispatch(&self, record: &LogRecord) -> Outcome {
        if !self.notifies(&record.level) {
            return Outcome::Skipped(SkipReason::LevelNotNotified);
        }
        let Some(mailer) = self.mailer.as_ref() else {
            return Outcome::Skipped(SkipReason::MailNotConfigured);
        };
        if self.recipients.is_empty() {
            return Outcome::Skipped(SkipReason::NoRecipients);
        }

        let alert = Alert {
            level: record.level.clone(),
            message: record.message.clone(),
            context: record.context.clone(),
            recipients: self.recipients.clone(),
        };
        match mailer.send(&alert).await {
            Ok(()) => Outcome::Done,
            Err(e) => {
                tracing::warn!(level = %record.level, "email send failed: {}", e);
                Outcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Alert>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, alert: &Alert) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Transport("535 auth failed".to_string()));
            }
            self.sent.lock().unwrap().push(alert.clone());
            Ok(())
        }
    }

    fn record(level: &str) -> LogRecord {
        LogRecord {
            timestamp: "2026-05-20 12:00:00".to_string(),
            level: level.to_string(),
            message: "payment failed".to_string(),
            context: r#"{"order":7}"#.to_string(),
        }
    }

    fn levels() -> Vec<String> {
        vec!["error".to_string(), "CRITICAL".to_string()]
    }

    #[tokio::test]
    async fn test_notify_level_sends_one_alert() {
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = AlertDispatcher::new(
            levels(),
            vec!["ops@example.com".to_string(), "dev@example.com".to_string()],
            Some(mailer.clone()),
        );

        assert_eq!(dispatcher.dispatch(&record("ERROR")).await, Outcome::Done);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipients.len(), 2);
        assert_eq!(sent[0].subject(), "[ERROR] Log Notification");
        assert_eq!(
            sent[0].body(),
            "Level: ERROR\nMessage: payment failed\nContext: {\"order\":7}"
        );
    }

    #[tokio::test]
    async fn test_other_levels_send_nothing() {
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = AlertDispatcher::new(levels(), vec!["ops@example.com".to_string()], Some(mailer.clone()));

        assert_eq!(
            dispatcher.dispatch(&record("WARNING")).await,
            Outcome::Skipped(SkipReason::LevelNotNotified)
        );
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_configuration_is_a_skip() {
        let no_mailer = AlertDispatcher::new(levels(), vec!["ops@example.com".to_string()], None);
        assert_eq!(
            no_mailer.dispatch(&record("ERROR")).await,
            Outcome::Skipped(SkipReason::MailNotConfigured)
        );

        let mailer = Arc::new(RecordingMailer::default());
        let no_recipients = AlertDispatcher::new(levels(), Vec::new(), Some(mailer.clone()));
        assert_eq!(
            no_recipients.dispatch(&record("CRITICAL")).await,
            Outcome::Skipped(SkipReason::NoRecipients)
        );
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_is_reported_not_raised() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let dispatcher = AlertDispatcher::new(levels(), vec!["ops@example.com".to_string()], Some(mailer));
        assert!(dispatcher.dispatch(&record("ERROR")).await.is_failed());
    }

    #[test]
    fn test_smtp_settings_debug_hides_password() {
        let settings = SmtpSettings::new("bot@example.com", "hunter2");
        assert!(!format!("{:?}", settings).contains("hunter2"));
        assert_eq!(settings.port, DEFAULT_SMTP_PORT);
    }
}
