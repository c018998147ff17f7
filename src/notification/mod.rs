//! Message types and the outbound seams used by the dispatcher.

pub mod email;
pub mod snapshot;

pub use email::SmtpMailer;
pub use snapshot::HttpSnapshot;

use crate::config::NotificationSettings;

pub const SNAPSHOT_FILENAME: &str = "snapshot.jpg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A fully rendered email, lives only for the duration of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Who the email is sent as and through which server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailIdentity {
    pub username: String,
    pub alias: String,
    pub server: String,
}

impl From<&NotificationSettings> for MailIdentity {
    fn from(settings: &NotificationSettings) -> Self {
        Self {
            username: settings.mail_username.clone(),
            alias: settings.mail_useralias.clone(),
            server: settings.mail_server.clone(),
        }
    }
}

pub trait MailTransport {
    /// Delivers `message` to every recipient in one session.
    ///
    /// Addresses are not checked up front, but an address the mail library
    /// cannot parse fails the whole send and no recipient gets the email.
    fn send(
        &self,
        identity: &MailIdentity,
        recipients: &[String],
        message: &NotificationMessage,
    ) -> anyhow::Result<()>;
}

pub trait SnapshotSource {
    fn fetch(&self, url: &str) -> anyhow::Result<Attachment>;
}
