use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, bail, Context};
use lettre::{
    message::{header::ContentType, Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Address, Message, SmtpTransport, Transport,
};
use log::{debug, warn};

use super::{MailIdentity, MailTransport, NotificationMessage};
use crate::config::{SmtpOptions, TlsMode};

/// Sends notifications over SMTP, one session per message
pub struct SmtpMailer {
    options: SmtpOptions,
}

impl SmtpMailer {
    /// Credentials are read when a message is sent, so a missing file only fails that send
    pub fn new(options: SmtpOptions) -> Self {
        Self { options }
    }

    fn password_for(&self, username: &str) -> anyhow::Result<Option<String>> {
        match &self.options.credentials_file {
            Some(path) => Ok(load_passwords(path)?.remove(username)),
            None => {
                debug!("No SMTP credentials file configured");
                Ok(None)
            }
        }
    }

    fn transport(&self, identity: &MailIdentity) -> anyhow::Result<SmtpTransport> {
        let (host, port) = split_server(&identity.server);
        if host.is_empty() {
            bail!("No mail server configured");
        }

        let mut builder = match self.options.tls {
            TlsMode::StartTls => SmtpTransport::starttls_relay(host)
                .with_context(|| format!("Failed to set up STARTTLS for {host:?}"))?,
            TlsMode::Tls => SmtpTransport::relay(host)
                .with_context(|| format!("Failed to set up TLS for {host:?}"))?,
            TlsMode::None => {
                warn!("Connecting to {host:?} without TLS");
                SmtpTransport::builder_dangerous(host)
            }
        };

        if let Some(port) = port.or(self.options.port) {
            builder = builder.port(port);
        }
        builder = builder.timeout(Some(self.options.timeout.into()));

        match self.password_for(&identity.username)? {
            Some(password) => {
                builder = builder.credentials(Credentials::new(identity.username.clone(), password));
            }
            None => debug!(
                "No password registered for {:?}, connecting without authentication",
                identity.username
            ),
        }

        Ok(builder.build())
    }
}

impl MailTransport for SmtpMailer {
    fn send(
        &self,
        identity: &MailIdentity,
        recipients: &[String],
        message: &NotificationMessage,
    ) -> anyhow::Result<()> {
        let email = build_message(identity, recipients, message)?;
        let transport = self.transport(identity)?;
        debug!(
            "Sending {:?} to {} recipient(s) via {:?}",
            message.title,
            recipients.len(),
            identity.server
        );
        transport
            .send(&email)
            .with_context(|| format!("Failed to send email via {:?}", identity.server))?;
        Ok(())
    }
}

fn load_passwords(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read SMTP credentials from {path:?}"))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse SMTP credentials in {path:?}"))
}

/// Splits `host:port`, leaving the whole string as the host when there is no numeric port
fn split_server(server: &str) -> (&str, Option<u16>) {
    let server = server.trim();
    match server.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (server, None),
        },
        None => (server, None),
    }
}

fn build_message(
    identity: &MailIdentity,
    recipients: &[String],
    message: &NotificationMessage,
) -> anyhow::Result<Message> {
    let address: Address = identity
        .username
        .trim()
        .parse()
        .with_context(|| format!("Invalid sender address {:?}", identity.username))?;
    let alias = identity.alias.trim();
    let from = Mailbox::new((!alias.is_empty()).then(|| alias.to_string()), address);

    let mut builder = Message::builder().from(from).subject(message.title.clone());
    for recipient in recipients {
        let mailbox: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid recipient address {recipient:?}"))?;
        builder = builder.to(mailbox);
    }

    let text = SinglePart::plain(message.body.clone());
    let result = match &message.attachment {
        None => builder.singlepart(text),
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                anyhow!(
                    "Invalid attachment content type {:?}: {e}",
                    attachment.content_type
                )
            })?;
            let image = MimeAttachment::new(attachment.filename.clone())
                .body(attachment.data.clone(), content_type);
            builder.multipart(MultiPart::mixed().singlepart(text).singlepart(image))
        }
    };
    result.context("Failed to build email message")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::notification::{Attachment, SNAPSHOT_FILENAME};
    use rstest::rstest;

    fn identity(server: &str) -> MailIdentity {
        MailIdentity {
            username: "printer@example.com".to_string(),
            alias: "Workshop Printer".to_string(),
            server: server.to_string(),
        }
    }

    fn message(attachment: Option<Attachment>) -> NotificationMessage {
        NotificationMessage {
            title: "Print job complete".to_string(),
            body: "benchy.gcode done printing after 00:42:00".to_string(),
            attachment,
        }
    }

    #[rstest]
    #[case("smtp.example.com", "smtp.example.com", None)]
    #[case("smtp.example.com:2525", "smtp.example.com", Some(2525))]
    #[case(" smtp.example.com:25 ", "smtp.example.com", Some(25))]
    #[case("smtp.example.com:abc", "smtp.example.com:abc", None)]
    #[case("", "", None)]
    fn server_split(#[case] server: &str, #[case] host: &str, #[case] port: Option<u16>) {
        assert_eq!(split_server(server), (host, port));
    }

    #[test]
    fn plain_message_headers() {
        let recipients = vec!["a@x.com".to_string(), "b@y.com".to_string()];

        let email = build_message(&identity("smtp.example.com"), &recipients, &message(None))
            .unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("Subject: Print job complete"));
        assert!(formatted.contains("printer@example.com"));
        assert!(formatted.contains("a@x.com"));
        assert!(formatted.contains("b@y.com"));
        assert!(!formatted.contains("multipart/mixed"));
    }

    #[test]
    fn snapshot_becomes_mixed_part() {
        let attachment = Attachment {
            filename: SNAPSHOT_FILENAME.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8, 0xff, 0xe0],
        };

        let email = build_message(
            &identity("smtp.example.com"),
            &["a@x.com".to_string()],
            &message(Some(attachment)),
        )
        .unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();

        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("image/jpeg"));
        assert!(formatted.contains(SNAPSHOT_FILENAME));
    }

    #[test]
    fn unparseable_recipient_fails_build() {
        let err = build_message(
            &identity("smtp.example.com"),
            &["not an address".to_string()],
            &message(None),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not an address"));
    }

    #[test]
    fn credentials_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "printer@example.com": "hunter2" }"#)
            .unwrap();

        let mailer = SmtpMailer::new(SmtpOptions {
            credentials_file: Some(file.path().to_path_buf()),
            ..Default::default()
        });

        assert_eq!(
            mailer.password_for("printer@example.com").unwrap().as_deref(),
            Some("hunter2")
        );
        assert_eq!(mailer.password_for("someone@else.com").unwrap(), None);
    }

    #[test]
    fn missing_credentials_file_fails_the_send() {
        let mailer = SmtpMailer::new(SmtpOptions {
            credentials_file: Some("no/such/credentials.json".into()),
            tls: TlsMode::None,
            ..Default::default()
        });

        let err = mailer
            .send(
                &identity("127.0.0.1:1"),
                &["a@x.com".to_string()],
                &message(None),
            )
            .unwrap_err();

        assert!(format!("{err:#}").contains("no/such/credentials.json"));
    }

    #[test]
    fn empty_server_is_rejected() {
        let mailer = SmtpMailer::new(SmtpOptions::default());
        let err = mailer
            .send(&identity(""), &["a@x.com".to_string()], &message(None))
            .unwrap_err();
        assert_eq!(err.to_string(), "No mail server configured");
    }

    #[test]
    fn unreachable_server_fails() {
        let mailer = SmtpMailer::new(SmtpOptions {
            tls: TlsMode::None,
            timeout: 2.into(),
            ..Default::default()
        });

        let result = mailer.send(
            &identity("127.0.0.1:1"),
            &["a@x.com".to_string()],
            &message(None),
        );

        assert!(result.is_err());
    }
}
