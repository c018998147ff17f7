//! Turns host events and API commands into sent notification emails.
//!
//! Both entry points share one sequence: render the text, optionally attach a
//! webcam snapshot, hand the message to the mail transport. Failures are logged
//! and reported as return values, never propagated to the host.

use anyhow::{bail, Context};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::SettingsSource,
    notification::{Attachment, MailIdentity, MailTransport, NotificationMessage, SnapshotSource},
    template::{render, TemplateVars},
    utils::{base_name, make_single_line, split_recipients},
    ElapsedTime,
};

pub const PRINT_DONE_EVENT: &str = "PrintDone";
pub const TEST_MAIL_COMMAND: &str = "testmail";
pub const TEST_TITLE: &str = "OctoPrint Email Notifier Test";
pub const TEST_BODY: &str = "Test notification email";

/// Sent by the host when a print job finishes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawJobCompletion")]
pub struct JobCompletionPayload {
    /// Path of the printed file
    pub file: String,

    /// Seconds the job ran for
    pub time: f64,
}

/// Wire shape of the PrintDone payload. Newer hosts send `path`, older ones `file`, some both.
#[derive(Deserialize)]
struct RawJobCompletion {
    file: Option<String>,
    path: Option<String>,
    time: f64,
}

impl TryFrom<RawJobCompletion> for JobCompletionPayload {
    type Error = String;

    fn try_from(raw: RawJobCompletion) -> Result<Self, Self::Error> {
        let file = raw
            .file
            .or(raw.path)
            .ok_or_else(|| "missing field `file`".to_string())?;
        Ok(Self {
            file,
            time: raw.time,
        })
    }
}

/// Parameters of the `testmail` command, taken from the settings form rather than stored settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCommandPayload {
    pub recipients: String,
    pub smtp: String,
    pub user: String,
    pub alias: String,
    #[serde(default)]
    pub snapshot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PrintDone(JobCompletionPayload),
    Other(String),
}

impl Event {
    pub fn from_parts(name: &str, payload: serde_json::Value) -> anyhow::Result<Self> {
        if name == PRINT_DONE_EVENT {
            let payload = serde_json::from_value(payload)
                .with_context(|| format!("Invalid payload for {name} event"))?;
            Ok(Self::PrintDone(payload))
        } else {
            Ok(Self::Other(name.to_string()))
        }
    }
}

/// Reply to the `testmail` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub success: bool,
    #[serde(rename = "msg", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestResult {
    fn succeeded() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    Test(TestResult),
    UnknownCommand,
    InvalidData(String),
}

impl CommandResponse {
    /// HTTP equivalent status code
    pub fn status(&self) -> u16 {
        match self {
            Self::Test(_) => 200,
            Self::UnknownCommand | Self::InvalidData(_) => 400,
        }
    }

    pub fn body(&self) -> anyhow::Result<String> {
        match self {
            Self::Test(result) => {
                serde_json::to_string(result).context("Failed to serialize test result")
            }
            Self::UnknownCommand => Ok("Unknown command".to_string()),
            Self::InvalidData(reason) => Ok(reason.clone()),
        }
    }
}

/// What happened to a job completion notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Disabled,
    Sent { with_snapshot: bool },
    Failed,
}

pub trait EventSink {
    fn on_event(&self, event: &Event);
}

pub trait CommandHandler {
    /// Names of the commands this handler accepts
    fn commands(&self) -> &'static [&'static str];

    fn on_command(&self, command: &str, data: serde_json::Value) -> CommandResponse;
}

pub struct NotificationDispatcher<S, M, P> {
    settings: S,
    mailer: M,
    snapshots: P,
}

impl<S, M, P> NotificationDispatcher<S, M, P>
where
    S: SettingsSource,
    M: MailTransport,
    P: SnapshotSource,
{
    pub fn new(settings: S, mailer: M, snapshots: P) -> Self {
        Self {
            settings,
            mailer,
            snapshots,
        }
    }

    /// Emails the configured recipients about a finished job.
    ///
    /// A snapshot that cannot be fetched is dropped and the email goes out without it.
    pub fn dispatch_job_completion(&self, payload: &JobCompletionPayload) -> DispatchOutcome {
        let settings = self.settings.settings();
        if !settings.enabled {
            debug!("Email notifications disabled, ignoring finished job");
            return DispatchOutcome::Disabled;
        }

        let elapsed_time = ElapsedTime::from(payload.time).to_string();
        let vars = TemplateVars {
            filename: base_name(&payload.file),
            elapsed_time: &elapsed_time,
        };
        let rendered = render(&settings.message_format.title, &vars).and_then(|title| {
            render(&settings.message_format.body, &vars).map(|body| (title, body))
        });
        let (title, body) = match rendered {
            Ok(parts) => parts,
            Err(e) => {
                error!("Email notification template error: {e}");
                return DispatchOutcome::Failed;
            }
        };

        let attachment = if settings.include_snapshot {
            match self.fetch_snapshot() {
                Ok(attachment) => attachment,
                Err(e) => {
                    warn!(
                        "Snapshot error (sending email notification without image): {}",
                        make_single_line(&format!("{e:#}"))
                    );
                    None
                }
            }
        } else {
            None
        };
        let with_snapshot = attachment.is_some();

        let message = NotificationMessage {
            title,
            body,
            attachment,
        };
        let recipients = split_recipients(&settings.recipient_address);
        match self.deliver(&MailIdentity::from(&settings), &recipients, &message) {
            Ok(()) => {
                info!("Print notification emailed to {}", recipients.join(", "));
                DispatchOutcome::Sent { with_snapshot }
            }
            Err(e) => {
                error!(
                    "Email notification error: {}",
                    make_single_line(&format!("{e:#}"))
                );
                DispatchOutcome::Failed
            }
        }
    }

    /// Sends a fixed test email using the server and recipients from `command`.
    ///
    /// Unlike job completion, a failed snapshot fetch is reported as a failure
    /// here so the settings form can surface a broken webcam URL. The email is
    /// still sent without the image.
    pub fn dispatch_test_notification(&self, command: &TestCommandPayload) -> TestResult {
        let mut snapshot_error = None;
        let attachment = if command.snapshot {
            match self.fetch_snapshot() {
                Ok(attachment) => attachment,
                Err(e) => {
                    let msg = format!("Snapshot error: {e:#}");
                    error!("{}", make_single_line(&msg));
                    snapshot_error = Some(msg);
                    None
                }
            }
        } else {
            None
        };

        let identity = MailIdentity {
            username: command.user.clone(),
            alias: command.alias.clone(),
            server: command.smtp.clone(),
        };
        let message = NotificationMessage {
            title: TEST_TITLE.to_string(),
            body: TEST_BODY.to_string(),
            attachment,
        };
        let recipients = split_recipients(&command.recipients);

        if let Err(e) = self.deliver(&identity, &recipients, &message) {
            let msg = format!("{e:#}");
            error!("Email notification error: {}", make_single_line(&msg));
            return TestResult::failed(msg);
        }
        info!("Test notification emailed to {}", recipients.join(", "));

        match snapshot_error {
            Some(msg) => TestResult::failed(msg),
            None => TestResult::succeeded(),
        }
    }

    fn fetch_snapshot(&self) -> anyhow::Result<Option<Attachment>> {
        match self.settings.snapshot_url() {
            Some(url) => self.snapshots.fetch(&url).map(Some),
            None => {
                debug!("No webcam snapshot URL configured, sending without image");
                Ok(None)
            }
        }
    }

    fn deliver(
        &self,
        identity: &MailIdentity,
        recipients: &[String],
        message: &NotificationMessage,
    ) -> anyhow::Result<()> {
        if recipients.is_empty() {
            bail!("No recipient addresses configured");
        }
        self.mailer.send(identity, recipients, message)
    }
}

impl<S, M, P> EventSink for NotificationDispatcher<S, M, P>
where
    S: SettingsSource,
    M: MailTransport,
    P: SnapshotSource,
{
    fn on_event(&self, event: &Event) {
        match event {
            Event::PrintDone(payload) => {
                self.dispatch_job_completion(payload);
            }
            Event::Other(name) => trace!("Ignoring event {name}"),
        }
    }
}

impl<S, M, P> CommandHandler for NotificationDispatcher<S, M, P>
where
    S: SettingsSource,
    M: MailTransport,
    P: SnapshotSource,
{
    fn commands(&self) -> &'static [&'static str] {
        &[TEST_MAIL_COMMAND]
    }

    fn on_command(&self, command: &str, data: serde_json::Value) -> CommandResponse {
        if command != TEST_MAIL_COMMAND {
            warn!("Unknown command {command:?}");
            return CommandResponse::UnknownCommand;
        }
        match serde_json::from_value::<TestCommandPayload>(data) {
            Ok(payload) => CommandResponse::Test(self.dispatch_test_notification(&payload)),
            Err(e) => CommandResponse::InvalidData(format!("Invalid {command} data: {e}")),
        }
    }
}
