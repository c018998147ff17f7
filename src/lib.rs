mod cli;
pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod notification;
pub mod template;
pub mod update;
mod units;
mod utils;

use std::process::ExitCode;

use anyhow::Context;
use log::debug;
use serde::Serialize;

pub use cli::{Cli, Command, LogLevel};
pub use config::{Config, SettingsSource};
pub use dispatcher::{
    CommandHandler, Event, EventSink, JobCompletionPayload, NotificationDispatcher,
};
pub use units::{ElapsedTime, Seconds};

use crate::{
    config::SettingsDocument,
    notification::{HttpSnapshot, SmtpMailer},
    update::update_information,
};

type Dispatcher = NotificationDispatcher<Config, SmtpMailer, HttpSnapshot>;

pub fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Event { name, payload } => {
            let payload = parse_json(payload.as_deref(), "event payload")?;
            let event = Event::from_parts(name, payload)?;
            load_dispatcher(&cli)?.on_event(&event);
            Ok(ExitCode::SUCCESS)
        }
        Command::JobDone { file, time } => {
            let event = Event::PrintDone(JobCompletionPayload {
                file: file.clone(),
                time: *time,
            });
            load_dispatcher(&cli)?.on_event(&event);
            Ok(ExitCode::SUCCESS)
        }
        Command::Command { name, data } => {
            let data = parse_json(data.as_deref(), "command data")?;
            let response = load_dispatcher(&cli)?.on_command(name, data);
            println!("{}", response.body()?);
            if response.status() == 200 {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Defaults => {
            print_json(&SettingsDocument::default())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::UpdateInfo => {
            print_json(&update_information())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_dispatcher(cli: &Cli) -> anyhow::Result<Dispatcher> {
    let config = Config::load_from(&cli.get_config_path())?;
    debug!("Notifications enabled: {}", config.emailnotifier.enabled);
    let mailer = SmtpMailer::new(config.smtp.clone());
    let snapshots = HttpSnapshot::new(config.webcam.snapshot_timeout);
    Ok(NotificationDispatcher::new(config, mailer, snapshots))
}

fn parse_json(raw: Option<&str>, what: &str) -> anyhow::Result<serde_json::Value> {
    match raw {
        Some(raw) => serde_json::from_str(raw).with_context(|| format!("Failed to parse {what}")),
        None => Ok(serde_json::Value::Null),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;

    use super::*;
    use crate::{
        config::{SmtpOptions, TlsMode},
        dispatcher::CommandResponse,
    };

    fn cli_with_config(contents: &str, args: &[&str]) -> (tempfile::NamedTempFile, Cli) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let mut argv = vec!["email_notifier", "-c", path.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::parse_from(argv);
        (file, cli)
    }

    #[test]
    fn disabled_job_done_succeeds_offline() {
        let (_file, cli) = cli_with_config(
            r#"{ "emailnotifier": { "enabled": false } }"#,
            &["job-done", "--file", "benchy.gcode", "--time", "10"],
        );
        assert!(run(cli).is_ok());
    }

    #[test]
    fn disabled_job_done_ignores_missing_credentials() {
        let (_file, cli) = cli_with_config(
            r#"{
                "emailnotifier": { "enabled": false },
                "smtp": { "credentials_file": "no/such/credentials.json" }
            }"#,
            &["job-done", "--file", "benchy.gcode", "--time", "10"],
        );
        assert!(run(cli).is_ok());
    }

    #[test]
    fn testmail_reports_missing_credentials_as_result() {
        let dispatcher = NotificationDispatcher::new(
            Config::default(),
            SmtpMailer::new(SmtpOptions {
                credentials_file: Some("no/such/credentials.json".into()),
                tls: TlsMode::None,
                ..Default::default()
            }),
            HttpSnapshot::new(2.into()),
        );

        let response = dispatcher.on_command(
            "testmail",
            serde_json::json!({
                "recipients": "me@x.com",
                "smtp": "127.0.0.1:1",
                "user": "tester@x.com",
                "alias": "",
                "snapshot": false
            }),
        );

        let CommandResponse::Test(result) = response else {
            panic!("expected a test result, got {response:?}");
        };
        assert!(!result.success);
        assert!(result
            .message
            .as_deref()
            .is_some_and(|msg| msg.contains("no/such/credentials.json")));
    }

    #[test]
    fn testmail_command_prints_result_instead_of_failing() {
        let (_file, cli) = cli_with_config(
            r#"{ "smtp": { "credentials_file": "no/such/credentials.json" } }"#,
            &[
                "command",
                "testmail",
                "--data",
                r#"{"recipients":"me@x.com","smtp":"127.0.0.1:1","user":"tester@x.com","alias":""}"#,
            ],
        );
        assert!(run(cli).is_ok());
    }

    #[test]
    fn unrelated_event_is_ignored() {
        let (_file, cli) = cli_with_config(r#"{}"#, &["event", "PrintStarted"]);
        assert!(run(cli).is_ok());
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let (_file, cli) = cli_with_config(
            r#"{}"#,
            &["event", "PrintDone", "--payload", "{not json"],
        );
        assert!(run(cli).is_err());
    }

    #[test]
    fn missing_config_is_an_error() {
        let cli = Cli::parse_from([
            "email_notifier",
            "-c",
            "no/such/config.json",
            "command",
            "testmail",
        ]);
        assert!(run(cli).is_err());
    }

    #[test]
    fn defaults_need_no_config() {
        let cli = Cli::parse_from(["email_notifier", "-c", "no/such/config.json", "defaults"]);
        assert!(run(cli).is_ok());
    }
}
