use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser, Clone, PartialEq, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Emails a notification, optionally with a webcam snapshot, when a print job finishes."
)]
pub struct Cli {
    /// Specify config file to use
    ///
    /// If not specified uses `config.json` in the working directory
    #[arg(long = "config", short, value_name = "PATH")]
    pub config_filename: Option<String>,

    /// Set logging level to use
    #[arg(long, short, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Also write a rolling log file into this folder
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, PartialEq, Debug)]
pub enum Command {
    /// Deliver a host event, only PrintDone triggers an email
    Event {
        /// Event name as reported by the host
        name: String,

        /// Event payload as a JSON object
        #[arg(long, value_name = "JSON")]
        payload: Option<String>,
    },

    /// Shorthand for the PrintDone event
    JobDone {
        /// Path of the printed file
        #[arg(long, value_name = "PATH")]
        file: String,

        /// Seconds the job ran for
        #[arg(long, value_name = "SECONDS")]
        time: f64,
    },

    /// Run an API command and print its JSON response
    Command {
        /// Command name, currently only `testmail`
        name: String,

        /// Command data as a JSON object
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
    },

    /// Print the default settings document
    Defaults,

    /// Print the software update descriptor
    UpdateInfo,
}

impl Cli {
    pub fn get_config_path(&self) -> PathBuf {
        match self.config_filename.as_ref() {
            Some(val) => PathBuf::from(val),
            None => PathBuf::from("config.json"),
        }
    }
}

/// Exists to provide better help messages variants copied from LevelFilter as
/// that's the type that is actually needed
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum LogLevel {
    /// Nothing emitted in this mode
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
