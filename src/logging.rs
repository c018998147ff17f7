// Copied and edited based on https://github.com/estk/log4rs/pull/295

use std::path::Path;

use anyhow::{anyhow, Context};
use log::LevelFilter;
use log4rs::Handle;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            policy::compound::{
                roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
            },
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

const LOG_FILE_NAME: &str = "email_notifier.log";
const ARCHIVE_PATTERN: &str = "email_notifier_{}.log";

/// Logs to stderr, and to a rolling file in `log_dir` when one is given
pub fn init_logging(level: LevelFilter, log_dir: Option<&Path>) -> anyhow::Result<Handle> {
    // Build a stderr logger. Stdout is reserved for command output.
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build();

    let mut config = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(log_dir) = log_dir {
        let file_path = log_dir.join(LOG_FILE_NAME);
        let archive_pattern = log_dir.join(ARCHIVE_PATTERN);
        // Pattern: https://docs.rs/log4rs/*/log4rs/append/rolling_file/policy/compound/roll/fixed_window/struct.FixedWindowRollerBuilder.html#method.build

        let trigger = SizeTrigger::new(2_097_152); // 2mb (2 * 1024 * 1024)
        let roller = FixedWindowRoller::builder()
            .build(&archive_pattern.to_string_lossy(), 10) // Roll based on pattern and max 10 archive files
            .map_err(|e| anyhow!("Failed to create FixedWindowRoller: {e}"))?;
        let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

        let log_file = RollingFileAppender::builder()
            // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} {l} - {m}\n",
            )))
            .build(&file_path, Box::new(policy))
            .with_context(|| format!("Failed to open log file {file_path:?}"))?;

        config = config.appender(Appender::builder().build("log_file", Box::new(log_file)));
        root = root.appender("log_file");
    }

    let config = config
        .build(root.build(level))
        .context("Failed to configure logging")?;

    let handle = log4rs::init_config(config).context("Failed to init_config")?;

    Ok(handle)
}
