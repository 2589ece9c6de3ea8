use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_outbox_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for CORS and password reset links")
                .env("ROSTER_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session cookie TTL in seconds")
                .env("ROSTER_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("ROSTER_RESET_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-outbox-poll-seconds")
                .long("email-outbox-poll-seconds")
                .help("Email outbox poll interval in seconds")
                .env("ROSTER_EMAIL_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-batch-size")
                .long("email-outbox-batch-size")
                .help("Email outbox batch size per poll")
                .env("ROSTER_EMAIL_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("email-outbox-max-attempts")
                .long("email-outbox-max-attempts")
                .help("Max attempts before marking an email as failed")
                .env("ROSTER_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("email-outbox-backoff-base-seconds")
                .long("email-outbox-backoff-base-seconds")
                .help("Base delay for email outbox retry backoff")
                .env("ROSTER_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-backoff-max-seconds")
                .long("email-outbox-backoff-max-seconds")
                .help("Max delay for email outbox retry backoff")
                .env("ROSTER_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct OutboxOptions {
    pub poll_seconds: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub outbox: OutboxOptions,
}

impl Options {
    /// Collect auth and outbox arguments from the parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            reset_token_ttl_seconds: matches
                .get_one::<i64>("reset-token-ttl-seconds")
                .copied()
                .context("missing required argument: --reset-token-ttl-seconds")?,
            outbox: OutboxOptions {
                poll_seconds: matches
                    .get_one::<u64>("email-outbox-poll-seconds")
                    .copied()
                    .context("missing required argument: --email-outbox-poll-seconds")?,
                batch_size: matches
                    .get_one::<usize>("email-outbox-batch-size")
                    .copied()
                    .context("missing required argument: --email-outbox-batch-size")?,
                max_attempts: matches
                    .get_one::<u32>("email-outbox-max-attempts")
                    .copied()
                    .context("missing required argument: --email-outbox-max-attempts")?,
                backoff_base_seconds: matches
                    .get_one::<u64>("email-outbox-backoff-base-seconds")
                    .copied()
                    .context("missing required argument: --email-outbox-backoff-base-seconds")?,
                backoff_max_seconds: matches
                    .get_one::<u64>("email-outbox-backoff-max-seconds")
                    .copied()
                    .context("missing required argument: --email-outbox-backoff-max-seconds")?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("ROSTER_FRONTEND_BASE_URL", None::<&str>),
                ("ROSTER_SESSION_TTL_SECONDS", None),
                ("ROSTER_RESET_TOKEN_TTL_SECONDS", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches =
                    command.get_matches_from(vec!["roster", "--dsn", "postgres://localhost/roster"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.frontend_base_url, "http://localhost:5173");
                assert_eq!(options.session_ttl_seconds, 86400);
                assert_eq!(options.reset_token_ttl_seconds, 3600);
                assert_eq!(options.outbox.poll_seconds, 5);
                assert_eq!(options.outbox.batch_size, 10);
                assert_eq!(options.outbox.max_attempts, 5);
                Ok(())
            },
        )
    }

    #[test]
    fn parse_overrides_from_env() -> Result<()> {
        temp_env::with_vars(
            [
                ("ROSTER_SESSION_TTL_SECONDS", Some("7200")),
                ("ROSTER_RESET_TOKEN_TTL_SECONDS", Some("600")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches =
                    command.get_matches_from(vec!["roster", "--dsn", "postgres://localhost/roster"]);
                let options = Options::parse(&matches)?;
                assert_eq!(options.session_ttl_seconds, 7200);
                assert_eq!(options.reset_token_ttl_seconds, 600);
                Ok(())
            },
        )
    }
}
