//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, media};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let media_opts = media::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        email_outbox_poll_seconds: auth_opts.outbox.poll_seconds,
        email_outbox_batch_size: auth_opts.outbox.batch_size,
        email_outbox_max_attempts: auth_opts.outbox.max_attempts,
        email_outbox_backoff_base_seconds: auth_opts.outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: auth_opts.outbox.backoff_max_seconds,
        media_endpoint: media_opts.endpoint,
        media_public_base_url: media_opts.public_base_url,
        media_auth_token: media_opts.auth_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsn_required() {
        temp_env::with_vars([("ROSTER_DSN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let result = command.try_get_matches_from(vec!["roster"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        temp_env::with_vars([("ROSTER_DSN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "roster",
                "--dsn",
                "postgres://user@localhost:5432/roster",
                "--port",
                "9090",
            ]);
            let Action::Server(args) = handler(&matches)?;
            assert_eq!(args.port, 9090);
            assert_eq!(args.dsn, "postgres://user@localhost:5432/roster");
            assert_eq!(args.session_ttl_seconds, 86400);
            assert_eq!(args.reset_token_ttl_seconds, 3600);
            Ok(())
        })
    }
}
