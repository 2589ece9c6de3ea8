use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("media-endpoint")
                .long("media-endpoint")
                .help("Object store endpoint uploads are written to")
                .env("ROSTER_MEDIA_ENDPOINT")
                .default_value("http://localhost:9000/roster-media"),
        )
        .arg(
            Arg::new("media-public-base-url")
                .long("media-public-base-url")
                .help("Public base URL stored objects are served from")
                .env("ROSTER_MEDIA_PUBLIC_BASE_URL")
                .default_value("http://localhost:9000/roster-media"),
        )
        .arg(
            Arg::new("media-auth-token")
                .long("media-auth-token")
                .help("Bearer token for object store writes")
                .env("ROSTER_MEDIA_AUTH_TOKEN"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub endpoint: String,
    pub public_base_url: String,
    pub auth_token: Option<String>,
}

impl Options {
    /// Collect object store arguments from the parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            endpoint: matches
                .get_one::<String>("media-endpoint")
                .cloned()
                .context("missing required argument: --media-endpoint")?,
            public_base_url: matches
                .get_one::<String>("media-public-base-url")
                .cloned()
                .context("missing required argument: --media-public-base-url")?,
            auth_token: matches.get_one::<String>("media-auth-token").cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() -> Result<()> {
        temp_env::with_vars([("ROSTER_MEDIA_AUTH_TOKEN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches =
                command.get_matches_from(vec!["roster", "--dsn", "postgres://localhost/roster"]);
            let options = Options::parse(&matches)?;
            assert_eq!(options.endpoint, "http://localhost:9000/roster-media");
            assert_eq!(
                options.public_base_url,
                "http://localhost:9000/roster-media"
            );
            assert!(options.auth_token.is_none());
            Ok(())
        })
    }

    #[test]
    fn parse_token_from_env() -> Result<()> {
        temp_env::with_vars([("ROSTER_MEDIA_AUTH_TOKEN", Some("sekret"))], || {
            let command = crate::cli::commands::new();
            let matches =
                command.get_matches_from(vec!["roster", "--dsn", "postgres://localhost/roster"]);
            let options = Options::parse(&matches)?;
            assert_eq!(options.auth_token.as_deref(), Some("sekret"));
            Ok(())
        })
    }
}
