//! Configuration loading from the process environment.

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::Parser;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("missing required setting: {0}")]
    Missing(String),

    /// A setting was provided but could not be parsed.
    #[error("invalid setting: {0}")]
    Invalid(String),
}

impl From<clap::Error> for ConfigError {
    fn from(err: clap::Error) -> Self {
        // Keep the diagnostic, drop the usage footer.
        let rendered = err.render().to_string();
        let diagnostic = rendered.split("\n\nUsage:").next().unwrap_or_default();
        let message = diagnostic
            .trim_start_matches("error: ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match err.kind() {
            ErrorKind::MissingRequiredArgument => ConfigError::Missing(message),
            _ => ConfigError::Invalid(message),
        }
    }
}

/// Load configuration from environment variables and process arguments.
///
/// `--help` and `--version` print and exit here; every other problem is
/// returned so the caller can log it before terminating.
pub fn load<T: Parser>() -> Result<T, ConfigError> {
    load_from(std::env::args_os())
}

/// Load configuration from an explicit argument list (environment still applies).
pub fn load_from<T, I, A>(args: I) -> Result<T, ConfigError>
where
    T: Parser,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(config) => Ok(config),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => Err(err.into()),
    }
}
