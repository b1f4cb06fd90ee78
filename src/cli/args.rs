//! CLI argument definitions using clap

use clap::{ArgAction, Parser};
use std::fmt;
use std::path::PathBuf;

/// A spec location or URL whose userinfo is redacted in Debug/Display output
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SensitiveUrl(pub String);

impl SensitiveUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replace any `user:password@` part with a placeholder
    pub fn redacted(&self) -> String {
        if let Ok(mut url) = url::Url::parse(&self.0) {
            if !url.username().is_empty() || url.password().is_some() {
                let _ = url.set_username("[REDACTED]");
                let _ = url.set_password(None);
                return url.to_string();
            }
        }
        self.0.clone()
    }
}

impl fmt::Debug for SensitiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveUrl(\"{}\")", self.redacted())
    }
}

impl fmt::Display for SensitiveUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl std::str::FromStr for SensitiveUrl {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SensitiveUrl(s.to_string()))
    }
}

impl AsRef<str> for SensitiveUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// specpulse - call any endpoint of an OpenAPI/Swagger document interactively
#[derive(Parser, Debug, Clone)]
#[command(name = "specpulse", version, about, long_about = None)]
pub struct Args {
    /// Path or URL of the OpenAPI (JSON or YAML) document
    #[arg(value_name = "SPEC")]
    pub spec: SensitiveUrl,

    /// Base URL for calls, skipping the server prompt
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<SensitiveUrl>,

    /// Use the minimal parser even when the enhanced one is available
    #[arg(long = "minimal-parser", action = ArgAction::SetTrue)]
    pub minimal_parser: bool,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Print the endpoints and exit
    #[arg(long = "list", action = ArgAction::SetTrue)]
    pub list: bool,

    /// Print each request before sending it, secrets redacted
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Debug logging to stderr
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Config file to use instead of the default location
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}
