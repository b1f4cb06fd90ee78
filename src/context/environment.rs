//! Environment struct (terminal capabilities)

/// Execution environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub stdin_isatty: bool,
    pub stdout_isatty: bool,
    pub stderr_isatty: bool,
    /// Color output on stdout
    pub colors: bool,
}

impl Environment {
    pub fn init() -> Self {
        Self::default()
    }

    /// An environment with no terminal attached
    pub fn piped() -> Self {
        Self {
            stdin_isatty: false,
            stdout_isatty: false,
            stderr_isatty: false,
            colors: false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        let stdout_isatty = atty::is(atty::Stream::Stdout);
        Self {
            stdin_isatty: atty::is(atty::Stream::Stdin),
            stdout_isatty,
            stderr_isatty: atty::is(atty::Stream::Stderr),
            colors: stdout_isatty && detect_color_support(),
        }
    }
}

/// Colors are off for `NO_COLOR` and dumb terminals
fn detect_color_support() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(std::env::var("TERM").as_deref(), Ok("dumb"))
}
