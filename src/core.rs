//! Run orchestration
//!
//! Loads the document, picks a base URL, lets the user select endpoints and
//! calls them one after another.

use std::io::Write;

use clap::Parser;
use indexmap::IndexMap;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::auth::{resolve_requirement, AuthContext};
use crate::cli::Args;
use crate::client::{build_client, Executor, ResponseResult};
use crate::collect::collect_values;
use crate::config::Config;
use crate::context::Environment;
use crate::errors::{Result, SpecPulseError};
use crate::openapi::{load, select_normalizer, Endpoint, Specification};
use crate::output::{render_response, Painter};
use crate::prompt::{Prompter, TerminalPrompter};
use crate::request::RequestPlan;
use crate::select::{listing, select_endpoints};
use crate::signals;
use crate::status::ExitStatus;

pub const LOG_ENV: &str = "SPECPULSE_LOG";

/// Main entry point for the CLI
pub fn run(args: Vec<String>, env: Environment) -> ExitStatus {
    let parsed = match Args::try_parse_from(&args) {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    init_tracing(parsed.debug);

    let mut prompter = TerminalPrompter::new(env.stdin_isatty, env.stderr_isatty);
    let mut stdout = std::io::stdout();
    match run_with(&parsed, &env, &mut prompter, &mut stdout) {
        Ok(status) => status,
        Err(SpecPulseError::Interrupted) => ExitStatus::Interrupted,
        Err(e) => {
            prompter.error(&e.to_string());
            ExitStatus::Error
        }
    }
}

/// Install the stderr log subscriber. `SPECPULSE_LOG`, then `RUST_LOG`, override the level.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

/// The whole interactive run, with the prompter and output supplied by the caller
pub fn run_with(
    args: &Args,
    env: &Environment,
    prompter: &mut dyn Prompter,
    out: &mut dyn Write,
) -> Result<ExitStatus> {
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            prompter.warn(&format!("Failed to load config: {}", e));
            Config::default()
        }
    };
    debug!(config = %config.config_file.display(), "Configuration ready");

    let client = build_client(&config.client_options(args.timeout)?)?;

    let (normalizer, notice) = select_normalizer(args.minimal_parser);
    if let Some(notice) = notice {
        prompter.warn(&notice);
    }

    info!(spec = %args.spec, "Loading document");
    let raw = load(args.spec.as_str(), &client)?;
    let spec = normalizer.normalize(&raw)?;

    for warning in &spec.warnings {
        prompter.warn(&warning.to_string());
    }
    prompter.info(&format!(
        "Loaded '{}' {} ({} endpoints, {} parser)",
        spec.title,
        spec.version,
        spec.endpoints.len(),
        spec.capability
    ));

    if args.list {
        for line in listing(&spec.endpoints) {
            writeln!(out, "{}", line)?;
        }
        return Ok(ExitStatus::Success);
    }

    let forced_base = args.base_url.as_ref().map(|u| u.as_str().to_string());
    let base_url = match forced_base.clone() {
        Some(url) => validate_base_url(&url)?,
        None => match choose_base_url(&spec, config.prefer_https, prompter)? {
            Some(url) => url,
            None => {
                return Err(SpecPulseError::Validation("no base URL provided".to_string()));
            }
        },
    };

    let selection = select_endpoints(&spec.endpoints, prompter)?;
    if selection.is_empty() {
        prompter.info("No endpoints selected. Exiting.");
        return Ok(ExitStatus::Success);
    }

    let mut runner = Runner::new(&spec, base_url, client)
        .forced_base(forced_base.is_some())
        .default_headers(config.headers.clone())
        .verbose(args.verbose)
        .painter(Painter::new(env.colors));
    runner.run_selection(&selection, prompter, out)?;

    Ok(ExitStatus::Success)
}

/// Check that a base URL is an absolute http(s) URL, trailing slash removed
pub fn validate_base_url(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('/');
    match url::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(trimmed.to_string()),
        _ => Err(SpecPulseError::Validation(format!(
            "'{}' is not an absolute http(s) URL",
            input.trim()
        ))),
    }
}

/// The declared base URL to offer, https first when preferred
pub fn suggest_base_url(base_urls: &[String], prefer_https: bool) -> Option<&str> {
    let preferred = prefer_https
        .then(|| base_urls.iter().find(|u| u.starts_with("https://")))
        .flatten();
    preferred.or_else(|| base_urls.first()).map(|u| u.trim_end_matches('/'))
}

/// Ask for the base URL. `None` when the user gives nothing.
pub fn choose_base_url(
    spec: &Specification,
    prefer_https: bool,
    prompter: &mut dyn Prompter,
) -> Result<Option<String>> {
    let suggestion = suggest_base_url(&spec.base_urls, prefer_https);
    match suggestion {
        Some(url) => {
            prompter.info(&format!("A server URL was found in the document: {}", url));
            for other in spec.base_urls.iter().filter(|u| u.trim_end_matches('/') != url) {
                prompter.info(&format!("  also declared: {}", other));
            }
        }
        None => prompter.warn("No servers declared in the document."),
    }

    loop {
        let answer = prompter.text("Base API URL (e.g. https://api.example.com/v1)", suggestion)?;
        if answer.trim().is_empty() {
            return Ok(None);
        }
        match validate_base_url(&answer) {
            Ok(url) => return Ok(Some(url)),
            Err(e) => prompter.error(&e.to_string()),
        }
    }
}

/// Calls selected endpoints in order with shared authentication state
pub struct Runner<'a> {
    spec: &'a Specification,
    base_url: String,
    forced_base: bool,
    auth: AuthContext,
    executor: Executor,
    default_headers: IndexMap<String, String>,
    verbose: bool,
    painter: Painter,
}

impl<'a> Runner<'a> {
    pub fn new(spec: &'a Specification, base_url: String, client: Client) -> Self {
        Self {
            spec,
            base_url,
            forced_base: false,
            auth: AuthContext::new(client.clone()),
            executor: Executor::new(client),
            default_headers: IndexMap::new(),
            verbose: false,
            painter: Painter::new(false),
        }
    }

    /// When set, the base URL wins over servers declared on endpoints
    pub fn forced_base(mut self, forced: bool) -> Self {
        self.forced_base = forced;
        self
    }

    pub fn default_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn painter(mut self, painter: Painter) -> Self {
        self.painter = painter;
        self
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Base URL used for `endpoint`
    pub fn base_url_for<'e>(&'e self, endpoint: &'e Endpoint) -> &'e str {
        if self.forced_base {
            return &self.base_url;
        }
        endpoint
            .servers
            .first()
            .map(String::as_str)
            .unwrap_or(&self.base_url)
    }

    /// Authorize, collect, build and send one endpoint
    pub fn call(
        &mut self,
        endpoint: &Endpoint,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Result<ResponseResult> {
        let security = resolve_requirement(self.spec, endpoint);
        debug!(endpoint = %endpoint.label(), schemes = ?security.scheme_names(), "Resolved security");

        let material = self.auth.authorize(&security, prompter)?;
        let values = collect_values(endpoint, prompter)?;

        let plan = RequestPlan::build(endpoint, &values, &material, self.base_url_for(endpoint))?
            .with_default_headers(self.default_headers.iter());

        if self.verbose {
            write!(out, "{}", plan)?;
            writeln!(out)?;
        }
        prompter.info(&format!("Requesting: {} {}", plan.method, plan.url));

        self.executor.execute(&plan)
    }

    /// Call each selected endpoint. Failures are reported per endpoint and
    /// the batch continues; interrupts and exhausted input end it.
    pub fn run_selection(
        &mut self,
        selection: &[usize],
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Result<Vec<std::result::Result<u16, String>>> {
        let spec = self.spec;
        let mut outcomes = Vec::with_capacity(selection.len());

        for &index in selection {
            if signals::was_interrupted() {
                return Err(SpecPulseError::Interrupted);
            }
            let Some(endpoint) = spec.endpoints.get(index) else {
                continue;
            };

            writeln!(
                out,
                "\n--- Calling: {} {} ---",
                self.painter.method(&endpoint.method),
                endpoint.path
            )?;

            match self.call(endpoint, prompter, out) {
                Ok(response) => {
                    write!(out, "{}", render_response(&response, &self.painter))?;
                    outcomes.push(Ok(response.status));
                }
                Err(e @ (SpecPulseError::Interrupted | SpecPulseError::Prompt(_) | SpecPulseError::Io(_))) => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(endpoint = %endpoint.label(), error = %e, "Endpoint skipped");
                    prompter.error(&format!("{}: {}", endpoint.label(), e));
                    outcomes.push(Err(e.to_string()));
                }
            }
            out.flush().ok();
        }

        Ok(outcomes)
    }
}
