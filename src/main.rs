//! # histguard - Message History Sanitizer CLI
//!
//! Command-line front end for the sanitization pipeline. Reads a JSON message
//! history, rewrites it for the target model API and prints the result; audits tool
//! schemas for Google backends; manages configuration.
//!
//! ## Usage
//!
//! ```bash
//! # Sanitize a transcript for Gemini, tracking the session marker in a JSONL log
//! histguard sanitize --api google-gemini-cli --input history.json \
//!     --session-id abc --session-file ~/.local/share/histguard/sessions/abc.jsonl
//!
//! # Audit tool schemas
//! histguard schema-check --provider google-antigravity --input tools.json
//! ```
//!
//! Logs go to stderr so stdout stays valid JSON.
//!
//! Authors: Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp
//!

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;
use std::io::Read;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use histguard::config::Config;
use histguard::config::cli::ConfigCli;
use histguard::error::{Result, SanitizeError};
use histguard::schema::{SCHEMA_AUDITED_PROVIDERS, ToolDefinition, log_tool_schemas_for_google};
use histguard::{HistorySanitizer, InMemorySessionLog, JsonlSessionLog, Message, SessionHistoryRequest, SessionLog};

/* --- constants ------------------------------------------------------------------------------ */

/** the version as defined in cargo.toml */
const VERSION: &str = env!("CARGO_PKG_VERSION");

/** session id used when none is given */
const DEFAULT_SESSION_ID: &str = "cli";

/* --- types ----------------------------------------------------------------------------------- */

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Sanitize {
        api: String,
        input: Option<PathBuf>,
        session_id: Option<String>,
        session_file: Option<PathBuf>,
    },
    SchemaCheck {
        provider: String,
        input: Option<PathBuf>,
    },
    ConfigShow,
    ConfigValidate,
    ConfigInit {
        force: bool,
    },
}

/// Command plus global options.
#[derive(Debug, Clone, PartialEq)]
struct Invocation {
    config_file: Option<PathBuf>,
    command: Command,
}

/* --- start of code -------------------------------------------------------------------------- */

///
/// Main application entry point.
///
/// `--help` and `--version` are handled before configuration is loaded so they
/// work without a valid configuration.
#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    handle_info_args(&args);

    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!();
            eprintln!("Run 'histguard --help' for more information.");
            std::process::exit(2);
        }
    };

    let _ = dotenvy::dotenv();

    match run(invocation).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let error_msg = format!("{}", e);
            eprintln!("Error:");
            for line in error_msg.lines() {
                eprintln!("{}", line);
            }
            std::process::exit(1);
        }
    }
}

/// Run a parsed command; returns the process exit code.
async fn run(invocation: Invocation) -> Result<i32> {
    let config_file = invocation.config_file.as_deref();

    match invocation.command {
        Command::ConfigShow => ConfigCli::show(config_file).map(|_| 0),
        Command::ConfigValidate => ConfigCli::validate(config_file).map(|_| 0),
        Command::ConfigInit { force } => ConfigCli::init(config_file, force).map(|_| 0),
        Command::Sanitize { api, input, session_id, session_file } => {
            let config = Config::load_with(config_file)?;
            initialize_logging(&config);
            run_sanitize(&config, &api, input, session_id, session_file).await.map(|_| 0)
        }
        Command::SchemaCheck { provider, input } => {
            let config = Config::load_with(config_file)?;
            initialize_logging(&config);
            run_schema_check(&provider, input)
        }
    }
}

///
/// Sanitize a history read from a file or stdin and print it to stdout.
async fn run_sanitize(
    config: &Config,
    api: &str,
    input: Option<PathBuf>,
    session_id: Option<String>,
    session_file: Option<PathBuf>,
) -> Result<()> {
    let raw = read_input(input.as_ref())?;
    let messages: Vec<Message> = serde_json::from_str(&raw)?;
    let session_id = session_id.unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let session_log: Box<dyn SessionLog> = match (session_file, config.session_dir()?) {
        (Some(path), _) => Box::new(JsonlSessionLog::open(histguard::config::paths::expand_path(path)?)),
        (None, Some(dir)) => Box::new(JsonlSessionLog::for_session(dir, &session_id)),
        (None, None) => Box::new(InMemorySessionLog::new()),
    };

    let sanitized = HistorySanitizer::from_config(config)
        .sanitize_session_history(SessionHistoryRequest {
            messages: &messages,
            model_api: Some(api),
            session_log: session_log.as_ref(),
            session_id: &session_id,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&sanitized)?);
    Ok(())
}

///
/// Audit tool schemas; exits with 1 when any tool has unsupported keywords.
fn run_schema_check(provider: &str, input: Option<PathBuf>) -> Result<i32> {
    let raw = read_input(input.as_ref())?;
    let tools: Vec<ToolDefinition> = serde_json::from_str(&raw)?;

    if !SCHEMA_AUDITED_PROVIDERS.contains(&provider) {
        println!("Provider '{}' is not audited; {} tool(s) skipped.", provider, tools.len());
        return Ok(0);
    }

    let audits = log_tool_schemas_for_google(&tools, provider);
    if audits.is_empty() {
        println!("[OK] {} tool schema(s) use only supported keywords", tools.len());
        return Ok(0);
    }

    for audit in &audits {
        println!("[ERROR] {}:{} has {} unsupported keyword(s):", audit.index, audit.tool, audit.violations.len());
        for path in &audit.violations {
            println!("  • {}", path);
        }
    }
    Ok(1)
}

/// Read the whole input file, or stdin when no file is given.
fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            SanitizeError::Config(format!("Failed to read input file '{}': {}", path.display(), e))
        }),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

///
/// Initialize logging to stderr.
///
/// `RUST_LOG` overrides the configured level when set.
fn initialize_logging(config: &Config) {
    let level = config.logging.log_level.to_tracing_level().to_string().to_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

///
/// Handle `--version` and `--help` before anything else.
fn handle_info_args(args: &[String]) {
    match args.first().map(String::as_str) {
        Some("--version") | Some("-V") => {
            println!("histguard {}", VERSION);
            std::process::exit(0);
        }
        Some("--help") | Some("-h") | None => {
            print_help();
            std::process::exit(0);
        }
        _ => {}
    }
}

///
/// Parse command line arguments (without the program name).
fn parse_args(args: &[String]) -> std::result::Result<Invocation, String> {
    let mut config_file = None;
    let mut positional: Vec<&str> = Vec::new();
    let mut options: Vec<(&str, Option<&str>)> = Vec::new();

    let mut iter = args.iter().map(String::as_str);
    while let Some(arg) = iter.next() {
        match arg {
            "--config" | "-c" => {
                let value = iter.next().ok_or("--config requires a file path")?;
                config_file = Some(PathBuf::from(value));
            }
            "--force" => options.push((arg, None)),
            flag if flag.starts_with("--") => {
                let value = iter.next().ok_or_else(|| format!("{} requires a value", flag))?;
                options.push((flag, Some(value)));
            }
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {}", flag)),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        ["sanitize"] => {
            check_options(&options, &["--api", "--input", "--session-id", "--session-file"])?;
            Command::Sanitize {
                api: option_value(&options, "--api").ok_or("sanitize requires --api <model-api>")?,
                input: option_value(&options, "--input").map(PathBuf::from),
                session_id: option_value(&options, "--session-id"),
                session_file: option_value(&options, "--session-file").map(PathBuf::from),
            }
        }
        ["schema-check"] => {
            check_options(&options, &["--provider", "--input"])?;
            Command::SchemaCheck {
                provider: option_value(&options, "--provider").ok_or("schema-check requires --provider <id>")?,
                input: option_value(&options, "--input").map(PathBuf::from),
            }
        }
        ["config", "show"] => {
            check_options(&options, &[])?;
            Command::ConfigShow
        }
        ["config", "validate"] => {
            check_options(&options, &[])?;
            Command::ConfigValidate
        }
        ["config", "init"] => {
            check_options(&options, &["--force"])?;
            Command::ConfigInit { force: options.iter().any(|(flag, _)| *flag == "--force") }
        }
        ["config", ..] => return Err("config expects one of: show, validate, init".to_string()),
        [] => return Err("No command given".to_string()),
        [other, ..] => return Err(format!("Unknown command: {}", other)),
    };

    Ok(Invocation { config_file, command })
}

/// Value of `name`, if it was given.
fn option_value(options: &[(&str, Option<&str>)], name: &str) -> Option<String> {
    options.iter().find(|(flag, _)| *flag == name).and_then(|(_, value)| value.map(str::to_string))
}

/// Reject options the command does not take.
fn check_options(options: &[(&str, Option<&str>)], allowed: &[&str]) -> std::result::Result<(), String> {
    match options.iter().find(|(flag, _)| !allowed.iter().any(|a| a == flag)) {
        Some((flag, _)) => Err(format!("Unknown option: {}", flag)),
        None => Ok(()),
    }
}

///
/// Print help information for the histguard CLI.
fn print_help() {
    println!("histguard v{}", VERSION);
    println!("Sanitizes agent message histories for the constraints of LLM backends");
    println!();
    println!("USAGE:");
    println!("    histguard [--config <file>] <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    sanitize            Sanitize a JSON message history and print it");
    println!("        --api <id>              Target model API (e.g. google-gemini-cli)");
    println!("        --input <file>          History file (default: stdin)");
    println!("        --session-id <id>       Session identifier (default: cli)");
    println!("        --session-file <path>   JSONL session log for the turn-ordering marker");
    println!("    schema-check        Report tool schema keywords Google rejects");
    println!("        --provider <id>         Provider (google-antigravity, google-gemini-cli)");
    println!("        --input <file>          JSON array of tools (default: stdin)");
    println!("    config show         Show the effective configuration");
    println!("    config validate     Validate the configuration");
    println!("    config init         Write an example configuration [--force]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <file> Extra configuration file, above the user config");
    println!("    -h, --help          Print help information");
    println!("    -V, --version       Print version information");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    HISTGUARD_LOG_LEVEL             trace, debug, info, warn, error (default: info)");
    println!("    HISTGUARD_SESSION_DIR           Directory of per-session JSONL logs");
    println!("    HISTGUARD_SCOPE_TAG             Image sanitizer scope (default: session:history)");
    println!("    HISTGUARD_LOG_MARKER_FAILURES   Log swallowed marker failures (default: true)");
    println!("    HISTGUARD_MAX_IMAGE_BYTES       Largest inline image accepted");
    println!("    HISTGUARD_ALLOWED_MIME_TYPES    Comma-separated accepted image types");
}

/* --- tests ----------------------------------------------------------------------------------- */
