pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand};
use returns_core::config::{AppConfig, LoadOptions, LogFormat};

use commands::format_policy::PolicySource;
use commands::watch::{WatchArgs, DEFAULT_STATUS_POINTER};

#[derive(Debug, Parser)]
#[command(
    name = "returns",
    about = "Return decision engine CLI",
    long_about = "Check return eligibility, compute refunds, format policy text, dispatch agent tools, and watch provisioning status.",
    after_help = "Examples:\n  returns eligibility --purchase-date 2025-01-15 --category electronics\n  returns refund --price 500 --condition damaged --reason changed_mind\n  returns watch --status-file stack.json\n  returns doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Decide whether a purchase is still inside its category's return window")]
    Eligibility {
        #[arg(long, help = "Purchase date as YYYY-MM-DD")]
        purchase_date: String,
        #[arg(long, help = "Product category, e.g. electronics")]
        category: String,
        #[arg(long, help = "Evaluate as of this date (YYYY-MM-DD) instead of today")]
        today: Option<String>,
    },
    #[command(about = "Compute the refund and deduction for a returned item")]
    Refund {
        #[arg(long, allow_hyphen_values = true, help = "Original price, e.g. 49.99")]
        price: String,
        #[arg(long, help = "Item condition: new, opened, used, damaged")]
        condition: String,
        #[arg(long, help = "Return reason, e.g. defective or changed_mind")]
        reason: String,
    },
    #[command(
        about = "Render raw return policy text for a customer",
        group(ArgGroup::new("policy").required(true).args(["file", "text"]))
    )]
    FormatPolicy {
        #[arg(long, help = "Read policy text from this file")]
        file: Option<PathBuf>,
        #[arg(long, help = "Policy text given inline")]
        text: Option<String>,
        #[arg(long, help = "Customer question to echo above the policy")]
        question: Option<String>,
        #[arg(long, help = "Print only the formatted text")]
        raw: bool,
    },
    #[command(about = "Dispatch one agent tool call and print its outcome")]
    Tool {
        #[arg(help = "Tool name, see `returns tools`")]
        name: String,
        #[arg(long, help = "Tool input as a JSON document")]
        input: Option<String>,
        #[arg(long, help = "Correlation id to attach to the call")]
        correlation_id: Option<String>,
    },
    #[command(about = "List the tools available to the support agent")]
    Tools,
    #[command(about = "Poll a JSON status file until the resource is ready, failed, or out of attempts")]
    Watch {
        #[arg(long, help = "JSON document holding the current status")]
        status_file: PathBuf,
        #[arg(long, default_value = DEFAULT_STATUS_POINTER, help = "JSON pointer to the status string")]
        pointer: String,
        #[arg(long, help = "Seconds between checks (overrides config)")]
        interval_secs: Option<u64>,
        #[arg(long, help = "Maximum number of checks (overrides config)")]
        max_attempts: Option<u32>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and probe the decision engine and tool dispatch")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging_config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    init_logging(&logging_config);

    let result = match cli.command {
        Command::Eligibility { purchase_date, category, today } => {
            commands::eligibility::run(&purchase_date, &category, today.as_deref())
        }
        Command::Refund { price, condition, reason } => {
            commands::refund::run(&price, &condition, &reason)
        }
        Command::FormatPolicy { file, text, question, raw } => {
            let source = match (&file, &text) {
                (Some(path), _) => PolicySource::File(path),
                (None, Some(text)) => PolicySource::Text(text),
                (None, None) => PolicySource::Text(""),
            };
            commands::format_policy::run(source, question.as_deref(), raw)
        }
        Command::Tool { name, input, correlation_id } => {
            commands::tool::run(&name, input.as_deref(), correlation_id.as_deref())
        }
        Command::Tools => commands::tool::list(),
        Command::Watch { status_file, pointer, interval_secs, max_attempts } => {
            commands::watch::run(WatchArgs { status_file, pointer, interval_secs, max_attempts })
        }
        Command::Config => commands::CommandResult::plain(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::plain(commands::doctor::run(json)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command payloads on stdout stay parseable.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_writer(std::io::stderr).with_target(false).with_max_level(log_level);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
