//! Leadmail CLI - draft, rewrite and send lead emails
//!
//! # Commands
//!
//! ```bash
//! leadmail draft leads.xlsx                         # Upload and print every draft
//! leadmail session leads.xlsx                       # Interactive review/edit/send
//! leadmail rewrite --email e.json --prompt "..."    # One-shot rewrite
//! leadmail send --email e.json                      # One-shot send
//! leadmail mock-serve                               # Local mock of the service
//! ```

use clap::{Parser, Subcommand};
use leadmail::config::{DEFAULT_MOCK_PORT, XLSX_EXTENSION};
use leadmail::console::{self, render_row};
use leadmail::{
    log_info, log_success, log_warning, normalize_email, normalize_email_str, CliError,
    CliResult, ClientConfig, EmailDraft, EmailService, HttpEmailService, LoadOutcome, Session,
    SpreadsheetUpload,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::BufReader;

#[derive(Parser)]
#[command(name = "leadmail")]
#[command(about = "Review, rewrite and send AI-drafted emails for a spreadsheet of leads", long_about = None)]
struct Cli {
    /// Base URL of the drafting service (overrides LEADMAIL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a spreadsheet and print the drafted emails
    Draft {
        /// Input XLSX file
        input: PathBuf,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a spreadsheet and review, rewrite and send its emails interactively
    Session {
        /// Input XLSX file
        input: PathBuf,
    },

    /// Rewrite one email following an instruction
    Rewrite {
        /// Email JSON file (object or legacy "Subject: ..." string)
        #[arg(short, long)]
        email: PathBuf,

        /// Rewrite instruction
        #[arg(short, long)]
        prompt: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send one email
    Send {
        /// Email JSON file (object or legacy "Subject: ..." string)
        #[arg(short, long)]
        email: PathBuf,
    },

    /// Start the mock drafting service
    MockServe {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_MOCK_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let api_url = cli.api_url;

    let result = match cli.command {
        Commands::Draft { input, json, output } => {
            cmd_draft(api_url.as_deref(), &input, json, output.as_deref()).await
        }
        Commands::Session { input } => cmd_session(api_url.as_deref(), &input).await,
        Commands::Rewrite { email, prompt, output } => {
            cmd_rewrite(api_url.as_deref(), &email, &prompt, output.as_deref()).await
        }
        Commands::Send { email } => cmd_send(api_url.as_deref(), &email).await,
        Commands::MockServe { port } => leadmail::server::start_server(port)
            .await
            .map_err(CliError::from),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn build_service(api_url: Option<&str>) -> CliResult<HttpEmailService> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = api_url {
        config = config.with_base_url(url)?;
    }
    log::debug!("Using API at {}", config.base_url);
    Ok(HttpEmailService::new(config)?)
}

/// Read the spreadsheet to upload. Only the extension is checked.
async fn load_upload(input: &Path) -> CliResult<SpreadsheetUpload> {
    let is_xlsx = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(XLSX_EXTENSION));
    if !is_xlsx {
        return Err(CliError::UnsupportedFile(input.display().to_string()));
    }
    Ok(SpreadsheetUpload::from_path(input).await?)
}

/// Upload and load, reporting the outcome the way the page did.
async fn process(service: &HttpEmailService, session: &mut Session, input: &Path) -> CliResult<()> {
    let upload = load_upload(input).await?;
    log_info(format!("📄 Processing your file: {}", input.display()));

    match session.process_file(service, &upload).await? {
        LoadOutcome::Loaded { rows, skipped } => {
            log_success(format!("Successfully processed {} leads!", rows));
            if skipped > 0 {
                log_warning(format!("{} malformed entries were skipped", skipped));
            }
        }
        LoadOutcome::NoResults => {
            log_warning("No results returned from the API. Please check your file and try again.");
        }
    }
    Ok(())
}

async fn cmd_draft(
    api_url: Option<&str>,
    input: &Path,
    json: bool,
    output: Option<&Path>,
) -> CliResult<()> {
    let service = build_service(api_url)?;
    let mut session = Session::new();
    process(&service, &mut session, input).await?;

    let content = if json {
        serde_json::to_string_pretty(session.rows())?
    } else {
        let mut text = String::new();
        for index in 0..session.len() {
            text.push_str(&render_row(&mut session, index)?);
            text.push('\n');
        }
        text
    };

    write_output(&content, output)
}

async fn cmd_session(api_url: Option<&str>, input: &Path) -> CliResult<()> {
    let service = build_service(api_url)?;
    let mut session = Session::new();
    process(&service, &mut session, input).await?;

    let mut stdout = std::io::stdout();
    print!("{}", console::render_list(&session));
    println!("Type 'help' for commands.");

    console::run(&mut session, &service, BufReader::new(tokio::io::stdin()), &mut stdout).await
}

async fn cmd_rewrite(
    api_url: Option<&str>,
    email_path: &Path,
    prompt: &str,
    output: Option<&Path>,
) -> CliResult<()> {
    let service = build_service(api_url)?;
    let original = read_email_file(email_path)?;

    log_info("Rewriting email...");
    let rewritten = service.refactor(&original, prompt).await?;
    log_success("Email rewritten");

    write_output(&serde_json::to_string_pretty(&rewritten)?, output)
}

async fn cmd_send(api_url: Option<&str>, email_path: &Path) -> CliResult<()> {
    let service = build_service(api_url)?;
    let email = read_email_file(email_path)?;

    log_info(format!("📤 Sending '{}' to {}", email.subject, email.to));
    let receipt = service.send(&email).await?;
    log_success("Email sent successfully!");

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

/// Email from a JSON file; plain text files are read as the legacy format.
fn read_email_file(path: &Path) -> CliResult<EmailDraft> {
    let content = fs::read_to_string(path)?;
    Ok(match serde_json::from_str::<Value>(&content) {
        Ok(value) => normalize_email(&value),
        Err(_) => normalize_email_str(&content),
    })
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult<()> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
