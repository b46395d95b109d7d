//! Interactive console over a [`Session`].
//!
//! Reads one command per line, runs it against the session and prints lead
//! and email cards. Rows are numbered from 1 here, like the "Lead 1",
//! "Lead 2" headings, and from 0 in the library.
//!
//! ```text
//! > open 1
//! > rewrite 1 make it shorter
//! > set 1 body Hi Ada,\nShorter text
//! > send 1
//! ```

use std::fmt::Write as _;
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{CliError, CliResult, ServiceError, SessionError};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::{EmailDraft, EmailField, LeadRecord};
use crate::service::EmailService;
use crate::session::Session;

pub const HELP: &str = "\
Commands:
  list                         List all leads
  show <n>                     Show lead n and its email
  open <n>                     Open the editor for lead n (closes any other)
  cancel <n>                   Close the editor, dropping unsaved edits
  rewrite <n> <instruction>    Ask the AI to rewrite the email
  set <n> <to|subject|body> <value>
                               Edit a field (\\n inserts a line break)
  send <n>                     Send the edited email
  help                         Show this help
  quit                         Leave";

/// A parsed console line. Row indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Show(usize),
    Open(usize),
    Cancel(usize),
    Rewrite(usize, String),
    Set(usize, EmailField, String),
    Send(usize),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = split_word(line);

        match verb.to_ascii_lowercase().as_str() {
            "list" | "ls" => Ok(Command::List),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "show" => Ok(Command::Show(parse_row(rest)?)),
            "open" | "edit" => Ok(Command::Open(parse_row(rest)?)),
            "cancel" => Ok(Command::Cancel(parse_row(rest)?)),
            "send" => Ok(Command::Send(parse_row(rest)?)),
            "rewrite" => {
                let (row, instruction) = split_word(rest);
                if instruction.is_empty() {
                    return Err("Usage: rewrite <n> <instruction>".to_string());
                }
                Ok(Command::Rewrite(parse_row(row)?, instruction.to_string()))
            }
            "set" => {
                let (row, rest) = split_word(rest);
                let (field, value) = split_word(rest);
                if field.is_empty() {
                    return Err("Usage: set <n> <to|subject|body> <value>".to_string());
                }
                Ok(Command::Set(parse_row(row)?, field.parse()?, unescape(value)))
            }
            "" => Err("Empty command".to_string()),
            other => Err(format!("Unknown command '{}' (type 'help')", other)),
        }
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn parse_row(s: &str) -> Result<usize, String> {
    let s = s.trim();
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("Invalid lead number '{}' (leads are numbered from 1)", s)),
    }
}

fn unescape(value: &str) -> String {
    value.replace("\\n", "\n")
}

// =============================================================================
// Rendering
// =============================================================================

/// "Lead 1: Ada Lovelace - Analytical Engines"
pub fn lead_heading(index: usize, lead: &LeadRecord) -> String {
    format!("Lead {}: {} - {}", index + 1, lead.full_name(), lead.company_name)
}

/// Lead information card.
pub fn render_lead(lead: &LeadRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {}", lead.full_name());
    let _ = writeln!(out, "  Company:   {}", lead.company_name);
    let _ = writeln!(out, "  Title:     {}", lead.job_title);
    let _ = writeln!(out, "  Industry:  {}", lead.industry);
    let _ = writeln!(out, "  Lead Type: {}", lead.lead_type);
    let _ = writeln!(out, "  Notes/Event:");
    for line in lead.notes_event.lines() {
        let _ = writeln!(out, "    {}", line);
    }
    out
}

/// Email card.
pub fn render_email(email: &EmailDraft) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  To: {}", email.to);
    let _ = writeln!(out, "  Subject: {}", email.subject);
    let _ = writeln!(out);
    for line in email.body.lines() {
        let _ = writeln!(out, "  {}", line);
    }
    out
}

/// Full row: lead card, current email and, when open, the editor.
///
/// Rendering an open editor seeds its working copy.
pub fn render_row(session: &mut Session, index: usize) -> CliResult<String> {
    let row = session.row(index)?;
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "{}", lead_heading(index, &row.lead));
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "Lead Information");
    out.push_str(&render_lead(&row.lead));

    let rewritten = session
        .row_state(index)
        .is_some_and(|s| s.rewritten_draft.is_some());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", if rewritten { "Rewritten Email" } else { "Drafted Email" });
    out.push_str(&render_email(session.current_draft(index)?));

    if session.is_editing(index) {
        let copy = session.editable_copy(index)?.clone();
        let instruction = session
            .row_state(index)
            .map(|s| s.pending_instruction.clone())
            .unwrap_or_default();

        let _ = writeln!(out);
        let _ = writeln!(out, "Editing (set {} <field> <value>, send {}, cancel {})", index + 1, index + 1, index + 1);
        if !instruction.is_empty() {
            let _ = writeln!(out, "  Instruction: {}", instruction);
        }
        out.push_str(&render_email(&copy));
    }

    Ok(out)
}

/// One line per lead, marking the open editor.
pub fn render_list(session: &Session) -> String {
    let mut out = String::new();
    for (index, row) in session.rows().iter().enumerate() {
        let marker = if session.is_editing(index) { "✏️ " } else { "  " };
        let _ = writeln!(out, "{} {}", marker, lead_heading(index, &row.lead));
    }
    out
}

/// Print a failed action the way the user expects to see it: status code and
/// body for service answers, the message otherwise.
pub fn report_error(err: &SessionError) {
    match err {
        SessionError::Service(ServiceError::Status { status, body }) => {
            log_error(format!("Error: API returned status code {}", status));
            log_error(format!("Response: {}", body));
        }
        other => log_error(format!("An error occurred: {}", other)),
    }
}

// =============================================================================
// Loop
// =============================================================================

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command. Failures are reported and never end the session.
pub async fn execute<S: EmailService, W: Write>(
    session: &mut Session,
    service: &S,
    command: Command,
    out: &mut W,
) -> CliResult<Flow> {
    let result = match command {
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => {
            writeln!(out, "{}", HELP)?;
            Ok(())
        }
        Command::List => {
            if session.is_empty() {
                log_warning("No leads loaded.");
            }
            write!(out, "{}", render_list(session))?;
            Ok(())
        }
        Command::Show(index) => show(session, index, out)?,
        Command::Open(index) => match session.open_editor(index) {
            Ok(()) => show(session, index, out)?,
            Err(e) => Err(e),
        },
        Command::Cancel(index) => session.cancel_editor(index).map(|_| {
            log_info(format!("Editing of lead {} cancelled", index + 1));
        }),
        Command::Set(index, field, value) => session.update_field(index, field, value).map(|_| {
            log_success(format!("Updated {} of lead {}", field, index + 1));
        }),
        Command::Rewrite(index, instruction) => {
            log_info("Rewriting email...");
            match session.request_rewrite(service, index, &instruction).await {
                Ok(email) => {
                    log_success("Email rewritten");
                    write!(out, "{}", render_email(email))?;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Command::Send(index) => {
            log_info("Sending email...");
            match session.send_email(service, index).await {
                Ok(_) => {
                    log_success("Email sent successfully!");
                    Ok(())
                }
                Err(e) => {
                    log_error("Failed to send email");
                    Err(e)
                }
            }
        }
    };

    if let Err(e) = result {
        report_error(&e);
    }
    Ok(Flow::Continue)
}

fn show<W: Write>(
    session: &mut Session,
    index: usize,
    out: &mut W,
) -> CliResult<Result<(), SessionError>> {
    match render_row(session, index) {
        Ok(text) => {
            write!(out, "{}", text)?;
            Ok(Ok(()))
        }
        Err(CliError::Session(e)) => Ok(Err(e)),
        Err(other) => Err(other),
    }
}

/// Read commands until `quit` or end of input.
pub async fn run<S, R, W>(session: &mut Session, service: &S, input: R, out: &mut W) -> CliResult<()>
where
    S: EmailService,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if execute(session, service, command, out).await? == Flow::Quit {
                    break;
                }
            }
            Err(message) => log_warning(message),
        }
    }
    writeln!(out)?;
    Ok(())
}
