//! Special commands parser for interactive chat mode
//!
//! Special commands are entered during an interactive session and act on the
//! conversation instead of being classified:
//! - Flag a verdict as incorrect
//! - Refresh and show usage statistics
//! - Show the conversation history
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive. Bare `exit` and
//! `quit` also end the session. `/say <text>` submits `<text>` verbatim, so a
//! prompt that would otherwise parse as a command can still be classified.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument that was not given
    #[error("Missing argument for {command}\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Flag a verdict as incorrect
    ///
    /// `/flag` targets the most recent verdict; `/flag <n>` targets the
    /// n-th verdict, numbered as in `/history`.
    Flag(Option<usize>),

    /// Refresh and display usage statistics
    Stats,

    /// Print every message with its number
    History,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Submit the text for classification as typed
    Say(String),

    /// Not a special command
    ///
    /// The input should be submitted for classification.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, and `CommandError::UnsupportedArgument` if `/flag` gets
/// something other than a message number. `/say` without text yields
/// `CommandError::MissingArgument`.
///
/// # Examples
///
/// ```
/// use guardchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/flag").unwrap(), SpecialCommand::Flag(None));
/// assert_eq!(parse_special_command("/flag 3").unwrap(), SpecialCommand::Flag(Some(3)));
/// assert_eq!(
///     parse_special_command("what are investment strategies?").unwrap(),
///     SpecialCommand::None
/// );
/// assert_eq!(
///     parse_special_command("/say exit").unwrap(),
///     SpecialCommand::Say("exit".to_string())
/// );
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    if let Some(text) = say_text(trimmed) {
        if text.is_empty() {
            return Err(CommandError::MissingArgument {
                command: "/say".to_string(),
                usage: "/say <text>".to_string(),
            });
        }
        return Ok(SpecialCommand::Say(text.to_string()));
    }

    match lower.as_str() {
        "/flag" => Ok(SpecialCommand::Flag(None)),
        input if input.starts_with("/flag ") => {
            let arg = input[6..].trim();
            arg.parse::<usize>()
                .map(|n| SpecialCommand::Flag(Some(n)))
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/flag".to_string(),
                    arg: arg.to_string(),
                })
        }
        "/stats" => Ok(SpecialCommand::Stats),
        "/history" => Ok(SpecialCommand::History),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Text following a `/say` prefix, with the original case kept
fn say_text(trimmed: &str) -> Option<&str> {
    let prefix = trimmed.get(..4)?;
    if !prefix.eq_ignore_ascii_case("/say") {
        return None;
    }
    let rest = &trimmed[4..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Print help for the special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

FEEDBACK:
  /flag           - Flag the most recent verdict as incorrect
  /flag <n>       - Flag verdict #<n> (numbers are shown in /history)

SESSION INFORMATION:
  /stats          - Refresh and show usage statistics
  /history        - Show the conversation with message numbers
  /help           - Show this help message

EXIT:
  /exit, exit, quit - Exit the session

Anything else you type is submitted for classification. Lines starting
with / and the bare words exit and quit are read as commands; use
/say <text> to classify such a prompt as typed:
  /say exit
  /say /etc/passwd
"#
    );
}
