//! Console command parsing.
//!
//! Each line typed at the viewer console is either a chat message or a
//! slash command.  A line starting with `//` is a chat message that begins
//! with a single `/`.
//!
//! | Line                 | Command                                |
//! |----------------------|----------------------------------------|
//! | `anything else`      | [`ViewerCommand::Chat`]                |
//! | `/file <path>`       | [`ViewerCommand::SendFile`]            |
//! | `/files`             | [`ViewerCommand::ListFiles`]           |
//! | `/save <n> [dir]`    | [`ViewerCommand::SaveFile`]            |
//! | `/status`            | [`ViewerCommand::Status`]              |
//! | `/help`              | [`ViewerCommand::Help`]                |
//! | `/quit`              | [`ViewerCommand::Quit`]                |

use std::path::PathBuf;

use thiserror::Error;

/// Help text printed by `/help`.
pub const HELP: &str = "\
commands:
  <text>             send a chat message (start with // to send a leading /)
  /file <path>       send a file
  /files             list files in this conversation
  /save <n> [dir]    save file number n (default: download directory)
  /status            show the connection status
  /quit              close the connection and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    Chat(String),
    /// An empty path is passed through so the file channel can reject it.
    SendFile(PathBuf),
    ListFiles,
    /// `index` is zero-based; the console shows files numbered from 1.
    SaveFile {
        index: usize,
        dir: Option<PathBuf>,
    },
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '/{0}' (try /help)")]
    Unknown(String),
    #[error("usage: /save <n> [dir]")]
    SaveUsage,
    #[error("file numbers start at 1, got '{0}'")]
    InvalidFileNumber(String),
}

impl ViewerCommand {
    /// Parses one console line (without its trailing newline).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for unknown slash commands and malformed
    /// `/save` arguments.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(escaped) = line.strip_prefix("//") {
            return Ok(Self::Chat(format!("/{escaped}")));
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Self::Chat(line.to_string()));
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "file" => Ok(Self::SendFile(PathBuf::from(rest))),
            "files" => Ok(Self::ListFiles),
            "save" => parse_save(rest),
            "status" => Ok(Self::Status),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_save(args: &str) -> Result<ViewerCommand, CommandError> {
    let (number, dir) = match args.split_once(char::is_whitespace) {
        Some((number, dir)) => (number, Some(PathBuf::from(dir.trim()))),
        None => (args, None),
    };
    if number.is_empty() {
        return Err(CommandError::SaveUsage);
    }

    let index = number
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| CommandError::InvalidFileNumber(number.to_string()))?;

    Ok(ViewerCommand::SaveFile { index, dir })
}
