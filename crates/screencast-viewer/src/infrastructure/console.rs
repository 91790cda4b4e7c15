//! Console I/O: commands in from stdin, conversation out to stdout.
//!
//! Stdin is read on a plain OS thread rather than a runtime task, so a
//! pending read never holds up runtime shutdown after `/quit`.

use std::io::BufRead;

use screencast_core::Origin;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::ViewerCommand;
use crate::infrastructure::session::SessionEvent;

/// Starts a thread that forwards stdin lines as commands.
pub fn spawn_stdin_reader(commands: mpsc::Sender<ViewerCommand>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            forward_commands(stdin.lock(), &commands);
        })
        .map(|_| ())
}

/// Parses each line of `input` and sends the commands on.  Blocking.
///
/// Parse errors are printed to stderr and skipped.  Returns when `input`
/// reaches EOF or the session stops listening.
pub fn forward_commands(input: impl BufRead, commands: &mpsc::Sender<ViewerCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("stdin read failed: {e}");
                break;
            }
        };
        match ViewerCommand::parse(&line) {
            Ok(command) => {
                if commands.blocking_send(command).is_err() {
                    break;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    debug!("console input finished");
}

/// Formats one session event as console output.
pub fn render_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Chat { origin, text } => format!("{} {text}", speaker(*origin)),
        SessionEvent::File {
            origin: Origin::Remote,
            number,
            file_name,
            size,
        } => format!("[peer] sent file '{file_name}' ({size} bytes), /save {number} to keep it"),
        SessionEvent::File {
            origin: Origin::Local,
            file_name,
            size,
            ..
        } => format!("[you] sent file '{file_name}' ({size} bytes)"),
        SessionEvent::Status(status) => format!("* {status}"),
        SessionEvent::Notice(text) => text.clone(),
    }
}

fn speaker(origin: Origin) -> &'static str {
    match origin {
        Origin::Local => "[you]",
        Origin::Remote => "[peer]",
    }
}

/// Prints events until the session drops its sender.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        println!("{}", render_event(&event));
    }
}
