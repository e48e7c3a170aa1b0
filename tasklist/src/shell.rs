//! Interactive line-oriented front end for the controller.
//!
//! Reads one command per line, runs it against the [`App`], and prints the
//! refreshed list or an error. Generic over the reader and writer so tests
//! can drive it from memory.

use tasklist_proto::task::TaskId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::app::{App, AppError};
use crate::service::TaskService;
use crate::ui;

/// Help text printed by the `help` command.
pub const HELP: &str = "\
commands:
  list                  show the task list
  add <title>           add a task
  edit <id> <title>     change a task's title
  toggle <id>           flip a task's completed flag
  rm <id>               delete a task
  clear                 delete every task
  reset                 restore the sample tasks
  help                  show this help
  quit                  leave the shell";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Re-fetch and print the list.
    List,
    /// Add a task with the given title.
    Add(String),
    /// Retitle a task, keeping its completed flag.
    Edit(TaskId, String),
    /// Flip a task's completed flag.
    Toggle(TaskId),
    /// Delete a task.
    Remove(TaskId),
    /// Delete every task.
    Clear,
    /// Restore the seed set.
    Reset,
    /// Print the help text.
    Help,
    /// Leave the shell.
    Quit,
}

impl ShellCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown commands or bad arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word {
            "list" | "ls" => Self::List,
            "add" => Self::Add(rest.to_string()),
            "edit" => {
                let (id, title) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: edit <id> <title>".to_string())?;
                Self::Edit(parse_id(id)?, title.trim().to_string())
            }
            "toggle" => Self::Toggle(parse_id(rest)?),
            "rm" | "remove" => Self::Remove(parse_id(rest)?),
            "clear" => Self::Clear,
            "reset" => Self::Reset,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command {other:?} (try `help`)")),
        };
        Ok(Some(command))
    }
}

fn parse_id(raw: &str) -> Result<TaskId, String> {
    raw.parse().map_err(|e| format!("{e}"))
}

/// Runs a parsed command against the controller.
///
/// # Errors
///
/// Returns whatever the controller action returns.
pub async fn execute(
    app: &mut App,
    service: &TaskService,
    command: ShellCommand,
) -> Result<(), AppError> {
    match command {
        ShellCommand::List => app.load(service).await,
        ShellCommand::Add(title) => {
            app.cancel_edit();
            app.form.title = title;
            app.submit_form(service).await.map(drop)
        }
        ShellCommand::Edit(id, title) => {
            app.begin_edit(id)?;
            app.form.title = title;
            let result = app.submit_form(service).await.map(drop);
            if result.is_err() {
                app.cancel_edit();
            }
            result
        }
        ShellCommand::Toggle(id) => app.toggle(service, id).await.map(drop),
        ShellCommand::Remove(id) => app.remove(service, id).await,
        ShellCommand::Clear => app.clear(service).await,
        ShellCommand::Reset => app.reset(service).await,
        ShellCommand::Help | ShellCommand::Quit => Ok(()),
    }
}

/// Runs the shell until `quit` or end of input.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub async fn run<R, W>(
    app: &mut App,
    service: &TaskService,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Err(e) = app.load(service).await {
        write_block(&mut output, &ui::render_error(&e)).await?;
    }
    write_block(&mut output, &ui::render_list(app)).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                write_block(&mut output, &message).await?;
                continue;
            }
        };
        tracing::debug!(command = ?command, "shell command");

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => write_block(&mut output, HELP).await?,
            command => {
                if let Err(e) = execute(app, service, command).await {
                    write_block(&mut output, &ui::render_error(&e)).await?;
                }
                write_block(&mut output, &ui::render_list(app)).await?;
            }
        }
    }
    output.flush().await
}

async fn write_block<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
