//! Operator console commands.
//!
//! One input line is either a command (leading `:`) or a value for the
//! current field. A leading `::` escapes a value that starts with a colon.

use std::str::FromStr;

use serde_json::Value;
use tracing::{info_span, warn, Instrument};

use crate::controller::{EntryController, FocusOutcome};
use crate::surface::FormSurface;
use crate::Result;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Submit a typed value for the current field.
    Submit(String),
    /// `:prev`
    Previous,
    /// `:goto <field> [occurrence]`
    GoTo {
        /// Target field.
        name: String,
        /// Target occurrence.
        occurrence: Option<u32>,
    },
    /// `:end-group`
    EndGroup,
    /// `:end-level`
    EndLevel,
    /// `:end-occ`
    EndOccurrence,
    /// `:insert`
    Insert,
    /// `:insert-after`
    InsertAfter,
    /// `:delete`
    Delete,
    /// `:sort`
    Sort,
    /// `:eval <expression>`
    Eval(String),
    /// `:stop`
    Stop,
    /// `:quit`
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        if let Some(escaped) = line.strip_prefix("::") {
            return Ok(Self::Submit(format!(":{escaped}")));
        }
        let Some(body) = line.strip_prefix(':') else {
            return Ok(Self::Submit(line.to_owned()));
        };

        let (verb, rest) = body
            .split_once(char::is_whitespace)
            .map_or((body, ""), |(verb, rest)| (verb, rest.trim()));

        match verb {
            "prev" => Ok(Self::Previous),
            "goto" => parse_goto(rest),
            "end-group" => Ok(Self::EndGroup),
            "end-level" => Ok(Self::EndLevel),
            "end-occ" => Ok(Self::EndOccurrence),
            "insert" => Ok(Self::Insert),
            "insert-after" => Ok(Self::InsertAfter),
            "delete" => Ok(Self::Delete),
            "sort" => Ok(Self::Sort),
            "eval" if rest.is_empty() => Err("usage: :eval <expression>".into()),
            "eval" => Ok(Self::Eval(rest.to_owned())),
            "stop" => Ok(Self::Stop),
            "quit" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

fn parse_goto(rest: &str) -> std::result::Result<ConsoleCommand, String> {
    let mut parts = rest.split_whitespace();
    let name = parts
        .next()
        .ok_or_else(|| "usage: :goto <field> [occurrence]".to_owned())?;
    let occurrence = parts
        .next()
        .map(|raw| {
            raw.parse::<u32>()
                .ok()
                .filter(|occ| *occ > 0)
                .ok_or_else(|| format!("invalid occurrence: {raw}"))
        })
        .transpose()?;
    Ok(ConsoleCommand::GoTo {
        name: name.to_owned(),
        occurrence,
    })
}

/// What the console loop does after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Keep prompting, optionally showing a message first.
    Continue(Option<String>),
    /// Leave the entry loop.
    Quit,
}

/// Route a parsed command to the controller.
///
/// # Errors
///
/// Propagates controller errors.
pub async fn dispatch<S: FormSurface>(
    controller: &mut EntryController<S>,
    command: ConsoleCommand,
) -> Result<Flow> {
    let span = info_span!("console_command", command = ?command);
    route(controller, command).instrument(span).await
}

async fn route<S: FormSurface>(
    controller: &mut EntryController<S>,
    command: ConsoleCommand,
) -> Result<Flow> {
    match command {
        ConsoleCommand::Submit(value) => {
            controller.submit_typed(&value).await?;
        }
        ConsoleCommand::Previous => {
            controller.previous().await?;
        }
        ConsoleCommand::GoTo { name, occurrence } => {
            if controller.focus_attempt(&name, occurrence).await? == FocusOutcome::Rejected {
                warn!(field = %name, "focus change refused");
                let current = controller
                    .guard()
                    .authoritative_field()
                    .map_or_else(|| "-".to_owned(), ToString::to_string);
                return Ok(Flow::Continue(Some(format!(
                    "cannot move to {name}; focus stays on {current}"
                ))));
            }
        }
        ConsoleCommand::EndGroup => {
            controller.end_group().await?;
        }
        ConsoleCommand::EndLevel => {
            controller.end_level().await?;
        }
        ConsoleCommand::EndOccurrence => {
            controller.end_group_occurrence().await?;
        }
        ConsoleCommand::Insert => {
            controller.insert_occurrence().await?;
        }
        ConsoleCommand::InsertAfter => {
            controller.insert_occurrence_after().await?;
        }
        ConsoleCommand::Delete => {
            controller.delete_occurrence().await?;
        }
        ConsoleCommand::Sort => {
            controller.sort_occurrences().await?;
        }
        ConsoleCommand::Eval(expression) => {
            let value = controller.evaluate(&expression).await?;
            return Ok(Flow::Continue(Some(render_value(&value))));
        }
        ConsoleCommand::Stop => {
            controller.stop().await?;
            return Ok(Flow::Quit);
        }
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue(None))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "(no value)".to_owned(),
        other => other.to_string(),
    }
}
