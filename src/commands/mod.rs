//! CLI command implementations.
//!
//! Each command takes an open [`TicketStore`] and returns an [`Outcome`];
//! `main` maps outcomes and errors to exit codes.

mod cache;
mod create;
mod dep;
mod ls;
mod show;
mod status;

pub use cache::{cmd_cache_clear, cmd_cache_path, cmd_cache_rebuild, cmd_cache_status};
pub use create::{CreateOptions, cmd_create};
pub use dep::{cmd_block, cmd_unblock};
pub use ls::{ListOptions, cmd_ls, cmd_ready};
pub use show::cmd_show;
pub use status::{cmd_close, cmd_reopen, cmd_start};

use serde::Serialize;
use serde_json::Value;

use crate::display::format_warning;
use crate::error::Result;
use crate::query::Warning;
use crate::store::TicketStore;
use crate::utils::format_relative_path;

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The command did its work but reported warnings.
    Partial,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Partial => 2,
        }
    }
}

/// A command result with a JSON form and an optional human form.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        CommandOutput { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Print as JSON or text. Without a text form the JSON is printed.
    pub fn print(self, output_json: bool) -> Result<Outcome> {
        match self.text {
            Some(text) if !output_json => println!("{text}"),
            _ => print_json(&self.json)?,
        }
        Ok(Outcome::Success)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print warnings to stderr and turn them into an outcome.
pub fn report_warnings(store: &TicketStore, warnings: &[Warning]) -> Outcome {
    let cwd = std::env::current_dir().unwrap_or_default();
    for warning in warnings {
        let path = format_relative_path(&store.dir().join(&warning.path), &cwd);
        eprintln!(
            "{}",
            format_warning(&Warning {
                path: path.into(),
                message: warning.message.clone(),
            })
        );
    }
    if warnings.is_empty() {
        Outcome::Success
    } else {
        Outcome::Partial
    }
}
