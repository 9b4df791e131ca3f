//! Command-line interface for firecheck.
//!
//! This module provides the CLI structure for the `firecheck` binary. Each
//! command that reads or writes inspections stands for one of the
//! application's pages and goes through the session gate first.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FormatArg, HistoryCommand, InspectCommand, LoginCommand, PrecacheCommand,
    SessionCommand, ShareCommand, ShowCommand, StatusCommand,
};

/// firecheck - APSAD R4 fire-safety inspections, offline
///
/// Records completed extinguisher checklists, renders them as reports and
/// keeps the inspection history on this device.
#[derive(Debug, Parser)]
#[command(name = "firecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a completed inspection and hand over its report
    Inspect(InspectCommand),

    /// Print a blank APSAD R4 checklist as JSON
    Template,

    /// List recorded inspections
    History(HistoryCommand),

    /// Print the report of a recorded inspection
    Show(ShowCommand),

    /// Share the report of a recorded inspection
    Share(ShareCommand),

    /// Open a session
    Login(LoginCommand),

    /// Close the current session
    Logout,

    /// Show the current session
    Session(SessionCommand),

    /// Fill the offline asset cache and drop older versions
    Precache(PrecacheCommand),

    /// Show storage, session and cache status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Page this command stands for, if it is gated.
    #[must_use]
    pub fn page(&self) -> Option<&'static str> {
        match self {
            Self::Inspect(_) => Some("inspection"),
            Self::History(_) => Some("history"),
            Self::Show(_) | Self::Share(_) => Some("report"),
            _ => None,
        }
    }

    /// Location to come back to after logging in.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        let page = self.page()?;
        Some(match self {
            Self::Show(cmd) => format!("{page}?id={}", cmd.id),
            Self::Share(cmd) => format!("{page}?id={}&share=1", cmd.id),
            _ => page.to_string(),
        })
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
