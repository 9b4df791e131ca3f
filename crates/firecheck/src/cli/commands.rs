//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::workflow::ReportFormat;

/// Arguments for recording a completed inspection.
#[derive(Debug, Args)]
pub struct InspectCommand {
    /// Filled-in checklist as JSON (`-` for stdin)
    pub file: PathBuf,

    /// Share the report instead of saving it
    #[arg(short, long)]
    pub share: bool,

    /// Hand over the report as plain text
    #[arg(short, long)]
    pub plain: bool,
}

/// Arguments for listing the inspection history.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for rendering a stored inspection.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Inspection id
    pub id: i64,

    /// Print the report as plain text instead of HTML
    #[arg(short, long)]
    pub plain: bool,
}

/// Arguments for sharing a stored inspection.
#[derive(Debug, Args)]
pub struct ShareCommand {
    /// Inspection id
    pub id: i64,

    /// Share the report as plain text
    #[arg(short, long)]
    pub plain: bool,
}

/// Arguments for opening a session.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Inspector name stored with the session
    #[arg(short, long)]
    pub user: String,

    /// Session lifetime in hours (defaults to the configured value)
    #[arg(long, value_name = "N")]
    pub hours: Option<u32>,
}

/// Arguments for showing the current session.
#[derive(Debug, Args)]
pub struct SessionCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments for filling the offline asset cache.
#[derive(Debug, Args)]
pub struct PrecacheCommand {
    /// Directory to read assets from (defaults to the configured asset root)
    #[arg(short, long, value_name = "DIR")]
    pub assets: Option<PathBuf>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Report format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatArg {
    /// HTML document
    #[default]
    Html,
    /// Plain text
    Text,
}

impl FormatArg {
    /// Format selected by a `--plain` flag.
    #[must_use]
    pub fn from_plain(plain: bool) -> Self {
        if plain {
            Self::Text
        } else {
            Self::Html
        }
    }
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => Self::Html,
            FormatArg::Text => Self::PlainText,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_arg_conversion() {
        assert_eq!(ReportFormat::from(FormatArg::Html), ReportFormat::Html);
        assert_eq!(ReportFormat::from(FormatArg::Text), ReportFormat::PlainText);
    }

    #[test]
    fn test_format_from_plain() {
        assert_eq!(FormatArg::from_plain(true), FormatArg::Text);
        assert_eq!(FormatArg::from_plain(false), FormatArg::Html);
        assert_eq!(FormatArg::default(), FormatArg::Html);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }

    #[test]
    fn test_login_command_debug() {
        let cmd = LoginCommand {
            user: "claire".to_string(),
            hours: Some(4),
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("claire"));
        assert!(debug_str.contains("hours"));
    }
}
