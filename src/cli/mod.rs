//! CLI for the Slate compiler.
//!
//! ## Commands
//!
//! - `build` (default) — compile the project rooted at the current directory
//! - `new <dir>` — create a project scaffold
//!
//! ## Design
//!
//! Argument parsing uses clap with derive macros. Command functions return
//! `CliResult<ExitCode>` instead of calling `process::exit`; only the
//! top-level [`run`] handles errors and exits.

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations: a user-facing message plus the exit code
/// the shell should see.
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The Slate programming language compiler
#[derive(Parser, Debug)]
#[command(name = "slate")]
#[command(version = VERSION)]
#[command(about = "The Slate programming language compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Tokenize one file and dump the token stream (debug)
    #[arg(long = "lex", value_name = "FILE")]
    pub lex_file: Option<PathBuf>,

    /// Parse one file and dump the AST (debug)
    #[arg(long = "parse", value_name = "FILE")]
    pub parse_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project scaffold
    New {
        /// Directory to create
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Compile the project in the current directory (default)
    Build,
}

/// Main CLI entry point. This is the only place `process::exit` is called.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(error) => {
            if !error.message.is_empty() {
                eprintln!("{}", error.message);
            }
            process::exit(error.exit_code.0);
        }
    }
}

fn execute(cli: Cli) -> CliResult<ExitCode> {
    if let Some(file) = cli.lex_file {
        return commands::lex_file(&file);
    }
    if let Some(file) = cli.parse_file {
        return commands::parse_file(&file);
    }

    match cli.command {
        Some(Command::New { dir }) => commands::new_project(&dir),
        Some(Command::Build) | None => commands::build_project(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_build() {
        let cli = Cli::try_parse_from(["slate", "build"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Build)));
    }

    #[test]
    fn cli_parses_new() {
        let cli = Cli::try_parse_from(["slate", "new", "hello"]).unwrap();
        match cli.command {
            Some(Command::New { dir }) => assert_eq!(dir, PathBuf::from("hello")),
            other => panic!("expected new command, got {:?}", other),
        }
    }

    #[test]
    fn cli_defaults_to_build() {
        let cli = Cli::try_parse_from(["slate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_debug_flags() {
        let cli = Cli::try_parse_from(["slate", "--lex", "x.slate"]).unwrap();
        assert!(cli.lex_file.is_some());

        let cli = Cli::try_parse_from(["slate", "--parse", "x.slate"]).unwrap();
        assert!(cli.parse_file.is_some());
    }
}
