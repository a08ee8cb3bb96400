//! Command implementations for the Slate CLI.

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

use crate::frontend;
use crate::frontend::diagnostics::{self, Diagnostic, ErrorKind};
use crate::frontend::module::Session;

use super::{CliError, CliResult, ExitCode};

const MAIN_SCAFFOLD: &str = "main :: () -> i32 {\n\treturn 0;\n}\n";

/// `slate build` — compile the project rooted at the current directory.
pub fn build_project() -> CliResult<ExitCode> {
    let mut session = match Session::discover(Path::new(".")) {
        Ok(session) => session,
        Err(diagnostic) => {
            return Err(CliError::failure(diagnostics::render_plain(&diagnostic)));
        }
    };

    let (_program, reporter) = frontend::compile(&mut session);

    if reporter.any_error() {
        diagnostics::print_all(&reporter, &session);
        eprintln!(
            "error: could not compile project ({} error{})",
            reporter.count(),
            if reporter.count() == 1 { "" } else { "s" }
        );
        return Ok(ExitCode::FAILURE);
    }

    // The code generator (external) writes its output into ./build.
    let build_dir = Path::new("build");
    if !build_dir.is_dir() {
        if let Err(error) = fs::create_dir(build_dir) {
            let diagnostic = Diagnostic::new(ErrorKind::OsDirCreateFailed).with_info(error.to_string());
            return Err(CliError::failure(diagnostics::render_plain(&diagnostic)));
        }
    }
    if let Err(error) = env::set_current_dir(build_dir) {
        let diagnostic = Diagnostic::new(ErrorKind::OsDirCreateFailed).with_info(error.to_string());
        return Err(CliError::failure(diagnostics::render_plain(&diagnostic)));
    }

    tracing::info!(modules = session.module_count(), "check passed");
    println!("checked {} module(s)", session.module_count());
    Ok(ExitCode::SUCCESS)
}

/// `slate --lex <file>` — dump one file's token stream (debug aid).
pub fn lex_file(path: &Path) -> CliResult<ExitCode> {
    use crate::frontend::lexer::{Lexer, TOKEN_BUFFER_SIZE, TOKEN_LOOKAHEAD};
    use crate::frontend::token::{Token, TokenKind};
    use crate::support::Interner;

    let source = read_source(path)?;
    let mut interner = Interner::new();
    let mut lexer = Lexer::new(&source, &mut interner);
    let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];

    let mut count = 0usize;
    'stream: loop {
        lexer.fill_token_buffer(&mut tokens);
        // Skip the repeated lookahead window after the first fill.
        let skip = if count == 0 { 0 } else { TOKEN_LOOKAHEAD };
        for token in tokens.iter().skip(skip) {
            if token.kind == TokenKind::InputEnd {
                break 'stream;
            }
            println!("{:>4}..{:<4} {:?}", token.span.start, token.span.end, token.kind);
            count += 1;
        }
    }
    println!("{count} token(s)");
    Ok(ExitCode::SUCCESS)
}

/// `slate --parse <file>` — dump one file's AST (debug aid).
pub fn parse_file(path: &Path) -> CliResult<ExitCode> {
    let source = read_source(path)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());

    let mut session = Session::from_sources(&[(&name, &source)]);
    let mut reporter = crate::frontend::diagnostics::Reporter::new();
    session.parse_all(&mut reporter);

    if reporter.any_error() {
        diagnostics::print_all(&reporter, &session);
        return Ok(ExitCode::FAILURE);
    }
    match session.ast(0) {
        Some(ast) => println!("{ast:#?}"),
        None => return Ok(ExitCode::FAILURE),
    }
    Ok(ExitCode::SUCCESS)
}

fn read_source(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|error| {
        let diagnostic = Diagnostic::new(ErrorKind::OsFileReadFailed)
            .with_info(format!("{}: {}", path.display(), error));
        CliError::failure(diagnostics::render_plain(&diagnostic))
    })
}

/// `slate new <dir>` — create a project scaffold.
pub fn new_project(dir: &Path) -> CliResult<ExitCode> {
    if dir.exists() {
        let diagnostic = Diagnostic::new(ErrorKind::CmdNewDirAlreadyExists).with_info(dir.display().to_string());
        return Err(CliError::failure(diagnostics::render_plain(&diagnostic)));
    }

    let src = dir.join("src");
    fs::create_dir_all(&src).map_err(|error| {
        let diagnostic = Diagnostic::new(ErrorKind::OsDirCreateFailed).with_info(error.to_string());
        CliError::failure(diagnostics::render_plain(&diagnostic))
    })?;
    fs::write(src.join("main.slate"), MAIN_SCAFFOLD).map_err(|error| {
        let diagnostic = Diagnostic::new(ErrorKind::OsFileOpenFailed).with_info(error.to_string());
        CliError::failure(diagnostics::render_plain(&diagnostic))
    })?;

    // Initializing a repository is a convenience; failure is not fatal.
    match Command::new("git").arg("init").arg(dir).output() {
        Ok(output) if !output.status.success() => {
            tracing::warn!("{}", ErrorKind::CmdNewGitInitFailed);
        }
        Err(_) => {
            tracing::warn!("{}", ErrorKind::CmdNewGitNotInstalled);
        }
        Ok(_) => {}
    }

    println!("created project `{}`", dir.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_source_parses_and_checks() {
        let mut session = Session::from_sources(&[("main", MAIN_SCAFFOLD)]);
        let (_, reporter) = frontend::compile(&mut session);
        assert!(!reporter.any_error(), "diagnostics: {:?}", reporter.diagnostics());
    }
}
