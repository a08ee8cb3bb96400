//! Slate compiler frontend.
//!
//! - `token` / `lexer`: byte-level tokenization into the fixed ring buffer
//! - `parser`: recursive descent into per-module ASTs
//! - `module`: source discovery and the compilation session
//! - `symbols` / `program`: symbol tables, resolved types, the registry
//! - `checker`: the five semantic passes
//! - `diagnostics`: the closed error taxonomy and the reporter sink

pub mod ast;
pub mod checker;
pub mod diagnostics;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod program;
pub mod symbols;
pub mod token;

use diagnostics::Reporter;
use module::Session;
use program::Program;

/// Parse and check every module of a session. The reporter carries all
/// diagnostics; compilation succeeded iff it stayed clean.
#[tracing::instrument(skip_all, fields(modules = session.module_count()))]
pub fn compile(session: &mut Session) -> (Program, Reporter) {
    let mut reporter = Reporter::new();

    session.parse_all(&mut reporter);
    if reporter.any_error() {
        return (Program::new(), reporter);
    }

    let program = checker::check(session, &mut reporter);
    (program, reporter)
}
