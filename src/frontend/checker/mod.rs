//! The semantic checker.
//!
//! Five passes over the module list, in strict order; between passes the
//! driver queries the reporter and stops cleanly if any error was recorded:
//!
//! 1. declaration uniqueness, symbol tables, registry registration
//! 2. `use`/import-target resolution, declaration signatures, main proc
//! 3. struct self-storage detection and layout
//! 4. constant folding with dependency-cycle detection
//! 5. procedure bodies: control-flow validity, then types and resolution
//!
//! The checker never mutates the AST. All resolution output lands on the
//! checker's side: the [`Program`] registry, per-module symbol tables and
//! the constant-folding state table. Registry indices are the canonical
//! cross-module identity of every entity.

mod collect;
mod const_eval;
mod decls;
mod expr;
mod sizing;
mod stmt;

#[cfg(test)]
mod tests;

pub use const_eval::{ConstId, ConstState, Folded};

use std::collections::HashMap;

use crate::frontend::ast::Ident;
use crate::frontend::diagnostics::{Diagnostic, ErrorKind, Reporter};
use crate::frontend::module::{ModuleId, Session};
use crate::frontend::program::{ProcId, Program};
use crate::frontend::symbols::{ModuleSymbols, Ty};
use crate::support::NameId;

/// A local variable on the flat var stack.
#[derive(Debug, Clone)]
pub(crate) struct LocalVar {
    pub name: NameId,
    pub ty: Ty,
}

/// One lexical scope: how many variables it pushed onto the flat var stack.
/// Loop context is tracked by the CFG walk, not the block stack.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockScope {
    pub var_count: usize,
}

pub struct Checker<'s, 'r> {
    pub(crate) session: &'s Session,
    pub(crate) reporter: &'r mut Reporter,
    pub(crate) program: Program,
    pub(crate) symbols: Vec<ModuleSymbols>,
    pub(crate) main_module: Option<ModuleId>,

    // Pass 4 state.
    pub(crate) const_states: HashMap<ConstId, ConstState>,
    pub(crate) eval_stack: Vec<ConstId>,
    pub(crate) sizing_stack: Vec<usize>,

    // Pass 5 state.
    pub(crate) vars: Vec<LocalVar>,
    pub(crate) blocks: Vec<BlockScope>,
    pub(crate) current_proc: Option<ProcId>,
}

/// Run all checker passes. Returns the populated program registry; the
/// reporter decides whether compilation may continue into code generation.
#[tracing::instrument(skip_all, fields(modules = session.module_count()))]
pub fn check(session: &Session, reporter: &mut Reporter) -> Program {
    let mut checker = Checker::new(session, reporter);

    checker.pass_1_collect();
    if checker.reporter.any_error() {
        return checker.program;
    }
    tracing::debug!(
        procs = checker.program.procs.len(),
        structs = checker.program.structs.len(),
        enums = checker.program.enums.len(),
        globals = checker.program.globals.len(),
        "pass 1 complete"
    );

    checker.pass_2_decls();
    if checker.reporter.any_error() {
        return checker.program;
    }

    checker.pass_3_sizing();
    if checker.reporter.any_error() {
        return checker.program;
    }

    checker.pass_4_const_eval();
    if checker.reporter.any_error() {
        return checker.program;
    }

    checker.pass_5_proc_bodies();
    checker.program
}

impl<'s, 'r> Checker<'s, 'r> {
    pub fn new(session: &'s Session, reporter: &'r mut Reporter) -> Self {
        let module_count = session.module_count();
        let mut symbols = Vec::with_capacity(module_count);
        symbols.resize_with(module_count, ModuleSymbols::new);
        Self {
            session,
            reporter,
            program: Program::new(),
            symbols,
            main_module: None,
            const_states: HashMap::new(),
            eval_stack: Vec::new(),
            sizing_stack: Vec::new(),
            vars: Vec::new(),
            blocks: Vec::new(),
            current_proc: None,
        }
    }

    pub(crate) fn error_at(&mut self, kind: ErrorKind, module: ModuleId, span: crate::frontend::ast::Span) {
        self.reporter.error_at(kind, module, span);
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.reporter.report(diagnostic);
    }

    pub(crate) fn name(&self, id: NameId) -> &'s str {
        self.session.interner.get(id)
    }

    /// Resolve a `module::module::` prefix starting from `module`'s import
    /// aliases, walking one alias table per segment.
    pub(crate) fn resolve_module_path(&mut self, module: ModuleId, path: &[Ident]) -> Option<ModuleId> {
        let mut current = module;
        for segment in path {
            match self.symbols[current].find_module(segment.name) {
                Some(target) => current = target,
                None => {
                    self.error_at(ErrorKind::ResolveModuleNotFound, module, segment.span);
                    return None;
                }
            }
        }
        Some(current)
    }
}
