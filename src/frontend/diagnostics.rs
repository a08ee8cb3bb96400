//! Diagnostics for the Slate compiler.
//!
//! Errors form a closed enumeration partitioned by pipeline stage; each kind
//! carries a static message and optionally a static hint. The [`Reporter`]
//! is a pure sink: it accumulates diagnostics and answers "did any error
//! ever occur", and the checker queries that flag between passes.

use thiserror::Error;

use crate::frontend::ast::Span;
use crate::frontend::module::{ModuleId, Session};

/// Every error the compiler can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("internal compiler error")]
    CompilerInternal,

    // ===== OS / command =====
    #[error("failed to create directory")]
    OsDirCreateFailed,
    #[error("failed to open file")]
    OsFileOpenFailed,
    #[error("failed to read file")]
    OsFileReadFailed,
    #[error("`src` directory not found in the current directory")]
    SrcDirNotFound,
    #[error("directory already exists")]
    CmdNewDirAlreadyExists,
    #[error("git does not appear to be installed")]
    CmdNewGitNotInstalled,
    #[error("`git init` failed")]
    CmdNewGitInitFailed,

    // ===== Lex / parse =====
    #[error("integer literal overflows 64 bits")]
    LexIntegerOverflow,
    #[error("expected {expected} in {context}")]
    ParseExpectedToken {
        expected: &'static str,
        context: &'static str,
    },

    // ===== Declarations (pass 1..2) =====
    #[error("symbol is already declared in this module")]
    SymbolAlreadyDeclared,
    #[error("import path does not name a module")]
    ImportPathNotFound,
    #[error("symbol not found in the imported module")]
    UseSymbolNotFound,
    #[error("duplicate struct field name")]
    StructDuplicateField,
    #[error("enum must declare at least one variant")]
    EnumZeroVariants,
    #[error("enum base type must be an integer type")]
    EnumNonIntegerType,
    #[error("duplicate enum variant name")]
    EnumDuplicateVariant,
    #[error("duplicate procedure parameter name")]
    ProcDuplicateParam,
    #[error("struct stores itself by value and has infinite size")]
    StructInfiniteSize,

    // ===== Resolution =====
    #[error("module path does not name an imported module")]
    ResolveModuleNotFound,
    #[error("type not found")]
    ResolveTypeNotFound,
    #[error("procedure not found")]
    ResolveProcNotFound,
    #[error("global not found in module")]
    ResolveGlobalNotFound,
    #[error("enum variant not found")]
    ResolveEnumVariantNotFound,
    #[error("struct field not found")]
    ResolveStructFieldNotFound,
    #[error("array initializer used where no array type is expected")]
    ResolveArrayWrongContext,
    #[error("array initializer type does not match the expected type")]
    ResolveArrayTypeMismatch,
    #[error("array initializer requires an array type from context")]
    ResolveArrayNoContext,
    #[error("struct initializer used where no struct type is expected")]
    ResolveStructWrongContext,
    #[error("struct initializer type does not match the expected type")]
    ResolveStructTypeMismatch,
    #[error("struct initializer requires a struct type from context")]
    ResolveStructNoContext,

    // ===== Main procedure =====
    #[error("no `main` module found under src")]
    MainFileNotFound,
    #[error("`main` procedure not found in the main module")]
    MainProcNotFound,
    #[error("`main` procedure cannot be external")]
    MainProcExternal,
    #[error("`main` procedure cannot be variadic")]
    MainProcVariadic,
    #[error("`main` procedure must take zero parameters")]
    MainNotZeroParams,
    #[error("`main` procedure must declare a return type")]
    MainProcNoReturnType,
    #[error("`main` procedure must return i32")]
    MainProcWrongReturnType,

    // ===== Control flow =====
    #[error("not all control paths of the procedure return a value")]
    CfgNotAllPathsReturn,
    #[error("unreachable statement")]
    CfgUnreachableStatement,
    #[error("`defer` cannot be nested inside another `defer`")]
    CfgNestedDefer,
    #[error("`return` is not allowed inside `defer`")]
    CfgReturnInsideDefer,
    #[error("`break` is not allowed inside `defer`")]
    CfgBreakInsideDefer,
    #[error("`break` outside of a loop")]
    CfgBreakOutsideLoop,
    #[error("`continue` is not allowed inside `defer`")]
    CfgContinueInsideDefer,
    #[error("`continue` outside of a loop")]
    CfgContinueOutsideLoop,

    // ===== Types and values =====
    #[error("type mismatch")]
    TypeMismatch,
    #[error("expected a compile-time constant expression")]
    ExprExpectedConstant,
    #[error("variable not found in scope")]
    VarLocalNotFound,
    #[error("a global with this name is already in scope")]
    VarDeclAlreadyIsGlobal,
    #[error("a variable with this name is already in scope")]
    VarDeclAlreadyInScope,
    #[error("procedure declares a return type; `return` needs an expression")]
    ReturnExpectedExpr,
    #[error("procedure has no return type; `return` must not carry an expression")]
    ReturnExpectedNoExpr,
    #[error("switch expression must have an integer or enum type")]
    SwitchIncorrectExprType,
    #[error("switch must have at least one case")]
    SwitchZeroCases,

    // ===== Casts and constant folding =====
    #[error("cast source expression must have a basic type")]
    CastExprNonBasicType,
    #[error("cannot cast from bool")]
    CastExprBoolBasicType,
    #[error("cannot cast from string")]
    CastExprStringBasicType,
    #[error("cannot cast into bool")]
    CastIntoBoolBasicType,
    #[error("cannot cast into string")]
    CastIntoStringBasicType,
    #[error("redundant cast between identical float types")]
    CastRedundantFloatCast,
    #[error("redundant cast between identical integer types")]
    CastRedundantIntegerCast,
    #[error("constant expressions depend on each other in a cycle")]
    ConstevalDependencyCycle,
    #[error("procedure calls are not allowed in constant expressions")]
    ConstProcIsNotConst,
    #[error("only globals can be referenced from constant expressions")]
    ConstVarIsNotGlobal,
    #[error("constant expression overflows during evaluation")]
    ConstevalIntOverflow,
    #[error("division by zero in constant expression")]
    ConstevalZeroDiv,
    #[error("remainder by zero in constant expression")]
    ConstevalZeroMod,
    #[error("constant expression produces NaN")]
    ConstevalNanProduced,
    #[error("constant does not fit the target integer type")]
    ConstevalIntOutOfRange,
}

impl ErrorKind {
    pub fn hint(self) -> Option<&'static str> {
        match self {
            ErrorKind::SymbolAlreadyDeclared => {
                Some("imports, uses, structs, enums, procedures and globals share one namespace per module")
            }
            ErrorKind::StructInfiniteSize => {
                Some("store the field behind a pointer (`*T`) to break the cycle")
            }
            ErrorKind::EnumNonIntegerType => Some("declare the base as one of i8..u64"),
            ErrorKind::CfgNotAllPathsReturn => {
                Some("add a `return` to every path, or an unconditional one at the end")
            }
            ErrorKind::ExprExpectedConstant => {
                Some("only literals, globals, enum variants, `sizeof` and operators on them fold")
            }
            ErrorKind::ConstevalDependencyCycle => {
                Some("a constant may not depend on itself, directly or through other constants")
            }
            ErrorKind::TypeMismatch => {
                Some("implicit conversion only widens within the same numeric kind; use `cast(T, expr)` otherwise")
            }
            ErrorKind::MainProcWrongReturnType => Some("declare it as `main :: () -> i32`"),
            ErrorKind::SrcDirNotFound => Some("run `slate build` from a project root, or create one with `slate new`"),
            _ => None,
        }
    }
}

/// A reported error: kind plus optional source origin and free-form context
/// (a field-access path, a cycle trace, an offending name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub origin: Option<(ModuleId, Span)>,
    pub info: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            origin: None,
            info: None,
        }
    }

    pub fn at(mut self, module: ModuleId, span: Span) -> Self {
        self.origin = Some((module, span));
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

/// Accumulates diagnostics; never halts anything itself.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, kind: ErrorKind) {
        self.report(Diagnostic::new(kind));
    }

    pub fn error_at(&mut self, kind: ErrorKind, module: ModuleId, span: Span) {
        self.report(Diagnostic::new(kind).at(module, span));
    }

    /// True if any error was ever recorded.
    pub fn any_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

// ============================================================================
// Rendering
// ============================================================================

const RED: &str = "\x1b[1;31m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Print every accumulated diagnostic with source context to stderr.
pub fn print_all(reporter: &Reporter, session: &Session) {
    for diagnostic in reporter.diagnostics() {
        eprint!("{}", render(diagnostic, session));
    }
}

/// Render a diagnostic that has no source context (I/O and command errors).
pub fn render_plain(diagnostic: &Diagnostic) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{RED}error:{RESET} {}", diagnostic.kind);
    if let Some(info) = &diagnostic.info {
        let _ = writeln!(out, "  {CYAN}={RESET} {}", info);
    }
    if let Some(hint) = diagnostic.kind.hint() {
        let _ = writeln!(out, "  {CYAN}= hint:{RESET} {}", hint);
    }
    out
}

/// Render one diagnostic the way the CLI shows it.
pub fn render(diagnostic: &Diagnostic, session: &Session) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{RED}error:{RESET} {}", diagnostic.kind);

    if let Some((module_id, span)) = diagnostic.origin {
        let file = session.file(module_id);
        let (line, col, line_text) = line_info(&file.source, &file.line_spans, span.start);
        let _ = writeln!(out, "  {CYAN}-->{RESET} {}:{}:{}", file.path.display(), line, col);
        let _ = writeln!(out, "  {CYAN}|{RESET} {}", line_text);
        let width = span.end.saturating_sub(span.start).max(1).min(line_text.len().max(1));
        let _ = writeln!(out, "  {CYAN}|{RESET} {}{RED}{}{RESET}", " ".repeat(col.saturating_sub(1)), "^".repeat(width));
    }

    if let Some(info) = &diagnostic.info {
        let _ = writeln!(out, "  {CYAN}={RESET} {}", info);
    }
    if let Some(hint) = diagnostic.kind.hint() {
        let _ = writeln!(out, "  {CYAN}= hint:{RESET} {}", hint);
    }

    out
}

/// Map a byte offset to (line, column, line text) through the module's
/// recorded line spans.
fn line_info<'src>(source: &'src str, line_spans: &[Span], offset: usize) -> (usize, usize, &'src str) {
    let index = match line_spans.binary_search_by(|span| {
        if offset < span.start {
            std::cmp::Ordering::Greater
        } else if offset > span.end {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Equal
        }
    }) {
        Ok(index) => index,
        Err(_) => line_spans.len().saturating_sub(1),
    };

    let span = line_spans.get(index).copied().unwrap_or_default();
    let start = span.start.min(source.len());
    let end = span.end.min(source.len()).max(start);
    let text = source[start..end].trim_end_matches(['\r', '\n']);
    (index + 1, offset.saturating_sub(span.start) + 1, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_flag_starts_clear() {
        let mut reporter = Reporter::new();
        assert!(!reporter.any_error());
        reporter.error(ErrorKind::MainProcNotFound);
        assert!(reporter.any_error());
        assert_eq!(reporter.count(), 1);
    }

    #[test]
    fn line_info_maps_offsets() {
        let source = "one\ntwo\nthree";
        let spans = vec![Span::new(0, 3), Span::new(4, 7), Span::new(8, 13)];
        assert_eq!(line_info(source, &spans, 0), (1, 1, "one"));
        assert_eq!(line_info(source, &spans, 5), (2, 2, "two"));
        assert_eq!(line_info(source, &spans, 8), (3, 1, "three"));
    }

    #[test]
    fn messages_are_static_and_closed() {
        assert_eq!(
            ErrorKind::SymbolAlreadyDeclared.to_string(),
            "symbol is already declared in this module"
        );
        let parse = ErrorKind::ParseExpectedToken {
            expected: "`;`",
            context: "break statement",
        };
        assert_eq!(parse.to_string(), "expected `;` in break statement");
    }
}
