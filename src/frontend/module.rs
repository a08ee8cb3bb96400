//! Source discovery and the compilation session.
//!
//! A session owns every module's source text, name and line table, the
//! interner, and the parsed ASTs. Modules are discovered by a recursive walk
//! of `./src`; every regular file is a module whose logical name is its path
//! relative to `src` with the extension stripped and `/` separators kept.
//! Directory entries are visited in sorted order so diagnostic order is
//! stable across filesystems.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::frontend::ast::{Ast, Span};
use crate::frontend::diagnostics::{Diagnostic, ErrorKind, Reporter};
use crate::frontend::parser::Parser;
use crate::support::Interner;

pub type ModuleId = usize;

/// One module's raw source and its line table.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    pub line_spans: Vec<Span>,
}

/// All per-compilation state that outlives individual pipeline stages.
#[derive(Debug, Default)]
pub struct Session {
    files: Vec<SourceFile>,
    names: Vec<String>,
    module_map: HashMap<String, ModuleId>,
    asts: Vec<Option<Ast>>,
    pub interner: Interner,
}

impl Session {
    /// Discover every module under `<root>/src`.
    pub fn discover(root: &Path) -> Result<Session, Diagnostic> {
        let src = root.join("src");
        if !src.is_dir() {
            return Err(Diagnostic::new(ErrorKind::SrcDirNotFound));
        }

        let mut session = Session {
            interner: Interner::new(),
            ..Session::default()
        };
        session.walk(&src, &src)?;
        tracing::debug!(modules = session.files.len(), "discovered sources");
        Ok(session)
    }

    fn walk(&mut self, dir: &Path, src_root: &Path) -> Result<(), Diagnostic> {
        let reader = fs::read_dir(dir).map_err(|err| {
            Diagnostic::new(ErrorKind::OsFileOpenFailed).with_info(format!("{}: {}", dir.display(), err))
        })?;

        let mut entries: Vec<PathBuf> = reader
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .collect();
        entries.sort();

        for entry in entries {
            if entry.is_dir() {
                self.walk(&entry, src_root)?;
            } else if entry.is_file() {
                let source = fs::read_to_string(&entry).map_err(|err| {
                    Diagnostic::new(ErrorKind::OsFileReadFailed)
                        .with_info(format!("{}: {}", entry.display(), err))
                })?;
                let name = module_name(&entry, src_root);
                self.add_module(name, entry, source);
            }
        }
        Ok(())
    }

    /// Build a session from in-memory `(name, source)` pairs. This is the
    /// entry point integration tests use.
    pub fn from_sources(sources: &[(&str, &str)]) -> Session {
        let mut session = Session {
            interner: Interner::new(),
            ..Session::default()
        };
        for (name, source) in sources {
            session.add_module(name.to_string(), PathBuf::from(format!("{name}.slate")), source.to_string());
        }
        session
    }

    fn add_module(&mut self, name: String, path: PathBuf, source: String) {
        let id = self.files.len();
        self.files.push(SourceFile {
            path,
            source,
            line_spans: Vec::new(),
        });
        self.module_map.insert(name.clone(), id);
        self.names.push(name);
        self.asts.push(None);
    }

    /// Parse every module. Modules that fail to parse record a diagnostic
    /// and keep no AST; the caller gates on the reporter before checking.
    #[tracing::instrument(skip_all, fields(modules = self.files.len()))]
    pub fn parse_all(&mut self, reporter: &mut Reporter) {
        for id in 0..self.files.len() {
            let parser = Parser::new(&self.files[id].source, &mut self.interner, id);
            let (result, line_spans) = parser.parse();
            self.files[id].line_spans = line_spans;
            match result {
                Ok(ast) => self.asts[id] = Some(ast),
                Err(diagnostic) => reporter.report(diagnostic),
            }
        }
    }

    pub fn module_count(&self) -> usize {
        self.files.len()
    }

    pub fn module_ids(&self) -> std::ops::Range<ModuleId> {
        0..self.files.len()
    }

    pub fn file(&self, id: ModuleId) -> &SourceFile {
        &self.files[id]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.names[id]
    }

    /// The parsed AST of a module; empty when parsing failed.
    pub fn ast(&self, id: ModuleId) -> Option<&Ast> {
        self.asts[id].as_ref()
    }

    pub fn lookup_module(&self, name: &str) -> Option<ModuleId> {
        self.module_map.get(name).copied()
    }

    pub fn main_module(&self) -> Option<ModuleId> {
        self.lookup_module("main")
    }
}

/// Logical module name: path relative to `src`, extension stripped,
/// separators normalized to `/`.
fn module_name(path: &Path, src_root: &Path) -> String {
    let relative = path.strip_prefix(src_root).unwrap_or(path);
    let stem = relative.with_extension("");
    stem.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
