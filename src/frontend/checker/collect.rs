//! Pass 1: declaration uniqueness, symbol tables, registry registration.
//!
//! Every module gets one combined namespace; a duplicate name reports
//! `SYMBOL_ALREADY_DECLARED` and the declaration is skipped. Surviving
//! structs, enums, procedures and globals are appended to the program
//! registry; the vector index handed out here is the entity's identity for
//! the rest of compilation. Import module paths resolve against the session
//! module map. Member procedures of `impl` blocks are registered as
//! procedures now and attached to their struct in pass 2, once the impl
//! type can be resolved.

use crate::frontend::ast::ImportTarget;
use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::program::{EnumInfo, GlobalInfo, ProcInfo, ProcSource, StructInfo, VariantInfo};
use crate::frontend::symbols::SymbolKind;

use super::Checker;

impl Checker<'_, '_> {
    pub(crate) fn pass_1_collect(&mut self) {
        let session = self.session;

        for module_id in session.module_ids() {
            let Some(ast) = session.ast(module_id) else { continue };

            for import in &ast.imports {
                let path: Vec<&str> = import.modules.iter().map(|segment| self.name(segment.name)).collect();
                let base = path.join("/");

                match &import.target {
                    ImportTarget::Module => match session.lookup_module(&base) {
                        Some(target) => {
                            let alias = import.modules[import.modules.len() - 1];
                            if self.symbols[module_id].insert(alias.name, SymbolKind::Module(target)).is_err() {
                                self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, alias.span);
                            }
                        }
                        None => {
                            self.report(
                                Diagnostic::new(ErrorKind::ImportPathNotFound)
                                    .at(module_id, import.span)
                                    .with_info(base),
                            );
                        }
                    },
                    ImportTarget::SymbolOrModule(symbol) => {
                        // `import a::b;` prefers the module `a/b`; otherwise
                        // `b` is a symbol of module `a`, resolved in pass 2.
                        let full = format!("{}/{}", base, self.name(symbol.name));
                        if let Some(target) = session.lookup_module(&full) {
                            if self.symbols[module_id].insert(symbol.name, SymbolKind::Module(target)).is_err() {
                                self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, symbol.span);
                            }
                        } else if session.lookup_module(&base).is_some() {
                            if self.symbols[module_id].reserve(symbol.name).is_err() {
                                self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, symbol.span);
                            }
                        } else {
                            self.report(
                                Diagnostic::new(ErrorKind::ImportPathNotFound)
                                    .at(module_id, import.span)
                                    .with_info(full),
                            );
                        }
                    }
                    ImportTarget::Wildcard | ImportTarget::SymbolList(_) => {
                        if session.lookup_module(&base).is_none() {
                            self.report(
                                Diagnostic::new(ErrorKind::ImportPathNotFound)
                                    .at(module_id, import.span)
                                    .with_info(base),
                            );
                        }
                        if let ImportTarget::SymbolList(symbols) = &import.target {
                            for symbol in symbols {
                                if self.symbols[module_id].reserve(symbol.name).is_err() {
                                    self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, symbol.span);
                                }
                            }
                        }
                    }
                }
            }

            for use_decl in &ast.uses {
                if self.symbols[module_id].reserve(use_decl.alias.name).is_err() {
                    self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, use_decl.alias.span);
                }
            }

            for (index, decl) in ast.structs.iter().enumerate() {
                let id = self.program.structs.len();
                if self.symbols[module_id].insert(decl.ident.name, SymbolKind::Struct(id)).is_err() {
                    self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, decl.ident.span);
                    continue;
                }
                self.program.add_struct(StructInfo {
                    module: module_id,
                    decl_index: index,
                    name: decl.ident.name,
                    fields: Vec::new(),
                    methods: std::collections::HashMap::new(),
                    layout: None,
                    infinite: false,
                });
            }

            for (index, decl) in ast.enums.iter().enumerate() {
                let id = self.program.enums.len();
                if self.symbols[module_id].insert(decl.ident.name, SymbolKind::Enum(id)).is_err() {
                    self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, decl.ident.span);
                    continue;
                }
                self.program.add_enum(EnumInfo {
                    module: module_id,
                    decl_index: index,
                    name: decl.ident.name,
                    basic_type: decl.basic_type,
                    variants: decl
                        .variants
                        .iter()
                        .map(|variant| VariantInfo {
                            name: variant.ident.name,
                            value: None,
                        })
                        .collect(),
                });
            }

            for (index, decl) in ast.procs.iter().enumerate() {
                let id = self.program.procs.len();
                if self.symbols[module_id].insert(decl.ident.name, SymbolKind::Proc(id)).is_err() {
                    self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, decl.ident.span);
                    continue;
                }
                self.program.add_proc(ProcInfo {
                    module: module_id,
                    source: ProcSource::Top(index),
                    name: decl.ident.name,
                    is_external: decl.is_external,
                    is_variadic: decl.is_variadic,
                    sig: None,
                });
            }

            for (index, decl) in ast.globals.iter().enumerate() {
                let id = self.program.globals.len();
                if self.symbols[module_id].insert(decl.ident.name, SymbolKind::Global(id)).is_err() {
                    self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, decl.ident.span);
                    continue;
                }
                self.program.add_global(GlobalInfo {
                    module: module_id,
                    decl_index: index,
                    name: decl.ident.name,
                    ty: None,
                    value: None,
                });
            }

            // Member procedures live in their struct's namespace, not the
            // module's; they still get program identities now.
            for (impl_index, impl_decl) in ast.impls.iter().enumerate() {
                for (proc_index, decl) in impl_decl.procs.iter().enumerate() {
                    self.program.add_proc(ProcInfo {
                        module: module_id,
                        source: ProcSource::Impl(impl_index, proc_index),
                        name: decl.ident.name,
                        is_external: decl.is_external,
                        is_variadic: decl.is_variadic,
                        sig: None,
                    });
                }
            }
        }

        self.main_module = self.session.main_module();
        if self.main_module.is_none() {
            self.reporter.error(ErrorKind::MainFileNotFound);
        }
    }
}
