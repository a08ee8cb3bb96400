//! Pass 2: `use` resolution, declaration signatures, main-procedure check.
//!
//! Custom type references resolve here, through the module symbol tables,
//! into [`Ty`] values stored on the registry. Array sizes inside type
//! signatures are constant expressions and fold on demand through the
//! pass-4 evaluator.

use std::collections::HashSet;

use crate::frontend::ast::{ProcDecl, Type, TypeKind};
use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::module::ModuleId;
use crate::frontend::program::{ProcSignature, ProcSource};
use crate::frontend::symbols::{ConstValue, ProcTy, SymbolKind, Ty, TyKind};
use crate::frontend::token::BasicType;
use crate::support::NameId;

use super::Checker;

impl<'s> Checker<'s, '_> {
    pub(crate) fn pass_2_decls(&mut self) {
        let session = self.session;

        for module_id in session.module_ids() {
            let Some(ast) = session.ast(module_id) else { continue };

            // `use Alias = module::symbol;` — the alias name was reserved in
            // pass 1; bind it now.
            for use_decl in &ast.uses {
                let Some(target) = self.symbols[module_id].find_module(use_decl.module.name) else {
                    self.error_at(ErrorKind::ResolveModuleNotFound, module_id, use_decl.module.span);
                    continue;
                };
                match self.symbols[target].find(use_decl.symbol.name) {
                    Some(kind) if !matches!(kind, SymbolKind::Module(_)) => {
                        self.symbols[module_id].define(use_decl.alias.name, kind);
                    }
                    _ => self.error_at(ErrorKind::UseSymbolNotFound, module_id, use_decl.symbol.span),
                }
            }

            // Import targets beyond plain module aliases.
            for import in &ast.imports {
                self.expand_import_target(module_id, import);
            }

            // Struct field signatures.
            let mut name_set: HashSet<NameId> = HashSet::new();
            for (index, decl) in ast.structs.iter().enumerate() {
                let Some(struct_id) = self.symbols[module_id].find_struct(decl.ident.name) else { continue };
                if self.program.structs[struct_id].decl_index != index
                    || self.program.structs[struct_id].module != module_id
                {
                    // A duplicate that pass 1 skipped.
                    continue;
                }

                name_set.clear();
                let mut fields = Vec::with_capacity(decl.fields.len());
                for field in &decl.fields {
                    let Some(ty) = self.check_type_signature(module_id, &field.ty) else { continue };

                    if !name_set.insert(field.ident.name) {
                        self.error_at(ErrorKind::StructDuplicateField, module_id, field.ident.span);
                        continue;
                    }
                    fields.push(crate::frontend::program::FieldInfo {
                        name: field.ident.name,
                        ty,
                        has_default: field.default.is_some(),
                    });
                }
                self.program.structs[struct_id].fields = fields;
            }

            // Enum declarations.
            for (index, decl) in ast.enums.iter().enumerate() {
                let Some(enum_id) = self.symbols[module_id].find_enum(decl.ident.name) else { continue };
                if self.program.enums[enum_id].decl_index != index
                    || self.program.enums[enum_id].module != module_id
                {
                    continue;
                }

                if decl.variants.is_empty() {
                    self.error_at(ErrorKind::EnumZeroVariants, module_id, decl.ident.span);
                    continue;
                }
                if !decl.basic_type.is_integer() {
                    self.error_at(ErrorKind::EnumNonIntegerType, module_id, decl.ident.span);
                    continue;
                }

                name_set.clear();
                for variant in &decl.variants {
                    if !name_set.insert(variant.ident.name) {
                        self.error_at(ErrorKind::EnumDuplicateVariant, module_id, variant.ident.span);
                    }
                }
            }

            // Procedure signatures, external ones included.
            for (index, decl) in ast.procs.iter().enumerate() {
                let Some(proc_id) = self.symbols[module_id].find_proc(decl.ident.name) else { continue };
                if self.program.procs[proc_id].source != ProcSource::Top(index)
                    || self.program.procs[proc_id].module != module_id
                {
                    continue;
                }
                let sig = self.resolve_proc_signature(module_id, decl, None);
                self.program.procs[proc_id].sig = sig;
            }

            // Impl blocks: resolve the target struct, then member signatures.
            for (impl_index, impl_decl) in ast.impls.iter().enumerate() {
                let struct_id = match self.check_type_signature(module_id, &impl_decl.ty) {
                    Some(Ty {
                        pointer_level: 0,
                        kind: TyKind::Struct(id),
                    }) => Some(id),
                    Some(_) => {
                        self.report(
                            Diagnostic::new(ErrorKind::TypeMismatch)
                                .at(module_id, impl_decl.ty.span)
                                .with_info("impl target must be a struct type"),
                        );
                        None
                    }
                    None => None,
                };
                let self_ty = struct_id.map(|id| Ty {
                    pointer_level: 0,
                    kind: TyKind::Struct(id),
                });

                for (proc_index, decl) in impl_decl.procs.iter().enumerate() {
                    let Some(proc_id) = self.find_impl_proc(module_id, impl_index, proc_index) else { continue };
                    let sig = self.resolve_proc_signature(module_id, decl, self_ty.clone());
                    self.program.procs[proc_id].sig = sig;

                    if let Some(struct_id) = struct_id {
                        let methods = &mut self.program.structs[struct_id].methods;
                        if methods.insert(decl.ident.name, proc_id).is_some() {
                            self.error_at(ErrorKind::SymbolAlreadyDeclared, module_id, decl.ident.span);
                        }
                    }
                }
            }
        }

        self.check_main_proc();
    }

    fn expand_import_target(&mut self, module_id: ModuleId, import: &crate::frontend::ast::ImportDecl) {
        let path: Vec<&str> = import.modules.iter().map(|segment| self.name(segment.name)).collect();
        let base = path.join("/");

        match &import.target {
            crate::frontend::ast::ImportTarget::Module => {}
            crate::frontend::ast::ImportTarget::SymbolOrModule(symbol) => {
                // Already bound as a module alias in pass 1?
                if matches!(self.symbols[module_id].find(symbol.name), Some(SymbolKind::Module(_))) {
                    return;
                }
                let Some(source) = self.session.lookup_module(&base) else { return };
                match self.symbols[source].find(symbol.name) {
                    Some(kind) if !matches!(kind, SymbolKind::Module(_)) => {
                        self.symbols[module_id].define(symbol.name, kind);
                    }
                    _ => self.error_at(ErrorKind::UseSymbolNotFound, module_id, symbol.span),
                }
            }
            crate::frontend::ast::ImportTarget::SymbolList(symbols) => {
                let Some(source) = self.session.lookup_module(&base) else { return };
                for symbol in symbols {
                    match self.symbols[source].find(symbol.name) {
                        Some(kind) if !matches!(kind, SymbolKind::Module(_)) => {
                            self.symbols[module_id].define(symbol.name, kind);
                        }
                        _ => self.error_at(ErrorKind::UseSymbolNotFound, module_id, symbol.span),
                    }
                }
            }
            crate::frontend::ast::ImportTarget::Wildcard => {
                let Some(source) = self.session.lookup_module(&base) else { return };
                let mut entries: Vec<(NameId, SymbolKind)> = self.symbols[source]
                    .entries()
                    .filter(|(_, kind)| !matches!(kind, SymbolKind::Module(_)))
                    .collect();
                entries.sort_by(|(a, _), (b, _)| self.name(*a).cmp(self.name(*b)));

                for (name, kind) in entries {
                    if self.symbols[module_id].insert(name, kind).is_err() {
                        self.report(
                            Diagnostic::new(ErrorKind::SymbolAlreadyDeclared)
                                .at(module_id, import.span)
                                .with_info(self.name(name).to_string()),
                        );
                    }
                }
            }
        }
    }

    /// Resolve a syntactic type into a [`Ty`]. Array sizes fold here.
    pub(crate) fn check_type_signature(&mut self, module_id: ModuleId, ty: &Type) -> Option<Ty> {
        let kind = match &ty.kind {
            TypeKind::Basic(basic) => TyKind::Basic(*basic),
            TypeKind::Array(array) => {
                let len = self.eval_array_size(module_id, &array.size)?;
                let element = self.check_type_signature(module_id, &array.element)?;
                TyKind::Array(len, Box::new(element))
            }
            TypeKind::Procedure(sig) => {
                let mut params = Vec::with_capacity(sig.params.len());
                for param in &sig.params {
                    params.push(self.check_type_signature(module_id, param)?);
                }
                let return_type = match &sig.return_type {
                    Some(ret) => Some(self.check_type_signature(module_id, ret)?),
                    None => None,
                };
                TyKind::Proc(Box::new(ProcTy { params, return_type }))
            }
            TypeKind::Custom(custom) => {
                let target = self.resolve_module_path(module_id, &custom.module_path)?;
                match self.symbols[target].find(custom.ident.name) {
                    Some(SymbolKind::Struct(id)) => TyKind::Struct(id),
                    Some(SymbolKind::Enum(id)) => TyKind::Enum(id),
                    _ => {
                        self.report(
                            Diagnostic::new(ErrorKind::ResolveTypeNotFound)
                                .at(module_id, custom.ident.span)
                                .with_info(self.name(custom.ident.name).to_string()),
                        );
                        return None;
                    }
                }
            }
        };

        Some(Ty {
            pointer_level: ty.pointer_level,
            kind,
        })
    }

    fn eval_array_size(&mut self, module_id: ModuleId, size: &crate::frontend::ast::ConstEvalExpr) -> Option<u64> {
        let folded = self.eval_const_expr(module_id, &size.expr, None)?;
        match folded.value {
            ConstValue::UInt(value) => Some(value),
            ConstValue::Int(value) if value >= 0 => Some(value as u64),
            ConstValue::Int(_) => {
                self.error_at(ErrorKind::ConstevalIntOutOfRange, module_id, size.expr.span);
                None
            }
            _ => {
                self.error_at(ErrorKind::TypeMismatch, module_id, size.expr.span);
                None
            }
        }
    }

    fn resolve_proc_signature(
        &mut self,
        module_id: ModuleId,
        decl: &ProcDecl,
        self_ty: Option<Ty>,
    ) -> Option<ProcSignature> {
        let mut name_set: HashSet<NameId> = HashSet::new();
        let mut params = Vec::with_capacity(decl.params.len());
        let mut failed = false;

        for param in &decl.params {
            if !name_set.insert(param.ident.name) {
                self.error_at(ErrorKind::ProcDuplicateParam, module_id, param.ident.span);
                failed = true;
                continue;
            }

            let ty = if param.is_self {
                self_ty.clone()
            } else {
                param.ty.as_ref().and_then(|ty| self.check_type_signature(module_id, ty))
            };
            match ty {
                Some(ty) => params.push((param.ident.name, ty)),
                None => failed = true,
            }
        }

        let return_type = match &decl.return_type {
            Some(ret) => match self.check_type_signature(module_id, ret) {
                Some(ty) => Some(ty),
                None => {
                    failed = true;
                    None
                }
            },
            None => None,
        };

        if failed {
            None
        } else {
            Some(ProcSignature { params, return_type })
        }
    }

    fn find_impl_proc(&self, module_id: ModuleId, impl_index: usize, proc_index: usize) -> Option<usize> {
        self.program.procs.iter().position(|info| {
            info.module == module_id && info.source == ProcSource::Impl(impl_index, proc_index)
        })
    }

    pub(crate) fn proc_decl(&self, proc_id: usize) -> Option<&'s ProcDecl> {
        let info = &self.program.procs[proc_id];
        let ast = self.session.ast(info.module)?;
        match info.source {
            ProcSource::Top(index) => ast.procs.get(index),
            ProcSource::Impl(impl_index, proc_index) => {
                ast.impls.get(impl_index).and_then(|impl_decl| impl_decl.procs.get(proc_index))
            }
        }
    }

    fn check_main_proc(&mut self) {
        let Some(main_module) = self.main_module else { return };
        let Some(main_name) = self.session.interner.find("main") else {
            self.reporter.error(ErrorKind::MainProcNotFound);
            return;
        };
        let Some(proc_id) = self.symbols[main_module].find_proc(main_name) else {
            self.reporter.error(ErrorKind::MainProcNotFound);
            return;
        };
        let Some(decl) = self.proc_decl(proc_id) else {
            self.reporter.error(ErrorKind::CompilerInternal);
            return;
        };
        let span = decl.ident.span;

        if decl.is_external {
            self.error_at(ErrorKind::MainProcExternal, main_module, span);
        }
        if decl.is_variadic {
            self.error_at(ErrorKind::MainProcVariadic, main_module, span);
        }
        if !decl.params.is_empty() {
            self.error_at(ErrorKind::MainNotZeroParams, main_module, span);
        }
        let return_type = self.program.procs[proc_id].sig.as_ref().map(|sig| sig.return_type.clone());
        match return_type {
            Some(None) => self.error_at(ErrorKind::MainProcNoReturnType, main_module, span),
            Some(Some(ret)) if ret != Ty::basic(BasicType::I32) => {
                self.error_at(ErrorKind::MainProcWrongReturnType, main_module, span);
            }
            _ => {}
        }
    }
}
