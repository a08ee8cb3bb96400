//! Pass 5, expression side.
//!
//! Types every expression inside procedure bodies and resolves designators:
//! base lookup (locals innermost-first, then globals, or a module-prefixed
//! global/procedure), then the access chain link by link. One level of
//! pointer indirection is transparently dereferenced for field access;
//! deeper indirection is not. Implicit conversion only widens within one
//! numeric kind; everything else is a `cast`.

use crate::frontend::ast::{ChainLink, Expr, Literal, Something, Spanned, Term};
use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::module::ModuleId;
use crate::frontend::program::ProcId;
use crate::frontend::symbols::{describe_ty, ty_coerces, Ty, TyKind};
use crate::frontend::token::{BasicType, BinOp, UnOp};

use super::const_eval::literal_default;
use super::Checker;

impl<'s> Checker<'s, '_> {
    /// Type an expression and require it to fit `expected` when supplied.
    pub(crate) fn check_expr_type(
        &mut self,
        module: ModuleId,
        expr: &'s Spanned<Expr>,
        expected: Option<&Ty>,
    ) -> Option<Ty> {
        let ty = self.check_expr(module, expr, expected)?;
        if let Some(expected) = expected {
            if !ty_coerces(&ty, expected) {
                self.expr_type_error(module, expr.span, &ty, expected);
                return None;
            }
        }
        Some(ty)
    }

    fn check_expr(&mut self, module: ModuleId, expr: &'s Spanned<Expr>, expected: Option<&Ty>) -> Option<Ty> {
        match &expr.node {
            Expr::Term(term) => self.check_term(module, term, expected, expr.span),
            Expr::Unary(op, rhs) => self.check_unary(module, *op, rhs, expected, expr.span),
            Expr::Binary(op, lhs, rhs) => self.check_binary(module, *op, lhs, rhs, expected, expr.span),
        }
    }

    fn check_unary(
        &mut self,
        module: ModuleId,
        op: UnOp,
        rhs: &'s Spanned<Expr>,
        expected: Option<&Ty>,
        span: crate::frontend::ast::Span,
    ) -> Option<Ty> {
        match op {
            UnOp::Neg => {
                // A negated integer literal folds: the unsigned default
                // widens into a signed value and range-checks in context.
                if let Expr::Term(term) = &rhs.node {
                    if let Term::Literal(Literal::Int(value)) = **term {
                        let wrapper = Spanned::new(
                            Expr::Unary(UnOp::Neg, Box::new(Spanned::new(
                                Expr::Term(Box::new(Term::Literal(Literal::Int(value)))),
                                rhs.span,
                            ))),
                            span,
                        );
                        return self.eval_const_expr(module, &wrapper, expected).map(|folded| folded.ty);
                    }
                }

                let ty = self.check_expr(module, rhs, expected)?;
                match ty.as_value_basic() {
                    Some(basic) if basic.is_signed_integer() || basic.is_float() => Some(ty),
                    _ => {
                        self.report(
                            Diagnostic::new(ErrorKind::TypeMismatch)
                                .at(module, span)
                                .with_info("unary `-` needs a signed integer or float operand"),
                        );
                        None
                    }
                }
            }
            UnOp::LogicNot => {
                let ty = self.check_expr(module, rhs, Some(&Ty::basic(BasicType::Bool)))?;
                if ty.is_bool() {
                    Some(ty)
                } else {
                    self.report(
                        Diagnostic::new(ErrorKind::TypeMismatch)
                            .at(module, span)
                            .with_info("unary `!` needs a bool operand"),
                    );
                    None
                }
            }
            UnOp::BitNot => {
                let ty = self.check_expr(module, rhs, expected)?;
                if ty.is_integer() {
                    Some(ty)
                } else {
                    self.report(
                        Diagnostic::new(ErrorKind::TypeMismatch)
                            .at(module, span)
                            .with_info("unary `~` needs an integer operand"),
                    );
                    None
                }
            }
        }
    }

    fn check_binary(
        &mut self,
        module: ModuleId,
        op: BinOp,
        lhs: &'s Spanned<Expr>,
        rhs: &'s Spanned<Expr>,
        expected: Option<&Ty>,
        span: crate::frontend::ast::Span,
    ) -> Option<Ty> {
        if op.is_logic() {
            let bool_ty = Ty::basic(BasicType::Bool);
            self.check_expr_type(module, lhs, Some(&bool_ty));
            self.check_expr_type(module, rhs, Some(&bool_ty));
            return Some(bool_ty);
        }

        if op.is_comparison() {
            let lhs_ty = self.check_expr(module, lhs, None)?;
            let rhs_ty = self.check_expr(module, rhs, Some(&lhs_ty))?;
            if !ty_coerces(&rhs_ty, &lhs_ty) && !ty_coerces(&lhs_ty, &rhs_ty) {
                self.expr_type_error(module, span, &rhs_ty, &lhs_ty);
                return None;
            }
            let ordering = !matches!(op, BinOp::IsEq | BinOp::NotEq);
            if ordering {
                let numeric = lhs_ty
                    .as_value_basic()
                    .is_some_and(|basic| basic.is_integer() || basic.is_float());
                if !numeric {
                    self.report(
                        Diagnostic::new(ErrorKind::TypeMismatch)
                            .at(module, span)
                            .with_info("ordering comparison needs numeric operands"),
                    );
                    return None;
                }
            }
            return Some(Ty::basic(BasicType::Bool));
        }

        // Arithmetic and bitwise operators.
        let lhs_ty = self.check_expr(module, lhs, expected)?;
        let rhs_ty = self.check_expr(module, rhs, Some(&lhs_ty))?;

        let result = if ty_coerces(&rhs_ty, &lhs_ty) {
            lhs_ty
        } else if ty_coerces(&lhs_ty, &rhs_ty) {
            rhs_ty.clone()
        } else {
            self.expr_type_error(module, span, &rhs_ty, &lhs_ty);
            return None;
        };

        let Some(basic) = result.as_value_basic() else {
            self.error_at(ErrorKind::TypeMismatch, module, span);
            return None;
        };

        let valid = if op.is_bitwise() {
            basic.is_unsigned_integer()
        } else if op == BinOp::Rem {
            basic.is_integer()
        } else {
            basic.is_integer() || basic.is_float()
        };
        if !valid {
            self.error_at(ErrorKind::TypeMismatch, module, span);
            return None;
        }

        Some(result)
    }

    fn check_term(
        &mut self,
        module: ModuleId,
        term: &'s Term,
        expected: Option<&Ty>,
        span: crate::frontend::ast::Span,
    ) -> Option<Ty> {
        match term {
            Term::Literal(literal) => self
                .apply_context(literal_default(*literal), expected, module, span)
                .map(|folded| folded.ty),
            Term::EnumLit(ident) => self.resolve_enum_literal(module, ident, expected).map(|folded| folded.ty),
            Term::Sizeof(ty) => {
                let resolved = self.check_type_signature(module, ty)?;
                if self.type_layout(&resolved).is_none() {
                    self.report(
                        Diagnostic::new(ErrorKind::CompilerInternal)
                            .at(module, span)
                            .with_info("sizeof target has no computable size"),
                    );
                    return None;
                }
                Some(Ty::basic(BasicType::U64))
            }
            Term::Cast(target, inner) => {
                let inner_ty = self.check_expr(module, inner, None)?;
                self.check_cast(module, &inner_ty, *target, span)
            }
            Term::StructInit(init) => self.check_struct_init(module, init, expected, span),
            Term::ArrayInit(init) => self.check_array_init(module, init, expected, span),
            Term::Something(something) => match self.resolve_something(module, something)? {
                Some(ty) => Some(ty),
                None => {
                    self.report(
                        Diagnostic::new(ErrorKind::TypeMismatch)
                            .at(module, something.span)
                            .with_info("procedure has no return value to use here"),
                    );
                    None
                }
            },
        }
    }

    fn check_cast(
        &mut self,
        module: ModuleId,
        inner: &Ty,
        target: BasicType,
        span: crate::frontend::ast::Span,
    ) -> Option<Ty> {
        match target {
            BasicType::Bool => {
                self.error_at(ErrorKind::CastIntoBoolBasicType, module, span);
                return None;
            }
            BasicType::String => {
                self.error_at(ErrorKind::CastIntoStringBasicType, module, span);
                return None;
            }
            _ => {}
        }

        let source = match inner.as_value_basic() {
            Some(BasicType::Bool) => {
                self.error_at(ErrorKind::CastExprBoolBasicType, module, span);
                return None;
            }
            Some(BasicType::String) => {
                self.error_at(ErrorKind::CastExprStringBasicType, module, span);
                return None;
            }
            Some(basic) => basic,
            None => {
                self.error_at(ErrorKind::CastExprNonBasicType, module, span);
                return None;
            }
        };

        if source == target {
            let kind = if target.is_float() {
                ErrorKind::CastRedundantFloatCast
            } else {
                ErrorKind::CastRedundantIntegerCast
            };
            self.error_at(kind, module, span);
            return None;
        }

        Some(Ty::basic(target))
    }

    fn check_struct_init(
        &mut self,
        module: ModuleId,
        init: &'s crate::frontend::ast::StructInit,
        expected: Option<&Ty>,
        span: crate::frontend::ast::Span,
    ) -> Option<Ty> {
        let struct_id = match &init.ident {
            Some(ident) => {
                let target = self.resolve_module_path(module, &init.module_path)?;
                let Some(struct_id) = self.symbols[target].find_struct(ident.name) else {
                    self.report(
                        Diagnostic::new(ErrorKind::ResolveTypeNotFound)
                            .at(module, ident.span)
                            .with_info(self.name(ident.name).to_string()),
                    );
                    return None;
                };
                if let Some(expected) = expected {
                    let this = Ty {
                        pointer_level: 0,
                        kind: TyKind::Struct(struct_id),
                    };
                    if !ty_coerces(&this, expected) {
                        self.error_at(ErrorKind::ResolveStructTypeMismatch, module, span);
                        return None;
                    }
                }
                struct_id
            }
            None => match expected {
                Some(Ty {
                    pointer_level: 0,
                    kind: TyKind::Struct(struct_id),
                }) => *struct_id,
                Some(_) => {
                    self.error_at(ErrorKind::ResolveStructWrongContext, module, span);
                    return None;
                }
                None => {
                    self.error_at(ErrorKind::ResolveStructNoContext, module, span);
                    return None;
                }
            },
        };

        let fields: Vec<crate::frontend::program::FieldInfo> =
            self.program.structs[struct_id].fields.clone();

        if init.inputs.len() > fields.len() {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, span)
                    .with_info(format!(
                        "struct has {} fields but {} initializers were given",
                        fields.len(),
                        init.inputs.len()
                    )),
            );
        } else {
            for field in fields.iter().skip(init.inputs.len()) {
                if !field.has_default {
                    self.report(
                        Diagnostic::new(ErrorKind::TypeMismatch)
                            .at(module, span)
                            .with_info(format!("missing initializer for field `{}`", self.name(field.name))),
                    );
                }
            }
        }

        for (input, field) in init.inputs.iter().zip(fields.iter()) {
            self.check_expr_type(module, input, Some(&field.ty));
        }

        Some(Ty {
            pointer_level: 0,
            kind: TyKind::Struct(struct_id),
        })
    }

    fn check_array_init(
        &mut self,
        module: ModuleId,
        init: &'s crate::frontend::ast::ArrayInit,
        expected: Option<&Ty>,
        span: crate::frontend::ast::Span,
    ) -> Option<Ty> {
        let array_ty = match &init.ty {
            Some(annotation) => {
                let resolved = self.check_type_signature(module, annotation)?;
                if resolved.pointer_level != 0 || !matches!(resolved.kind, TyKind::Array(..)) {
                    self.error_at(ErrorKind::ResolveArrayWrongContext, module, span);
                    return None;
                }
                if let Some(expected) = expected {
                    if !ty_coerces(&resolved, expected) {
                        self.error_at(ErrorKind::ResolveArrayTypeMismatch, module, span);
                        return None;
                    }
                }
                resolved
            }
            None => match expected {
                Some(ty @ Ty {
                    pointer_level: 0,
                    kind: TyKind::Array(..),
                }) => (*ty).clone(),
                Some(_) => {
                    self.error_at(ErrorKind::ResolveArrayWrongContext, module, span);
                    return None;
                }
                None => {
                    self.error_at(ErrorKind::ResolveArrayNoContext, module, span);
                    return None;
                }
            },
        };

        let TyKind::Array(len, element) = &array_ty.kind else { return Some(array_ty) };
        let element = (**element).clone();
        let len = *len;

        if init.inputs.len() as u64 != len {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, span)
                    .with_info(format!(
                        "array of {} elements initialized with {} values",
                        len,
                        init.inputs.len()
                    )),
            );
        }
        for input in &init.inputs {
            self.check_expr_type(module, input, Some(&element));
        }

        Some(array_ty)
    }

    // ========================================================================
    // Designator resolution
    // ========================================================================

    /// Resolve a designator to its value type. `Some(None)` is a call with
    /// no return value — valid only in statement position, which the caller
    /// decides. `None` means an error was already reported.
    pub(crate) fn resolve_something(&mut self, module: ModuleId, something: &'s Something) -> Option<Option<Ty>> {
        let target = self.resolve_module_path(module, &something.module_path)?;
        let prefixed = !something.module_path.is_empty();

        let mut current: Option<Ty> = None;

        for (index, link) in something.chain.iter().enumerate() {
            let is_last = index + 1 == something.chain.len();

            let next = match link {
                ChainLink::Field(ident) if index == 0 => {
                    if prefixed {
                        match self.symbols[target].find_global(ident.name) {
                            Some(global_id) => match self.program.globals[global_id].ty.clone() {
                                Some(ty) => ty,
                                None => return None,
                            },
                            None => {
                                self.error_at(ErrorKind::ResolveGlobalNotFound, module, ident.span);
                                return None;
                            }
                        }
                    } else if let Some(var) = self.find_var(ident.name) {
                        var.ty.clone()
                    } else if let Some(global_id) = self.symbols[module].find_global(ident.name) {
                        match self.program.globals[global_id].ty.clone() {
                            Some(ty) => ty,
                            None => return None,
                        }
                    } else {
                        self.report(
                            Diagnostic::new(ErrorKind::VarLocalNotFound)
                                .at(module, ident.span)
                                .with_info(self.name(ident.name).to_string()),
                        );
                        return None;
                    }
                }
                ChainLink::Call(ident, args) if index == 0 => {
                    let Some(proc_id) = self.symbols[target].find_proc(ident.name) else {
                        self.report(
                            Diagnostic::new(ErrorKind::ResolveProcNotFound)
                                .at(module, ident.span)
                                .with_info(self.name(ident.name).to_string()),
                        );
                        return None;
                    };
                    self.check_call_args(module, proc_id, args, false, ident.span);
                    match self.proc_return_type(proc_id) {
                        Some(ty) => ty,
                        None if is_last => return Some(None),
                        None => {
                            self.report(
                                Diagnostic::new(ErrorKind::TypeMismatch)
                                    .at(module, ident.span)
                                    .with_info("procedure has no return value to access"),
                            );
                            return None;
                        }
                    }
                }
                ChainLink::Field(ident) => {
                    let base = current.take()?;
                    self.access_field(module, base, ident)?
                }
                ChainLink::Call(ident, args) => {
                    let base = current.take()?;
                    let proc_id = self.access_method(module, &base, ident)?;
                    self.check_call_args(module, proc_id, args, true, ident.span);
                    match self.proc_return_type(proc_id) {
                        Some(ty) => ty,
                        None if is_last => return Some(None),
                        None => {
                            self.report(
                                Diagnostic::new(ErrorKind::TypeMismatch)
                                    .at(module, ident.span)
                                    .with_info("procedure has no return value to access"),
                            );
                            return None;
                        }
                    }
                }
                ChainLink::Index(index_expr) => {
                    let base = current.take()?;
                    self.access_index(module, base, index_expr)?
                }
            };

            current = Some(next);
        }

        current.map(Some)
    }

    /// One level of pointer indirection is looked through; deeper is not.
    fn access_field(&mut self, module: ModuleId, mut base: Ty, ident: &crate::frontend::ast::Ident) -> Option<Ty> {
        if base.pointer_level == 1 {
            base.pointer_level = 0;
        }
        if base.pointer_level > 0 {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, ident.span)
                    .with_info("field access through more than one pointer level"),
            );
            return None;
        }

        let TyKind::Struct(struct_id) = base.kind else {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, ident.span)
                    .with_info("field access on a non-struct value"),
            );
            return None;
        };

        match self.program.structs[struct_id]
            .fields
            .iter()
            .find(|field| field.name == ident.name)
        {
            Some(field) => Some(field.ty.clone()),
            None => {
                self.report(
                    Diagnostic::new(ErrorKind::ResolveStructFieldNotFound)
                        .at(module, ident.span)
                        .with_info(self.name(ident.name).to_string()),
                );
                None
            }
        }
    }

    fn access_method(&mut self, module: ModuleId, base: &Ty, ident: &crate::frontend::ast::Ident) -> Option<ProcId> {
        let mut effective = base.clone();
        if effective.pointer_level == 1 {
            effective.pointer_level = 0;
        }
        let (0, TyKind::Struct(struct_id)) = (effective.pointer_level, &effective.kind) else {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, ident.span)
                    .with_info("method call on a non-struct value"),
            );
            return None;
        };

        match self.program.structs[*struct_id].methods.get(&ident.name) {
            Some(&proc_id) => Some(proc_id),
            None => {
                self.report(
                    Diagnostic::new(ErrorKind::ResolveProcNotFound)
                        .at(module, ident.span)
                        .with_info(self.name(ident.name).to_string()),
                );
                None
            }
        }
    }

    fn access_index(&mut self, module: ModuleId, base: Ty, index: &'s Spanned<Expr>) -> Option<Ty> {
        if base.pointer_level != 0 {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, index.span)
                    .with_info("indexing a pointer value"),
            );
            return None;
        }
        let TyKind::Array(_, element) = &base.kind else {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, index.span)
                    .with_info("indexing a non-array value"),
            );
            return None;
        };
        let element = (**element).clone();

        if let Some(index_ty) = self.check_expr_type(module, index, None) {
            if !index_ty.is_integer() {
                self.report(
                    Diagnostic::new(ErrorKind::TypeMismatch)
                        .at(module, index.span)
                        .with_info("array index must be an integer"),
                );
            }
        }

        Some(element)
    }

    /// Arity (variadic callees accept at least the declared count) and
    /// per-argument type checks.
    fn check_call_args(
        &mut self,
        module: ModuleId,
        proc_id: ProcId,
        args: &'s [Spanned<Expr>],
        skip_self: bool,
        span: crate::frontend::ast::Span,
    ) {
        let Some(sig) = self.program.procs[proc_id].sig.clone() else { return };
        let params = sig.params.get(usize::from(skip_self)..).unwrap_or(&[]);
        let variadic = self.program.procs[proc_id].is_variadic;

        let arity_ok = if variadic {
            args.len() >= params.len()
        } else {
            args.len() == params.len()
        };
        if !arity_ok {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, span)
                    .with_info(format!(
                        "procedure expects {}{} arguments, {} given",
                        params.len(),
                        if variadic { " or more" } else { "" },
                        args.len()
                    )),
            );
        }

        for (index, arg) in args.iter().enumerate() {
            match params.get(index) {
                Some((_, ty)) => {
                    let ty = ty.clone();
                    self.check_expr_type(module, arg, Some(&ty));
                }
                None => {
                    self.check_expr_type(module, arg, None);
                }
            }
        }
    }

    fn proc_return_type(&self, proc_id: ProcId) -> Option<Ty> {
        self.program.procs[proc_id]
            .sig
            .as_ref()
            .and_then(|sig| sig.return_type.clone())
    }

    fn expr_type_error(&mut self, module: ModuleId, span: crate::frontend::ast::Span, found: &Ty, expected: &Ty) {
        let found = describe_ty(found, &self.program, &self.session.interner);
        let expected = describe_ty(expected, &self.program, &self.session.interner);
        self.report(
            Diagnostic::new(ErrorKind::TypeMismatch)
                .at(module, span)
                .with_info(format!("expected `{}`, found `{}`", expected, found)),
        );
    }
}
