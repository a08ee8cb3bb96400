//! Pass 4: constant folding with dependency-cycle detection.
//!
//! Every constant expression (global initializer, enum variant value,
//! struct field default, array-type size, switch case) folds through this
//! evaluator. Named constants move through the state machine
//! `NotEvaluated → Evaluating → {Invalid, Valid}`; the evaluation stack is
//! the parent chain of the active dependency path, so re-entering a
//! constant that is still `Evaluating` is a dependency cycle: it is
//! reported once and every constant on the path is marked `Invalid`.
//!
//! Raw integer literals default to unsigned; a supplied type context
//! retypes and range-checks them. Unary minus on an unsigned value that
//! fits a signed 64-bit integer widens it. Arithmetic requires same-kind
//! operands, `%` is integer-only, and the bitwise operators work on
//! unsigned integers only. Overflow, division by zero, remainder by zero
//! and NaN production are distinct errors.

use crate::frontend::ast::{Expr, Ident, Literal, Span, Spanned, Term};
use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::module::ModuleId;
use crate::frontend::program::{EnumId, GlobalId, StructId};
use crate::frontend::symbols::{basic_widens, ConstValue, SymbolKind, Ty, TyKind};
use crate::frontend::token::{BasicType, BinOp, UnOp};

use super::Checker;

/// Identity of a named constant expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstId {
    Global(GlobalId),
    EnumVariant(EnumId, usize),
    StructDefault(StructId, usize),
}

/// Folding state of a named constant. `Valid` holds both literal and enum
/// results; the value kind tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstState {
    NotEvaluated,
    Evaluating,
    Invalid,
    Valid(Folded),
}

/// A folded constant: its value and the basic-or-enum type it was folded at.
#[derive(Debug, Clone, PartialEq)]
pub struct Folded {
    pub ty: Ty,
    pub value: ConstValue,
}

impl Checker<'_, '_> {
    pub(crate) fn pass_4_const_eval(&mut self) {
        for module_id in self.session.module_ids() {
            for struct_id in 0..self.program.structs.len() {
                if self.program.structs[struct_id].module != module_id {
                    continue;
                }
                for field_index in 0..self.program.structs[struct_id].fields.len() {
                    if self.program.structs[struct_id].fields[field_index].has_default {
                        self.eval_const(ConstId::StructDefault(struct_id, field_index));
                    }
                }
            }
            for enum_id in 0..self.program.enums.len() {
                if self.program.enums[enum_id].module != module_id {
                    continue;
                }
                for variant_index in 0..self.program.enums[enum_id].variants.len() {
                    self.eval_const(ConstId::EnumVariant(enum_id, variant_index));
                }
            }
            for global_id in 0..self.program.globals.len() {
                if self.program.globals[global_id].module != module_id {
                    continue;
                }
                self.eval_const(ConstId::Global(global_id));
            }
        }
    }

    /// Evaluate a named constant through the state machine. Folding is
    /// idempotent: terminal states return immediately.
    pub(crate) fn eval_const(&mut self, id: ConstId) -> Option<Folded> {
        match self.const_states.get(&id).cloned().unwrap_or(ConstState::NotEvaluated) {
            ConstState::Valid(folded) => Some(folded),
            ConstState::Invalid => None,
            ConstState::Evaluating => {
                self.report_const_cycle(id);
                None
            }
            ConstState::NotEvaluated => {
                self.const_states.insert(id, ConstState::Evaluating);
                self.eval_stack.push(id);
                let result = self.eval_const_body(id);
                self.eval_stack.pop();

                match &result {
                    Some(folded) => {
                        self.const_states.insert(id, ConstState::Valid(folded.clone()));
                        self.record_const(id, folded);
                    }
                    None => {
                        self.const_states.insert(id, ConstState::Invalid);
                    }
                }
                result
            }
        }
    }

    fn report_const_cycle(&mut self, id: ConstId) {
        let position = self.eval_stack.iter().position(|&entry| entry == id).unwrap_or(0);
        let cycle = self.eval_stack[position..].to_vec();

        let mut path: Vec<String> = cycle.iter().map(|&entry| self.const_name(entry)).collect();
        path.push(self.const_name(id));
        let (module, span) = self.const_origin(id);
        self.report(
            Diagnostic::new(ErrorKind::ConstevalDependencyCycle)
                .at(module, span)
                .with_info(path.join(" -> ")),
        );

        for entry in cycle {
            self.const_states.insert(entry, ConstState::Invalid);
        }
    }

    fn eval_const_body(&mut self, id: ConstId) -> Option<Folded> {
        let session = self.session;
        match id {
            ConstId::Global(global_id) => {
                let info = &self.program.globals[global_id];
                let (module, decl_index) = (info.module, info.decl_index);
                let expr = &session.ast(module)?.globals[decl_index].value.expr;
                self.eval_const_expr(module, expr, None)
            }
            ConstId::EnumVariant(enum_id, variant_index) => {
                let info = &self.program.enums[enum_id];
                let (module, decl_index, basic) = (info.module, info.decl_index, info.basic_type);
                let expr = &session.ast(module)?.enums[decl_index].variants[variant_index].value.expr;
                let expected = Ty::basic(basic);
                self.eval_const_expr(module, expr, Some(&expected))
            }
            ConstId::StructDefault(struct_id, field_index) => {
                let info = &self.program.structs[struct_id];
                let (module, decl_index) = (info.module, info.decl_index);
                let expected = info.fields[field_index].ty.clone();
                let field = &session.ast(module)?.structs[decl_index].fields[field_index];
                let expr = &field.default.as_ref()?.expr;
                self.eval_const_expr(module, expr, Some(&expected))
            }
        }
    }

    fn record_const(&mut self, id: ConstId, folded: &Folded) {
        match id {
            ConstId::Global(global_id) => {
                self.program.globals[global_id].ty = Some(folded.ty.clone());
                self.program.globals[global_id].value = Some(folded.value);
            }
            ConstId::EnumVariant(enum_id, variant_index) => {
                self.program.enums[enum_id].variants[variant_index].value = Some(folded.value);
            }
            ConstId::StructDefault(..) => {}
        }
    }

    fn const_name(&self, id: ConstId) -> String {
        match id {
            ConstId::Global(global_id) => self.name(self.program.globals[global_id].name).to_string(),
            ConstId::EnumVariant(enum_id, variant_index) => {
                let info = &self.program.enums[enum_id];
                format!("{}.{}", self.name(info.name), self.name(info.variants[variant_index].name))
            }
            ConstId::StructDefault(struct_id, field_index) => {
                let info = &self.program.structs[struct_id];
                format!("{}.{}", self.name(info.name), self.name(info.fields[field_index].name))
            }
        }
    }

    fn const_origin(&self, id: ConstId) -> (ModuleId, Span) {
        let fallback = Span::default();
        match id {
            ConstId::Global(global_id) => {
                let info = &self.program.globals[global_id];
                let span = self
                    .session
                    .ast(info.module)
                    .map(|ast| ast.globals[info.decl_index].value.expr.span)
                    .unwrap_or(fallback);
                (info.module, span)
            }
            ConstId::EnumVariant(enum_id, variant_index) => {
                let info = &self.program.enums[enum_id];
                let span = self
                    .session
                    .ast(info.module)
                    .map(|ast| ast.enums[info.decl_index].variants[variant_index].value.expr.span)
                    .unwrap_or(fallback);
                (info.module, span)
            }
            ConstId::StructDefault(struct_id, field_index) => {
                let info = &self.program.structs[struct_id];
                let span = self
                    .session
                    .ast(info.module)
                    .and_then(|ast| {
                        ast.structs[info.decl_index].fields[field_index]
                            .default
                            .as_ref()
                            .map(|default| default.expr.span)
                    })
                    .unwrap_or(fallback);
                (info.module, span)
            }
        }
    }

    // ========================================================================
    // Expression folding
    // ========================================================================

    pub(crate) fn eval_const_expr(
        &mut self,
        module: ModuleId,
        expr: &Spanned<Expr>,
        expected: Option<&Ty>,
    ) -> Option<Folded> {
        match &expr.node {
            Expr::Term(term) => self.eval_term(module, term, expected, expr.span),
            Expr::Unary(op, rhs) => {
                let folded = match op {
                    UnOp::Neg => {
                        let rhs = self.eval_const_expr(module, rhs, None)?;
                        self.eval_neg(rhs, module, expr.span)?
                    }
                    UnOp::LogicNot => {
                        let rhs = self.eval_const_expr(module, rhs, None)?;
                        match rhs.value {
                            ConstValue::Bool(value) => Folded {
                                ty: Ty::basic(BasicType::Bool),
                                value: ConstValue::Bool(!value),
                            },
                            _ => return self.const_type_error(module, expr.span),
                        }
                    }
                    UnOp::BitNot => {
                        let rhs = self.eval_const_expr(module, rhs, None)?;
                        match rhs.value {
                            ConstValue::UInt(value) => Folded {
                                ty: rhs.ty,
                                value: ConstValue::UInt(!value),
                            },
                            ConstValue::Int(value) => Folded {
                                ty: rhs.ty,
                                value: ConstValue::Int(!value),
                            },
                            _ => return self.const_type_error(module, expr.span),
                        }
                    }
                };
                self.apply_context(folded, expected, module, expr.span)
            }
            Expr::Binary(op, lhs, rhs) => {
                let operand_expected = if op.is_comparison() || op.is_logic() { None } else { expected };
                let lhs = self.eval_const_expr(module, lhs, operand_expected)?;
                let rhs = self.eval_const_expr(module, rhs, operand_expected)?;
                let folded = self.eval_binary(*op, lhs, rhs, module, expr.span)?;
                self.apply_context(folded, expected, module, expr.span)
            }
        }
    }

    fn eval_term(&mut self, module: ModuleId, term: &Term, expected: Option<&Ty>, span: Span) -> Option<Folded> {
        match term {
            Term::Literal(literal) => {
                let folded = literal_default(*literal);
                self.apply_context(folded, expected, module, span)
            }
            Term::EnumLit(ident) => {
                let folded = self.resolve_enum_literal(module, ident, expected)?;
                Some(folded)
            }
            Term::Sizeof(ty) => {
                let resolved = self.check_type_signature(module, ty)?;
                let Some(layout) = self.type_layout(&resolved) else {
                    self.report(
                        Diagnostic::new(ErrorKind::CompilerInternal)
                            .at(module, span)
                            .with_info("sizeof target has no computable size"),
                    );
                    return None;
                };
                let folded = Folded {
                    ty: Ty::basic(BasicType::U64),
                    value: ConstValue::UInt(layout.size),
                };
                self.apply_context(folded, expected, module, span)
            }
            Term::Cast(target, inner) => {
                let inner = self.eval_const_expr(module, inner, None)?;
                let folded = self.eval_cast(inner, *target, module, span)?;
                self.apply_context(folded, expected, module, span)
            }
            Term::StructInit(_) | Term::ArrayInit(_) => {
                self.error_at(ErrorKind::ExprExpectedConstant, module, span);
                None
            }
            Term::Something(something) => {
                // Only whole globals fold; calls and deeper access do not.
                for link in &something.chain {
                    if matches!(link, crate::frontend::ast::ChainLink::Call(..)) {
                        self.error_at(ErrorKind::ConstProcIsNotConst, module, span);
                        return None;
                    }
                }
                if something.chain.len() != 1 {
                    self.error_at(ErrorKind::ExprExpectedConstant, module, span);
                    return None;
                }
                let crate::frontend::ast::ChainLink::Field(ident) = &something.chain[0] else {
                    self.error_at(ErrorKind::ExprExpectedConstant, module, span);
                    return None;
                };

                let target = self.resolve_module_path(module, &something.module_path)?;
                match self.symbols[target].find(ident.name) {
                    Some(SymbolKind::Global(global_id)) => {
                        let folded = self.eval_const(ConstId::Global(global_id))?;
                        self.apply_context(folded, expected, module, span)
                    }
                    Some(_) => {
                        self.error_at(ErrorKind::ConstVarIsNotGlobal, module, ident.span);
                        None
                    }
                    None if something.module_path.is_empty() => {
                        self.error_at(ErrorKind::VarLocalNotFound, module, ident.span);
                        None
                    }
                    None => {
                        self.error_at(ErrorKind::ResolveGlobalNotFound, module, ident.span);
                        None
                    }
                }
            }
        }
    }

    pub(crate) fn resolve_enum_literal(
        &mut self,
        module: ModuleId,
        ident: &Ident,
        expected: Option<&Ty>,
    ) -> Option<Folded> {
        let Some(Ty {
            pointer_level: 0,
            kind: TyKind::Enum(enum_id),
        }) = expected
        else {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, ident.span)
                    .with_info("enum literal requires an enum type from context"),
            );
            return None;
        };

        let info = &self.program.enums[*enum_id];
        match info.variants.iter().position(|variant| variant.name == ident.name) {
            Some(index) => Some(Folded {
                ty: Ty {
                    pointer_level: 0,
                    kind: TyKind::Enum(*enum_id),
                },
                value: ConstValue::Enum(*enum_id, index as u32),
            }),
            None => {
                self.error_at(ErrorKind::ResolveEnumVariantNotFound, module, ident.span);
                None
            }
        }
    }

    fn eval_neg(&mut self, rhs: Folded, module: ModuleId, span: Span) -> Option<Folded> {
        match rhs.value {
            ConstValue::Float(value) => Some(Folded {
                ty: rhs.ty,
                value: ConstValue::Float(-value),
            }),
            ConstValue::Int(value) => match value.checked_neg() {
                Some(negated) => Some(Folded {
                    ty: rhs.ty,
                    value: ConstValue::Int(negated),
                }),
                None => {
                    self.error_at(ErrorKind::ConstevalIntOverflow, module, span);
                    None
                }
            },
            // An unsigned value that fits a signed 64-bit integer widens.
            ConstValue::UInt(value) => {
                if value <= (1u64 << 63) {
                    Some(Folded {
                        ty: Ty::basic(BasicType::I64),
                        value: ConstValue::Int((value as i128).wrapping_neg() as i64),
                    })
                } else {
                    self.error_at(ErrorKind::ConstevalIntOverflow, module, span);
                    None
                }
            }
            _ => self.const_type_error(module, span),
        }
    }

    fn eval_cast(&mut self, inner: Folded, target: BasicType, module: ModuleId, span: Span) -> Option<Folded> {
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

        let source = match inner.ty.as_value_basic() {
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

        let value = cast_value(inner.value, target);
        Some(Folded {
            ty: Ty::basic(target),
            value,
        })
    }

    fn eval_binary(&mut self, op: BinOp, lhs: Folded, rhs: Folded, module: ModuleId, span: Span) -> Option<Folded> {
        use ConstValue::*;

        if op.is_logic() {
            return match (lhs.value, rhs.value) {
                (Bool(left), Bool(right)) => {
                    let result = match op {
                        BinOp::LogicAnd => left && right,
                        _ => left || right,
                    };
                    Some(Folded {
                        ty: Ty::basic(BasicType::Bool),
                        value: Bool(result),
                    })
                }
                _ => self.const_type_error(module, span),
            };
        }

        if op.is_comparison() {
            let (lhs, rhs) = self.unify_int_kinds(lhs, rhs, module, span)?;
            let result = match (lhs.value, rhs.value) {
                (Int(left), Int(right)) => compare(op, left.cmp(&right))?,
                (UInt(left), UInt(right)) => compare(op, left.cmp(&right))?,
                (Float(left), Float(right)) => match op {
                    BinOp::IsEq => left == right,
                    BinOp::NotEq => left != right,
                    BinOp::Less => left < right,
                    BinOp::LessEq => left <= right,
                    BinOp::Greater => left > right,
                    BinOp::GreaterEq => left >= right,
                    _ => return self.const_type_error(module, span),
                },
                (Bool(left), Bool(right)) if matches!(op, BinOp::IsEq | BinOp::NotEq) => {
                    if op == BinOp::IsEq { left == right } else { left != right }
                }
                (Str(left), Str(right)) if matches!(op, BinOp::IsEq | BinOp::NotEq) => {
                    if op == BinOp::IsEq { left == right } else { left != right }
                }
                (Enum(le, lv), Enum(re, rv)) if matches!(op, BinOp::IsEq | BinOp::NotEq) && le == re => {
                    if op == BinOp::IsEq { lv == rv } else { lv != rv }
                }
                _ => return self.const_type_error(module, span),
            };
            return Some(Folded {
                ty: Ty::basic(BasicType::Bool),
                value: Bool(result),
            });
        }

        if op.is_bitwise() {
            // Bitwise operators work on unsigned integers only.
            let (UInt(left), UInt(right)) = (lhs.value, rhs.value) else {
                return self.const_type_error(module, span);
            };
            let value = match op {
                BinOp::BitAnd => Some(left & right),
                BinOp::BitOr => Some(left | right),
                BinOp::BitXor => Some(left ^ right),
                BinOp::Shl => u32::try_from(right).ok().and_then(|shift| left.checked_shl(shift)),
                BinOp::Shr => u32::try_from(right).ok().and_then(|shift| left.checked_shr(shift)),
                _ => None,
            };
            return match value {
                Some(value) => Some(Folded {
                    ty: wider_ty(&lhs.ty, &rhs.ty),
                    value: UInt(value),
                }),
                None => {
                    self.error_at(ErrorKind::ConstevalIntOverflow, module, span);
                    None
                }
            };
        }

        // Arithmetic: same-kind, non-bool operands.
        let (lhs, rhs) = self.unify_int_kinds(lhs, rhs, module, span)?;
        let ty = wider_ty(&lhs.ty, &rhs.ty);
        match (lhs.value, rhs.value) {
            (Int(left), Int(right)) => {
                let value = match op {
                    BinOp::Add => left.checked_add(right),
                    BinOp::Sub => left.checked_sub(right),
                    BinOp::Mul => left.checked_mul(right),
                    BinOp::Div => {
                        if right == 0 {
                            self.error_at(ErrorKind::ConstevalZeroDiv, module, span);
                            return None;
                        }
                        left.checked_div(right)
                    }
                    BinOp::Rem => {
                        if right == 0 {
                            self.error_at(ErrorKind::ConstevalZeroMod, module, span);
                            return None;
                        }
                        left.checked_rem(right)
                    }
                    _ => None,
                };
                match value {
                    Some(value) => Some(Folded { ty, value: Int(value) }),
                    None => {
                        self.error_at(ErrorKind::ConstevalIntOverflow, module, span);
                        None
                    }
                }
            }
            (UInt(left), UInt(right)) => {
                let value = match op {
                    BinOp::Add => left.checked_add(right),
                    BinOp::Sub => left.checked_sub(right),
                    BinOp::Mul => left.checked_mul(right),
                    BinOp::Div => {
                        if right == 0 {
                            self.error_at(ErrorKind::ConstevalZeroDiv, module, span);
                            return None;
                        }
                        left.checked_div(right)
                    }
                    BinOp::Rem => {
                        if right == 0 {
                            self.error_at(ErrorKind::ConstevalZeroMod, module, span);
                            return None;
                        }
                        left.checked_rem(right)
                    }
                    _ => None,
                };
                match value {
                    Some(value) => Some(Folded { ty, value: UInt(value) }),
                    None => {
                        self.error_at(ErrorKind::ConstevalIntOverflow, module, span);
                        None
                    }
                }
            }
            (Float(left), Float(right)) => {
                let value = match op {
                    BinOp::Add => left + right,
                    BinOp::Sub => left - right,
                    BinOp::Mul => left * right,
                    BinOp::Div => left / right,
                    // `%` is integer-only.
                    _ => return self.const_type_error(module, span),
                };
                if value.is_nan() {
                    self.error_at(ErrorKind::ConstevalNanProduced, module, span);
                    return None;
                }
                Some(Folded { ty, value: Float(value) })
            }
            _ => self.const_type_error(module, span),
        }
    }

    /// Pair a signed and an unsigned operand by converting the unsigned one
    /// when its value fits; mixed kinds otherwise fail.
    fn unify_int_kinds(&mut self, lhs: Folded, rhs: Folded, module: ModuleId, span: Span) -> Option<(Folded, Folded)> {
        match (&lhs.value, &rhs.value) {
            (ConstValue::Int(_), ConstValue::UInt(value)) => {
                if *value <= i64::MAX as u64 {
                    let converted = Folded {
                        ty: lhs.ty.clone(),
                        value: ConstValue::Int(*value as i64),
                    };
                    Some((lhs, converted))
                } else {
                    self.error_at(ErrorKind::TypeMismatch, module, span);
                    None
                }
            }
            (ConstValue::UInt(value), ConstValue::Int(_)) => {
                if *value <= i64::MAX as u64 {
                    let converted = Folded {
                        ty: rhs.ty.clone(),
                        value: ConstValue::Int(*value as i64),
                    };
                    Some((converted, rhs))
                } else {
                    self.error_at(ErrorKind::TypeMismatch, module, span);
                    None
                }
            }
            _ => Some((lhs, rhs)),
        }
    }

    fn const_type_error(&mut self, module: ModuleId, span: Span) -> Option<Folded> {
        self.error_at(ErrorKind::TypeMismatch, module, span);
        None
    }

    /// Prefer the supplied type context over the syntactic default,
    /// range-checking integer values into the target type.
    pub(crate) fn apply_context(
        &mut self,
        folded: Folded,
        expected: Option<&Ty>,
        module: ModuleId,
        span: Span,
    ) -> Option<Folded> {
        let Some(expected) = expected else { return Some(folded) };

        if let Some(target) = expected.as_value_basic() {
            if target.is_integer() {
                let fits = match folded.value {
                    ConstValue::Int(value) => int_fits(value, target),
                    ConstValue::UInt(value) => uint_fits(value, target),
                    _ => {
                        self.type_context_error(module, span, &folded, expected);
                        return None;
                    }
                };
                if !fits {
                    self.error_at(ErrorKind::ConstevalIntOutOfRange, module, span);
                    return None;
                }
                let value = retag_int(folded.value, target);
                return Some(Folded {
                    ty: expected.clone(),
                    value,
                });
            }
            if target.is_float() {
                return match folded.value {
                    ConstValue::Float(_) => Some(Folded {
                        ty: expected.clone(),
                        value: folded.value,
                    }),
                    _ => {
                        self.type_context_error(module, span, &folded, expected);
                        None
                    }
                };
            }
        }

        // Non-numeric contexts require an exact (or widening) match.
        if crate::frontend::symbols::ty_coerces(&folded.ty, expected) {
            return Some(Folded {
                ty: expected.clone(),
                value: folded.value,
            });
        }
        self.type_context_error(module, span, &folded, expected);
        None
    }

    fn type_context_error(&mut self, module: ModuleId, span: Span, folded: &Folded, expected: &Ty) {
        let found = crate::frontend::symbols::describe_ty(&folded.ty, &self.program, &self.session.interner);
        let wanted = crate::frontend::symbols::describe_ty(expected, &self.program, &self.session.interner);
        self.report(
            Diagnostic::new(ErrorKind::TypeMismatch)
                .at(module, span)
                .with_info(format!("expected `{}`, found `{}`", wanted, found)),
        );
    }
}

/// Default folding of a literal with no context: raw integers are unsigned
/// 64-bit, floats are f64.
pub(crate) fn literal_default(literal: Literal) -> Folded {
    match literal {
        Literal::Bool(value) => Folded {
            ty: Ty::basic(BasicType::Bool),
            value: ConstValue::Bool(value),
        },
        Literal::Int(value) => Folded {
            ty: Ty::basic(BasicType::U64),
            value: ConstValue::UInt(value),
        },
        Literal::Float(value) => Folded {
            ty: Ty::basic(BasicType::F64),
            value: ConstValue::Float(value),
        },
        Literal::Str(value) => Folded {
            ty: Ty::basic(BasicType::String),
            value: ConstValue::Str(value),
        },
    }
}

fn int_fits(value: i64, target: BasicType) -> bool {
    let value = value as i128;
    let (min, max) = int_range(target);
    value >= min && value <= max
}

fn uint_fits(value: u64, target: BasicType) -> bool {
    let (_, max) = int_range(target);
    (value as i128) <= max
}

fn int_range(target: BasicType) -> (i128, i128) {
    match target {
        BasicType::I8 => (i8::MIN as i128, i8::MAX as i128),
        BasicType::U8 => (0, u8::MAX as i128),
        BasicType::I16 => (i16::MIN as i128, i16::MAX as i128),
        BasicType::U16 => (0, u16::MAX as i128),
        BasicType::I32 => (i32::MIN as i128, i32::MAX as i128),
        BasicType::U32 => (0, u32::MAX as i128),
        BasicType::I64 => (i64::MIN as i128, i64::MAX as i128),
        BasicType::U64 => (0, u64::MAX as i128),
        _ => (0, 0),
    }
}

fn retag_int(value: ConstValue, target: BasicType) -> ConstValue {
    match value {
        ConstValue::Int(value) if target.is_unsigned_integer() => ConstValue::UInt(value as u64),
        ConstValue::UInt(value) if target.is_signed_integer() => ConstValue::Int(value as i64),
        other => other,
    }
}

fn cast_value(value: ConstValue, target: BasicType) -> ConstValue {
    match value {
        ConstValue::Int(value) => cast_from_i128(value as i128, target),
        ConstValue::UInt(value) => cast_from_i128(value as i128, target),
        ConstValue::Float(value) => {
            if target.is_float() {
                let value = if target == BasicType::F32 { value as f32 as f64 } else { value };
                ConstValue::Float(value)
            } else if target.is_signed_integer() {
                ConstValue::Int(value as i64)
            } else {
                ConstValue::UInt(value as u64)
            }
        }
        other => other,
    }
}

fn cast_from_i128(value: i128, target: BasicType) -> ConstValue {
    match target {
        BasicType::I8 => ConstValue::Int(value as i8 as i64),
        BasicType::I16 => ConstValue::Int(value as i16 as i64),
        BasicType::I32 => ConstValue::Int(value as i32 as i64),
        BasicType::I64 => ConstValue::Int(value as i64),
        BasicType::U8 => ConstValue::UInt(value as u8 as u64),
        BasicType::U16 => ConstValue::UInt(value as u16 as u64),
        BasicType::U32 => ConstValue::UInt(value as u32 as u64),
        BasicType::U64 => ConstValue::UInt(value as u64),
        BasicType::F32 => ConstValue::Float(value as f32 as f64),
        BasicType::F64 => ConstValue::Float(value as f64),
        _ => ConstValue::UInt(0),
    }
}

fn wider_ty(lhs: &Ty, rhs: &Ty) -> Ty {
    match (lhs.as_value_basic(), rhs.as_value_basic()) {
        (Some(left), Some(right)) if basic_widens(left, right) => rhs.clone(),
        _ => lhs.clone(),
    }
}

fn compare(op: BinOp, ordering: std::cmp::Ordering) -> Option<bool> {
    use std::cmp::Ordering;
    Some(match op {
        BinOp::IsEq => ordering == Ordering::Equal,
        BinOp::NotEq => ordering != Ordering::Equal,
        BinOp::Less => ordering == Ordering::Less,
        BinOp::LessEq => ordering != Ordering::Greater,
        BinOp::Greater => ordering == Ordering::Greater,
        BinOp::GreaterEq => ordering != Ordering::Less,
        _ => return None,
    })
}
