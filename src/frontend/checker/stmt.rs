//! Pass 5, statement side.
//!
//! Each non-external procedure runs two sub-phases. The CFG walk computes a
//! [`Terminator`] per block: a block terminates like its last reachable
//! statement, statements after a terminator are unreachable, `if/else`
//! propagates a terminator only when both branches terminate identically,
//! and `break`/`continue`/`return`/`defer` legality is enforced here. The
//! type walk then checks every statement against the block stack: one frame
//! per lexical scope over a flat variable stack, innermost-first lookup,
//! shadowing forbidden.

use crate::frontend::ast::{Block, Else, If, Spanned, Stmt, Switch};
use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::module::ModuleId;
use crate::frontend::symbols::Ty;
use crate::frontend::token::{AssignOp, BasicType};
use crate::support::NameId;

use super::{BlockScope, Checker, LocalVar};

/// How a block's normal control flow ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminator {
    None,
    Return,
    Break,
    Continue,
}

impl<'s> Checker<'s, '_> {
    #[tracing::instrument(skip_all, fields(procs = self.program.procs.len()))]
    pub(crate) fn pass_5_proc_bodies(&mut self) {
        for proc_id in 0..self.program.procs.len() {
            if self.program.procs[proc_id].is_external {
                continue;
            }
            let module = self.program.procs[proc_id].module;
            let Some(decl) = self.proc_decl(proc_id) else { continue };
            let Some(block) = &decl.block else { continue };

            let terminator = self.check_block_cfg(module, block, false, false);
            if terminator != Terminator::Return && decl.return_type.is_some() {
                self.error_at(ErrorKind::CfgNotAllPathsReturn, module, decl.ident.span);
            }

            self.current_proc = Some(proc_id);
            self.vars.clear();
            self.blocks.clear();
            self.push_scope();

            if let Some(sig) = self.program.procs[proc_id].sig.clone() {
                for (index, (name, ty)) in sig.params.iter().enumerate() {
                    let span = decl.params.get(index).map(|param| param.ident.span).unwrap_or_default();
                    if self.symbols[module].find_global(*name).is_some() {
                        self.error_at(ErrorKind::VarDeclAlreadyIsGlobal, module, span);
                    } else if !self.var_in_scope(*name) {
                        self.add_var(*name, ty.clone());
                    }
                }
            }

            self.check_block(module, block, true);
            self.current_proc = None;
        }
    }

    // ========================================================================
    // CFG walk
    // ========================================================================

    pub(crate) fn check_block_cfg(
        &mut self,
        module: ModuleId,
        block: &Block,
        in_loop: bool,
        in_defer: bool,
    ) -> Terminator {
        let mut terminator = Terminator::None;

        for stmt in &block.stmts {
            if terminator != Terminator::None {
                self.error_at(ErrorKind::CfgUnreachableStatement, module, stmt.span);
                break;
            }

            match &stmt.node {
                Stmt::If(if_stmt) => {
                    terminator = self.check_if_cfg(module, if_stmt, in_loop, in_defer);
                }
                Stmt::For(for_stmt) => {
                    self.check_block_cfg(module, &for_stmt.block, true, in_defer);
                }
                Stmt::Block(inner) => {
                    terminator = self.check_block_cfg(module, inner, in_loop, in_defer);
                }
                Stmt::Defer(inner) => {
                    if in_defer {
                        self.error_at(ErrorKind::CfgNestedDefer, module, stmt.span);
                    } else {
                        self.check_block_cfg(module, inner, false, true);
                    }
                }
                Stmt::Break => {
                    if !in_loop {
                        let kind = if in_defer {
                            ErrorKind::CfgBreakInsideDefer
                        } else {
                            ErrorKind::CfgBreakOutsideLoop
                        };
                        self.error_at(kind, module, stmt.span);
                    } else {
                        terminator = Terminator::Break;
                    }
                }
                Stmt::Continue => {
                    if !in_loop {
                        let kind = if in_defer {
                            ErrorKind::CfgContinueInsideDefer
                        } else {
                            ErrorKind::CfgContinueOutsideLoop
                        };
                        self.error_at(kind, module, stmt.span);
                    } else {
                        terminator = Terminator::Continue;
                    }
                }
                Stmt::Return(_) => {
                    if in_defer {
                        self.error_at(ErrorKind::CfgReturnInsideDefer, module, stmt.span);
                    } else {
                        terminator = Terminator::Return;
                    }
                }
                Stmt::Switch(switch) => {
                    for case in &switch.cases {
                        self.check_block_cfg(module, &case.block, in_loop, in_defer);
                    }
                }
                Stmt::ProcCall(_) | Stmt::VarDecl(_) | Stmt::VarAssign(_) => {}
            }
        }

        terminator
    }

    /// Both branches must terminate identically for an `if` to terminate;
    /// a missing `else` never terminates.
    fn check_if_cfg(&mut self, module: ModuleId, if_stmt: &If, in_loop: bool, in_defer: bool) -> Terminator {
        let then_terminator = self.check_block_cfg(module, &if_stmt.block, in_loop, in_defer);

        let else_terminator = match &if_stmt.else_branch {
            Some(Else::If(next)) => self.check_if_cfg(module, next, in_loop, in_defer),
            Some(Else::Block(block)) => self.check_block_cfg(module, block, in_loop, in_defer),
            None => return Terminator::None,
        };

        if then_terminator == else_terminator {
            then_terminator
        } else {
            Terminator::None
        }
    }

    // ========================================================================
    // Type / resolution walk
    // ========================================================================

    fn check_block(&mut self, module: ModuleId, block: &'s Block, scope_added: bool) {
        if !scope_added {
            self.push_scope();
        }

        for stmt in &block.stmts {
            self.check_stmt(module, stmt);
        }

        self.pop_scope();
    }

    fn check_stmt(&mut self, module: ModuleId, stmt: &'s Spanned<Stmt>) {
        match &stmt.node {
            Stmt::If(if_stmt) => self.check_if(module, if_stmt),
            Stmt::For(for_stmt) => {
                self.push_scope();
                if let Some(var_decl) = &for_stmt.var_decl {
                    self.check_var_decl(module, var_decl);
                }
                if let Some(cond) = &for_stmt.cond {
                    self.check_expr_type(module, cond, Some(&Ty::basic(BasicType::Bool)));
                }
                if let Some(var_assign) = &for_stmt.var_assign {
                    self.check_var_assign(module, var_assign);
                }
                self.check_block(module, &for_stmt.block, true);
            }
            Stmt::Block(inner) => self.check_block(module, inner, false),
            Stmt::Defer(inner) => self.check_block(module, inner, false),
            Stmt::Break | Stmt::Continue => {}
            Stmt::Return(value) => self.check_return(module, stmt.span, value.as_ref()),
            Stmt::Switch(switch) => self.check_switch(module, switch),
            Stmt::ProcCall(something) => {
                if !something.ends_in_call() {
                    self.report(
                        Diagnostic::new(ErrorKind::TypeMismatch)
                            .at(module, something.span)
                            .with_info("expression statement must be a procedure call"),
                    );
                    return;
                }
                match self.resolve_something(module, something) {
                    Some(Some(_)) => {
                        self.report(
                            Diagnostic::new(ErrorKind::TypeMismatch)
                                .at(module, something.span)
                                .with_info("procedure called as a statement must not return a value"),
                        );
                    }
                    Some(None) | None => {}
                }
            }
            Stmt::VarDecl(var_decl) => self.check_var_decl(module, var_decl),
            Stmt::VarAssign(var_assign) => self.check_var_assign(module, var_assign),
        }
    }

    fn check_if(&mut self, module: ModuleId, if_stmt: &'s If) {
        self.check_expr_type(module, &if_stmt.cond, Some(&Ty::basic(BasicType::Bool)));
        self.check_block(module, &if_stmt.block, false);

        match &if_stmt.else_branch {
            Some(Else::If(next)) => self.check_if(module, next),
            Some(Else::Block(block)) => self.check_block(module, block, false),
            None => {}
        }
    }

    fn check_return(&mut self, module: ModuleId, span: crate::frontend::ast::Span, value: Option<&'s Spanned<crate::frontend::ast::Expr>>) {
        let return_type = self
            .current_proc
            .and_then(|proc_id| self.program.procs[proc_id].sig.as_ref())
            .and_then(|sig| sig.return_type.clone());

        match (value, return_type) {
            (Some(value), Some(expected)) => {
                self.check_expr_type(module, value, Some(&expected));
            }
            (Some(value), None) => {
                self.error_at(ErrorKind::ReturnExpectedNoExpr, module, value.span);
            }
            (None, Some(_)) => {
                self.error_at(ErrorKind::ReturnExpectedExpr, module, span);
            }
            (None, None) => {}
        }
    }

    fn check_switch(&mut self, module: ModuleId, switch: &'s Switch) {
        let on_type = self.check_expr_type(module, &switch.on, None);

        if let Some(on_type) = &on_type {
            if !on_type.is_integer() && !on_type.is_enum() {
                self.error_at(ErrorKind::SwitchIncorrectExprType, module, switch.on.span);
            }
        }
        if switch.cases.is_empty() {
            self.error_at(ErrorKind::SwitchZeroCases, module, switch.on.span);
        }

        for case in &switch.cases {
            if let Some(on_type) = &on_type {
                self.eval_const_expr(module, &case.value.expr, Some(on_type));
            }
            self.check_block(module, &case.block, false);
        }
    }

    fn check_var_decl(&mut self, module: ModuleId, var_decl: &'s crate::frontend::ast::VarDecl) {
        let name = var_decl.ident.name;

        if self.symbols[module].find_global(name).is_some() {
            self.error_at(ErrorKind::VarDeclAlreadyIsGlobal, module, var_decl.ident.span);
            return;
        }
        if self.var_in_scope(name) {
            self.error_at(ErrorKind::VarDeclAlreadyInScope, module, var_decl.ident.span);
            return;
        }

        if let Some(annotation) = &var_decl.ty {
            let Some(ty) = self.check_type_signature(module, annotation) else { return };
            if let Some(value) = &var_decl.value {
                self.check_expr_type(module, value, Some(&ty));
            }
            self.add_var(name, ty);
        } else if let Some(value) = &var_decl.value {
            if let Some(ty) = self.check_expr_type(module, value, None) {
                self.add_var(name, ty);
            }
        }
    }

    fn check_var_assign(&mut self, module: ModuleId, var_assign: &'s crate::frontend::ast::VarAssign) {
        if var_assign.lvalue.ends_in_call() {
            self.report(
                Diagnostic::new(ErrorKind::TypeMismatch)
                    .at(module, var_assign.lvalue.span)
                    .with_info("cannot assign to the result of a call"),
            );
            return;
        }

        let Some(Some(lvalue_ty)) = self.resolve_something(module, &var_assign.lvalue) else { return };

        if let AssignOp::Bin(op) = var_assign.op {
            let valid = if op.is_bitwise() {
                lvalue_ty
                    .as_value_basic()
                    .is_some_and(BasicType::is_unsigned_integer)
            } else if op == crate::frontend::token::BinOp::Rem {
                lvalue_ty.is_integer()
            } else {
                matches!(
                    lvalue_ty.as_value_basic(),
                    Some(basic) if basic.is_integer() || basic.is_float()
                )
            };
            if !valid {
                self.error_at(ErrorKind::TypeMismatch, module, var_assign.span);
                return;
            }
        }

        self.check_expr_type(module, &var_assign.value, Some(&lvalue_ty));
    }

    // ========================================================================
    // Block stack
    // ========================================================================

    pub(crate) fn push_scope(&mut self) {
        self.blocks.push(BlockScope { var_count: 0 });
    }

    pub(crate) fn pop_scope(&mut self) {
        if let Some(scope) = self.blocks.pop() {
            self.vars.truncate(self.vars.len().saturating_sub(scope.var_count));
        }
    }

    pub(crate) fn add_var(&mut self, name: NameId, ty: Ty) {
        self.vars.push(LocalVar { name, ty });
        if let Some(scope) = self.blocks.last_mut() {
            scope.var_count += 1;
        }
    }

    /// Innermost-first lookup over the flat variable stack.
    pub(crate) fn find_var(&self, name: NameId) -> Option<&LocalVar> {
        self.vars.iter().rev().find(|var| var.name == name)
    }

    pub(crate) fn var_in_scope(&self, name: NameId) -> bool {
        self.find_var(name).is_some()
    }
}
