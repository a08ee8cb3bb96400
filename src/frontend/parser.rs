//! Recursive-descent parser for Slate.
//!
//! The parser drives the lexer through the fixed token ring buffer and never
//! looks further ahead than [`TOKEN_LOOKAHEAD`] tokens. One module yields
//! either a fully built [`Ast`] or the first parse diagnostic; recovery
//! inside a module is not attempted, but other modules still parse.
//!
//! Expressions use precedence climbing (`parse_sub_expr(min_prec)` recursing
//! at `prec + 1`); unary operators bind tighter than any binary operator.
//! Every forced consume goes through a single `expect` primitive that
//! produces the expected-token diagnostic with an "in <context>" string.

use crate::frontend::ast::*;
use crate::frontend::diagnostics::{Diagnostic, ErrorKind};
use crate::frontend::lexer::{Lexer, TOKEN_BUFFER_SIZE, TOKEN_LOOKAHEAD};
use crate::frontend::module::ModuleId;
use crate::frontend::token::{Token, TokenKind};
use crate::support::Interner;

type PResult<T> = Result<T, Diagnostic>;

pub struct Parser<'src, 'i> {
    lexer: Lexer<'src, 'i>,
    tokens: [Token; TOKEN_BUFFER_SIZE],
    peek_index: usize,
    /// Span of the most recently consumed token; survives buffer refills so
    /// node end spans stay correct.
    prev_span: Span,
    module: ModuleId,
}

impl<'src, 'i> Parser<'src, 'i> {
    pub fn new(source: &'src str, interner: &'i mut Interner, module: ModuleId) -> Self {
        let mut lexer = Lexer::new(source, interner);
        let mut tokens = [Token::input_end(); TOKEN_BUFFER_SIZE];
        lexer.fill_token_buffer(&mut tokens);
        Self {
            lexer,
            tokens,
            peek_index: 0,
            prev_span: Span::default(),
            module,
        }
    }

    /// Parse the whole module. Also returns the completed line table.
    pub fn parse(mut self) -> (PResult<Ast>, Vec<Span>) {
        let result = self.parse_ast();
        if result.is_err() {
            // Finish lexing so the line table covers the whole file and
            // diagnostics past the error position still render.
            while self.peek(0) != TokenKind::InputEnd {
                self.consume();
            }
        }
        let line_spans = self.lexer.take_line_spans();
        (result, line_spans)
    }

    // ========================================================================
    // Token plumbing
    // ========================================================================

    fn peek(&self, offset: usize) -> TokenKind {
        self.tokens[self.peek_index + offset].kind
    }

    fn peek_token(&self, offset: usize) -> Token {
        self.tokens[self.peek_index + offset]
    }

    fn consume(&mut self) {
        self.prev_span = self.tokens[self.peek_index].span;
        self.peek_index += 1;
        if self.peek_index >= TOKEN_BUFFER_SIZE - TOKEN_LOOKAHEAD {
            self.peek_index = 0;
            self.lexer.fill_token_buffer(&mut self.tokens);
        }
    }

    fn consume_get(&mut self) -> Token {
        let token = self.peek_token(0);
        self.consume();
        token
    }

    fn try_consume(&mut self, kind: TokenKind) -> bool {
        if self.peek(0) == kind {
            self.consume();
            true
        } else {
            false
        }
    }

    fn try_ident(&mut self) -> Option<Ident> {
        match self.peek(0) {
            TokenKind::Ident(name) => {
                let span = self.peek_token(0).span;
                self.consume();
                Some(Ident { name, span })
            }
            _ => None,
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &'static str) -> PResult<Token> {
        if self.peek(0) == kind {
            Ok(self.consume_get())
        } else {
            Err(self.err_expect_name(kind.as_str(), context, 0))
        }
    }

    fn expect_ident(&mut self, context: &'static str) -> PResult<Ident> {
        self.try_ident()
            .ok_or_else(|| self.err_expect_name("identifier", context, 0))
    }

    fn err_expect_name(&self, expected: &'static str, context: &'static str, offset: usize) -> Diagnostic {
        let token = self.peek_token(offset);
        if token.kind == TokenKind::Error {
            if let Some(kind) = self.lexer.error_kind_at(token.span) {
                return Diagnostic::new(kind).at(self.module, token.span);
            }
        }
        Diagnostic::new(ErrorKind::ParseExpectedToken { expected, context }).at(self.module, token.span)
    }

    fn span_start(&self) -> usize {
        self.peek_token(0).span.start
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_span.end)
    }

    // ========================================================================
    // Top level
    // ========================================================================

    fn parse_ast(&mut self) -> PResult<Ast> {
        let mut ast = Ast::default();

        loop {
            match self.peek(0) {
                TokenKind::Ident(_) => {
                    if self.peek(1) != TokenKind::ColonColon {
                        return Err(self.err_expect_name("`::`", "global declaration", 1));
                    }
                    match self.peek(2) {
                        TokenKind::KwStruct => ast.structs.push(self.parse_decl_struct()?),
                        TokenKind::KwEnum => ast.enums.push(self.parse_decl_enum()?),
                        TokenKind::ParenStart => ast.procs.push(self.parse_decl_proc(false)?),
                        _ => ast.globals.push(self.parse_decl_global()?),
                    }
                }
                TokenKind::KwImpl => ast.impls.push(self.parse_decl_impl()?),
                TokenKind::KwImport => ast.imports.push(self.parse_decl_import()?),
                TokenKind::KwUse => ast.uses.push(self.parse_decl_use()?),
                TokenKind::InputEnd => return Ok(ast),
                _ => return Err(self.err_expect_name("identifier", "global declaration", 0)),
            }
        }
    }

    fn parse_decl_struct(&mut self) -> PResult<StructDecl> {
        let ident = self.expect_ident("struct declaration")?;
        self.consume(); // ::
        self.consume(); // struct

        self.expect(TokenKind::BlockStart, "struct declaration")?;
        let mut fields = Vec::new();
        while let Some(field) = self.try_ident() {
            self.expect(TokenKind::Colon, "struct field type definition")?;
            let ty = self.parse_type()?;

            if self.try_consume(TokenKind::Assign) {
                let expr = self.parse_expr()?;
                fields.push(StructField {
                    ident: field,
                    ty,
                    default: Some(ConstEvalExpr { expr }),
                });
            } else {
                self.expect(TokenKind::Semicolon, "struct field declaration")?;
                fields.push(StructField {
                    ident: field,
                    ty,
                    default: None,
                });
            }
        }
        self.expect(TokenKind::BlockEnd, "struct declaration")?;

        Ok(StructDecl { ident, fields })
    }

    fn parse_decl_enum(&mut self) -> PResult<EnumDecl> {
        let ident = self.expect_ident("enum declaration")?;
        self.consume(); // ::
        self.consume(); // enum

        let basic_type = if self.try_consume(TokenKind::ColonColon) {
            let basic = self
                .peek(0)
                .as_basic_type()
                .ok_or_else(|| self.err_expect_name("basic type", "enum declaration", 0))?;
            self.consume();
            basic
        } else {
            crate::frontend::token::BasicType::I32
        };

        self.expect(TokenKind::BlockStart, "enum declaration")?;
        let mut variants = Vec::new();
        while let Some(variant) = self.try_ident() {
            self.expect(TokenKind::Assign, "enum variant expression")?;
            let expr = self.parse_expr()?;
            variants.push(EnumVariant {
                ident: variant,
                value: ConstEvalExpr { expr },
            });
        }
        self.expect(TokenKind::BlockEnd, "enum declaration")?;

        Ok(EnumDecl {
            ident,
            basic_type,
            variants,
        })
    }

    fn parse_decl_proc(&mut self, in_impl: bool) -> PResult<ProcDecl> {
        let ident = self.expect_ident("procedure declaration")?;
        self.consume(); // ::
        self.consume(); // (

        let mut params = Vec::new();
        let mut is_variadic = false;
        loop {
            if self.try_consume(TokenKind::DotDot) {
                is_variadic = true;
                break;
            }

            if self.peek(0) == TokenKind::KwSelf {
                if !in_impl {
                    return Err(self.err_expect_name("identifier", "procedure parameter", 0));
                }
                let span = self.consume_get().span;
                let name = self.lexer.intern("self");
                params.push(ProcParam {
                    ident: Ident { name, span },
                    ty: None,
                    is_self: true,
                });
            } else {
                let Some(param) = self.try_ident() else { break };
                self.expect(TokenKind::Colon, "procedure parameter type definition")?;
                let ty = self.parse_type()?;
                params.push(ProcParam {
                    ident: param,
                    ty: Some(ty),
                    is_self: false,
                });
            }

            if !self.try_consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::ParenEnd, "procedure declaration")?;

        let return_type = if self.try_consume(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let (is_external, block) = if self.try_consume(TokenKind::At) {
            (true, None)
        } else {
            (false, Some(self.parse_block()?))
        };

        Ok(ProcDecl {
            ident,
            params,
            return_type,
            is_variadic,
            is_external,
            block,
            is_member: in_impl,
        })
    }

    fn parse_decl_global(&mut self) -> PResult<GlobalDecl> {
        let ident = self.expect_ident("global declaration")?;
        self.consume(); // ::
        let expr = self.parse_expr()?;
        Ok(GlobalDecl {
            ident,
            value: ConstEvalExpr { expr },
        })
    }

    fn parse_decl_impl(&mut self) -> PResult<ImplDecl> {
        self.consume(); // impl
        let ty = self.parse_type()?;
        self.expect(TokenKind::BlockStart, "impl block")?;

        let mut procs = Vec::new();
        while !self.try_consume(TokenKind::BlockEnd) {
            if !matches!(self.peek(0), TokenKind::Ident(_)) {
                return Err(self.err_expect_name("identifier", "procedure declaration inside impl block", 0));
            }
            if self.peek(1) != TokenKind::ColonColon {
                return Err(self.err_expect_name("`::`", "procedure declaration inside impl block", 1));
            }
            if self.peek(2) != TokenKind::ParenStart {
                return Err(self.err_expect_name("`(`", "procedure declaration inside impl block", 2));
            }
            procs.push(self.parse_decl_proc(true)?);
        }

        Ok(ImplDecl { ty, procs })
    }

    fn parse_decl_import(&mut self) -> PResult<ImportDecl> {
        let start = self.span_start();
        self.consume(); // import

        let first = self.expect_ident("import declaration")?;
        let mut modules = vec![first];

        if self.try_consume(TokenKind::Semicolon) {
            return Ok(ImportDecl {
                modules,
                target: ImportTarget::Module,
                span: self.span_from(start),
            });
        }
        self.expect(TokenKind::ColonColon, "import declaration")?;

        while matches!(self.peek(0), TokenKind::Ident(_)) && self.peek(1) == TokenKind::ColonColon {
            let segment = self.expect_ident("import declaration")?;
            self.consume(); // ::
            modules.push(segment);
        }

        let target = match self.peek(0) {
            TokenKind::Times => {
                self.consume();
                ImportTarget::Wildcard
            }
            TokenKind::BlockStart => {
                self.consume();
                let mut symbols = Vec::new();
                if !self.try_consume(TokenKind::BlockEnd) {
                    loop {
                        symbols.push(self.expect_ident("import declaration")?);
                        if !self.try_consume(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::BlockEnd, "import declaration")?;
                }
                ImportTarget::SymbolList(symbols)
            }
            TokenKind::Ident(_) => {
                let symbol = self.expect_ident("import declaration")?;
                ImportTarget::SymbolOrModule(symbol)
            }
            _ => return Err(self.err_expect_name("identifier, `*` or `{`", "import declaration", 0)),
        };

        self.expect(TokenKind::Semicolon, "import declaration")?;
        Ok(ImportDecl {
            modules,
            target,
            span: self.span_from(start),
        })
    }

    fn parse_decl_use(&mut self) -> PResult<UseDecl> {
        self.consume(); // use
        let alias = self.expect_ident("use declaration")?;
        self.expect(TokenKind::Assign, "use declaration")?;
        let module = self.expect_ident("use declaration")?;
        self.expect(TokenKind::ColonColon, "use declaration")?;
        let symbol = self.expect_ident("use declaration")?;
        self.expect(TokenKind::Semicolon, "use declaration")?;
        Ok(UseDecl { alias, module, symbol })
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn parse_type(&mut self) -> PResult<Type> {
        let start = self.span_start();
        let mut pointer_level = 0;
        while self.try_consume(TokenKind::Times) {
            pointer_level += 1;
        }

        if let Some(basic) = self.peek(0).as_basic_type() {
            self.consume();
            return Ok(Type {
                pointer_level,
                kind: TypeKind::Basic(basic),
                span: self.span_from(start),
            });
        }

        let kind = match self.peek(0) {
            TokenKind::BracketStart => {
                self.consume();
                let size = ConstEvalExpr {
                    expr: self.parse_sub_expr(0)?,
                };
                self.expect(TokenKind::BracketEnd, "array type signature")?;
                let element = self.parse_type()?;
                TypeKind::Array(Box::new(ArrayType { size, element }))
            }
            TokenKind::ParenStart => {
                self.consume();
                let mut params = Vec::new();
                if !self.try_consume(TokenKind::ParenEnd) {
                    loop {
                        params.push(self.parse_type()?);
                        if !self.try_consume(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::ParenEnd, "procedure type signature")?;
                }
                let return_type = if self.try_consume(TokenKind::Arrow) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                TypeKind::Procedure(Box::new(ProcTypeSig { params, return_type }))
            }
            TokenKind::Ident(_) => {
                let module_path = self.parse_module_access();
                let ident = self.expect_ident("custom type signature")?;
                TypeKind::Custom(CustomType { module_path, ident })
            }
            _ => return Err(self.err_expect_name("type", "type signature", 0)),
        };

        Ok(Type {
            pointer_level,
            kind,
            span: self.span_from(start),
        })
    }

    /// `module::module::` prefix, empty when the next tokens are not one.
    fn parse_module_access(&mut self) -> Vec<Ident> {
        let mut modules = Vec::new();
        while matches!(self.peek(0), TokenKind::Ident(_)) && self.peek(1) == TokenKind::ColonColon {
            if let Some(ident) = self.try_ident() {
                modules.push(ident);
            }
            self.consume(); // ::
        }
        modules
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(TokenKind::BlockStart, "code block")?;
        let mut stmts = Vec::new();
        loop {
            if self.try_consume(TokenKind::BlockEnd) {
                return Ok(Block { stmts });
            }
            stmts.push(self.parse_stmt()?);
        }
    }

    /// A block, or a single statement treated as one.
    fn parse_block_short(&mut self) -> PResult<Block> {
        if self.peek(0) == TokenKind::BlockStart {
            return self.parse_block();
        }
        let stmt = self.parse_stmt()?;
        Ok(Block { stmts: vec![stmt] })
    }

    fn parse_stmt(&mut self) -> PResult<Spanned<Stmt>> {
        let start = self.span_start();
        let stmt = match self.peek(0) {
            TokenKind::KwIf => Stmt::If(Box::new(self.parse_stmt_if()?)),
            TokenKind::KwFor => Stmt::For(Box::new(self.parse_stmt_for()?)),
            TokenKind::BlockStart => Stmt::Block(Box::new(self.parse_block()?)),
            TokenKind::KwDefer => {
                self.consume();
                Stmt::Defer(Box::new(self.parse_block_short()?))
            }
            TokenKind::KwBreak => {
                self.consume();
                self.expect(TokenKind::Semicolon, "break statement")?;
                Stmt::Break
            }
            TokenKind::KwReturn => {
                self.consume();
                if self.try_consume(TokenKind::Semicolon) {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.parse_expr()?))
                }
            }
            TokenKind::KwSwitch => Stmt::Switch(Box::new(self.parse_stmt_switch()?)),
            TokenKind::KwContinue => {
                self.consume();
                self.expect(TokenKind::Semicolon, "continue statement")?;
                Stmt::Continue
            }
            TokenKind::Ident(_) if self.peek(1) == TokenKind::Colon => {
                Stmt::VarDecl(Box::new(self.parse_stmt_var_decl()?))
            }
            _ => {
                let module_path = self.parse_module_access();
                let something = self.parse_something(module_path)?;

                if self.try_consume(TokenKind::Semicolon) {
                    Stmt::ProcCall(Box::new(something))
                } else {
                    let op = self
                        .peek(0)
                        .as_assign_op()
                        .ok_or_else(|| self.err_expect_name("`=`", "variable assignment statement", 0))?;
                    self.consume();
                    let value = self.parse_expr()?;
                    Stmt::VarAssign(Box::new(VarAssign {
                        lvalue: something,
                        op,
                        value,
                        span: self.span_from(start),
                    }))
                }
            }
        };

        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn parse_stmt_if(&mut self) -> PResult<If> {
        self.consume(); // if
        let cond = self.parse_sub_expr(0)?;
        let block = self.parse_block()?;

        let else_branch = if self.peek(0) == TokenKind::KwElse {
            self.consume();
            match self.peek(0) {
                TokenKind::KwIf => Some(Else::If(Box::new(self.parse_stmt_if()?))),
                TokenKind::BlockStart => Some(Else::Block(Box::new(self.parse_block()?))),
                _ => return Err(self.err_expect_name("`if` or `{`", "branch chain", 0)),
            }
        } else {
            None
        };

        Ok(If {
            cond,
            block,
            else_branch,
        })
    }

    fn parse_stmt_for(&mut self) -> PResult<For> {
        self.consume(); // for

        // `for { .. }` loops forever.
        if self.peek(0) == TokenKind::BlockStart {
            let block = self.parse_block()?;
            return Ok(For {
                var_decl: None,
                cond: None,
                var_assign: None,
                block,
            });
        }

        let var_decl = if matches!(self.peek(0), TokenKind::Ident(_)) && self.peek(1) == TokenKind::Colon {
            Some(self.parse_stmt_var_decl()?)
        } else {
            None
        };

        let cond = self.parse_expr()?;

        let var_assign = if self.peek(0) != TokenKind::BlockStart {
            let start = self.span_start();
            let module_path = self.parse_module_access();
            let lvalue = self.parse_something(module_path)?;
            let op = self
                .peek(0)
                .as_assign_op()
                .ok_or_else(|| self.err_expect_name("`=`", "variable assignment statement", 0))?;
            self.consume();
            let value = self.parse_sub_expr(0)?;
            Some(VarAssign {
                lvalue,
                op,
                value,
                span: self.span_from(start),
            })
        } else {
            None
        };

        let block = self.parse_block()?;
        Ok(For {
            var_decl,
            cond: Some(cond),
            var_assign,
            block,
        })
    }

    fn parse_stmt_switch(&mut self) -> PResult<Switch> {
        self.consume(); // switch
        let on = self.parse_sub_expr(0)?;
        self.expect(TokenKind::BlockStart, "switch statement")?;

        let mut cases = Vec::new();
        loop {
            if self.try_consume(TokenKind::BlockEnd) {
                break;
            }
            let value = ConstEvalExpr {
                expr: self.parse_sub_expr(0)?,
            };
            self.expect(TokenKind::Colon, "switch case")?;
            let block = self.parse_block_short()?;
            cases.push(SwitchCase { value, block });
        }

        Ok(Switch { on, cases })
    }

    fn parse_stmt_var_decl(&mut self) -> PResult<VarDecl> {
        let ident = self.expect_ident("var decl statement")?;
        self.consume(); // :

        if self.try_consume(TokenKind::Assign) {
            let value = self.parse_expr()?;
            return Ok(VarDecl {
                ident,
                ty: None,
                value: Some(value),
            });
        }

        let ty = self.parse_type()?;
        if self.try_consume(TokenKind::Semicolon) {
            return Ok(VarDecl {
                ident,
                ty: Some(ty),
                value: None,
            });
        }
        self.expect(TokenKind::Assign, "var decl statement")?;
        let value = self.parse_expr()?;
        Ok(VarDecl {
            ident,
            ty: Some(ty),
            value: Some(value),
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// A statement-position expression with its terminating `;`.
    fn parse_expr(&mut self) -> PResult<Spanned<Expr>> {
        let expr = self.parse_sub_expr(0)?;
        self.expect(TokenKind::Semicolon, "expression")?;
        Ok(expr)
    }

    fn parse_sub_expr(&mut self, min_prec: u32) -> PResult<Spanned<Expr>> {
        let start = self.span_start();
        let mut lhs = self.parse_primary_expr()?;

        loop {
            let Some(op) = self.peek(0).as_bin_op() else { break };
            let prec = op.prec();
            if prec < min_prec {
                break;
            }
            self.consume();

            let rhs = self.parse_sub_expr(prec + 1)?;
            let span = self.span_from(start);
            lhs = Spanned::new(Expr::Binary(op, Box::new(lhs), Box::new(rhs)), span);
        }

        Ok(lhs)
    }

    fn parse_primary_expr(&mut self) -> PResult<Spanned<Expr>> {
        if self.try_consume(TokenKind::ParenStart) {
            let expr = self.parse_sub_expr(0)?;
            self.expect(TokenKind::ParenEnd, "parenthesised expression")?;
            return Ok(expr);
        }

        if let Some(op) = self.peek(0).as_un_op() {
            let start = self.span_start();
            self.consume();
            let rhs = self.parse_primary_expr()?;
            let span = self.span_from(start);
            return Ok(Spanned::new(Expr::Unary(op, Box::new(rhs)), span));
        }

        let start = self.span_start();
        let term = self.parse_term()?;
        let span = self.span_from(start);
        Ok(Spanned::new(Expr::Term(Box::new(term)), span))
    }

    fn parse_term(&mut self) -> PResult<Term> {
        match self.peek(0) {
            TokenKind::KwCast => {
                self.consume();
                self.expect(TokenKind::ParenStart, "cast expression")?;
                let basic = self
                    .peek(0)
                    .as_basic_type()
                    .ok_or_else(|| self.err_expect_name("basic type", "cast expression", 0))?;
                self.consume();
                self.expect(TokenKind::Comma, "cast expression")?;
                let expr = self.parse_sub_expr(0)?;
                self.expect(TokenKind::ParenEnd, "cast expression")?;
                Ok(Term::Cast(basic, Box::new(expr)))
            }
            TokenKind::KwSizeof => {
                self.consume();
                self.expect(TokenKind::ParenStart, "sizeof expression")?;
                let ty = self.parse_type()?;
                self.expect(TokenKind::ParenEnd, "sizeof expression")?;
                Ok(Term::Sizeof(ty))
            }
            TokenKind::BoolLit(value) => {
                self.consume();
                Ok(Term::Literal(Literal::Bool(value)))
            }
            TokenKind::IntLit(value) => {
                self.consume();
                Ok(Term::Literal(Literal::Int(value)))
            }
            TokenKind::FloatLit(value) => {
                self.consume();
                Ok(Term::Literal(Literal::Float(value)))
            }
            TokenKind::StrLit(value) => {
                self.consume();
                Ok(Term::Literal(Literal::Str(value)))
            }
            TokenKind::BlockStart => {
                let inputs = self.parse_expr_list(TokenKind::BlockStart, TokenKind::BlockEnd, "array initializer")?;
                Ok(Term::ArrayInit(ArrayInit { ty: None, inputs }))
            }
            TokenKind::BracketStart => {
                let ty = self.parse_type()?;
                let inputs = self.parse_expr_list(TokenKind::BlockStart, TokenKind::BlockEnd, "array initializer")?;
                Ok(Term::ArrayInit(ArrayInit { ty: Some(ty), inputs }))
            }
            TokenKind::Dot if self.peek(1) == TokenKind::BlockStart => {
                self.consume();
                let inputs = self.parse_expr_list(TokenKind::BlockStart, TokenKind::BlockEnd, "struct initializer")?;
                Ok(Term::StructInit(StructInit {
                    module_path: Vec::new(),
                    ident: None,
                    inputs,
                }))
            }
            TokenKind::Dot => {
                self.consume();
                let ident = self.expect_ident("enum literal")?;
                Ok(Term::EnumLit(ident))
            }
            _ => {
                let module_path = self.parse_module_access();

                if self.peek(0) == TokenKind::Dot && self.peek(1) == TokenKind::BlockStart {
                    self.consume();
                    let inputs =
                        self.parse_expr_list(TokenKind::BlockStart, TokenKind::BlockEnd, "struct initializer")?;
                    return Ok(Term::StructInit(StructInit {
                        module_path,
                        ident: None,
                        inputs,
                    }));
                }
                if matches!(self.peek(0), TokenKind::Ident(_))
                    && self.peek(1) == TokenKind::Dot
                    && self.peek(2) == TokenKind::BlockStart
                {
                    let ident = self.expect_ident("struct initializer")?;
                    self.consume(); // .
                    let inputs =
                        self.parse_expr_list(TokenKind::BlockStart, TokenKind::BlockEnd, "struct initializer")?;
                    return Ok(Term::StructInit(StructInit {
                        module_path,
                        ident: Some(ident),
                        inputs,
                    }));
                }

                Ok(Term::Something(self.parse_something(module_path)?))
            }
        }
    }

    /// A designator: first chain link, then `.ident`, `.ident(..)` and
    /// `[index]` links for as long as they continue.
    fn parse_something(&mut self, module_path: Vec<Ident>) -> PResult<Something> {
        let start = self.span_start();
        let mut chain = Vec::new();

        let first = self.expect_ident("access chain")?;
        chain.push(self.parse_chain_link(first)?);

        loop {
            match self.peek(0) {
                TokenKind::Dot => {
                    self.consume();
                    let ident = self.expect_ident("access chain")?;
                    chain.push(self.parse_chain_link(ident)?);
                }
                TokenKind::BracketStart => {
                    self.consume();
                    let index = self.parse_sub_expr(0)?;
                    self.expect(TokenKind::BracketEnd, "array access")?;
                    chain.push(ChainLink::Index(index));
                }
                _ => break,
            }
        }

        Ok(Something {
            module_path,
            chain,
            span: self.span_from(start),
        })
    }

    fn parse_chain_link(&mut self, ident: Ident) -> PResult<ChainLink> {
        if self.peek(0) == TokenKind::ParenStart {
            let inputs = self.parse_expr_list(TokenKind::ParenStart, TokenKind::ParenEnd, "procedure call")?;
            Ok(ChainLink::Call(ident, inputs))
        } else {
            Ok(ChainLink::Field(ident))
        }
    }

    fn parse_expr_list(
        &mut self,
        start: TokenKind,
        end: TokenKind,
        context: &'static str,
    ) -> PResult<Vec<Spanned<Expr>>> {
        self.expect(start, context)?;
        let mut exprs = Vec::new();
        if self.try_consume(end) {
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_sub_expr(0)?);
            if !self.try_consume(TokenKind::Comma) {
                break;
            }
        }
        self.expect(end, context)?;
        Ok(exprs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::{BasicType, BinOp, UnOp};

    fn parse_source(source: &str) -> PResult<Ast> {
        let mut interner = Interner::new();
        let parser = Parser::new(source, &mut interner, 0);
        parser.parse().0
    }

    fn parse_ok(source: &str) -> Ast {
        parse_source(source).expect("expected source to parse")
    }

    #[test]
    fn parses_struct_decl() {
        let ast = parse_ok("Vec2 :: struct { x: f32; y: f32; }");
        assert_eq!(ast.structs.len(), 1);
        assert_eq!(ast.structs[0].fields.len(), 2);
        assert!(ast.structs[0].fields[0].default.is_none());
    }

    #[test]
    fn parses_struct_field_default() {
        let ast = parse_ok("Config :: struct { retries: i32 = 3; }");
        assert!(ast.structs[0].fields[0].default.is_some());
    }

    #[test]
    fn parses_enum_decl_with_base_type() {
        let ast = parse_ok("Flag :: enum :: u8 { A = 0; B = 1; }");
        assert_eq!(ast.enums[0].basic_type, BasicType::U8);
        assert_eq!(ast.enums[0].variants.len(), 2);
    }

    #[test]
    fn enum_base_type_defaults_to_i32() {
        let ast = parse_ok("Flag :: enum { A = 0; }");
        assert_eq!(ast.enums[0].basic_type, BasicType::I32);
    }

    #[test]
    fn parses_proc_decl() {
        let ast = parse_ok("add :: (a: i32, b: i32) -> i32 { return a + b; }");
        let proc = &ast.procs[0];
        assert_eq!(proc.params.len(), 2);
        assert!(proc.return_type.is_some());
        assert!(!proc.is_external);
        assert!(proc.block.is_some());
    }

    #[test]
    fn parses_external_proc() {
        let ast = parse_ok("write :: (fd: i32, len: u64) -> i64 @");
        let proc = &ast.procs[0];
        assert!(proc.is_external);
        assert!(proc.block.is_none());
    }

    #[test]
    fn parses_variadic_proc() {
        let ast = parse_ok("printf :: (fmt: *u8, ..) @");
        assert!(ast.procs[0].is_variadic);
    }

    #[test]
    fn parses_global_decl() {
        let ast = parse_ok("MAX :: 4096;");
        assert_eq!(ast.globals.len(), 1);
    }

    #[test]
    fn parses_impl_block() {
        let ast = parse_ok("impl Vec2 { length :: (self) -> f32 { return 0.0; } }");
        assert_eq!(ast.impls.len(), 1);
        let member = &ast.impls[0].procs[0];
        assert!(member.is_member);
        assert!(member.params[0].is_self);
    }

    #[test]
    fn parses_import_forms() {
        let ast = parse_ok("import a;\nimport a::b;\nimport a::{x, y};\nimport a::*;");
        assert_eq!(ast.imports.len(), 4);
        assert!(matches!(ast.imports[0].target, ImportTarget::Module));
        assert!(matches!(ast.imports[1].target, ImportTarget::SymbolOrModule(_)));
        assert!(matches!(&ast.imports[2].target, ImportTarget::SymbolList(list) if list.len() == 2));
        assert!(matches!(ast.imports[3].target, ImportTarget::Wildcard));
    }

    #[test]
    fn parses_use_decl() {
        let ast = parse_ok("use V = a::Vec;");
        assert_eq!(ast.uses.len(), 1);
    }

    #[test]
    fn parses_pointer_and_array_types() {
        let ast = parse_ok("Node :: struct { next: *Node; items: [4]i32; }");
        let fields = &ast.structs[0].fields;
        assert_eq!(fields[0].ty.pointer_level, 1);
        assert!(matches!(fields[0].ty.kind, TypeKind::Custom(_)));
        assert!(matches!(fields[1].ty.kind, TypeKind::Array(_)));
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let ast = parse_ok("x :: 1 + 2 * 3;");
        let Expr::Binary(op, lhs, rhs) = &ast.globals[0].value.expr.node else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(lhs.node, Expr::Term(_)));
        assert!(matches!(rhs.node, Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn parens_override_precedence() {
        let ast = parse_ok("x :: (1 + 2) * 3;");
        let Expr::Binary(op, lhs, _) = &ast.globals[0].value.expr.node else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinOp::Mul);
        assert!(matches!(lhs.node, Expr::Binary(BinOp::Add, _, _)));
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let ast = parse_ok("x :: -1 + 2;");
        let Expr::Binary(op, lhs, _) = &ast.globals[0].value.expr.node else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(lhs.node, Expr::Unary(UnOp::Neg, _)));
    }

    #[test]
    fn parses_statement_forms() {
        let ast = parse_ok(
            "f :: () {\
               x: i32 = 0;\
               y: i32;\
               z := 1;\
               if x == 0 { x = 1; } else if x == 1 { x = 2; } else { x = 3; }\
               for i: i32 = 0; i < 10; i = i + 1 { x += 1; }\
               for { break; }\
               defer done();\
               switch x { 0: { y = 1; } 1: y = 2; }\
               call(x, y);\
               continue;\
             }",
        );
        let block = ast.procs[0].block.as_ref().expect("proc body");
        assert_eq!(block.stmts.len(), 10);
        assert!(matches!(block.stmts[0].node, Stmt::VarDecl(_)));
        assert!(matches!(block.stmts[3].node, Stmt::If(_)));
        assert!(matches!(block.stmts[4].node, Stmt::For(_)));
        assert!(matches!(block.stmts[6].node, Stmt::Defer(_)));
        assert!(matches!(block.stmts[7].node, Stmt::Switch(_)));
        assert!(matches!(block.stmts[8].node, Stmt::ProcCall(_)));
    }

    #[test]
    fn infer_var_decl_uses_colon_assign() {
        let ast = parse_ok("f :: () { x := 1; }");
        let block = ast.procs[0].block.as_ref().expect("proc body");
        let Stmt::VarDecl(decl) = &block.stmts[0].node else {
            panic!("expected var decl");
        };
        assert!(decl.ty.is_none());
        assert!(decl.value.is_some());
    }

    #[test]
    fn parses_access_chains() {
        let ast = parse_ok("f :: () { a.b[0].c(1, 2); }");
        let block = ast.procs[0].block.as_ref().expect("proc body");
        let Stmt::ProcCall(something) = &block.stmts[0].node else {
            panic!("expected call statement");
        };
        assert_eq!(something.chain.len(), 4);
        assert!(matches!(something.chain[0], ChainLink::Field(_)));
        assert!(matches!(something.chain[2], ChainLink::Index(_)));
        assert!(something.ends_in_call());
    }

    #[test]
    fn parses_module_prefixed_designator() {
        let ast = parse_ok("f :: () { x := math::vec::length(v); }");
        let block = ast.procs[0].block.as_ref().expect("proc body");
        let Stmt::VarDecl(decl) = &block.stmts[0].node else {
            panic!("expected var decl");
        };
        let Expr::Term(term) = &decl.value.as_ref().unwrap().node else {
            panic!("expected term");
        };
        let Term::Something(something) = term.as_ref() else {
            panic!("expected designator");
        };
        assert_eq!(something.module_path.len(), 2);
    }

    #[test]
    fn parses_cast_sizeof_inits_and_enum_literal() {
        let ast = parse_ok(
            "f :: () {\
               a := cast(i64, 1);\
               b := sizeof(*u8);\
               c := Vec2.{1, 2};\
               d := .{1, 2};\
               e := [2]i32{1, 2};\
               g := {1, 2};\
               h := .Red;\
             }",
        );
        let block = ast.procs[0].block.as_ref().expect("proc body");
        let terms: Vec<&Term> = block
            .stmts
            .iter()
            .map(|stmt| {
                let Stmt::VarDecl(decl) = &stmt.node else { panic!() };
                let Expr::Term(term) = &decl.value.as_ref().unwrap().node else { panic!() };
                term.as_ref()
            })
            .collect();
        assert!(matches!(terms[0], Term::Cast(BasicType::I64, _)));
        assert!(matches!(terms[1], Term::Sizeof(_)));
        assert!(matches!(terms[2], Term::StructInit(init) if init.ident.is_some()));
        assert!(matches!(terms[3], Term::StructInit(init) if init.ident.is_none()));
        assert!(matches!(terms[4], Term::ArrayInit(init) if init.ty.is_some()));
        assert!(matches!(terms[5], Term::ArrayInit(init) if init.ty.is_none()));
        assert!(matches!(terms[6], Term::EnumLit(_)));
    }

    #[test]
    fn missing_semicolon_is_reported_with_context() {
        let err = parse_source("f :: () { break }").expect_err("should fail");
        assert_eq!(
            err.kind,
            ErrorKind::ParseExpectedToken {
                expected: "`;`",
                context: "break statement"
            }
        );
    }

    #[test]
    fn missing_double_colon_reports_declaration_context() {
        let err = parse_source("foo bar").expect_err("should fail");
        assert_eq!(
            err.kind,
            ErrorKind::ParseExpectedToken {
                expected: "`::`",
                context: "global declaration"
            }
        );
    }

    #[test]
    fn lex_integer_overflow_surfaces_from_parser() {
        let err = parse_source("x :: 99999999999999999999;").expect_err("should fail");
        assert_eq!(err.kind, ErrorKind::LexIntegerOverflow);
    }

    #[test]
    fn statements_record_spans() {
        let source = "f :: () { return 1; }";
        let ast = parse_ok(source);
        let block = ast.procs[0].block.as_ref().expect("proc body");
        let span = block.stmts[0].span;
        assert_eq!(&source[span.start..span.end], "return 1;");
    }

    #[test]
    fn long_module_parses_across_buffer_refills() {
        // Enough declarations to force several ring-buffer refills.
        let mut source = String::new();
        for index in 0..200 {
            source.push_str(&format!("g{} :: {};\n", index, index));
        }
        let ast = parse_ok(&source);
        assert_eq!(ast.globals.len(), 200);
    }
}
