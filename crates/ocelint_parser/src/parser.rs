//! Recursive-descent parser.
//!
//! Covers the Python subset the built-in inspections exercise:
//! module, class and function definitions, `for`/`while`/`if`/`try`
//! statements, assignments, `return`/`raise`/`yield`, calls with
//! keyword arguments and generator expressions, attributes,
//! subscripts, tuples, list/dict/set literals, lambdas, and constant
//! literals. Imports are consumed as opaque statements. Decorators are
//! parsed and discarded.

use ocelint_ast::{ConstValue, ExprContext, Field, Node, NodeId, NodeKind, Span, Tree};

use crate::ParseError;
use crate::lexer::{Op, Token, TokenKind, tokenize};

/// Parses a whole source unit into a [`Tree`].
pub fn parse_module(source: &str) -> Result<Tree, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        prev_line: 1,
        tree: Tree::new(),
    };
    parser.module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Line of the last substantive token consumed; used as the end
    /// line of the construct being finished.
    prev_line: u32,
    tree: Tree,
}

type Start = (u32, u32);

impl Parser {
    // ------------------------------------------------------------------
    // Token plumbing

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        if matches!(
            token.kind,
            TokenKind::Name(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::Op(_)
        ) {
            self.prev_line = token.line;
        }
        token
    }

    fn start(&self) -> Start {
        let token = self.peek();
        (token.line, token.column)
    }

    fn span_from(&self, start: Start) -> Span {
        Span::new(start.0, self.prev_line.max(start.0), start.1)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::new(message, token.line, token.column)
    }

    fn at_op(&self, op: Op) -> bool {
        matches!(self.peek_kind(), TokenKind::Op(found) if *found == op)
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Op, context: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(format!("expected {op:?} {context}")))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Name(name) if name == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_name(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Name(_) => {
                let TokenKind::Name(name) = self.advance().kind else {
                    unreachable!()
                };
                Ok(name)
            }
            _ => Err(self.error(format!("expected a name {context}"))),
        }
    }

    fn eat_newline(&mut self) -> bool {
        if matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_newline(&mut self) -> Result<(), ParseError> {
        if self.eat_newline() || matches!(self.peek_kind(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error("expected end of line"))
        }
    }

    fn finish(&mut self, node: Node, start: Start) -> NodeId {
        let span = self.span_from(start);
        self.tree.push(node.with_span(span))
    }

    // ------------------------------------------------------------------
    // Statements

    fn module(&mut self) -> Result<Tree, ParseError> {
        let start = self.start();
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                }
                _ => body.extend(self.statement()?),
            }
        }
        let module = self.finish(Node::new(NodeKind::Module), start);
        for stmt in body {
            self.tree.add_child(module, Field::Body, stmt);
        }
        self.tree.set_root(module);
        Ok(std::mem::take(&mut self.tree))
    }

    fn statement(&mut self) -> Result<Vec<NodeId>, ParseError> {
        while self.at_op(Op::At) {
            // Decorator: parsed for syntax, not represented.
            self.advance();
            self.test()?;
            self.expect_newline()?;
        }

        if self.at_keyword("def") {
            Ok(vec![self.function_def()?])
        } else if self.at_keyword("class") {
            Ok(vec![self.class_def()?])
        } else if self.at_keyword("for") {
            Ok(vec![self.for_stmt()?])
        } else if self.at_keyword("while") {
            Ok(vec![self.while_stmt()?])
        } else if self.at_keyword("if") {
            Ok(vec![self.if_stmt()?])
        } else if self.at_keyword("try") {
            Ok(vec![self.try_stmt()?])
        } else {
            self.simple_line()
        }
    }

    /// One or more `;`-separated simple statements ending in a newline.
    fn simple_line(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut stmts = vec![self.simple_statement()?];
        while self.eat_op(Op::Semi) {
            if self.eat_newline() || matches!(self.peek_kind(), TokenKind::Eof) {
                return Ok(stmts);
            }
            stmts.push(self.simple_statement()?);
        }
        self.expect_newline()?;
        Ok(stmts)
    }

    fn simple_statement(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        if self.eat_keyword("pass") {
            return Ok(self.finish(Node::new(NodeKind::Pass), start));
        }
        if self.eat_keyword("break") {
            return Ok(self.finish(Node::new(NodeKind::Break), start));
        }
        if self.eat_keyword("continue") {
            return Ok(self.finish(Node::new(NodeKind::Continue), start));
        }
        if self.eat_keyword("return") {
            let value = if self.line_continues() {
                Some(self.testlist()?)
            } else {
                None
            };
            let id = self.finish(Node::new(NodeKind::Return), start);
            if let Some(value) = value {
                self.tree.add_child(id, Field::Value, value);
            }
            return Ok(id);
        }
        if self.eat_keyword("raise") {
            let exc = if self.line_continues() {
                Some(self.test()?)
            } else {
                None
            };
            let cause = if self.eat_keyword("from") {
                Some(self.test()?)
            } else {
                None
            };
            let id = self.finish(Node::new(NodeKind::Raise), start);
            if let Some(exc) = exc {
                self.tree.add_child(id, Field::Value, exc);
            }
            if let Some(cause) = cause {
                self.tree.add_child(id, Field::Value, cause);
            }
            return Ok(id);
        }
        if self.at_keyword("import") || self.at_keyword("from") {
            // Imports are opaque to the inspections; consume the line.
            while !matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof) {
                self.advance();
            }
            return Ok(self.finish(Node::new(NodeKind::Import), start));
        }
        self.expr_statement(start)
    }

    /// True while the current logical line still has expression tokens.
    fn line_continues(&self) -> bool {
        !matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Eof | TokenKind::Op(Op::Semi)
        )
    }

    fn expr_statement(&mut self, start: Start) -> Result<NodeId, ParseError> {
        let first = self.testlist()?;

        // Annotated assignment: `name: annotation [= value]`.
        if self.tree.kind(first) == NodeKind::Name && self.eat_op(Op::Colon) {
            let annotation = self.test()?;
            let value = if self.eat_op(Op::Assign) {
                Some(self.testlist()?)
            } else {
                None
            };
            self.mark_store(first);
            let id = self.finish(Node::new(NodeKind::Assign), start);
            self.tree.add_child(id, Field::Targets, first);
            self.tree.add_child(id, Field::Annotation, annotation);
            if let Some(value) = value {
                self.tree.add_child(id, Field::Value, value);
            }
            return Ok(id);
        }

        if !self.at_op(Op::Assign) {
            let id = self.finish(Node::new(NodeKind::Expr), start);
            self.tree.add_child(id, Field::Value, first);
            return Ok(id);
        }

        let mut parts = vec![first];
        while self.eat_op(Op::Assign) {
            parts.push(self.testlist()?);
        }
        let value = parts.pop().expect("at least two parts after `=`");
        for target in &parts {
            self.mark_store(*target);
        }
        let id = self.finish(Node::new(NodeKind::Assign), start);
        for target in parts {
            self.tree.add_child(id, Field::Targets, target);
        }
        self.tree.add_child(id, Field::Value, value);
        Ok(id)
    }

    fn function_def(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // def
        let name = self.expect_name("after `def`")?;
        let args = self.parameters()?;
        if self.eat_op(Op::Arrow) {
            // Return annotation, parsed and discarded.
            self.test()?;
        }
        let body = self.block()?;
        let id = self.finish(Node::new(NodeKind::FunctionDef).with_name(name), start);
        self.tree.add_child(id, Field::Args, args);
        for stmt in body {
            self.tree.add_child(id, Field::Body, stmt);
        }
        Ok(id)
    }

    fn parameters(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.expect_op(Op::LParen, "after the function name")?;
        let mut params = Vec::new();
        let mut defaults = Vec::new();
        while !self.at_op(Op::RParen) {
            // `*args` / `**kwargs` markers carry no inspection weight.
            self.eat_op(Op::Star);
            self.eat_op(Op::DoubleStar);
            let param_start = self.start();
            let name = self.expect_name("in the parameter list")?;
            let annotation = if self.eat_op(Op::Colon) {
                Some(self.test()?)
            } else {
                None
            };
            let param = self.finish(Node::new(NodeKind::Arg).with_name(name), param_start);
            if let Some(annotation) = annotation {
                self.tree.add_child(param, Field::Annotation, annotation);
            }
            params.push(param);
            if self.eat_op(Op::Assign) {
                defaults.push(self.test()?);
            }
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen, "to close the parameter list")?;
        let id = self.finish(Node::new(NodeKind::Arguments), start);
        for param in params {
            self.tree.add_child(id, Field::Args, param);
        }
        for default in defaults {
            self.tree.add_child(id, Field::Defaults, default);
        }
        Ok(id)
    }

    fn class_def(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // class
        let name = self.expect_name("after `class`")?;
        let mut bases = Vec::new();
        if self.eat_op(Op::LParen) {
            while !self.at_op(Op::RParen) {
                bases.push(self.test()?);
                if !self.eat_op(Op::Comma) {
                    break;
                }
            }
            self.expect_op(Op::RParen, "to close the base class list")?;
        }
        let body = self.block()?;
        let id = self.finish(Node::new(NodeKind::ClassDef).with_name(name), start);
        for base in bases {
            self.tree.add_child(id, Field::Bases, base);
        }
        for stmt in body {
            self.tree.add_child(id, Field::Body, stmt);
        }
        Ok(id)
    }

    fn for_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // for
        let target = self.target_list()?;
        if !self.eat_keyword("in") {
            return Err(self.error("expected `in` in `for` statement"));
        }
        let iter = self.testlist()?;
        let body = self.block()?;
        let or_else = if self.eat_keyword("else") {
            self.block()?
        } else {
            Vec::new()
        };
        let id = self.finish(Node::new(NodeKind::For), start);
        self.tree.add_child(id, Field::Target, target);
        self.tree.add_child(id, Field::Iter, iter);
        for stmt in body {
            self.tree.add_child(id, Field::Body, stmt);
        }
        for stmt in or_else {
            self.tree.add_child(id, Field::OrElse, stmt);
        }
        Ok(id)
    }

    fn while_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // while
        let test = self.test()?;
        let body = self.block()?;
        let or_else = if self.eat_keyword("else") {
            self.block()?
        } else {
            Vec::new()
        };
        let id = self.finish(Node::new(NodeKind::While), start);
        self.tree.add_child(id, Field::Test, test);
        for stmt in body {
            self.tree.add_child(id, Field::Body, stmt);
        }
        for stmt in or_else {
            self.tree.add_child(id, Field::OrElse, stmt);
        }
        Ok(id)
    }

    fn if_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // if / elif
        let test = self.test()?;
        let body = self.block()?;
        let mut or_else = Vec::new();
        if self.at_keyword("elif") {
            or_else.push(self.if_stmt()?);
        } else if self.eat_keyword("else") {
            or_else = self.block()?;
        }
        let id = self.finish(Node::new(NodeKind::If), start);
        self.tree.add_child(id, Field::Test, test);
        for stmt in body {
            self.tree.add_child(id, Field::Body, stmt);
        }
        for stmt in or_else {
            self.tree.add_child(id, Field::OrElse, stmt);
        }
        Ok(id)
    }

    fn try_stmt(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // try
        let body = self.block()?;
        let mut handlers = Vec::new();
        while self.at_keyword("except") {
            let handler_start = self.start();
            self.advance();
            let exc_type = if !self.at_op(Op::Colon) {
                Some(self.test()?)
            } else {
                None
            };
            let alias = if self.eat_keyword("as") {
                Some(self.expect_name("after `as`")?)
            } else {
                None
            };
            let handler_body = self.block()?;
            let mut node = Node::new(NodeKind::ExceptHandler);
            if let Some(alias) = alias {
                node = node.with_name(alias);
            }
            let handler = self.finish(node, handler_start);
            if let Some(exc_type) = exc_type {
                self.tree.add_child(handler, Field::Type, exc_type);
            }
            for stmt in handler_body {
                self.tree.add_child(handler, Field::Body, stmt);
            }
            handlers.push(handler);
        }
        let or_else = if self.eat_keyword("else") {
            self.block()?
        } else {
            Vec::new()
        };
        let final_body = if self.eat_keyword("finally") {
            self.block()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && final_body.is_empty() {
            return Err(self.error("`try` needs at least one `except` or `finally`"));
        }
        let id = self.finish(Node::new(NodeKind::Try), start);
        for stmt in body {
            self.tree.add_child(id, Field::Body, stmt);
        }
        for handler in handlers {
            self.tree.add_child(id, Field::Handlers, handler);
        }
        for stmt in or_else {
            self.tree.add_child(id, Field::OrElse, stmt);
        }
        for stmt in final_body {
            self.tree.add_child(id, Field::FinalBody, stmt);
        }
        Ok(id)
    }

    /// A `:`-introduced suite, indented or inline.
    fn block(&mut self) -> Result<Vec<NodeId>, ParseError> {
        self.expect_op(Op::Colon, "to open the block")?;
        if self.eat_newline() {
            if !matches!(self.peek_kind(), TokenKind::Indent) {
                return Err(self.error("expected an indented block"));
            }
            self.advance();
            let mut body = Vec::new();
            loop {
                match self.peek_kind() {
                    TokenKind::Dedent => {
                        self.advance();
                        break;
                    }
                    TokenKind::Newline => {
                        self.advance();
                    }
                    TokenKind::Eof => break,
                    _ => body.extend(self.statement()?),
                }
            }
            Ok(body)
        } else {
            // Inline suite: `def f(): pass`
            self.simple_line()
        }
    }

    // ------------------------------------------------------------------
    // Expressions

    /// `test (',' test)* [',']`, a tuple when more than one element or
    /// a trailing comma is present.
    fn testlist(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let first = self.test()?;
        if !self.at_op(Op::Comma) {
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if !self.line_continues() || self.at_op(Op::Assign) || self.at_op(Op::RParen) {
                break;
            }
            elts.push(self.test()?);
        }
        let id = self.finish(Node::new(NodeKind::Tuple), start);
        for elt in elts {
            self.tree.add_child(id, Field::Elts, elt);
        }
        Ok(id)
    }

    fn test(&mut self) -> Result<NodeId, ParseError> {
        if self.at_keyword("yield") {
            return self.yield_expr();
        }
        if self.at_keyword("lambda") {
            return self.lambda();
        }
        self.or_test()
    }

    fn yield_expr(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // yield
        if self.eat_keyword("from") {
            let value = self.test()?;
            let id = self.finish(Node::new(NodeKind::YieldFrom), start);
            self.tree.add_child(id, Field::Value, value);
            return Ok(id);
        }
        let value = if self.line_continues()
            && !self.at_op(Op::RParen)
            && !self.at_op(Op::RBracket)
            && !self.at_op(Op::Comma)
        {
            Some(self.testlist()?)
        } else {
            None
        };
        let id = self.finish(Node::new(NodeKind::Yield), start);
        if let Some(value) = value {
            self.tree.add_child(id, Field::Value, value);
        }
        Ok(id)
    }

    fn lambda(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        self.advance(); // lambda
        let args_start = self.start();
        let mut params = Vec::new();
        while !self.at_op(Op::Colon) {
            let param_start = self.start();
            let name = self.expect_name("in the lambda parameter list")?;
            params.push(self.finish(Node::new(NodeKind::Arg).with_name(name), param_start));
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        let args = self.finish(Node::new(NodeKind::Arguments), args_start);
        for param in params {
            self.tree.add_child(args, Field::Args, param);
        }
        self.expect_op(Op::Colon, "in the lambda")?;
        let body = self.test()?;
        let id = self.finish(Node::new(NodeKind::Lambda), start);
        self.tree.add_child(id, Field::Args, args);
        self.tree.add_child(id, Field::Body, body);
        Ok(id)
    }

    fn or_test(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let first = self.and_test()?;
        if !self.at_keyword("or") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword("or") {
            values.push(self.and_test()?);
        }
        let id = self.finish(Node::new(NodeKind::BoolOp).with_name("or"), start);
        for value in values {
            self.tree.add_child(id, Field::Values, value);
        }
        Ok(id)
    }

    fn and_test(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let first = self.not_test()?;
        if !self.at_keyword("and") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword("and") {
            values.push(self.not_test()?);
        }
        let id = self.finish(Node::new(NodeKind::BoolOp).with_name("and"), start);
        for value in values {
            self.tree.add_child(id, Field::Values, value);
        }
        Ok(id)
    }

    fn not_test(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        if self.eat_keyword("not") {
            let operand = self.not_test()?;
            let id = self.finish(Node::new(NodeKind::UnaryOp).with_name("not"), start);
            self.tree.add_child(id, Field::Operand, operand);
            return Ok(id);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let left = self.arith()?;
        let mut comparators = Vec::new();
        let mut ops: Vec<&str> = Vec::new();
        loop {
            let op = if self.eat_op(Op::Eq) {
                "=="
            } else if self.eat_op(Op::NotEq) {
                "!="
            } else if self.eat_op(Op::LtEq) {
                "<="
            } else if self.eat_op(Op::GtEq) {
                ">="
            } else if self.eat_op(Op::Lt) {
                "<"
            } else if self.eat_op(Op::Gt) {
                ">"
            } else if self.at_keyword("in") {
                self.advance();
                "in"
            } else if self.at_keyword("is") {
                self.advance();
                self.eat_keyword("not");
                "is"
            } else if self.at_keyword("not") {
                self.advance();
                if !self.eat_keyword("in") {
                    return Err(self.error("expected `in` after `not` in comparison"));
                }
                "not in"
            } else {
                break;
            };
            ops.push(op);
            comparators.push(self.arith()?);
        }
        if comparators.is_empty() {
            return Ok(left);
        }
        let id = self.finish(Node::new(NodeKind::Compare).with_name(ops.join(" ")), start);
        self.tree.add_child(id, Field::Left, left);
        for comparator in comparators {
            self.tree.add_child(id, Field::Comparators, comparator);
        }
        Ok(id)
    }

    fn arith(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut left = self.term()?;
        loop {
            let op = if self.at_op(Op::Plus) {
                "+"
            } else if self.at_op(Op::Minus) {
                "-"
            } else {
                break;
            };
            self.advance();
            let right = self.term()?;
            let id = self.finish(Node::new(NodeKind::BinOp).with_name(op), start);
            self.tree.add_child(id, Field::Left, left);
            self.tree.add_child(id, Field::Right, right);
            left = id;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut left = self.factor()?;
        loop {
            let op = if self.at_op(Op::Star) {
                "*"
            } else if self.at_op(Op::Slash) {
                "/"
            } else if self.at_op(Op::DoubleSlash) {
                "//"
            } else if self.at_op(Op::Percent) {
                "%"
            } else {
                break;
            };
            self.advance();
            let right = self.factor()?;
            let id = self.finish(Node::new(NodeKind::BinOp).with_name(op), start);
            self.tree.add_child(id, Field::Left, left);
            self.tree.add_child(id, Field::Right, right);
            left = id;
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        if self.at_op(Op::Plus) || self.at_op(Op::Minus) {
            let TokenKind::Op(op) = self.advance().kind else {
                unreachable!()
            };
            let operand = self.factor()?;
            let name = if op == Op::Plus { "+" } else { "-" };
            let id = self.finish(Node::new(NodeKind::UnaryOp).with_name(name), start);
            self.tree.add_child(id, Field::Operand, operand);
            return Ok(id);
        }
        self.power()
    }

    fn power(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let base = self.postfix()?;
        if self.eat_op(Op::DoubleStar) {
            let exponent = self.factor()?;
            let id = self.finish(Node::new(NodeKind::BinOp).with_name("**"), start);
            self.tree.add_child(id, Field::Left, base);
            self.tree.add_child(id, Field::Right, exponent);
            return Ok(id);
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut value = self.atom()?;
        loop {
            if self.eat_op(Op::LParen) {
                value = self.call(value, start)?;
            } else if self.eat_op(Op::LBracket) {
                let slice = self.subscript_slice()?;
                self.expect_op(Op::RBracket, "to close the subscript")?;
                let id = self.finish(Node::new(NodeKind::Subscript), start);
                self.tree.add_child(id, Field::Value, value);
                self.tree.add_child(id, Field::Slice, slice);
                value = id;
            } else if self.eat_op(Op::Dot) {
                let attr = self.expect_name("after `.`")?;
                let id = self.finish(Node::new(NodeKind::Attribute).with_name(attr), start);
                self.tree.add_child(id, Field::Value, value);
                value = id;
            } else {
                break;
            }
        }
        Ok(value)
    }

    fn call(&mut self, func: NodeId, start: Start) -> Result<NodeId, ParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.at_op(Op::RParen) {
            // `*args` / `**kwargs` spreads are flattened into plain args.
            self.eat_op(Op::Star);
            self.eat_op(Op::DoubleStar);

            let arg_start = self.start();
            if let TokenKind::Name(name) = self.peek_kind().clone()
                && matches!(
                    self.tokens.get(self.pos + 1).map(|t| &t.kind),
                    Some(TokenKind::Op(Op::Assign))
                )
            {
                self.advance();
                self.advance();
                let value = self.test()?;
                let keyword = self.finish(Node::new(NodeKind::Keyword).with_name(name), arg_start);
                self.tree.add_child(keyword, Field::Value, value);
                keywords.push(keyword);
            } else {
                let arg = self.test()?;
                if self.at_keyword("for") {
                    args.push(self.generator_exp(arg, arg_start)?);
                } else {
                    args.push(arg);
                }
            }
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RParen, "to close the call")?;
        let id = self.finish(Node::new(NodeKind::Call), start);
        self.tree.add_child(id, Field::Func, func);
        for arg in args {
            self.tree.add_child(id, Field::Args, arg);
        }
        for keyword in keywords {
            self.tree.add_child(id, Field::Keywords, keyword);
        }
        Ok(id)
    }

    /// `elt for target in iter [if cond]* (for ...)*` after `elt` has
    /// already been parsed.
    fn generator_exp(&mut self, elt: NodeId, start: Start) -> Result<NodeId, ParseError> {
        let mut generators = Vec::new();
        while self.at_keyword("for") {
            let gen_start = self.start();
            self.advance();
            let target = self.target_list()?;
            if !self.eat_keyword("in") {
                return Err(self.error("expected `in` in comprehension"));
            }
            let iter = self.or_test()?;
            let mut conditions = Vec::new();
            while self.eat_keyword("if") {
                conditions.push(self.or_test()?);
            }
            let generator = self.finish(Node::new(NodeKind::Comprehension), gen_start);
            self.tree.add_child(generator, Field::Target, target);
            self.tree.add_child(generator, Field::Iter, iter);
            for condition in conditions {
                self.tree.add_child(generator, Field::Test, condition);
            }
            generators.push(generator);
        }
        let id = self.finish(Node::new(NodeKind::GeneratorExp), start);
        self.tree.add_child(id, Field::Elt, elt);
        for generator in generators {
            self.tree.add_child(id, Field::Generators, generator);
        }
        Ok(id)
    }

    fn subscript_slice(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let mut parts = Vec::new();
        let mut sliced = false;
        loop {
            if self.at_op(Op::Colon) {
                sliced = true;
                self.advance();
                continue;
            }
            if self.at_op(Op::RBracket) {
                break;
            }
            parts.push(self.test()?);
            if self.eat_op(Op::Comma) {
                sliced = true;
                continue;
            }
            if !self.at_op(Op::Colon) {
                break;
            }
        }
        if !sliced && parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        // Extended or colon slices are kept as a tuple of the parts
        // that were present; the inspections never look inside.
        let id = self.finish(Node::new(NodeKind::Tuple), start);
        for part in parts {
            self.tree.add_child(id, Field::Elts, part);
        }
        Ok(id)
    }

    fn atom(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        match self.peek_kind().clone() {
            TokenKind::Name(name) => {
                self.advance();
                let node = match name.as_str() {
                    "True" => Node::new(NodeKind::Constant).with_value(ConstValue::Bool(true)),
                    "False" => Node::new(NodeKind::Constant).with_value(ConstValue::Bool(false)),
                    "None" => Node::new(NodeKind::Constant).with_value(ConstValue::None),
                    _ => Node::new(NodeKind::Name).with_name(name),
                };
                Ok(self.finish(node, start))
            }
            TokenKind::Int(value) => {
                self.advance();
                Ok(self.finish(
                    Node::new(NodeKind::Constant).with_value(ConstValue::Int(value)),
                    start,
                ))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(self.finish(
                    Node::new(NodeKind::Constant).with_value(ConstValue::Float(value)),
                    start,
                ))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(self.finish(
                    Node::new(NodeKind::Constant).with_value(ConstValue::Str(value)),
                    start,
                ))
            }
            TokenKind::Op(Op::Ellipsis) => {
                self.advance();
                Ok(self.finish(
                    Node::new(NodeKind::Constant).with_value(ConstValue::Ellipsis),
                    start,
                ))
            }
            TokenKind::Op(Op::LParen) => self.paren_atom(start),
            TokenKind::Op(Op::LBracket) => self.list_atom(start),
            TokenKind::Op(Op::LBrace) => self.brace_atom(start),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    /// `()`, `(expr)`, `(a, b)`, or `(elt for ...)`.
    fn paren_atom(&mut self, start: Start) -> Result<NodeId, ParseError> {
        self.advance(); // (
        if self.eat_op(Op::RParen) {
            return Ok(self.finish(Node::new(NodeKind::Tuple), start));
        }
        let first_start = self.start();
        let first = self.test()?;
        if self.at_keyword("for") {
            let genexp = self.generator_exp(first, first_start)?;
            self.expect_op(Op::RParen, "to close the generator expression")?;
            return Ok(genexp);
        }
        if !self.at_op(Op::Comma) {
            self.expect_op(Op::RParen, "to close the parenthesis")?;
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RParen) {
                break;
            }
            elts.push(self.test()?);
        }
        self.expect_op(Op::RParen, "to close the tuple")?;
        let id = self.finish(Node::new(NodeKind::Tuple), start);
        for elt in elts {
            self.tree.add_child(id, Field::Elts, elt);
        }
        Ok(id)
    }

    fn list_atom(&mut self, start: Start) -> Result<NodeId, ParseError> {
        self.advance(); // [
        let mut elts = Vec::new();
        while !self.at_op(Op::RBracket) {
            let elt_start = self.start();
            let elt = self.test()?;
            if self.at_keyword("for") {
                // A list comprehension is represented as its generator;
                // no inspection distinguishes the two.
                elts.push(self.generator_exp(elt, elt_start)?);
            } else {
                elts.push(elt);
            }
            if !self.eat_op(Op::Comma) {
                break;
            }
        }
        self.expect_op(Op::RBracket, "to close the list")?;
        let id = self.finish(Node::new(NodeKind::List), start);
        for elt in elts {
            self.tree.add_child(id, Field::Elts, elt);
        }
        Ok(id)
    }

    fn brace_atom(&mut self, start: Start) -> Result<NodeId, ParseError> {
        self.advance(); // {
        if self.eat_op(Op::RBrace) {
            return Ok(self.finish(Node::new(NodeKind::Dict), start));
        }
        let first = self.test()?;
        if self.eat_op(Op::Colon) {
            // Dict literal.
            let mut keys = vec![first];
            let mut values = vec![self.test()?];
            while self.eat_op(Op::Comma) {
                if self.at_op(Op::RBrace) {
                    break;
                }
                keys.push(self.test()?);
                self.expect_op(Op::Colon, "between dict key and value")?;
                values.push(self.test()?);
            }
            self.expect_op(Op::RBrace, "to close the dict")?;
            let id = self.finish(Node::new(NodeKind::Dict), start);
            for key in keys {
                self.tree.add_child(id, Field::Keys, key);
            }
            for value in values {
                self.tree.add_child(id, Field::Values, value);
            }
            return Ok(id);
        }
        // Set literal.
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_op(Op::RBrace) {
                break;
            }
            elts.push(self.test()?);
        }
        self.expect_op(Op::RBrace, "to close the set")?;
        let id = self.finish(Node::new(NodeKind::Set), start);
        for elt in elts {
            self.tree.add_child(id, Field::Elts, elt);
        }
        Ok(id)
    }

    /// Assignment/loop targets: names, attributes, subscripts, and
    /// tuples thereof. Marked with store context.
    fn target_list(&mut self) -> Result<NodeId, ParseError> {
        let start = self.start();
        let first = self.target_atom()?;
        if !self.at_op(Op::Comma) {
            self.mark_store(first);
            return Ok(first);
        }
        let mut elts = vec![first];
        while self.eat_op(Op::Comma) {
            if self.at_keyword("in") || !self.line_continues() {
                break;
            }
            elts.push(self.target_atom()?);
        }
        let id = self.finish(Node::new(NodeKind::Tuple), start);
        for elt in elts {
            self.tree.add_child(id, Field::Elts, elt);
        }
        self.mark_store(id);
        Ok(id)
    }

    fn target_atom(&mut self) -> Result<NodeId, ParseError> {
        // Targets are postfix expressions: `x`, `x.attr`, `x[i]`,
        // or a parenthesized tuple of targets.
        self.postfix()
    }

    fn mark_store(&mut self, id: NodeId) {
        let kind = self.tree.kind(id);
        self.tree.node_mut(id).ctx = ExprContext::Store;
        if matches!(kind, NodeKind::Tuple | NodeKind::List) {
            let elts: Vec<NodeId> = self.tree.field(id, Field::Elts).collect();
            for elt in elts {
                self.mark_store(elt);
            }
        }
    }
}
