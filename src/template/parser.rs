//! Recursive-descent parser for the template language.
//!
//! Statement markers are concatenated into one token stream. Literal text and
//! expression markers sit in that stream as `Token::Emit` placeholders, so
//! `{{ if (ok) { }}yes{{ } else { }}no{{ } }}` parses as a regular `if`/`else`
//! whose branches each emit one fragment.

use super::TemplateError;
use super::lexer::{Segment, Token, tokenize};
use super::value::Value;

/// An output instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    Text(String),
    /// Comma separated expressions of one marker, appended in order.
    Values(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Array(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    TypeOf(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign(String, AssignOp, Box<Expr>),
    Update {
        name: String,
        delta: f64,
        prefix: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Emit(Emit),
    Var(Vec<(String, Option<Expr>)>),
    Expr(Expr),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        name: String,
        object: Expr,
        body: Box<Stmt>,
    },
    Switch(Expr, Vec<Case>),
    Break,
    Block(Vec<Stmt>),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// A parsed template, ready to render against any context.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub(crate) body: Vec<Stmt>,
    /// Names introduced with `var`; they read as `undefined` before assignment.
    pub(crate) declared: Vec<String>,
}

impl Program {
    pub(crate) fn from_segments(segments: &[Segment]) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut emits = Vec::new();
        for segment in segments {
            match segment {
                Segment::Literal(text) => {
                    tokens.push(Token::Emit(emits.len()));
                    emits.push(Emit::Text(text.clone()));
                }
                Segment::Expression(code) => {
                    let mut parser = Parser::new(tokenize(code)?, &[]);
                    let values = parser.expression_list()?;
                    parser.expect_end()?;
                    tokens.push(Token::Emit(emits.len()));
                    emits.push(Emit::Values(values));
                }
                Segment::Statement(code) => tokens.extend(tokenize(code)?),
            }
        }

        let mut parser = Parser::new(tokens, &emits);
        let body = parser.program()?;
        Ok(Program {
            body,
            declared: parser.declared,
        })
    }
}

/// Statements and expressions may nest this deep before compilation gives up.
const MAX_NESTING_DEPTH: usize = 128;

const RESERVED: [&str; 9] = ["var", "if", "else", "for", "in", "switch", "case", "default", "break"];

struct Parser<'e> {
    tokens: Vec<Token>,
    emits: &'e [Emit],
    pos: usize,
    /// Depth of enclosing loops and switches; `break` is only legal inside one.
    breakable: usize,
    /// Nesting of statements, operands and operator chains, capped at [`MAX_NESTING_DEPTH`].
    depth: usize,
    declared: Vec<String>,
}

impl<'e> Parser<'e> {
    fn new(tokens: Vec<Token>, emits: &'e [Emit]) -> Self {
        Self {
            tokens,
            emits,
            pos: 0,
            breakable: 0,
            depth: 0,
            declared: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(q)) if *q == p)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name == word)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.is_keyword(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> TemplateError {
        match self.peek() {
            Some(tok) => TemplateError::Syntax(format!("Unexpected token {tok}")),
            None => TemplateError::Syntax("Unexpected end of input".into()),
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), TemplateError> {
        if self.eat_punct(p) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<(), TemplateError> {
        if self.eat_keyword(word) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn expect_end(&self) -> Result<(), TemplateError> {
        if self.at_end() { Ok(()) } else { Err(self.unexpected()) }
    }

    fn deepen(&mut self) -> Result<(), TemplateError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(TemplateError::Range(format!(
                "Template nesting exceeds {MAX_NESTING_DEPTH} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, TemplateError>,
    ) -> Result<T, TemplateError> {
        let base = self.depth;
        self.deepen()?;
        let parsed = parse(self);
        self.depth = base;
        parsed
    }

    fn binding_name(&mut self) -> Result<String, TemplateError> {
        match self.peek() {
            Some(Token::Ident(name)) if !is_reserved(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    // ---- statements ----

    fn program(&mut self) -> Result<Vec<Stmt>, TemplateError> {
        let mut body = Vec::new();
        while !self.at_end() {
            body.push(self.statement()?);
        }
        Ok(body)
    }

    fn statement(&mut self) -> Result<Stmt, TemplateError> {
        self.nested(Self::single_statement)
    }

    fn single_statement(&mut self) -> Result<Stmt, TemplateError> {
        match self.peek().cloned() {
            None => Err(self.unexpected()),
            Some(Token::Emit(idx)) => {
                let emit = self.emits.get(idx).cloned().ok_or_else(|| self.unexpected())?;
                self.pos += 1;
                Ok(Stmt::Emit(emit))
            }
            Some(Token::Punct("{")) => self.block(),
            Some(Token::Punct(";")) => {
                self.pos += 1;
                Ok(Stmt::Empty)
            }
            Some(Token::Ident(word)) => match word.as_str() {
                "var" => {
                    let decl = self.var_declaration()?;
                    self.eat_punct(";");
                    Ok(decl)
                }
                "if" => self.if_statement(),
                "for" => self.for_statement(),
                "switch" => self.switch_statement(),
                "break" => {
                    if self.breakable == 0 {
                        return Err(TemplateError::Syntax("Illegal break statement".into()));
                    }
                    self.pos += 1;
                    self.eat_punct(";");
                    Ok(Stmt::Break)
                }
                _ => self.expression_statement(),
            },
            Some(_) => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt, TemplateError> {
        let expr = self.expression()?;
        self.eat_punct(";");
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> Result<Stmt, TemplateError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.eat_punct("}") {
            body.push(self.statement()?);
        }
        Ok(Stmt::Block(body))
    }

    fn var_declaration(&mut self) -> Result<Stmt, TemplateError> {
        self.expect_keyword("var")?;
        let mut bindings = Vec::new();
        loop {
            let name = self.binding_name()?;
            self.declared.push(name.clone());
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            bindings.push((name, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Var(bindings))
    }

    fn if_statement(&mut self) -> Result<Stmt, TemplateError> {
        self.expect_keyword("if")?;
        self.expect_punct("(")?;
        let test = self.expression()?;
        self.expect_punct(")")?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.eat_keyword("else") {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(test, then, otherwise))
    }

    fn loop_body(&mut self) -> Result<Box<Stmt>, TemplateError> {
        self.breakable += 1;
        let body = self.statement();
        self.breakable -= 1;
        body.map(Box::new)
    }

    fn for_statement(&mut self) -> Result<Stmt, TemplateError> {
        self.expect_keyword("for")?;
        self.expect_punct("(")?;

        let is_var = self.is_keyword("var");
        let name_offset = usize::from(is_var);
        let for_in = matches!(self.peek_at(name_offset), Some(Token::Ident(_)))
            && matches!(self.peek_at(name_offset + 1), Some(Token::Ident(w)) if w == "in");
        if for_in {
            self.eat_keyword("var");
            let name = self.binding_name()?;
            if is_var {
                self.declared.push(name.clone());
            }
            self.expect_keyword("in")?;
            let object = self.expression()?;
            self.expect_punct(")")?;
            let body = self.loop_body()?;
            return Ok(Stmt::ForIn { name, object, body });
        }

        let init = if self.eat_punct(";") {
            None
        } else {
            let init = if is_var {
                self.var_declaration()?
            } else {
                Stmt::Expr(self.expression()?)
            };
            self.expect_punct(";")?;
            Some(Box::new(init))
        };
        let test = if self.eat_punct(";") {
            None
        } else {
            let test = self.expression()?;
            self.expect_punct(";")?;
            Some(test)
        };
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_punct(")")?;
        let body = self.loop_body()?;
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn switch_statement(&mut self) -> Result<Stmt, TemplateError> {
        self.expect_keyword("switch")?;
        self.expect_punct("(")?;
        let subject = self.expression()?;
        self.expect_punct(")")?;
        self.expect_punct("{")?;

        self.breakable += 1;
        let cases = self.switch_cases();
        self.breakable -= 1;
        Ok(Stmt::Switch(subject, cases?))
    }

    fn switch_cases(&mut self) -> Result<Vec<Case>, TemplateError> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.eat_punct("}") {
            let test = if self.eat_keyword("case") {
                Some(self.expression()?)
            } else if self.eat_keyword("default") {
                if seen_default {
                    return Err(TemplateError::Syntax(
                        "More than one default clause in switch statement".into(),
                    ));
                }
                seen_default = true;
                None
            } else {
                return Err(self.unexpected());
            };
            self.expect_punct(":")?;

            let mut body = Vec::new();
            while !(self.is_keyword("case") || self.is_keyword("default") || self.is_punct("}")) {
                body.push(self.statement()?);
            }
            cases.push(Case { test, body });
        }
        Ok(cases)
    }

    // ---- expressions ----

    fn expression_list(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut list = Vec::new();
        if self.at_end() {
            return Ok(list);
        }
        loop {
            list.push(self.assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(list)
    }

    fn expression(&mut self) -> Result<Expr, TemplateError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, TemplateError> {
        self.nested(Self::assignment_expr)
    }

    fn assignment_expr(&mut self) -> Result<Expr, TemplateError> {
        let target = self.conditional()?;
        let op = if self.is_punct("=") {
            AssignOp::Set
        } else if self.is_punct("+=") {
            AssignOp::Add
        } else if self.is_punct("-=") {
            AssignOp::Sub
        } else {
            return Ok(target);
        };
        let Expr::Ident(name) = target else {
            return Err(TemplateError::Syntax("Invalid left-hand side in assignment".into()));
        };
        self.pos += 1;
        let value = self.assignment()?;
        Ok(Expr::Assign(name, op, Box::new(value)))
    }

    fn conditional(&mut self) -> Result<Expr, TemplateError> {
        let test = self.logical_or()?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let then = self.assignment()?;
        self.expect_punct(":")?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional(Box::new(test), Box::new(then), Box::new(otherwise)))
    }

    fn logical_or(&mut self) -> Result<Expr, TemplateError> {
        let base = self.depth;
        let mut left = self.logical_and()?;
        while self.eat_punct("||") {
            self.deepen()?;
            let right = self.logical_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, TemplateError> {
        let base = self.depth;
        let mut left = self.binary_level(0)?;
        while self.eat_punct("&&") {
            self.deepen()?;
            let right = self.binary_level(0)?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    /// Left-associative binary operators, loosest level first.
    fn binary_level(&mut self, level: usize) -> Result<Expr, TemplateError> {
        const LEVELS: [&[(&str, BinaryOp)]; 4] = [
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNe),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
            ],
            &[
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let base = self.depth;
        let mut left = self.binary_level(level + 1)?;
        'outer: loop {
            for (sym, op) in ops.iter() {
                if self.eat_punct(sym) {
                    self.deepen()?;
                    let right = self.binary_level(level + 1)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            self.depth = base;
            return Ok(left);
        }
    }

    fn unary(&mut self) -> Result<Expr, TemplateError> {
        self.nested(Self::unary_expr)
    }

    fn unary_expr(&mut self) -> Result<Expr, TemplateError> {
        if self.eat_punct("!") {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat_punct("-") {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        if self.eat_punct("+") {
            return Ok(Expr::Unary(UnaryOp::Plus, Box::new(self.unary()?)));
        }
        if self.eat_keyword("typeof") {
            return Ok(Expr::TypeOf(Box::new(self.unary()?)));
        }
        for (sym, delta) in [("++", 1.0), ("--", -1.0)] {
            if self.eat_punct(sym) {
                let Expr::Ident(name) = self.unary()? else {
                    return Err(TemplateError::Syntax(
                        "Invalid left-hand side expression in prefix operation".into(),
                    ));
                };
                return Ok(Expr::Update {
                    name,
                    delta,
                    prefix: true,
                });
            }
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, TemplateError> {
        let expr = self.call_member()?;
        for (sym, delta) in [("++", 1.0), ("--", -1.0)] {
            if self.is_punct(sym) {
                let Expr::Ident(name) = expr else {
                    return Err(TemplateError::Syntax(
                        "Invalid left-hand side expression in postfix operation".into(),
                    ));
                };
                self.pos += 1;
                return Ok(Expr::Update {
                    name,
                    delta,
                    prefix: false,
                });
            }
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> Result<Expr, TemplateError> {
        let base = self.depth;
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                self.deepen()?;
                let Some(Token::Ident(name)) = self.advance() else {
                    return Err(TemplateError::Syntax("Unexpected token after '.'".into()));
                };
                if self.eat_punct("(") {
                    let args = self.arguments()?;
                    expr = Expr::Call {
                        receiver: Box::new(expr),
                        method: name,
                        args,
                    };
                } else {
                    expr = Expr::Member(Box::new(expr), name);
                }
            } else if self.eat_punct("[") {
                self.deepen()?;
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.is_punct("(") {
                return Err(TemplateError::Syntax(
                    "only method calls such as value.toFixed(1) are supported".into(),
                ));
            } else {
                self.depth = base;
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut args = Vec::new();
        if self.eat_punct(")") {
            return Ok(args);
        }
        loop {
            args.push(self.assignment()?);
            if self.eat_punct(")") {
                return Ok(args);
            }
            self.expect_punct(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, TemplateError> {
        let expr = match self.peek() {
            Some(Token::Number(n)) => Expr::Literal(Value::Number(*n)),
            Some(Token::Str(s)) => Expr::Literal(Value::Str(s.clone())),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                "undefined" => Expr::Literal(Value::Undefined),
                w if is_reserved(w) => return Err(self.unexpected()),
                _ => Expr::Ident(word.clone()),
            },
            Some(Token::Punct("(")) => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect_punct(")")?;
                return Ok(inner);
            }
            Some(Token::Punct("[")) => {
                self.pos += 1;
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.assignment()?);
                    if !self.is_punct("]") {
                        self.expect_punct(",")?;
                    }
                }
                return Ok(Expr::Array(items));
            }
            _ => return Err(self.unexpected()),
        };
        self.pos += 1;
        Ok(expr)
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word) || word == "typeof"
}
