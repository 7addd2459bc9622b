//! Tree-walking evaluator.

use ahash::{AHashMap, AHashSet};
use std::cmp::Ordering;

use super::TemplateError;
use super::parser::{AssignOp, BinaryOp, Case, Emit, Expr, LogicalOp, Program, Stmt, UnaryOp};
use super::value::{Context, Value, number_to_string};

/// Total loop iterations one render may perform.
pub const MAX_LOOP_ITERATIONS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
}

/// Run `program` against `context` and return the joined output fragments.
pub(crate) fn run(program: &Program, context: &Context) -> Result<String, TemplateError> {
    let mut interpreter = Interpreter {
        context,
        locals: AHashMap::new(),
        hoisted: program.declared.iter().map(String::as_str).collect(),
        out: Vec::new(),
        iterations: 0,
    };
    for stmt in &program.body {
        interpreter.exec(stmt)?;
    }
    Ok(interpreter.out.concat())
}

struct Interpreter<'p> {
    context: &'p Context,
    /// Assigned variables. They shadow context fields of the same name.
    locals: AHashMap<String, Value>,
    hoisted: AHashSet<&'p str>,
    out: Vec<String>,
    iterations: usize,
}

impl Interpreter<'_> {
    fn tick(&mut self) -> Result<(), TemplateError> {
        self.iterations += 1;
        if self.iterations > MAX_LOOP_ITERATIONS {
            return Err(TemplateError::Range(format!(
                "loop iteration limit of {MAX_LOOP_ITERATIONS} exceeded"
            )));
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, TemplateError> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(v) = self.context.get(name) {
            return Ok(v.clone());
        }
        if self.hoisted.contains(name) {
            return Ok(Value::Undefined);
        }
        Err(TemplateError::Reference(name.to_string()))
    }

    fn resolvable(&self, name: &str) -> bool {
        self.locals.contains_key(name) || self.context.get(name).is_some() || self.hoisted.contains(name)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, TemplateError> {
        match stmt {
            Stmt::Emit(Emit::Text(text)) => self.out.push(text.clone()),
            Stmt::Emit(Emit::Values(exprs)) => {
                for expr in exprs {
                    let v = self.eval(expr)?;
                    self.out.push(v.fragment());
                }
            }
            Stmt::Var(bindings) => {
                for (name, init) in bindings {
                    if let Some(init) = init {
                        let v = self.eval(init)?;
                        self.locals.insert(name.clone(), v);
                    }
                }
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::If(test, then, otherwise) => {
                if self.eval(test)?.truthy() {
                    return self.exec(then);
                } else if let Some(otherwise) = otherwise {
                    return self.exec(otherwise);
                }
            }
            Stmt::Block(body) => {
                for s in body {
                    if self.exec(s)? == Flow::Break {
                        return Ok(Flow::Break);
                    }
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval(test)?.truthy() {
                            break;
                        }
                    }
                    self.tick()?;
                    if self.exec(body)? == Flow::Break {
                        break;
                    }
                    if let Some(update) = update {
                        self.eval(update)?;
                    }
                }
            }
            Stmt::ForIn { name, object, body } => {
                let keys: Vec<String> = match self.eval(object)? {
                    Value::Object(map) => map.into_keys().collect(),
                    Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
                    Value::Str(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
                    _ => Vec::new(),
                };
                for key in keys {
                    self.tick()?;
                    self.locals.insert(name.clone(), Value::Str(key));
                    if self.exec(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::Switch(subject, cases) => self.exec_switch(subject, cases)?,
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Empty => {}
        }
        Ok(Flow::Normal)
    }

    fn exec_switch(&mut self, subject: &Expr, cases: &[Case]) -> Result<(), TemplateError> {
        let subject = self.eval(subject)?;
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.eval(test)? == subject {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = start.or_else(|| cases.iter().position(|c| c.test.is_none()));
        let Some(start) = start else {
            return Ok(());
        };
        // fall through until `break`
        for case in &cases[start..] {
            for s in &case.body {
                if self.exec(s)? == Flow::Break {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, TemplateError> {
        Ok(match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Ident(name) => self.lookup(name)?,
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Value::Array(values)
            }
            Expr::Member(object, name) => {
                let base = self.eval(object)?;
                property(&base, name)?
            }
            Expr::Index(object, index) => {
                let base = self.eval(object)?;
                let key = self.eval(index)?;
                index_value(&base, &key)?
            }
            Expr::Call {
                receiver,
                method,
                args,
            } => {
                let base = self.eval(receiver)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                call_method(&base, method, &values)?
            }
            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                    UnaryOp::Plus => Value::Number(v.to_number()),
                }
            }
            Expr::TypeOf(operand) => match operand.as_ref() {
                Expr::Ident(name) if !self.resolvable(name) => Value::Str("undefined".into()),
                other => Value::Str(self.eval(other)?.type_name().into()),
            },
            Expr::Binary(op, left, right) => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                binary(*op, &l, &r)
            }
            Expr::Logical(op, left, right) => {
                let l = self.eval(left)?;
                match (op, l.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => l,
                    _ => self.eval(right)?,
                }
            }
            Expr::Conditional(test, then, otherwise) => {
                if self.eval(test)?.truthy() {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }
            Expr::Assign(name, op, value) => {
                let v = self.eval(value)?;
                let new = match op {
                    AssignOp::Set => v,
                    AssignOp::Add => binary(BinaryOp::Add, &self.lookup(name)?, &v),
                    AssignOp::Sub => binary(BinaryOp::Sub, &self.lookup(name)?, &v),
                };
                self.locals.insert(name.clone(), new.clone());
                new
            }
            Expr::Update {
                name,
                delta,
                prefix,
            } => {
                let old = self.lookup(name)?.to_number();
                let new = old + delta;
                self.locals.insert(name.clone(), Value::Number(new));
                Value::Number(if *prefix { new } else { old })
            }
        })
    }
}

fn read_error(base: &Value, key: &str) -> TemplateError {
    TemplateError::Type(format!("Cannot read properties of {base} (reading '{key}')"))
}

fn property(base: &Value, name: &str) -> Result<Value, TemplateError> {
    Ok(match base {
        Value::Undefined | Value::Null => return Err(read_error(base, name)),
        Value::Str(s) if name == "length" => Value::Number(s.chars().count() as f64),
        Value::Array(items) if name == "length" => Value::Number(items.len() as f64),
        Value::Array(items) => element(items, name),
        Value::Str(s) => s
            .chars()
            .nth(name.parse::<usize>().unwrap_or(usize::MAX))
            .map_or(Value::Undefined, |c| Value::Str(c.to_string())),
        Value::Object(map) => map.get(name).cloned().unwrap_or_default(),
        Value::Bool(_) | Value::Number(_) => Value::Undefined,
    })
}

fn element(items: &[Value], key: &str) -> Value {
    key.parse::<usize>()
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .unwrap_or_default()
}

fn index_value(base: &Value, key: &Value) -> Result<Value, TemplateError> {
    let key = match key {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => format!("{}", *n as usize),
        other => other.to_string(),
    };
    property(base, &key)
}

fn call_method(base: &Value, method: &str, args: &[Value]) -> Result<Value, TemplateError> {
    if base.is_nullish() {
        return Err(read_error(base, method));
    }
    Ok(match (method, base) {
        ("toFixed", Value::Number(n)) => {
            let digits = args.first().map_or(0.0, Value::to_number);
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(TemplateError::Range(
                    "toFixed() digits argument must be between 0 and 100".into(),
                ));
            }
            Value::Str(to_fixed(*n, digits as usize))
        }
        ("toUpperCase", Value::Str(s)) => Value::Str(s.to_uppercase()),
        ("toLowerCase", Value::Str(s)) => Value::Str(s.to_lowercase()),
        ("trim", Value::Str(s)) => Value::Str(s.trim().to_string()),
        ("join", Value::Array(items)) => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_string(),
            };
            Value::Str(items.iter().map(Value::fragment).collect::<Vec<_>>().join(&sep))
        }
        ("toString", v) => Value::Str(v.to_string()),
        (_, v) => {
            return Err(TemplateError::Type(format!(
                "{method} is not a function on a {} value",
                v.type_name()
            )));
        }
    })
}

/// `Number.prototype.toFixed`: halves round away from zero.
fn to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }
    let factor = 10f64.powi(digits as i32);
    let rounded = (n.abs() * factor).round() / factor;
    let body = format!("{rounded:.digits$}");
    if n < 0.0 { format!("-{body}") } else { body }
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

fn concatenates(v: &Value) -> bool {
    matches!(v, Value::Str(_) | Value::Array(_) | Value::Object(_))
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Add if concatenates(l) || concatenates(r) => Value::Str(format!("{l}{r}")),
        BinaryOp::Add => Value::Number(l.to_number() + r.to_number()),
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Lt => Value::Bool(compare(l, r) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(l, r) == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(compare(l, r), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Ge => Value::Bool(matches!(compare(l, r), Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Eq => Value::Bool(loose_equals(l, r)),
        BinaryOp::Ne => Value::Bool(!loose_equals(l, r)),
        BinaryOp::StrictEq => Value::Bool(l == r),
        BinaryOp::StrictNe => Value::Bool(l != r),
    }
}

fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(x), Value::Str(_)) => *x == b.to_number(),
        (Value::Str(_), Value::Number(y)) => a.to_number() == *y,
        (Value::Bool(_), _) => loose_equals(&Value::Number(a.to_number()), b),
        (_, Value::Bool(_)) => loose_equals(a, &Value::Number(b.to_number())),
        (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::Str(_)) => {
            loose_equals(&Value::Str(a.to_string()), b)
        }
        (Value::Number(_) | Value::Str(_), Value::Array(_) | Value::Object(_)) => {
            loose_equals(a, &Value::Str(b.to_string()))
        }
        _ => a == b,
    }
}
