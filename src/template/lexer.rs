//! Marker scanning and tokenization.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::TemplateError;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("valid marker pattern"));
static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ ?(var|if|for|else|switch|case|break|\{|\}|;)").expect("valid statement pattern")
});

/// One piece of a template, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied to the output as is.
    Literal(String),
    /// Control code such as `if (x) {`, `}` or `var i = 0;`.
    Statement(String),
    /// Code whose value is appended to the output.
    Expression(String),
}

/// Split a template into literal text and marker contents.
///
/// Markers do not span lines. Carriage returns, tabs and newlines are dropped
/// everywhere, including literal text.
pub fn scan(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for caps in MARKER.captures_iter(template) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_literal(&mut segments, &template[cursor..whole.start()]);
        let code = strip_control(inner.as_str());
        if STATEMENT.is_match(inner.as_str()) {
            segments.push(Segment::Statement(code));
        } else {
            segments.push(Segment::Expression(code));
        }
        cursor = whole.end();
    }
    push_literal(&mut segments, &template[cursor..]);
    segments
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    let text = strip_control(text);
    if !text.is_empty() {
        segments.push(Segment::Literal(text));
    }
}

fn strip_control(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '\r' | '\t' | '\n')).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    /// Placeholder for an output instruction (literal text or expression marker).
    Emit(usize),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Punct(p) => write!(f, "{p}"),
            Token::Emit(_) => write!(f, "template output"),
        }
    }
}

// Longest first so `===` wins over `==` and `=`.
const PUNCTUATORS: [&str; 32] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "(", ")", "{",
    "}", "[", "]", ";", ",", ".", "?", ":", "+", "-", "*", "/", "%", "<", ">", "=", "!",
];

/// Tokenize the code of one marker.
pub fn tokenize(code: &str) -> Result<Vec<Token>, TemplateError> {
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let (n, next) = lex_number(&chars, i)?;
            tokens.push(Token::Number(n));
            i = next;
        } else if c == '\'' || c == '"' {
            let (s, next) = lex_string(&chars, i)?;
            tokens.push(Token::Str(s));
            i = next;
        } else if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let punct = PUNCTUATORS
                .iter()
                .find(|p| rest.starts_with(**p))
                .copied()
                .ok_or_else(|| TemplateError::Syntax(format!("Invalid or unexpected token '{c}'")))?;
            tokens.push(Token::Punct(punct));
            i += punct.chars().count();
        }
    }
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(f64, usize), TemplateError> {
    let mut i = start;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        i += 1;
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    let text: String = chars[start..i].iter().collect();
    let n = text
        .parse::<f64>()
        .map_err(|_| TemplateError::Syntax(format!("Invalid number '{text}'")))?;
    if i < chars.len() && (chars[i].is_ascii_alphabetic() || chars[i] == '_') {
        return Err(TemplateError::Syntax(
            "Invalid or unexpected token after numeric literal".into(),
        ));
    }
    Ok((n, i))
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), TemplateError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            c if c == quote => return Ok((out, i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .ok_or_else(|| TemplateError::Syntax("Invalid or unexpected token".into()))?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => *other,
                });
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(TemplateError::Syntax("Invalid or unexpected token: unterminated string".into()))
}
