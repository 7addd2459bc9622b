//! Tooltip template compiler.
//!
//! A template is markup with `{{ ... }}` markers:
//! - `{{ currentIndicator }}` appends the value of an expression,
//! - markers starting with `var`, `if`, `for`, `else`, `switch`, `case`, `break`,
//!   `{`, `}` or `;` are control code spanning the text around them.
//!
//! ```
//! use wbi_map::template::{Context, compile_template};
//!
//! let ctx = Context::new().with("currentIndicator", "42.0%");
//! assert_eq!(
//!     compile_template("Value: {{ currentIndicator }}", &ctx).as_deref(),
//!     Some("Value: 42.0%")
//! );
//! ```
//!
//! Compilation has three stages: [`Template::scan`] splits the source into
//! segments, [`Template::compile`] parses them into a [`Program`], and
//! [`Program::render`] evaluates it. Nothing is cached between calls.

mod eval;
mod lexer;
mod parser;
mod value;

use thiserror::Error;

pub use eval::MAX_LOOP_ITERATIONS;
pub use lexer::Segment;
pub use parser::Program;
pub use value::{Context, Value};

/// Why a template could not be compiled or rendered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("SyntaxError: {0}")]
    Syntax(String),
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("RangeError: {0}")]
    Range(String),
}

/// Receives template failures. The caller only sees an absent result.
pub trait DiagnosticSink {
    fn report(&self, error: &TemplateError, listing: &str);
}

/// Default sink: reports through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, error: &TemplateError, listing: &str) {
        log::error!("'{error}' in template\n\nCode:\n{listing}\n");
    }
}

/// A scanned template: literal and marker segments in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn scan(source: &str) -> Self {
        Self {
            segments: lexer::scan(source),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn compile(&self) -> Result<Program, TemplateError> {
        Program::from_segments(&self.segments)
    }

    /// One instruction per line, for diagnostics.
    pub fn listing(&self) -> String {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, seg)| match seg {
                Segment::Literal(text) => format!("{i:>3}: text {text:?}"),
                Segment::Statement(code) => format!("{i:>3}: exec {}", code.trim()),
                Segment::Expression(code) => format!("{i:>3}: emit {}", code.trim()),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Program {
    pub fn render(&self, context: &Context) -> Result<String, TemplateError> {
        eval::run(self, context)
    }
}

/// Compile `source` and render it against `context`, logging failures.
pub fn compile_template(source: &str, context: &Context) -> Option<String> {
    compile_template_with(source, context, &LogSink)
}

/// Compile `source` and render it against `context`.
///
/// Failures go to `sink` together with the instruction listing; the result is
/// then `None`.
pub fn compile_template_with(
    source: &str,
    context: &Context,
    sink: &dyn DiagnosticSink,
) -> Option<String> {
    let template = Template::scan(source);
    match template.compile().and_then(|program| program.render(context)) {
        Ok(text) => Some(text),
        Err(err) => {
            sink.report(&err, &template.listing());
            None
        }
    }
}
