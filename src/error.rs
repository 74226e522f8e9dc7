//! Shared error type used across the compilation pipeline.
//!
//! Syntax errors are anchored at a byte offset and rendered with the
//! offending source line and a caret. Semantic errors carry only the names or
//! types involved; the first one raised aborts compilation.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{line}\n{marker} {message}"))]
  WithLocation {
    line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("name {name} is not defined"))]
  NotDefined { name: String },

  #[snafu(display("name {name} is already defined in this scope"))]
  Redefined { name: String },

  #[snafu(display("attempting to redefine constant {name}"))]
  RedefiningConstant { name: String },

  #[snafu(display("type mismatch: expected {expected}, found {found}"))]
  TypeMismatch { expected: String, found: String },

  #[snafu(display("type {ty} has no lowering in {context}"))]
  InvalidType { ty: String, context: String },

  #[snafu(display("{construct} cannot be lowered to IR yet"))]
  Unsupported { construct: String },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = loc.min(source.len());
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |idx| idx + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |idx| safe_loc + idx);
    let line_no = source[..line_start].matches('\n').count() + 1;

    let prefix = format!("{line_no}: ");
    let line = format!("{prefix}{}", &source[line_start..line_end]);
    let char_offset = prefix.len() + source[line_start..safe_loc].chars().count();
    let marker = format!("{}^", " ".repeat(char_offset));
    Self::WithLocation {
      line,
      marker,
      message: message.into(),
    }
  }
}
