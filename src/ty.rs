use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeKind {
  Int,
  Float,
  Char,
  Function,
  Array,
}

/// Type tag attached to every compiled value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Type {
  pub kind: TypeKind,
  pub base: Option<Box<Type>>,
  pub len: usize,
}

impl Type {
  fn scalar(kind: TypeKind) -> Self {
    Self {
      kind,
      base: None,
      len: 0,
    }
  }

  pub fn int() -> Self {
    Self::scalar(TypeKind::Int)
  }

  pub fn float() -> Self {
    Self::scalar(TypeKind::Float)
  }

  pub fn char() -> Self {
    Self::scalar(TypeKind::Char)
  }

  pub fn function() -> Self {
    Self::scalar(TypeKind::Function)
  }

  pub fn array_of(base: Type, len: usize) -> Self {
    Self {
      kind: TypeKind::Array,
      base: Some(Box::new(base)),
      len,
    }
  }

  /// Integer-like types lower to the signed integer opcodes.
  pub fn is_integer(&self) -> bool {
    matches!(self.kind, TypeKind::Int | TypeKind::Char)
  }

  pub fn is_float(&self) -> bool {
    matches!(self.kind, TypeKind::Float)
  }

  pub fn base(&self) -> Option<&Type> {
    self.base.as_deref()
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      TypeKind::Int => f.write_str("i32"),
      TypeKind::Float => f.write_str("double"),
      TypeKind::Char => f.write_str("i8"),
      TypeKind::Function => f.write_str("ptr"),
      TypeKind::Array => match self.base() {
        Some(base) => write!(f, "[{} x {base}]", self.len),
        None => write!(f, "[{} x i8]", self.len),
      },
    }
  }
}
