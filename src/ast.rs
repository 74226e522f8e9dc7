//! Syntax tree handed from the parser to the code generator.
//!
//! Each node owns its children. The set of node kinds is closed: the code
//! generator matches on it exhaustively.

use serde::Serialize;

use crate::blocks::BlockKind;
use crate::ty::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOp {
  And,
  Or,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
  Int(i32),
  Float(f64),
  Char(u8),
  Str(String),
}

/// `let`/`const` declaration, optionally annotated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decl {
  pub name: String,
  pub constant: bool,
  pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
  pub name: String,
  pub ty: Type,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Target {
  Decl(Decl),
  Usage(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
  pub kind: BlockKind,
  pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDef {
  pub params: Vec<Param>,
  pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
  Constant(Constant),
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Compare {
    op: CompareOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Logical {
    op: LogicalOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Not(Box<Expr>),
  Decl(Decl),
  Usage(String),
  Assign {
    target: Target,
    value: Box<Expr>,
  },
  Return(Box<Expr>),
  Function(FunctionDef),
  Call {
    module: Option<String>,
    name: String,
    args: Vec<Expr>,
  },
}

impl Expr {
  pub fn int(value: i32) -> Self {
    Self::Constant(Constant::Int(value))
  }

  pub fn usage(name: impl Into<String>) -> Self {
    Self::Usage(name.into())
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn assign(target: Target, value: Expr) -> Self {
    Self::Assign {
      target,
      value: Box::new(value),
    }
  }
}

/// One `if`/`else if` arm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfArm {
  pub cond: Expr,
  pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
  Expr(Expr),
  If {
    arms: Vec<IfArm>,
    otherwise: Option<Block>,
  },
  Use(String),
}

/// Root of a source file. `name` overrides the module name the driver picks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
  pub name: Option<String>,
  pub stmts: Vec<Stmt>,
}
