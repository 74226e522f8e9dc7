//! Recursive-descent parser producing the syntax tree.
//!
//! Expressions use a precedence-climbing set of helpers; statements and
//! blocks sit on top. Every `->` the parser consumes opens a block, and the
//! block is tagged with its kind so the code generator can replay the scope
//! change when it walks the tree.

use crate::ast::{
  BinaryOp, Block, CompareOp, Constant, Decl, Expr, File, FunctionDef, IfArm, LogicalOp, Param,
  Stmt, Target,
};
use crate::blocks::BlockKind;
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Literal, Token, TokenKind, describe_token, token_text};
use crate::ty::Type;

/// Parse a whole source file.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<File> {
  let mut stream = TokenStream::new(tokens, source);
  let mut stmts = Vec::new();

  while !stream.is_eof() {
    stmts.push(parse_stmt(&mut stream)?);
  }

  Ok(File { name: None, stmts })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  if stream.equal_keyword("use") {
    let (name, _) = stream.get_ident()?;
    stream.skip(";")?;
    return Ok(Stmt::Use(name));
  }

  if stream.equal_keyword("if") {
    return parse_if(stream);
  }

  let expr = parse_expr(stream)?;
  stream.skip(";")?;
  Ok(Stmt::Expr(expr))
}

/// `if (c) -> ... [else if (c) -> ...]* [else -> ...] done;`
fn parse_if(stream: &mut TokenStream) -> CompileResult<Stmt> {
  let mut arms = Vec::new();
  let mut otherwise = None;

  loop {
    stream.skip("(")?;
    let cond = parse_expr(stream)?;
    stream.skip(")")?;
    stream.skip("->")?;
    let body = parse_block_body(stream, BlockKind::Nested)?;
    arms.push(IfArm { cond, body });

    if stream.equal_keyword("done") {
      break;
    }
    stream.skip_keyword("else")?;
    if stream.equal_keyword("if") {
      continue;
    }
    stream.skip("->")?;
    otherwise = Some(parse_block_body(stream, BlockKind::Nested)?);
    stream.skip_keyword("done")?;
    break;
  }

  stream.skip(";")?;
  Ok(Stmt::If { arms, otherwise })
}

/// Statements up to (not including) the `done` or `else` closing the block.
fn parse_block_body(stream: &mut TokenStream, kind: BlockKind) -> CompileResult<Block> {
  let mut stmts = Vec::new();
  while !stream.at_keyword("done") && !stream.at_keyword("else") {
    if stream.is_eof() {
      return Err(stream.error_here("unexpected end of input inside block"));
    }
    stmts.push(parse_stmt(stream)?);
  }
  Ok(Block { kind, stmts })
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Expr> {
  if stream.equal_keyword("return") {
    let value = parse_expr(stream)?;
    return Ok(Expr::Return(Box::new(value)));
  }
  parse_assign(stream)
}

fn parse_assign(stream: &mut TokenStream) -> CompileResult<Expr> {
  let loc = stream.loc();
  let node = parse_or(stream)?;

  if stream.equal("=") {
    let target = match node {
      Expr::Decl(decl) => Target::Decl(decl),
      Expr::Usage(name) => Target::Usage(name),
      _ => {
        return Err(CompileError::at(
          stream.source,
          loc,
          "left side of assignment must be a name or declaration",
        ));
      }
    };
    let value = parse_expr(stream)?;
    return Ok(Expr::assign(target, value));
  }

  Ok(node)
}

fn parse_or(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_and(stream)?;
  while stream.equal("||") {
    let rhs = parse_and(stream)?;
    node = logical(LogicalOp::Or, node, rhs);
  }
  Ok(node)
}

fn parse_and(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_equality(stream)?;
  while stream.equal("&&") {
    let rhs = parse_equality(stream)?;
    node = logical(LogicalOp::And, node, rhs);
  }
  Ok(node)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_relational(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("==") => CompareOp::Eq,
      Some("!=") => CompareOp::Ne,
      _ => break,
    };
    stream.advance();
    let rhs = parse_relational(stream)?;
    node = compare(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_add(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("<") => CompareOp::Lt,
      Some("<=") => CompareOp::Le,
      Some(">") => CompareOp::Gt,
      Some(">=") => CompareOp::Ge,
      _ => break,
    };
    stream.advance();
    let rhs = parse_add(stream)?;
    node = compare(op, node, rhs);
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_mul(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("+") => BinaryOp::Add,
      Some("-") => BinaryOp::Sub,
      _ => break,
    };
    stream.advance();
    let rhs = parse_mul(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<Expr> {
  let mut node = parse_unary(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("*") => BinaryOp::Mul,
      Some("/") => BinaryOp::Div,
      _ => break,
    };
    stream.advance();
    let rhs = parse_unary(stream)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<Expr> {
  if stream.equal("!") {
    let operand = parse_unary(stream)?;
    return Ok(Expr::Not(Box::new(operand)));
  }
  parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<Expr> {
  if stream.at("(") {
    if stream.starts_function() {
      return parse_function(stream).map(Expr::Function);
    }
    stream.advance();
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  if stream.equal("-") {
    return parse_constant(stream, true).map(Expr::Constant);
  }

  if stream.at_keyword("let") || stream.at_keyword("const") {
    return parse_decl(stream).map(Expr::Decl);
  }

  if matches!(stream.peek().map(|t| t.kind), Some(TokenKind::Ident)) {
    let (name, _) = stream.get_ident()?;

    if stream.equal(".") {
      let (function, _) = stream.get_ident()?;
      let args = parse_args(stream)?;
      return Ok(Expr::Call {
        module: Some(name),
        name: function,
        args,
      });
    }

    if stream.at("(") {
      let args = parse_args(stream)?;
      return Ok(Expr::Call {
        module: None,
        name,
        args,
      });
    }

    return Ok(Expr::Usage(name));
  }

  parse_constant(stream, false).map(Expr::Constant)
}

/// A literal, negated when it follows a unary minus. Integers are range
/// checked after negation so `-2147483648` is accepted.
fn parse_constant(stream: &mut TokenStream, negative: bool) -> CompileResult<Constant> {
  let (literal, loc) = stream.get_literal()?;
  match literal {
    Literal::Int(value) => {
      let value = if negative { -value } else { value };
      i32::try_from(value)
        .map(Constant::Int)
        .map_err(|_| CompileError::at(stream.source, loc, "integer literal does not fit in 32 bits"))
    }
    Literal::Float(value) => Ok(Constant::Float(if negative { -value } else { value })),
    _ if negative => Err(CompileError::at(stream.source, loc, "expected a number after '-'")),
    Literal::Char(value) => Ok(Constant::Char(value)),
    Literal::Str(value) => Ok(Constant::Str(value)),
  }
}

/// `let name[: type]` or `const name[: type]`
fn parse_decl(stream: &mut TokenStream) -> CompileResult<Decl> {
  let constant = if stream.equal_keyword("const") {
    true
  } else {
    stream.skip_keyword("let")?;
    false
  };
  let (name, _) = stream.get_ident()?;
  let ty = if stream.equal(":") {
    Some(parse_type(stream)?)
  } else {
    None
  };
  Ok(Decl { name, constant, ty })
}

fn parse_type(stream: &mut TokenStream) -> CompileResult<Type> {
  if stream.equal_keyword("int") {
    return Ok(Type::int());
  }
  if stream.equal_keyword("float") {
    return Ok(Type::float());
  }
  if stream.equal_keyword("char") {
    return Ok(Type::char());
  }
  if stream.equal_keyword("function") {
    return Ok(Type::function());
  }
  let got = describe_token(stream.peek(), stream.source);
  Err(stream.error_here(format!("expected a type, but got \"{got}\"")))
}

/// `(a, b: float) -> stmts done`
fn parse_function(stream: &mut TokenStream) -> CompileResult<FunctionDef> {
  stream.skip("(")?;
  let mut params = Vec::new();
  if !stream.equal(")") {
    loop {
      let (name, _) = stream.get_ident()?;
      let ty = if stream.equal(":") {
        parse_type(stream)?
      } else {
        Type::int()
      };
      params.push(Param { name, ty });
      if stream.equal(")") {
        break;
      }
      stream.skip(",")?;
    }
  }

  stream.skip("->")?;
  let body = parse_block_body(stream, BlockKind::Function)?;
  stream.skip_keyword("done")?;
  Ok(FunctionDef { params, body })
}

fn parse_args(stream: &mut TokenStream) -> CompileResult<Vec<Expr>> {
  stream.skip("(")?;
  let mut args = Vec::new();
  if stream.equal(")") {
    return Ok(args);
  }
  loop {
    args.push(parse_expr(stream)?);
    if stream.equal(")") {
      return Ok(args);
    }
    stream.skip(",")?;
  }
}

fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Expr {
  Expr::Compare {
    op,
    lhs: Box::new(lhs),
    rhs: Box::new(rhs),
  }
}

fn logical(op: LogicalOp, lhs: Expr, rhs: Expr) -> Expr {
  Expr::Logical {
    op,
    lhs: Box::new(lhs),
    rhs: Box::new(rhs),
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) {
    self.pos += 1;
  }

  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  fn peek_punctuator(&self) -> Option<&'a str> {
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, self.source))
  }

  fn at(&self, op: &str) -> bool {
    self.peek_punctuator() == Some(op)
  }

  fn at_keyword(&self, word: &str) -> bool {
    self
      .peek()
      .is_some_and(|token| token.kind == TokenKind::Keyword && token_text(token, self.source) == word)
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.at(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn equal_keyword(&mut self, word: &str) -> bool {
    if self.at_keyword(word) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      return Ok(());
    }
    let got = describe_token(self.peek(), self.source);
    Err(self.error_here(format!("expected \"{s}\", but got \"{got}\"")))
  }

  fn skip_keyword(&mut self, word: &str) -> CompileResult<()> {
    if self.equal_keyword(word) {
      return Ok(());
    }
    let got = describe_token(self.peek(), self.source);
    Err(self.error_here(format!("expected \"{word}\", but got \"{got}\"")))
  }

  /// Whether the `(` under the cursor opens a parameter list: its matching
  /// `)` must be followed by `->`.
  fn starts_function(&self) -> bool {
    let mut depth = 0usize;
    for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
      if token.kind != TokenKind::Punctuator {
        continue;
      }
      match token_text(token, self.source) {
        "(" => depth += 1,
        ")" => {
          depth -= 1;
          if depth == 0 {
            return self.tokens.get(self.pos + offset + 1).is_some_and(|next| {
              next.kind == TokenKind::Punctuator && token_text(next, self.source) == "->"
            });
          }
        }
        _ => {}
      }
    }
    false
  }

  /// Consume a literal token, returning its value and location.
  fn get_literal(&mut self) -> CompileResult<(Literal, usize)> {
    if let Some(token) = self.peek()
      && let Some(value) = token.value.clone()
    {
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    if self.is_eof() {
      return Err(self.error_here("expected an expression, but reached end of input"));
    }
    let got = describe_token(self.peek(), self.source);
    Err(self.error_here(format!("expected an expression, but got \"{got}\"")))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Ident
    {
      let ident = token_text(token, self.source).to_string();
      let loc = token.loc;
      self.pos += 1;
      return Ok((ident, loc));
    }

    let got = describe_token(self.peek(), self.source);
    Err(self.error_here(format!("expected an identifier, but got \"{got}\"")))
  }

  fn error_here(&self, message: impl Into<String>) -> CompileError {
    CompileError::at(self.source, self.loc(), message)
  }

  fn is_eof(&self) -> bool {
    self.peek().is_none_or(|token| token.kind == TokenKind::Eof)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize;

  fn parse_source(source: &str) -> CompileResult<File> {
    parse(tokenize(source)?, source)
  }

  fn single_expr(source: &str) -> Expr {
    let file = parse_source(source).unwrap();
    match file.stmts.into_iter().next() {
      Some(Stmt::Expr(expr)) => expr,
      other => panic!("expected an expression statement, got {other:?}"),
    }
  }

  #[test]
  fn empty_source_has_no_statements() {
    assert!(parse_source("").unwrap().stmts.is_empty());
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    let expr = single_expr("1 + 2 * 3;");
    assert_eq!(
      expr,
      Expr::binary(
        BinaryOp::Add,
        Expr::int(1),
        Expr::binary(BinaryOp::Mul, Expr::int(2), Expr::int(3))
      )
    );
  }

  #[test]
  fn typed_constant_declaration_with_value() {
    let expr = single_expr("const pi: float = 3.5;");
    let Expr::Assign { target, value } = expr else {
      panic!("expected assignment");
    };
    assert_eq!(
      target,
      Target::Decl(Decl {
        name: "pi".to_string(),
        constant: true,
        ty: Some(Type::float()),
      })
    );
    assert_eq!(*value, Expr::Constant(Constant::Float(3.5)));
  }

  #[test]
  fn function_literal_opens_function_block() {
    let expr = single_expr("let add = (a, b: float) -> return a; done;");
    let Expr::Assign { value, .. } = expr else {
      panic!("expected assignment");
    };
    let Expr::Function(def) = *value else {
      panic!("expected function literal");
    };
    assert_eq!(def.params.len(), 2);
    assert_eq!(def.params[0].ty, Type::int());
    assert_eq!(def.params[1].ty, Type::float());
    assert_eq!(def.body.kind, BlockKind::Function);
    assert!(matches!(def.body.stmts[0], Stmt::Expr(Expr::Return(_))));
  }

  #[test]
  fn parenthesised_expression_is_not_a_function() {
    let expr = single_expr("(a) * 2;");
    assert_eq!(
      expr,
      Expr::binary(BinaryOp::Mul, Expr::usage("a"), Expr::int(2))
    );
  }

  #[test]
  fn if_chain_arms_are_nested_blocks() {
    let file = parse_source("if (a) -> 1; else if (b) -> 2; else -> 3; done;").unwrap();
    let Stmt::If { arms, otherwise } = &file.stmts[0] else {
      panic!("expected if statement");
    };
    assert_eq!(arms.len(), 2);
    assert_eq!(arms[1].cond, Expr::usage("b"));
    let otherwise = otherwise.as_ref().unwrap();
    assert_eq!(otherwise.kind, BlockKind::Nested);
    assert_eq!(otherwise.stmts.len(), 1);
  }

  #[test]
  fn qualified_call_and_use() {
    let file = parse_source("use io; io.print(1, x);").unwrap();
    assert_eq!(file.stmts[0], Stmt::Use("io".to_string()));
    let Stmt::Expr(Expr::Call { module, name, args }) = &file.stmts[1] else {
      panic!("expected call");
    };
    assert_eq!(module.as_deref(), Some("io"));
    assert_eq!(name, "print");
    assert_eq!(args.len(), 2);
  }

  #[test]
  fn negative_literals() {
    assert_eq!(single_expr("-7;"), Expr::int(-7));
  }

  #[test]
  fn comparisons_and_booleans_build_nodes() {
    let expr = single_expr("!a && b < 2;");
    let Expr::Logical { op, lhs, rhs } = expr else {
      panic!("expected logical node");
    };
    assert_eq!(op, LogicalOp::And);
    assert!(matches!(*lhs, Expr::Not(_)));
    assert!(matches!(*rhs, Expr::Compare { op: CompareOp::Lt, .. }));
  }

  #[test]
  fn missing_semicolon_is_located() {
    let err = parse_source("let x = 1").unwrap_err();
    assert!(err.to_string().contains("expected \";\", but got \"EOF\""));
  }

  #[test]
  fn rejects_assignment_to_non_name() {
    let err = parse_source("1 = 2;").unwrap_err();
    assert!(err.to_string().contains("left side of assignment"));
  }

  #[test]
  fn unterminated_function_body() {
    let err = parse_source("let f = () -> 1;").unwrap_err();
    assert!(err.to_string().contains("unexpected end of input inside block"));
  }

  #[test]
  fn most_negative_int_literal_fits() {
    assert_eq!(single_expr("-2147483648;"), Expr::int(i32::MIN));
    let err = parse_source("-2147483649;").unwrap_err();
    assert!(err.to_string().contains("does not fit in 32 bits"));
    let err = parse_source("2147483648;").unwrap_err();
    assert!(err.to_string().contains("does not fit in 32 bits"));
  }

  #[test]
  fn minus_before_a_string_is_rejected() {
    let err = parse_source("-\"s\";").unwrap_err();
    assert!(err.to_string().contains("expected a number after '-'"));
  }

  #[test]
  fn oversized_integer_literal() {
    let err = parse_source("4294967296;").unwrap_err();
    assert!(err.to_string().contains("does not fit in 32 bits"));
  }
}
