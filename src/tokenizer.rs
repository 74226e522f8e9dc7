//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer knows nothing about semantics beyond recognising literals,
//! keywords and operators. Multi-character punctuators are matched before
//! single-character ones to avoid ambiguity.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Keyword,
  Ident,
  Num,
  Float,
  Char,
  Str,
  Eof,
}

/// Decoded literal payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
  Int(i64),
  Float(f64),
  Char(u8),
  Str(String),
}

#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<Literal>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<Literal>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

pub const KEYWORDS: [&str; 11] = [
  "if", "else", "done", "return", "const", "let", "int", "float", "char", "function", "use",
];

const LONG_PUNCTUATORS: [&str; 7] = ["->", "==", "!=", "<=", ">=", "&&", "||"];

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if input[i..].starts_with("//") {
      while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
      }
      continue;
    }

    if input[i..].starts_with("/*") {
      let Some(end) = input[i + 2..].find("*/") else {
        return Err(CompileError::at(input, i, "unterminated block comment"));
      };
      i += end + 4;
      continue;
    }

    if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
      let (token, next) = read_number(input, i)?;
      tokens.push(token);
      i = next;
      continue;
    }

    if c == b'\'' {
      if bytes.get(i + 2) != Some(&b'\'') || !bytes.get(i + 1).is_some_and(u8::is_ascii) {
        return Err(CompileError::at(input, i, "invalid character literal"));
      }
      let value = Literal::Char(bytes[i + 1]);
      tokens.push(Token::new(TokenKind::Char, i, 3, Some(value)));
      i += 3;
      continue;
    }

    if c == b'"' {
      let Some(end) = input[i + 1..].find('"') else {
        return Err(CompileError::at(input, i, "unterminated string literal"));
      };
      let text = input[i + 1..i + 1 + end].to_string();
      tokens.push(Token::new(
        TokenKind::Str,
        i,
        end + 2,
        Some(Literal::Str(text)),
      ));
      i += end + 2;
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let kind = if KEYWORDS.contains(&&input[start..i]) {
        TokenKind::Keyword
      } else {
        TokenKind::Ident
      };
      tokens.push(Token::new(kind, start, i - start, None));
      continue;
    }

    if let Some(op) = LONG_PUNCTUATORS
      .into_iter()
      .find(|op| input[i..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len(), None));
      i += op.len();
      continue;
    }

    if matches!(
      c,
      b'+'
        | b'-'
        | b'*'
        | b'/'
        | b'('
        | b')'
        | b':'
        | b','
        | b';'
        | b'='
        | b'<'
        | b'>'
        | b'!'
        | b'.'
    ) {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1, None));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::at(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  Ok(tokens)
}

/// Scan an integer (decimal, `0x` hex, leading-zero octal) or float literal.
fn read_number(input: &str, start: usize) -> CompileResult<(Token, usize)> {
  let bytes = input.as_bytes();
  let mut i = start;

  if input[start..].starts_with("0x") || input[start..].starts_with("0X") {
    i += 2;
    while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
      i += 1;
    }
    let value = i64::from_str_radix(&input[start + 2..i], 16)
      .map_err(|err| CompileError::at(input, start, format!("invalid number: {err}")))?;
    let token = Token::new(TokenKind::Num, start, i - start, Some(Literal::Int(value)));
    return Ok((token, i));
  }

  while i < bytes.len() && bytes[i].is_ascii_digit() {
    i += 1;
  }

  if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
      i += 1;
    }
    let text = &input[start..i];
    let value = text
      .parse::<f64>()
      .map_err(|err| CompileError::at(input, start, format!("invalid number: {err}")))?;
    let token = Token::new(TokenKind::Float, start, i - start, Some(Literal::Float(value)));
    return Ok((token, i));
  }

  let text = &input[start..i];
  let radix = if text.len() > 1 && text.starts_with('0') {
    8
  } else {
    10
  };
  let value = i64::from_str_radix(text, radix)
    .map_err(|err| CompileError::at(input, start, format!("invalid number: {err}")))?;
  let token = Token::new(TokenKind::Num, start, i - start, Some(Literal::Int(value)));
  Ok((token, i))
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}
