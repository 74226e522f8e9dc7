//! Unique symbol names and per-function virtual registers.

use std::cell::Cell;
use std::rc::Rc;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Deterministic generator of collision-free names: a counter rendered in
/// base 36 behind a fixed prefix.
#[derive(Debug, Default)]
pub struct UniqueNames {
  next: u64,
}

impl UniqueNames {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fresh(&mut self) -> String {
    let name = format!("u{}", base36(self.next));
    self.next += 1;
    name
  }
}

fn base36(mut value: u64) -> String {
  if value == 0 {
    return "0".to_string();
  }
  let mut digits = Vec::new();
  while value > 0 {
    digits.push(DIGITS[(value % 36) as usize]);
    value /= 36;
  }
  digits.reverse();
  String::from_utf8_lossy(&digits).into_owned()
}

/// Virtual register numbering for the function currently being emitted.
///
/// Clones share the same counter, so a clone handed to a scope push hook
/// resets the numbering seen by the compiler.
#[derive(Debug, Clone)]
pub struct RegisterCounter {
  next: Rc<Cell<u32>>,
}

impl RegisterCounter {
  pub fn new() -> Self {
    Self {
      next: Rc::new(Cell::new(1)),
    }
  }

  /// Allocate the next register, e.g. `%3`.
  pub fn fresh(&self) -> String {
    let reg = self.next.get();
    self.next.set(reg + 1);
    format!("%{reg}")
  }

  pub fn reset(&self) {
    tracing::trace!(from = self.next.get(), "reset registers");
    self.next.set(1);
  }

  /// The number the next register will get.
  pub fn current(&self) -> u32 {
    self.next.get()
  }

  pub fn restore(&self, next: u32) {
    self.next.set(next);
  }
}

impl Default for RegisterCounter {
  fn default() -> Self {
    Self::new()
  }
}
