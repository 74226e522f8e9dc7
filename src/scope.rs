//! Lexical scope table.
//!
//! Scopes form a stack with the innermost scope on top. Resolution walks the
//! stack from the top so inner declarations shadow outer ones. Redefinition
//! checks use the current-scope-only lookup and are the caller's job; the
//! table itself never rejects an insert.
//!
//! Push hooks run every time a function-level scope is pushed. They are
//! registered once per table and never removed.

use std::collections::HashMap;
use std::fmt;

use crate::ty::Type;

/// A declared name.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
  /// Storage slot for locals, bound register for parameters.
  pub location: String,
  pub ty: Type,
  pub constant: bool,
  pub parameter: bool,
}

impl Symbol {
  pub fn local(location: impl Into<String>, ty: Type, constant: bool) -> Self {
    Self {
      location: location.into(),
      ty,
      constant,
      parameter: false,
    }
  }

  pub fn parameter(location: impl Into<String>, ty: Type) -> Self {
    Self {
      location: location.into(),
      ty,
      constant: false,
      parameter: true,
    }
  }
}

#[derive(Debug, Default)]
struct Scope {
  symbols: HashMap<String, Symbol>,
}

type PushHook = Box<dyn FnMut()>;

pub struct ScopeTable {
  scopes: Vec<Scope>,
  globals: HashMap<String, String>,
  push_hooks: Vec<PushHook>,
}

impl ScopeTable {
  /// A table holding only the root scope.
  pub fn new() -> Self {
    Self {
      scopes: vec![Scope::default()],
      globals: HashMap::new(),
      push_hooks: Vec::new(),
    }
  }

  /// Push a function-level scope and run every push hook in registration order.
  pub fn push_scope(&mut self) {
    self.scopes.push(Scope::default());
    tracing::trace!(depth = self.depth(), "push scope");
    for hook in &mut self.push_hooks {
      hook();
    }
  }

  /// Push a nested block scope. Hooks do not run.
  pub fn push_block_scope(&mut self) {
    self.scopes.push(Scope::default());
    tracing::trace!(depth = self.depth(), "push block scope");
  }

  /// Discard the innermost scope. The root scope is never popped.
  pub fn pop_scope(&mut self) {
    if self.scopes.len() > 1 {
      self.scopes.pop();
    }
    tracing::trace!(depth = self.depth(), "pop scope");
  }

  /// Insert into the innermost scope, replacing any previous entry there.
  pub fn declare(&mut self, name: impl Into<String>, symbol: Symbol) {
    if let Some(scope) = self.scopes.last_mut() {
      scope.symbols.insert(name.into(), symbol);
    }
  }

  pub fn resolve(&self, name: &str, current_only: bool) -> Option<&Symbol> {
    if current_only {
      return self.scopes.last().and_then(|scope| scope.symbols.get(name));
    }
    self
      .scopes
      .iter()
      .rev()
      .find_map(|scope| scope.symbols.get(name))
  }

  pub fn register_push_hook(&mut self, hook: impl FnMut() + 'static) {
    self.push_hooks.push(Box::new(hook));
  }

  /// Module-level bindings such as the enclosing module name or used modules.
  pub fn add_global(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.globals.insert(name.into(), value.into());
  }

  pub fn global(&self, name: &str) -> Option<&str> {
    self.globals.get(name).map(String::as_str)
  }

  /// Number of live scopes, the root included.
  pub fn depth(&self) -> usize {
    self.scopes.len()
  }
}

impl Default for ScopeTable {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for ScopeTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScopeTable")
      .field("scopes", &self.scopes)
      .field("globals", &self.globals)
      .field("push_hooks", &self.push_hooks.len())
      .finish()
  }
}
