//! Per-compilation state.
//!
//! One `Context` is created for each compilation run and threaded through
//! the walk by `&mut`. Nothing in it is shared between runs.

use crate::module_map::ModuleMap;
use crate::names::{RegisterCounter, UniqueNames};
use crate::scope::ScopeTable;

/// Module-level binding holding the effective module name.
pub const MODULE_NAME_KEY: &str = "__module_name";

#[derive(Debug)]
pub struct Context {
  pub scopes: ScopeTable,
  pub names: UniqueNames,
  pub registers: RegisterCounter,
  pub modules: ModuleMap,
}

impl Context {
  /// Fresh state with the register reset wired as the single push hook.
  pub fn new() -> Self {
    let registers = RegisterCounter::new();
    let mut scopes = ScopeTable::new();
    let hook = registers.clone();
    scopes.register_push_hook(move || hook.reset());

    Self {
      scopes,
      names: UniqueNames::new(),
      registers,
      modules: ModuleMap::new(),
    }
  }

  pub fn module_name(&self) -> &str {
    self.scopes.global(MODULE_NAME_KEY).unwrap_or_default()
  }

  pub fn set_module_name(&mut self, name: impl Into<String>) {
    self.scopes.add_global(MODULE_NAME_KEY, name);
  }

  /// Record a `use` of another module. The key cannot clash with an
  /// identifier because identifiers never contain a dot.
  pub fn use_module(&mut self, name: &str) {
    self.scopes.add_global(format!("use.{name}"), name);
  }

  pub fn is_used(&self, name: &str) -> bool {
    self.scopes.global(&format!("use.{name}")).is_some()
  }

  /// `@<module>.<name>`
  pub fn qualified(&self, name: &str) -> String {
    format!("@{}.{name}", self.module_name())
  }
}

impl Default for Context {
  fn default() -> Self {
    Self::new()
  }
}
