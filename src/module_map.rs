//! Function name to signature registry.
//!
//! Every emitted function records its parameter types here. Call sites
//! resolve against it, and the finished map is the one piece of state handed
//! back to the driver so it can check calls across files.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ty::Type;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
  pub params: Vec<Type>,
}

impl Signature {
  pub fn new(params: Vec<Type>) -> Self {
    Self { params }
  }

  pub fn accepts(&self, args: &[Type]) -> bool {
    self.params.as_slice() == args
  }

  /// Parenthesised parameter list used in diagnostics, e.g. `(i32, double)`.
  pub fn describe(&self) -> String {
    describe_types(&self.params)
  }
}

pub fn describe_types(types: &[Type]) -> String {
  let list = types
    .iter()
    .map(Type::to_string)
    .collect::<Vec<_>>()
    .join(", ");
  format!("({list})")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModuleMap {
  functions: BTreeMap<String, Vec<Signature>>,
}

impl ModuleMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a signature; repeated names accumulate overloads.
  pub fn register(&mut self, name: impl Into<String>, signature: Signature) {
    self
      .functions
      .entry(name.into())
      .or_default()
      .push(signature);
  }

  pub fn resolve(&self, name: &str) -> Option<&[Signature]> {
    self.functions.get(name).map(Vec::as_slice)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[Signature])> {
    self
      .functions
      .iter()
      .map(|(name, sigs)| (name.as_str(), sigs.as_slice()))
  }

  pub fn len(&self) -> usize {
    self.functions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.functions.is_empty()
  }
}
