//! Block-entry and block-exit events.
//!
//! The parser tags every `->` it reduces with the kind of block it opens. The
//! code generator replays those events here when it walks into and out of the
//! block, so scope changes happen in the same order the grammar produced
//! them: a function scope is live before its parameters are declared and is
//! torn down once the whole definition has been emitted.

use serde::Serialize;

use crate::scope::ScopeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
  /// Body of a function literal. Entering it restarts register numbering.
  Function,
  /// An `if`/`else` arm. Shadows names but shares the enclosing registers.
  Nested,
}

pub fn enter(scopes: &mut ScopeTable, kind: BlockKind) {
  match kind {
    BlockKind::Function => scopes.push_scope(),
    BlockKind::Nested => scopes.push_block_scope(),
  }
}

pub fn exit(scopes: &mut ScopeTable, kind: BlockKind) {
  tracing::trace!(?kind, "leave block");
  scopes.pop_scope();
}
