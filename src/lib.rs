//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the file's syntax tree.
//! - `codegen` and `function` walk the tree and emit LLVM-style textual IR,
//!   using the scope table, name allocators and module map held in `context`.
//! - `error` centralises the diagnostics shared by the other modules.

pub mod ast;
pub mod blocks;
pub mod buffer;
pub mod codegen;
pub mod context;
pub mod error;
pub mod module_map;
pub mod names;
pub mod parser;
pub mod scope;
pub mod tokenizer;
pub mod ty;

mod function;

pub use codegen::{CompileOutput, Compiler, Value};
pub use error::{CompileError, CompileResult};
pub use module_map::{ModuleMap, Signature};

/// Module whose top-level statements are wrapped in the process entry point.
pub const DEFAULT_ENTRY_MODULE: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
  /// Module name used when the file does not name itself.
  pub module_name: Option<String>,
  pub entry_module: String,
}

impl Default for CompileOptions {
  fn default() -> Self {
    Self {
      module_name: None,
      entry_module: DEFAULT_ENTRY_MODULE.to_string(),
    }
  }
}

/// Tokenize and parse a source string.
pub fn parse_source(source: &str) -> CompileResult<ast::File> {
  let tokens = tokenizer::tokenize(source)?;
  parser::parse(tokens, source)
}

/// Compile an already-parsed file with a fresh compilation context.
pub fn compile_file(file: &ast::File, options: &CompileOptions) -> CompileResult<CompileOutput> {
  Compiler::new(options).compile_file(file)
}

/// Compile a source string into IR.
pub fn compile_source(source: &str, options: &CompileOptions) -> CompileResult<CompileOutput> {
  let file = parse_source(source)?;
  compile_file(&file, options)
}
