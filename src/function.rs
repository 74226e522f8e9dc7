//! Function emission.
//!
//! A function literal is compiled into detached buffers and then hoisted:
//! its header, body, default return and closing brace are prepended to the
//! module buffer, so every definition lands above the code that calls it.
//! The most recently finished function ends up closest to the top. A
//! function defined inside another one is held back until its enclosing
//! function is finished and is then hoisted directly above it.

use snafu::ensure;

use crate::ast::{FunctionDef, Param};
use crate::blocks::{self, BlockKind};
use crate::buffer::EmissionBuffer;
use crate::codegen::{Compiler, Value};
use crate::error::{CompileResult, RedefinedSnafu};
use crate::module_map::Signature;
use crate::scope::Symbol;
use crate::ty::Type;

impl Compiler {
  /// Emit `def` under `name`, or under a fresh unique name when anonymous.
  /// The enclosing function's register numbering is restored afterwards.
  pub(crate) fn compile_function(
    &mut self,
    def: &FunctionDef,
    name: Option<&str>,
  ) -> CompileResult<Value> {
    let name = match name {
      Some(name) => name.to_string(),
      None => self.ctx.names.fresh(),
    };

    let saved = self.ctx.registers.current();
    self.hoisting.push(EmissionBuffer::new());
    blocks::enter(&mut self.ctx.scopes, BlockKind::Function);
    let emitted = self.emit_function(def, &name);
    blocks::exit(&mut self.ctx.scopes, BlockKind::Function);
    self.ctx.registers.restore(saved);
    let mut definitions = self.hoisting.pop().unwrap_or_default();

    let (value, definition) = emitted?;
    if !definitions.is_empty() {
      tracing::trace!(
        function = %value.operand,
        lines = definitions.len(),
        "hoisting nested definitions"
      );
    }
    definitions.splice(definition);
    self.hoist(definitions);
    Ok(value)
  }

  /// Place finished definitions above everything emitted so far, either in
  /// the enclosing function's pending list or in the module itself.
  fn hoist(&mut self, definitions: EmissionBuffer) {
    let target = self.hoisting.last_mut().unwrap_or(&mut self.module);
    for line in definitions.into_lines().into_iter().rev() {
      target.prepend(line);
    }
  }

  fn emit_function(
    &mut self,
    def: &FunctionDef,
    name: &str,
  ) -> CompileResult<(Value, EmissionBuffer)> {
    let mut params = EmissionBuffer::new();
    for (ordinal, param) in def.params.iter().enumerate() {
      self.compile_param(param, ordinal, &mut params)?;
    }

    // Registered before the body so the function can call itself.
    let signature = Signature::new(def.params.iter().map(|param| param.ty.clone()).collect());
    self.ctx.modules.register(name, signature);

    let mut body = EmissionBuffer::new();
    for stmt in &def.body.stmts {
      self.compile_stmt(stmt, &mut body)?;
    }

    let qualified = self.ctx.qualified(name);
    let param_list = params.lines().collect::<Vec<_>>().join(", ");
    let mut definition = EmissionBuffer::new();
    definition.append(format!("define fastcc i32 {qualified}({param_list}) {{"));
    definition.splice(body);
    definition.instr("ret i32 0");
    definition.append("}");

    tracing::debug!(function = %qualified, arity = def.params.len(), "hoisted function");
    Ok((Value::new(qualified, Type::function()), definition))
  }

  /// Bind a parameter to `%arg<ordinal>` in the current function scope.
  fn compile_param(
    &mut self,
    param: &Param,
    ordinal: usize,
    out: &mut EmissionBuffer,
  ) -> CompileResult<()> {
    ensure!(
      self.ctx.scopes.resolve(&param.name, true).is_none(),
      RedefinedSnafu { name: &param.name }
    );
    let register = format!("%arg{ordinal}");
    out.append(format!("{} {register}", param.ty));
    self
      .ctx
      .scopes
      .declare(param.name.clone(), Symbol::parameter(register, param.ty.clone()));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::CompileOptions;
  use crate::ast::{BinaryOp, Block, Decl, Expr, File, FunctionDef, Param, Stmt, Target};
  use crate::blocks::BlockKind;
  use crate::codegen::{CompileOutput, Compiler};
  use crate::error::{CompileError, CompileResult};
  use crate::module_map::Signature;
  use crate::ty::Type;

  fn int_param(name: &str) -> Param {
    Param {
      name: name.to_string(),
      ty: Type::int(),
    }
  }

  fn function(params: Vec<Param>, stmts: Vec<Stmt>) -> Expr {
    Expr::Function(FunctionDef {
      params,
      body: Block {
        kind: BlockKind::Function,
        stmts,
      },
    })
  }

  fn define(name: &str, def: Expr) -> Stmt {
    let target = Target::Decl(Decl {
      name: name.to_string(),
      constant: false,
      ty: None,
    });
    Stmt::Expr(Expr::assign(target, def))
  }

  fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
      module: None,
      name: name.to_string(),
      args,
    }
  }

  fn compile(stmts: Vec<Stmt>) -> CompileResult<CompileOutput> {
    Compiler::new(&CompileOptions::default()).compile_file(&File { name: None, stmts })
  }

  fn position(output: &CompileOutput, needle: &str) -> usize {
    output
      .lines
      .iter()
      .position(|line| line.contains(needle))
      .unwrap_or_else(|| panic!("no line containing {needle:?} in {:#?}", output.lines))
  }

  #[test]
  fn definition_is_hoisted_above_entry_point() {
    let body = vec![Stmt::Expr(Expr::Return(Box::new(Expr::binary(
      BinaryOp::Add,
      Expr::usage("a"),
      Expr::int(1),
    ))))];
    let output = compile(vec![
      Stmt::Expr(Expr::assign(
        Target::Decl(Decl {
          name: "before".to_string(),
          constant: false,
          ty: None,
        }),
        Expr::int(3),
      )),
      define("inc", function(vec![int_param("a")], body)),
      Stmt::Expr(call("inc", vec![Expr::int(5)])),
    ])
    .unwrap();

    assert_eq!(
      &output.lines[..4],
      &[
        "define fastcc i32 @main.inc(i32 %arg0) {",
        "  %1 = add i32 %arg0, 1",
        "  ret i32 %1",
        "  ret i32 0",
      ]
    );
    assert_eq!(output.lines[4], "}");
    assert!(position(&output, "define i32 @main()") > 4);
    assert!(position(&output, "call i32 @main.inc(i32 5)") > position(&output, "define i32 @main()"));
    assert_eq!(
      output.module_map.resolve("inc"),
      Some(&[Signature::new(vec![Type::int()])][..])
    );
  }

  #[test]
  fn registers_restart_in_each_function_and_resume_outside() {
    let body = |value| {
      vec![Stmt::Expr(Expr::binary(
        BinaryOp::Mul,
        Expr::int(value),
        Expr::int(2),
      ))]
    };
    let output = compile(vec![
      Stmt::Expr(Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(1))),
      define("f", function(Vec::new(), body(3))),
      define("g", function(Vec::new(), body(4))),
      Stmt::Expr(Expr::binary(BinaryOp::Sub, Expr::int(9), Expr::int(1))),
    ])
    .unwrap();

    assert!(output.lines.contains(&"  %1 = mul i32 3, 2".to_string()));
    assert!(output.lines.contains(&"  %1 = mul i32 4, 2".to_string()));
    assert!(output.lines.contains(&"  %1 = add i32 1, 1".to_string()));
    assert!(output.lines.contains(&"  %2 = sub i32 9, 1".to_string()));
  }

  #[test]
  fn latest_definition_is_closest_to_the_top() {
    let output = compile(vec![
      define("first", function(Vec::new(), Vec::new())),
      define("second", function(Vec::new(), Vec::new())),
    ])
    .unwrap();
    assert!(position(&output, "@main.second(") < position(&output, "@main.first("));
  }

  #[test]
  fn anonymous_function_gets_unique_name() {
    let output = compile(vec![Stmt::Expr(function(Vec::new(), Vec::new()))]).unwrap();
    assert_eq!(output.lines[0], "define fastcc i32 @main.u0() {");
    assert!(output.module_map.resolve("u0").is_some());
  }

  #[test]
  fn recursive_call_resolves_inside_body() {
    let body = vec![Stmt::Expr(Expr::Return(Box::new(call(
      "loop",
      vec![Expr::usage("n")],
    ))))];
    let output = compile(vec![define("loop", function(vec![int_param("n")], body))]).unwrap();
    assert_eq!(output.lines[1], "  %1 = call i32 @main.loop(i32 %arg0)");
  }

  #[test]
  fn parameters_are_function_local() {
    let output = compile(vec![
      define("f", function(vec![int_param("a")], Vec::new())),
      Stmt::Expr(Expr::usage("a")),
    ]);
    assert!(matches!(output, Err(CompileError::NotDefined { ref name }) if name == "a"));
  }

  #[test]
  fn duplicate_parameter_names_are_rejected() {
    let output = compile(vec![define(
      "f",
      function(vec![int_param("a"), int_param("a")], Vec::new()),
    )]);
    assert!(matches!(output, Err(CompileError::Redefined { ref name }) if name == "a"));
  }

  #[test]
  fn parameters_cannot_be_reassigned() {
    let body = vec![Stmt::Expr(Expr::assign(
      Target::Usage("a".to_string()),
      Expr::int(1),
    ))];
    let output = compile(vec![define("f", function(vec![int_param("a")], body))]);
    assert!(matches!(output, Err(CompileError::RedefiningConstant { .. })));
  }

  #[test]
  fn call_with_wrong_argument_types_is_rejected() {
    let output = compile(vec![
      define("f", function(vec![int_param("a")], Vec::new())),
      Stmt::Expr(call("f", vec![Expr::int(1), Expr::int(2)])),
    ]);
    assert!(matches!(
      output,
      Err(CompileError::TypeMismatch { ref expected, ref found }) if expected == "(i32)" && found == "(i32, i32)"
    ));
  }

  #[test]
  fn call_to_unknown_function_is_rejected() {
    let output = compile(vec![Stmt::Expr(call("foo", vec![Expr::int(5)]))]);
    assert!(matches!(output, Err(CompileError::NotDefined { ref name }) if name == "foo"));
  }

  #[test]
  fn nested_function_is_hoisted_to_module_level() {
    let inner = define("inner", function(Vec::new(), Vec::new()));
    let output = compile(vec![define(
      "outer",
      function(Vec::new(), vec![inner, Stmt::Expr(call("inner", Vec::new()))]),
    )])
    .unwrap();

    let outer = position(&output, "define fastcc i32 @main.outer()");
    let inner = position(&output, "define fastcc i32 @main.inner()");
    assert_eq!(inner, 0);
    assert_eq!(outer, 3, "inner sits directly above its caller");
    assert_eq!(output.lines[outer + 1], "  %1 = call i32 @main.inner()");
    assert_eq!(output.lines[outer + 2], "  ret i32 0");
  }

  #[test]
  fn nested_definitions_stay_above_every_caller() {
    let leaf = define(
      "leaf",
      function(Vec::new(), vec![Stmt::Expr(Expr::Return(Box::new(Expr::int(7))))]),
    );
    let middle = define(
      "middle",
      function(
        Vec::new(),
        vec![leaf, Stmt::Expr(Expr::Return(Box::new(call("leaf", Vec::new()))))],
      ),
    );
    let output = compile(vec![
      define("before", function(Vec::new(), Vec::new())),
      define(
        "outer",
        function(
          Vec::new(),
          vec![middle, Stmt::Expr(Expr::Return(Box::new(call("middle", Vec::new()))))],
        ),
      ),
      Stmt::Expr(call("outer", Vec::new())),
    ])
    .unwrap();

    let leaf = position(&output, "define fastcc i32 @main.leaf()");
    let middle = position(&output, "define fastcc i32 @main.middle()");
    let outer = position(&output, "define fastcc i32 @main.outer()");
    let before = position(&output, "define fastcc i32 @main.before()");
    let entry = position(&output, "define i32 @main()");
    assert!(leaf < middle && middle < outer && outer < before && before < entry);
    assert!(position(&output, "call i32 @main.leaf()") > leaf);
    assert!(position(&output, "call i32 @main.middle()") > middle);
  }

  #[test]
  fn failed_nested_function_leaves_no_pending_definitions() {
    let broken = define(
      "inner",
      function(Vec::new(), vec![Stmt::Expr(Expr::usage("ghost"))]),
    );
    let mut compiler = Compiler::new(&CompileOptions::default());
    let file = File {
      name: None,
      stmts: vec![define("outer", function(Vec::new(), vec![broken]))],
    };
    let mut scratch = crate::buffer::EmissionBuffer::new();
    assert!(compiler.compile_stmt(&file.stmts[0], &mut scratch).is_err());
    assert!(compiler.hoisting.is_empty());
  }
}
