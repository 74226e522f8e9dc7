//! Code generation: lower the syntax tree into LLVM-style textual IR.
//!
//! The walk is depth-first and single pass. Every expression compiles to a
//! `Value` (an operand plus its type) and appends its instructions to the
//! buffer it is given. Locals live in `alloca` slots named by the unique name
//! generator; intermediate results take numbered registers that restart at
//! `%1` in every function. Function bodies are hoisted to the top of the
//! module buffer by `function.rs`.

use snafu::{OptionExt, ensure};

use crate::CompileOptions;
use crate::ast::{
  BinaryOp, Block, Constant, Decl, Expr, File, FunctionDef, IfArm, Stmt, Target,
};
use crate::blocks;
use crate::buffer::EmissionBuffer;
use crate::context::Context;
use crate::error::{
  CompileResult, InvalidTypeSnafu, NotDefinedSnafu, RedefinedSnafu, RedefiningConstantSnafu,
  TypeMismatchSnafu, UnsupportedSnafu,
};
use crate::module_map::{ModuleMap, describe_types};
use crate::scope::Symbol;
use crate::ty::{Type, TypeKind};

/// Symbol of the process entry point wrapping an entry module's statements.
pub const ENTRY_SYMBOL: &str = "main";

/// A compiled operand: register, immediate literal, or global name.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
  pub operand: String,
  pub ty: Type,
}

impl Value {
  pub fn new(operand: impl Into<String>, ty: Type) -> Self {
    Self {
      operand: operand.into(),
      ty,
    }
  }
}

/// Finished IR plus the signatures of every function it defines.
#[derive(Debug, Clone)]
pub struct CompileOutput {
  pub lines: Vec<String>,
  pub module_map: ModuleMap,
}

impl CompileOutput {
  pub fn ir(&self) -> String {
    let mut text = self.lines.join("\n");
    text.push('\n');
    text
  }
}

pub struct Compiler {
  pub(crate) ctx: Context,
  pub(crate) module: EmissionBuffer,
  /// One entry per function being emitted, holding the finished
  /// definitions nested inside it until it is hoisted itself.
  pub(crate) hoisting: Vec<EmissionBuffer>,
  default_module: Option<String>,
  entry_module: String,
}

impl Compiler {
  pub fn new(options: &CompileOptions) -> Self {
    Self {
      ctx: Context::new(),
      module: EmissionBuffer::new(),
      hoisting: Vec::new(),
      default_module: options.module_name.clone(),
      entry_module: options.entry_module.clone(),
    }
  }

  /// Compile a whole file. An entry module has its top-level statements
  /// wrapped in `@main`, scoped like a function body.
  pub fn compile_file(mut self, file: &File) -> CompileResult<CompileOutput> {
    let module_name = file
      .name
      .clone()
      .or_else(|| self.default_module.clone())
      .unwrap_or_else(|| self.entry_module.clone());
    self.ctx.set_module_name(&module_name);
    tracing::debug!(module = %module_name, statements = file.stmts.len(), "compile module");

    let is_entry = module_name == self.entry_module;
    if is_entry {
      self.ctx.scopes.push_scope();
    }

    let mut body = EmissionBuffer::new();
    for stmt in &file.stmts {
      self.compile_stmt(stmt, &mut body)?;
    }

    if is_entry {
      self.ctx.scopes.pop_scope();
      self.module.append(format!("define i32 @{ENTRY_SYMBOL}() {{"));
      self.module.splice(body);
      self.module.instr("ret i32 0");
      self.module.append("}");
      tracing::debug!(module = %module_name, "wrapped top level in entry point");
    } else {
      self.module.splice(body);
    }

    Ok(CompileOutput {
      lines: self.module.into_lines(),
      module_map: self.ctx.modules,
    })
  }

  pub(crate) fn compile_stmt(&mut self, stmt: &Stmt, out: &mut EmissionBuffer) -> CompileResult<()> {
    match stmt {
      Stmt::Expr(expr) => self.compile_expr(expr, out).map(|_| ()),
      Stmt::Use(name) => {
        self.ctx.use_module(name);
        Ok(())
      }
      Stmt::If { arms, otherwise } => self.compile_if(arms, otherwise.as_ref(), out),
    }
  }

  pub(crate) fn compile_expr(&mut self, expr: &Expr, out: &mut EmissionBuffer) -> CompileResult<Value> {
    match expr {
      Expr::Constant(constant) => Ok(constant_value(constant)),
      Expr::Binary { op, lhs, rhs } => self.compile_binary(*op, lhs, rhs, out),
      Expr::Compare { .. } => UnsupportedSnafu {
        construct: "comparison",
      }
      .fail(),
      Expr::Logical { .. } => UnsupportedSnafu {
        construct: "boolean operator",
      }
      .fail(),
      Expr::Not(_) => UnsupportedSnafu {
        construct: "boolean not",
      }
      .fail(),
      Expr::Decl(decl) => self.compile_decl(decl, None, out),
      Expr::Usage(name) => self.compile_usage(name, out),
      Expr::Assign { target, value } => self.compile_assign(target, value, out),
      Expr::Return(value) => {
        let value = self.compile_expr(value, out)?;
        out.instr(format!("ret {} {}", value.ty, value.operand));
        Ok(value)
      }
      Expr::Function(def) => self.compile_function(def, None),
      Expr::Call { module, name, args } => self.compile_call(module.as_deref(), name, args, out),
    }
  }

  fn compile_binary(
    &mut self,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    out: &mut EmissionBuffer,
  ) -> CompileResult<Value> {
    let lhs = self.compile_expr(lhs, out)?;
    let rhs = self.compile_expr(rhs, out)?;
    ensure!(
      lhs.ty == rhs.ty,
      TypeMismatchSnafu {
        expected: lhs.ty.to_string(),
        found: rhs.ty.to_string(),
      }
    );

    let opcode = arithmetic_opcode(op, &lhs.ty)?;
    let reg = self.ctx.registers.fresh();
    out.instr(format!(
      "{reg} = {opcode} {} {}, {}",
      lhs.ty, lhs.operand, rhs.operand
    ));
    Ok(Value::new(reg, lhs.ty))
  }

  /// Allocate a slot for a declaration. `inferred` is the type of the value
  /// being assigned, if any; without it or an annotation the slot is `i32`.
  fn compile_decl(
    &mut self,
    decl: &Decl,
    inferred: Option<&Type>,
    out: &mut EmissionBuffer,
  ) -> CompileResult<Value> {
    ensure!(
      self.ctx.scopes.resolve(&decl.name, true).is_none(),
      RedefinedSnafu { name: &decl.name }
    );

    let ty = match (&decl.ty, inferred) {
      (Some(declared), Some(inferred)) => {
        ensure!(
          declared == inferred,
          TypeMismatchSnafu {
            expected: declared.to_string(),
            found: inferred.to_string(),
          }
        );
        declared.clone()
      }
      (Some(declared), None) => declared.clone(),
      (None, Some(inferred)) => inferred.clone(),
      (None, None) => Type::int(),
    };

    let location = format!("%{}", self.ctx.names.fresh());
    out.instr(format!("{location} = alloca {ty}"));
    self.ctx.scopes.declare(
      decl.name.clone(),
      Symbol::local(location.clone(), ty.clone(), decl.constant),
    );
    Ok(Value::new(location, ty))
  }

  fn compile_usage(&mut self, name: &str, out: &mut EmissionBuffer) -> CompileResult<Value> {
    let symbol = self
      .ctx
      .scopes
      .resolve(name, false)
      .context(NotDefinedSnafu { name })?;
    // Parameters and functions are already values; only slots need a load.
    if symbol.parameter || symbol.ty.kind == TypeKind::Function {
      return Ok(Value::new(symbol.location.clone(), symbol.ty.clone()));
    }

    let slot = Value::new(symbol.location.clone(), symbol.ty.clone());
    let reg = self.ctx.registers.fresh();
    out.instr(format!(
      "{reg} = load {ty}, {ty}* {}",
      slot.operand,
      ty = slot.ty
    ));
    Ok(Value::new(reg, slot.ty))
  }

  fn compile_assign(
    &mut self,
    target: &Target,
    value: &Expr,
    out: &mut EmissionBuffer,
  ) -> CompileResult<Value> {
    if let Expr::Function(def) = value {
      return self.bind_function(target, def);
    }

    match target {
      Target::Decl(decl) => {
        // The value is compiled first so its type is known, but the slot's
        // alloca has to precede it in the output.
        let mut scratch = EmissionBuffer::new();
        let value = self.compile_expr(value, &mut scratch)?;
        let slot = self.compile_decl(decl, Some(&value.ty), out)?;
        out.splice(scratch);
        store(&value, &slot, out);
        Ok(slot)
      }
      Target::Usage(name) => {
        let value = self.compile_expr(value, out)?;
        let symbol = self
          .ctx
          .scopes
          .resolve(name, false)
          .context(NotDefinedSnafu { name })?;
        ensure!(
          !symbol.constant && !symbol.parameter,
          RedefiningConstantSnafu { name }
        );
        ensure!(
          symbol.ty == value.ty,
          TypeMismatchSnafu {
            expected: symbol.ty.to_string(),
            found: value.ty.to_string(),
          }
        );
        let slot = Value::new(symbol.location.clone(), symbol.ty.clone());
        store(&value, &slot, out);
        Ok(slot)
      }
    }
  }

  /// A function bound to a name is declared like any other value, but its
  /// symbol refers to the function itself rather than to a stack slot.
  fn bind_function(&mut self, target: &Target, def: &FunctionDef) -> CompileResult<Value> {
    let name = match target {
      Target::Decl(decl) => {
        ensure!(
          self.ctx.scopes.resolve(&decl.name, true).is_none(),
          RedefinedSnafu { name: &decl.name }
        );
        if let Some(declared) = &decl.ty {
          ensure!(
            declared.kind == TypeKind::Function,
            TypeMismatchSnafu {
              expected: declared.to_string(),
              found: Type::function().to_string(),
            }
          );
        }
        let location = self.ctx.qualified(&decl.name);
        self.ctx.scopes.declare(
          decl.name.clone(),
          Symbol::local(location, Type::function(), decl.constant),
        );
        decl.name.as_str()
      }
      Target::Usage(name) => {
        let symbol = self
          .ctx
          .scopes
          .resolve(name, false)
          .context(NotDefinedSnafu { name })?;
        ensure!(
          !symbol.constant && !symbol.parameter,
          RedefiningConstantSnafu { name }
        );
        ensure!(
          symbol.ty.kind == TypeKind::Function,
          TypeMismatchSnafu {
            expected: symbol.ty.to_string(),
            found: Type::function().to_string(),
          }
        );
        name.as_str()
      }
    };
    self.compile_function(def, Some(name))
  }

  fn compile_call(
    &mut self,
    module: Option<&str>,
    name: &str,
    args: &[Expr],
    out: &mut EmissionBuffer,
  ) -> CompileResult<Value> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
      values.push(self.compile_expr(arg, out)?);
    }

    let callee = match module {
      Some(module) => {
        ensure!(
          self.ctx.is_used(module),
          NotDefinedSnafu { name: module }
        );
        format!("@{module}.{name}")
      }
      None => {
        let signatures = self
          .ctx
          .modules
          .resolve(name)
          .context(NotDefinedSnafu { name })?;
        let arg_types: Vec<Type> = values.iter().map(|value| value.ty.clone()).collect();
        if !signatures.iter().any(|sig| sig.accepts(&arg_types)) {
          let expected = signatures
            .iter()
            .map(|sig| sig.describe())
            .collect::<Vec<_>>()
            .join(" or ");
          return TypeMismatchSnafu {
            expected,
            found: describe_types(&arg_types),
          }
          .fail();
        }
        self.ctx.qualified(name)
      }
    };

    let arg_list = values
      .iter()
      .map(|value| format!("{} {}", value.ty, value.operand))
      .collect::<Vec<_>>()
      .join(", ");
    let reg = self.ctx.registers.fresh();
    out.instr(format!("{reg} = call i32 {callee}({arg_list})"));
    Ok(Value::new(reg, Type::int()))
  }

  /// Each arm tests its condition against zero and branches; all arms meet
  /// at a shared end label.
  fn compile_if(
    &mut self,
    arms: &[IfArm],
    otherwise: Option<&Block>,
    out: &mut EmissionBuffer,
  ) -> CompileResult<()> {
    let end = format!("end.{}", self.ctx.names.fresh());

    for arm in arms {
      let cond = self.compile_expr(&arm.cond, out)?;
      let flag = self.ctx.registers.fresh();
      let test = match cond.ty.kind {
        TypeKind::Int | TypeKind::Char => {
          format!("{flag} = icmp ne {} {}, 0", cond.ty, cond.operand)
        }
        TypeKind::Float => format!("{flag} = fcmp une double {}, 0.0", cond.operand),
        TypeKind::Function | TypeKind::Array => {
          return InvalidTypeSnafu {
            ty: cond.ty.to_string(),
            context: "if condition",
          }
          .fail();
        }
      };
      let then_label = format!("then.{}", self.ctx.names.fresh());
      let else_label = format!("else.{}", self.ctx.names.fresh());

      out.instr(test);
      out.instr(format!("br i1 {flag}, label %{then_label}, label %{else_label}"));
      out.append(format!("{then_label}:"));
      self.compile_block(&arm.body, out)?;
      out.instr(format!("br label %{end}"));
      out.append(format!("{else_label}:"));
    }

    if let Some(block) = otherwise {
      self.compile_block(block, out)?;
    }
    out.instr(format!("br label %{end}"));
    out.append(format!("{end}:"));
    Ok(())
  }

  fn compile_block(&mut self, block: &Block, out: &mut EmissionBuffer) -> CompileResult<()> {
    blocks::enter(&mut self.ctx.scopes, block.kind);
    let result = block
      .stmts
      .iter()
      .try_for_each(|stmt| self.compile_stmt(stmt, out));
    blocks::exit(&mut self.ctx.scopes, block.kind);
    result
  }
}

fn store(value: &Value, slot: &Value, out: &mut EmissionBuffer) {
  out.instr(format!(
    "store {ty} {}, {ty}* {}",
    value.operand,
    slot.operand,
    ty = value.ty
  ));
}

fn arithmetic_opcode(op: BinaryOp, ty: &Type) -> CompileResult<&'static str> {
  if ty.is_integer() {
    return Ok(match op {
      BinaryOp::Add => "add",
      BinaryOp::Sub => "sub",
      BinaryOp::Mul => "mul",
      BinaryOp::Div => "sdiv",
    });
  }
  if ty.is_float() {
    return Ok(match op {
      BinaryOp::Add => "fadd",
      BinaryOp::Sub => "fsub",
      BinaryOp::Mul => "fmul",
      BinaryOp::Div => "fdiv",
    });
  }
  InvalidTypeSnafu {
    ty: ty.to_string(),
    context: "arithmetic",
  }
  .fail()
}

fn constant_value(constant: &Constant) -> Value {
  match constant {
    Constant::Int(value) => Value::new(value.to_string(), Type::int()),
    // LLVM spells doubles exactly as their bit pattern.
    Constant::Float(value) => Value::new(format!("0x{:016X}", value.to_bits()), Type::float()),
    Constant::Char(value) => Value::new(value.to_string(), Type::char()),
    Constant::Str(text) => Value::new(
      format!("c\"{}\"", escape_bytes(text.as_bytes())),
      Type::array_of(Type::char(), text.len()),
    ),
  }
}

fn escape_bytes(bytes: &[u8]) -> String {
  let mut escaped = String::with_capacity(bytes.len());
  for &byte in bytes {
    if (byte.is_ascii_graphic() && byte != b'"' && byte != b'\\') || byte == b' ' {
      escaped.push(byte as char);
    } else {
      escaped.push_str(&format!("\\{byte:02X}"));
    }
  }
  escaped
}
