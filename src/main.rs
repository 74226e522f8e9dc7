use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use arborc::{CompileError, CompileOptions, DEFAULT_ENTRY_MODULE};
use clap::{Parser, ValueEnum};
use snafu::{ResultExt, Snafu};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arborc")]
#[command(version, about = "Compile Arbor source to LLVM-style IR", long_about = None)]
struct Cli {
  /// Source file to compile
  file: PathBuf,

  /// Write output here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Module name (defaults to the file stem)
  #[arg(short, long)]
  module: Option<String>,

  /// Module whose top level becomes the program entry point
  #[arg(long, default_value = DEFAULT_ENTRY_MODULE)]
  entry_module: String,

  /// What to print
  #[arg(long, value_enum, default_value = "ir")]
  emit: Emit,

  /// Also write the function signature map as JSON
  #[arg(long)]
  module_map: Option<PathBuf>,

  /// Disable ANSI colors in log output
  #[arg(long)]
  no_color: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Emit {
  /// Textual IR
  Ir,
  /// Parsed syntax tree as JSON
  Ast,
}

#[derive(Debug, Snafu)]
enum DriverError {
  #[snafu(display("failed to read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("failed to write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("{}: {source}", path.display()))]
  Compile {
    path: PathBuf,
    source: CompileError,
  },

  #[snafu(display("failed to serialize {what}: {source}"))]
  Serialize {
    what: String,
    source: serde_json::Error,
  },
}

/// `dir/name.ab` → `name`
fn module_name_for(path: &Path) -> Option<String> {
  path
    .file_stem()
    .and_then(|stem| stem.to_str())
    .map(str::to_string)
}

fn run(cli: &Cli) -> Result<(), DriverError> {
  let source = fs::read_to_string(&cli.file).context(ReadSourceSnafu { path: &cli.file })?;
  let file = arborc::parse_source(&source).context(CompileSnafu { path: &cli.file })?;

  let text = match cli.emit {
    Emit::Ast => {
      let mut json = serde_json::to_string_pretty(&file).context(SerializeSnafu { what: "AST" })?;
      json.push('\n');
      json
    }
    Emit::Ir => {
      let options = CompileOptions {
        module_name: cli.module.clone().or_else(|| module_name_for(&cli.file)),
        entry_module: cli.entry_module.clone(),
      };
      let output = arborc::compile_file(&file, &options).context(CompileSnafu { path: &cli.file })?;
      tracing::info!(
        lines = output.lines.len(),
        functions = output.module_map.len(),
        "compiled {}",
        cli.file.display()
      );

      if let Some(path) = &cli.module_map {
        for (function, signatures) in output.module_map.iter() {
          tracing::debug!(function, overloads = signatures.len(), "exporting signatures");
        }
        let json = serde_json::to_string_pretty(&output.module_map)
          .context(SerializeSnafu { what: "module map" })?;
        fs::write(path, json).context(WriteOutputSnafu { path })?;
      }
      output.ir()
    }
  };

  match &cli.output {
    Some(path) => fs::write(path, text).context(WriteOutputSnafu { path }),
    None => {
      print!("{text}");
      Ok(())
    }
  }
}

fn main() {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .with_ansi(!cli.no_color)
    .init();

  if let Err(err) = run(&cli) {
    eprintln!("{err}");
    process::exit(1);
  }
}
