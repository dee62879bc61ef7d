//! The gslang compiler CLI.
//!
//! Provides the `gslangc` command with the following subcommands:
//!
//! - `gslangc compile <package>` - Compile a package and all of its imports
//! - `gslangc tokens <file>` - Dump the token stream of one source file
//!
//! Options:
//! - `--root` - Additional search roots (used instead of `GSLANG_PATH`)
//! - `--emit-ast` - Write the linked module as JSON

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use gslang_common::token::TokenValue;
use gslang_compiler::Compiler;
use gslang_lexer::Lexer;

#[derive(Parser)]
#[command(name = "gslangc", version, about = "The gslang IDL compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a package and everything it imports
    Compile {
        /// Dotted package path, e.g. com.example.api
        package: String,

        /// Search roots; when given, GSLANG_PATH is ignored
        #[arg(long = "root")]
        roots: Vec<PathBuf>,

        /// Write the linked module as JSON to the given path
        #[arg(long = "emit-ast")]
        emit_ast: Option<PathBuf>,
    },

    /// Dump the token stream of a single source file
    Tokens {
        /// Path to a .gs source file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            package,
            roots,
            emit_ast,
        } => compile(&package, roots, emit_ast.as_deref()),
        Commands::Tokens { file } => tokens(&file),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Execute the pipeline: load packages -> link -> report -> emit.
fn compile(package: &str, roots: Vec<PathBuf>, emit_ast: Option<&Path>) -> Result<(), String> {
    let mut compiler = if roots.is_empty() {
        Compiler::new(package)
    } else {
        Compiler::with_roots(package, roots)
    };

    let load_result = compiler.compile(package);
    if load_result.is_ok() {
        compiler.link();
    }

    let has_errors = report_diagnostics(&compiler);
    if let Err(fatal) = load_result {
        return Err(fatal.to_string());
    }
    if has_errors {
        return Err("compilation failed due to the errors above".to_string());
    }

    let module = compiler
        .finish()
        .expect("a compilation without diagnostics must produce a module");

    if let Some(path) = emit_ast {
        let json = serde_json::to_string_pretty(&module)
            .map_err(|e| format!("failed to serialize the module: {e}"))?;
        std::fs::write(path, json)
            .map_err(|e| format!("failed to write '{}': {e}", path.display()))?;
        eprintln!("  AST: {}", path.display());
    }

    eprintln!("  Compiled: {package}");
    Ok(())
}

/// Render accumulated diagnostics with ariadne. Returns true if there were
/// any.
fn report_diagnostics(compiler: &Compiler) -> bool {
    use ariadne::{Label, Report, ReportKind, Source};

    let mut has_errors = false;
    for diagnostic in compiler.diagnostics().iter() {
        has_errors = true;
        let source = compiler.source(&diagnostic.file);
        match (diagnostic.span, source) {
            (Some(span), Some(source)) => {
                let start = span.start.offset as usize;
                let end = (span.end.offset as usize).max(start + 1);
                let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
                    .with_message(format!("{} error: {}", diagnostic.stage, diagnostic.kind))
                    .with_label(Label::new(start..end).with_message(&diagnostic.message))
                    .finish()
                    .eprint(Source::from(source));
            }
            _ => eprintln!("{}", diagnostic),
        }
    }
    has_errors
}

/// Tokenize one file and print the stream, one token per line.
fn tokens(file: &Path) -> Result<(), String> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {e}", file.display()))?;

    let tokens = Lexer::tokenize(&file.display().to_string(), &source)
        .map_err(|diagnostic| diagnostic.to_string())?;

    for token in tokens {
        let pos = token.span.start;
        match &token.value {
            Some(TokenValue::Str(s)) => {
                println!("{}:{}\t{}\t{s:?}", pos.line, pos.column, token.kind)
            }
            Some(TokenValue::Int(v)) => {
                println!("{}:{}\t{}\t{v}", pos.line, pos.column, token.kind)
            }
            Some(TokenValue::Float(v)) => {
                println!("{}:{}\t{}\t{v}", pos.line, pos.column, token.kind)
            }
            None => println!("{}:{}\t{}", pos.line, pos.column, token.kind),
        }
    }
    Ok(())
}
