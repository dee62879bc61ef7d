//! The gslang build driver.
//!
//! [`Compiler`] resolves package paths against the configured search roots,
//! parses every source file of a package into scripts, follows
//! using-imports recursively with cycle detection, and runs the linker
//! passes over the assembled module. Callers receive either a fully-linked
//! [`Module`] or the accumulated diagnostics.
//!
//! The `gslang` and `gslang.annotations` standard packages are bundled
//! with the driver and used whenever no search root provides them; the
//! linker reads annotation target flags from these loaded scripts.

pub mod backend;
pub mod search;

use std::fmt;
use std::path::PathBuf;

use gslang_common::diagnostics::{
    Diagnostic, DiagnosticBag, DiagnosticKind, DiagnosticSink, Stage,
};
use gslang_parser::ast::{Module, NodeId};
use gslang_parser::parse_script;
use rustc_hash::FxHashMap;

pub use backend::{deliver, Backend};

/// The well-known standard package every user script imports implicitly.
pub const STD_PACKAGE: &str = "gslang";

const STD_GSLANG_SOURCE: &str = include_str!("../std/gslang.gs");
const STD_ANNOTATIONS_SOURCE: &str = include_str!("../std/annotations.gs");

/// Fatal driver failures. Recoverable conditions stay in the diagnostic
/// bag instead.
#[derive(Debug)]
pub enum CompileError {
    /// No search root holds a directory for the package.
    PackageNotFound(String),
    /// More than one root holds the package.
    AmbiguousPackage(String, Vec<PathBuf>),
    /// The package is already on the loading stack.
    CircularImport(String),
    /// A package directory could not be enumerated.
    Io(PathBuf, std::io::Error),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::PackageNotFound(package) => {
                write!(f, "no search root holds package '{package}'")
            }
            CompileError::AmbiguousPackage(package, candidates) => {
                write!(f, "found more than one package named '{package}':")?;
                for (index, candidate) in candidates.iter().enumerate() {
                    write!(f, "\n\t{}) {}", index, candidate.display())?;
                }
                Ok(())
            }
            CompileError::CircularImport(chain) => {
                write!(f, "circular package import: {chain}")
            }
            CompileError::Io(path, err) => {
                write!(f, "failed to read '{}': {err}", path.display())
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// The package build driver.
pub struct Compiler {
    roots: Vec<PathBuf>,
    module: Module,
    diagnostics: DiagnosticBag,
    /// Loaded-package cache, keyed by package path.
    loaded: FxHashMap<String, NodeId>,
    /// Packages currently being resolved, for cycle detection.
    loading: Vec<String>,
    /// Source text of every parsed file, kept for diagnostic rendering.
    sources: FxHashMap<String, String>,
    linked: bool,
}

impl Compiler {
    /// Create a compiler with search roots from the `GSLANG_PATH`
    /// environment variable.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self::with_roots(module_name, search::roots_from_env())
    }

    /// Create a compiler with explicit search roots.
    pub fn with_roots(module_name: impl Into<String>, roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            module: Module::new(module_name),
            diagnostics: DiagnosticBag::new(),
            loaded: FxHashMap::default(),
            loading: Vec::new(),
            sources: FxHashMap::default(),
            linked: false,
        }
    }

    /// Compile a package and, recursively, everything it imports.
    pub fn compile(&mut self, package: &str) -> Result<(), CompileError> {
        if self.loaded.contains_key(package) {
            return Ok(());
        }
        self.check_circular(package)?;

        let files = self.load_package_sources(package)?;
        let package_node = self.module.ensure_package(package);

        let mut scripts = Vec::new();
        for (file, source) in files {
            let script = parse_script(&mut self.module, &file, &source, &mut self.diagnostics);
            self.sources.insert(file.clone(), source);
            let Some(script) = script else {
                continue;
            };
            let declared = self.module.script(script).package.clone();
            if declared != package {
                let span = self.module.extras(script).span;
                self.diagnostics.report(Diagnostic::new(
                    Stage::Parsing,
                    DiagnosticKind::NameConflict,
                    file,
                    span,
                    format!("script declares package '{declared}', expected '{package}'"),
                ));
            }
            scripts.push(script);
        }

        // Everything outside the standard namespace imports gslang
        // implicitly, so annotations and builtin meta-types resolve.
        if !is_std_package(package) {
            for &script in &scripts {
                self.module.prepend_using(script, STD_PACKAGE);
            }
        }

        self.loading.push(package.to_string());
        let imports = self.collect_imports(&scripts);
        let mut result = Ok(());
        for import in imports {
            if let Err(err) = self.compile_import(&import) {
                result = Err(err);
                break;
            }
        }
        self.loading.pop();
        result?;

        self.loaded.insert(package.to_string(), package_node);
        Ok(())
    }

    /// Run the linker passes over everything compiled so far.
    pub fn link(&mut self) {
        gslang_linker::link(&mut self.module, &mut self.diagnostics);
        self.linked = true;
    }

    /// Finish the pipeline: a fully-linked module, or the error list.
    pub fn finish(mut self) -> Result<Module, DiagnosticBag> {
        if !self.linked {
            self.link();
        }
        if self.diagnostics.is_empty() {
            Ok(self.module)
        } else {
            Err(self.diagnostics)
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn diagnostics(&self) -> &DiagnosticBag {
        &self.diagnostics
    }

    /// Source text of a parsed file, for rendering diagnostics.
    pub fn source(&self, file: &str) -> Option<&str> {
        self.sources.get(file).map(String::as_str)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn check_circular(&mut self, package: &str) -> Result<(), CompileError> {
        if !self.loading.iter().any(|loading| loading == package) {
            return Ok(());
        }
        let position = self
            .loading
            .iter()
            .position(|loading| loading == package)
            .unwrap_or(0);
        let mut chain: Vec<&str> = self.loading[position..]
            .iter()
            .map(String::as_str)
            .collect();
        chain.push(package);
        let chain = chain.join(" imports ");
        self.diagnostics.report(Diagnostic::new(
            Stage::SemanticAnalysis,
            DiagnosticKind::CircularImport,
            String::new(),
            None,
            format!("circular package import: {chain}"),
        ));
        Err(CompileError::CircularImport(chain))
    }

    /// Using paths of the given scripts, in declaration order, without
    /// duplicates.
    fn collect_imports(&self, scripts: &[NodeId]) -> Vec<String> {
        let mut imports = Vec::new();
        for &script in scripts {
            for &using in &self.module.script(script).usings {
                if let Some(u) = self.module.as_using(using) {
                    if !imports.contains(&u.path) {
                        imports.push(u.path.clone());
                    }
                }
            }
        }
        imports
    }

    /// Compile the package behind a using path. A path that names a type
    /// rather than a package falls back to the type's enclosing package.
    fn compile_import(&mut self, path: &str) -> Result<(), CompileError> {
        if self.loaded.contains_key(path) || self.has_package_sources(path) {
            return self.compile(path);
        }
        if let Some((parent, _)) = path.rsplit_once('.') {
            if self.loaded.contains_key(parent) || self.has_package_sources(parent) {
                return self.compile(parent);
            }
        }
        // Neither the path nor its parent names a package; let the
        // original lookup report precisely.
        self.compile(path)
    }

    fn has_package_sources(&self, package: &str) -> bool {
        if is_bundled(package) {
            return true;
        }
        matches!(search::package_dir(&self.roots, package), Ok(Some(_)))
    }

    /// Locate and read every source file of a package. Falls back to the
    /// bundled standard sources when no search root provides the package.
    fn load_package_sources(
        &mut self,
        package: &str,
    ) -> Result<Vec<(String, String)>, CompileError> {
        let dir = match search::package_dir(&self.roots, package) {
            Ok(dir) => dir,
            Err(candidates) => {
                self.diagnostics.report(Diagnostic::new(
                    Stage::SemanticAnalysis,
                    DiagnosticKind::AmbiguousPackage,
                    String::new(),
                    None,
                    format!("found more than one package named '{package}'"),
                ));
                return Err(CompileError::AmbiguousPackage(
                    package.to_string(),
                    candidates,
                ));
            }
        };

        let Some(dir) = dir else {
            if let Some(bundled) = bundled_sources(package) {
                return Ok(bundled);
            }
            self.diagnostics.report(Diagnostic::new(
                Stage::SemanticAnalysis,
                DiagnosticKind::PackageNotFound,
                String::new(),
                None,
                format!("no search root holds package '{package}'"),
            ));
            return Err(CompileError::PackageNotFound(package.to_string()));
        };

        let files =
            search::list_source_files(&dir).map_err(|err| CompileError::Io(dir.clone(), err))?;

        let mut sources = Vec::new();
        for path in files {
            let bytes =
                std::fs::read(&path).map_err(|err| CompileError::Io(path.clone(), err))?;
            let name = path.display().to_string();
            match String::from_utf8(bytes) {
                Ok(text) => sources.push((name, text)),
                Err(_) => {
                    // The file is abandoned, the rest of the package loads.
                    self.diagnostics.report(Diagnostic::new(
                        Stage::Lexing,
                        DiagnosticKind::IllegalUtf8,
                        name.clone(),
                        None,
                        format!("'{name}' is not valid UTF-8"),
                    ));
                }
            }
        }
        Ok(sources)
    }
}

fn is_std_package(package: &str) -> bool {
    package == STD_PACKAGE || package.starts_with("gslang.")
}

fn is_bundled(package: &str) -> bool {
    package == "gslang" || package == "gslang.annotations"
}

/// The bundled standard package sources, keyed by package path.
fn bundled_sources(package: &str) -> Option<Vec<(String, String)>> {
    match package {
        "gslang" => Some(vec![(
            "<builtin>/gslang/gslang.gs".to_string(),
            STD_GSLANG_SOURCE.to_string(),
        )]),
        "gslang.annotations" => Some(vec![(
            "<builtin>/gslang/annotations/annotations.gs".to_string(),
            STD_ANNOTATIONS_SOURCE.to_string(),
        )]),
        _ => None,
    }
}
