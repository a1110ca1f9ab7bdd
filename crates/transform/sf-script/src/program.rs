//! CompiledProgram - sources loaded and compiled once per processor.

use crate::config::ScriptConfig;
use crate::session::create_engine;
use rhai::AST;
use sf_error::ScriptError;
use std::path::PathBuf;
use tracing::debug;

/// Source name used for inline scripts.
pub const INLINE_SOURCE_NAME: &str = "inline.rhai";

/// A compiled script together with the names of the sources it came from.
///
/// Immutable after construction and shared by every session of a processor.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    names: Vec<String>,
    ast: AST,
}

impl CompiledProgram {
    /// Compiles a single named source.
    pub fn compile(name: impl Into<String>, source: &str) -> Result<Self, ScriptError> {
        let name = name.into();
        let ast = compile_one(&name, source)?;
        Ok(Self {
            names: vec![name],
            ast,
        })
    }

    /// Loads and compiles the sources selected by `config`.
    ///
    /// File sources are glob patterns; matches are loaded in pattern order
    /// and then lexicographic order within a pattern. A file matched by
    /// more than one pattern is loaded once.
    pub fn load(config: &ScriptConfig) -> Result<Self, ScriptError> {
        config.validate()?;

        if let Some(source) = &config.source {
            return Self::compile(INLINE_SOURCE_NAME, source);
        }

        let patterns: Vec<&str> = match &config.file {
            Some(file) => vec![file.as_str()],
            None => config.files.iter().map(String::as_str).collect(),
        };

        let paths = resolve_files(&patterns)?;
        let mut names = Vec::with_capacity(paths.len());
        let mut combined: Option<AST> = None;

        for path in paths {
            let name = path.display().to_string();
            let source = std::fs::read_to_string(&path).map_err(|e| ScriptError::Io {
                path: name.clone(),
                message: e.to_string(),
            })?;

            let ast = compile_one(&name, &source)?;
            combined = Some(match combined {
                Some(previous) => previous.merge(&ast),
                None => ast,
            });
            names.push(name);
        }

        let ast = combined.ok_or_else(|| ScriptError::NoSources(patterns.join(", ")))?;
        debug!(sources = ?names, "Compiled script sources");

        Ok(Self { names, ast })
    }

    /// Returns the source names in load order.
    pub fn source_names(&self) -> &[String] {
        &self.names
    }

    /// Returns the compiled AST.
    pub fn ast(&self) -> &AST {
        &self.ast
    }

    /// Returns true if the program defines `name` with exactly `arity` parameters.
    pub fn has_function(&self, name: &str, arity: usize) -> bool {
        self.ast
            .iter_functions()
            .any(|f| f.name == name && f.params.len() == arity)
    }

    /// Returns true if the program defines `name` with any number of parameters.
    pub fn defines_function(&self, name: &str) -> bool {
        self.ast.iter_functions().any(|f| f.name == name)
    }
}

fn compile_one(name: &str, source: &str) -> Result<AST, ScriptError> {
    let mut ast = create_engine()
        .compile(source)
        .map_err(|e| ScriptError::Syntax {
            source_name: name.to_string(),
            message: e.to_string(),
        })?;
    ast.set_source(name);
    Ok(ast)
}

/// Expands each pattern and returns the de-duplicated matches in order.
fn resolve_files(patterns: &[&str]) -> Result<Vec<PathBuf>, ScriptError> {
    let mut resolved: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let entries = glob::glob(pattern)
            .map_err(|e| ScriptError::InvalidConfig(format!("bad pattern '{pattern}': {e}")))?;

        let mut matched = 0usize;
        for entry in entries {
            let path = entry.map_err(|e| ScriptError::Io {
                path: e.path().display().to_string(),
                message: e.error().to_string(),
            })?;
            matched += 1;
            if !resolved.contains(&path) {
                resolved.push(path);
            }
        }

        if matched == 0 {
            return Err(ScriptError::NoSources((*pattern).to_string()));
        }
    }

    Ok(resolved)
}
