//! Import extraction from Java sources using tree-sitter.
//!
//! Only single-type imports count: wildcard (`import a.b.*;`) and static
//! imports carry no class name that could be matched against a jar catalog,
//! so both are dropped. Duplicates across files are kept on purpose since
//! the usage engine counts every occurrence.

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::{debug, trace};
use tree_sitter::{Node, Parser};

use crate::error::{Error, Result};

/// Outcome of scanning source roots without stopping at the first bad file.
#[derive(Debug, Default)]
pub struct ImportScan {
    pub files: usize,
    pub imports: Vec<String>,
    pub failures: Vec<Error>,
}

/// Every qualifying import under `roots`. The first unparsable file aborts the scan.
pub fn imports_of(roots: &[PathBuf]) -> Result<Vec<String>> {
    let mut imports = Vec::new();
    for outcome in parse_files(&java_sources(roots)) {
        imports.extend(outcome?);
    }
    Ok(imports)
}

/// Like [`imports_of`], but unparsable files are collected instead of aborting.
pub fn collect_imports(roots: &[PathBuf]) -> ImportScan {
    let files = java_sources(roots);
    let mut scan = ImportScan {
        files: files.len(),
        ..ImportScan::default()
    };
    for outcome in parse_files(&files) {
        match outcome {
            Ok(found) => scan.imports.extend(found),
            Err(e) => scan.failures.push(e),
        }
    }
    scan
}

pub fn java_sources(roots: &[PathBuf]) -> Vec<PathBuf> {
    let (tx, rx) = mpsc::channel();

    for root in roots.iter().filter(|r| r.is_dir()) {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .build_parallel();

        walker.run(|| {
            let tx = tx.clone();
            Box::new(move |entry| {
                if let Ok(entry) = entry {
                    let path = entry.path();
                    if path.is_file() && path.extension().is_some_and(|e| e == "java") {
                        let _ = tx.send(path.to_path_buf());
                    }
                }
                ignore::WalkState::Continue
            })
        });
    }

    drop(tx);
    let mut files: Vec<PathBuf> = rx.iter().collect();
    files.sort();
    files.dedup();
    debug!(files = files.len(), "collected java sources");
    files
}

fn parse_files(files: &[PathBuf]) -> Vec<Result<Vec<String>>> {
    files.par_iter().map(|path| imports_in_file(path)).collect()
}

pub fn imports_in_file(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| Error::parse(path, e))?;
    // Legacy trees carry Latin-1 comments; identifiers that matter are ASCII.
    let source = String::from_utf8_lossy(&bytes);
    let imports = imports_in_source(&source).map_err(|reason| Error::parse(path, reason))?;
    for import in &imports {
        trace!(file = %path.display(), import = %import, "source import");
    }
    Ok(imports)
}

/// Single-type imports declared by one compilation unit.
pub fn imports_in_source(source: &str) -> std::result::Result<Vec<String>, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| e.to_string())?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser produced no syntax tree".to_string())?;
    let root = tree.root_node();

    if root.has_error() {
        let line = first_error(&root)
            .map(|n| n.start_position().row + 1)
            .unwrap_or(1);
        return Err(format!("syntax error near line {line}"));
    }

    let bytes = source.as_bytes();
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "import_declaration"
            && let Some(name) = single_type_import(&child, bytes)
        {
            imports.push(name);
        }
    }
    Ok(imports)
}

fn single_type_import(node: &Node, source: &[u8]) -> Option<String> {
    let mut path = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "static" | "asterisk" => return None,
            "scoped_identifier" | "identifier" => {
                path = child.utf8_text(source).ok().map(strip_whitespace);
            }
            _ => {}
        }
    }

    path.filter(|p| !p.is_empty())
}

fn first_error<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error()
            && let Some(found) = first_error(&child)
        {
            return Some(found);
        }
    }
    None
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
