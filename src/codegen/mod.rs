//! Build-time pipeline that regenerates the facade from eBay's contracts
//!
//! Stages run in order: discover, dedupe, cache, patch, generate,
//! post-patch, flatten, harvest, emit. See [`pipeline::Pipeline`].

pub mod cache;
pub mod dedupe;
pub mod discover;
pub mod docstring;
pub mod emit;
pub mod flatten;
pub mod generate;
pub mod harvest;
pub mod patch;
pub mod pipeline;
pub mod post_patch;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::{Error, ErrorCode};

pub use discover::{ContractRef, Discoverer};
pub use harvest::{ApiMeta, OperationMeta};
pub use pipeline::{Pipeline, PipelineReport};

/// Pipeline failure
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Fetching {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: {message} at line {line} column {column} (offset {offset})")]
    Parse {
        file: String,
        message: String,
        line: usize,
        column: usize,
        offset: usize,
    },

    #[error("{operation}: scopes map to {flows:?}, expected exactly one flow")]
    AmbiguousFlow { operation: String, flows: Vec<String> },

    #[error("Generator failed for {package}: {message}")]
    Generator { package: String, message: String },

    #[error("Anchor {0} not found")]
    AnchorMissing(String),

    #[error("Rendering facade source failed")]
    Render(#[from] std::fmt::Error),
}

impl CodegenError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CodegenError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            CodegenError::Network { .. } => ErrorCode::CodegenNetwork,
            CodegenError::Io { .. } => ErrorCode::CodegenIo,
            CodegenError::Parse { .. } => ErrorCode::ContractParse,
            CodegenError::AmbiguousFlow { .. } => ErrorCode::AmbiguousFlow,
            CodegenError::Generator { .. } => ErrorCode::GeneratorFailed,
            CodegenError::AnchorMissing(_) => ErrorCode::AnchorMissing,
            CodegenError::Render(_) => ErrorCode::GeneratorFailed,
        }
    }
}

impl From<CodegenError> for Error {
    fn from(err: CodegenError) -> Self {
        Error::new(err.code()).with_cause(err)
    }
}

/// Every `.rs` file below `dir`, sorted
pub fn rust_files(dir: &Path) -> Result<Vec<PathBuf>, CodegenError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|e| CodegenError::io(&current, e))?;
        for entry in entries {
            let path = entry.map_err(|e| CodegenError::io(&current, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// `getItemsByItemGroup` -> `get_items_by_item_group`, `Content-Language` -> `content_language`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}
