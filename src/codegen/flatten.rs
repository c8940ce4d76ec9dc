//! Move generated packages under one parent module
//!
//! Each generated package is written as a standalone crate. Copying it to
//! `src/generated/<package>/` requires its `crate::` paths to point at the
//! new location and its crate-level attributes to go.

use std::path::Path;

use tracing::info;

use super::cache::write_if_changed;
use super::{rust_files, CodegenError};

/// Rewrite one source file for life as `crate::generated::<package>`
pub fn flatten_source(text: &str, package: &str) -> String {
    let prefix = format!("crate::generated::{}::", package);
    let mut out = String::with_capacity(text.len());
    let mut skip_next_extern = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[macro_use]") {
            skip_next_extern = true;
            continue;
        }
        if trimmed.starts_with("extern crate ") || trimmed.starts_with("#![") {
            skip_next_extern = false;
            continue;
        }
        if skip_next_extern {
            // #[macro_use] that did not precede an extern crate
            out.push_str("#[macro_use]\n");
            skip_next_extern = false;
        }
        out.push_str(&line.replace("crate::", &prefix));
        out.push('\n');
    }
    out
}

/// Copy `<generated>/src` into `<dest>` flattened; `lib.rs` becomes `mod.rs`
pub fn flatten_package(package: &str, generated: &Path, dest: &Path) -> Result<usize, CodegenError> {
    let src = generated.join("src");
    let root = if src.is_dir() { src } else { generated.to_path_buf() };

    let mut written = 0;
    for file in rust_files(&root)? {
        let relative = file.strip_prefix(&root).unwrap_or(&file);
        let target = if relative == Path::new("lib.rs") {
            dest.join("mod.rs")
        } else {
            dest.join(relative)
        };
        let text = std::fs::read_to_string(&file).map_err(|e| CodegenError::io(&file, e))?;
        if write_if_changed(&target, &flatten_source(&text, package))? {
            written += 1;
        }
    }
    info!(package, written, dest = %dest.display(), "Package flattened");
    Ok(written)
}
