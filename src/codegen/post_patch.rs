//! Textual fixes applied to generated package sources
//!
//! Generated clients deserialize every successful body, which fails on
//! HTTP 204 and other empty responses. Request signing needs no textual
//! hook: the runtime sends every request through its middleware chain.

use std::path::Path;

use tracing::{debug, warn};

use super::cache::write_if_changed;
use super::{rust_files, CodegenError};

/// One find-and-replace over generated sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPatch {
    pub name: &'static str,
    pub find: &'static str,
    pub replace: &'static str,
}

/// Fixes for the generator's reqwest client template, old and new variable names
pub static TEXT_PATCHES: &[TextPatch] = &[
    TextPatch {
        name: "empty body deserializes to no value",
        find: "serde_json::from_str(&local_var_content).map_err(Error::from)",
        replace: "if local_var_content.trim().is_empty() { serde_json::from_str(\"null\") } else { serde_json::from_str(&local_var_content) }.map_err(Error::from)",
    },
    TextPatch {
        name: "empty body deserializes to no value",
        find: "serde_json::from_str(&content).map_err(Error::from)",
        replace: "if content.trim().is_empty() { serde_json::from_str(\"null\") } else { serde_json::from_str(&content) }.map_err(Error::from)",
    },
];

/// Apply the patch table to one source text; returns the text and the hit count
pub fn patch_source(text: &str) -> (String, usize) {
    let mut out = text.to_string();
    let mut hits = 0;
    for patch in TEXT_PATCHES {
        let count = out.matches(patch.find).count();
        if count > 0 {
            out = out.replace(patch.find, patch.replace);
            hits += count;
        }
    }
    (out, hits)
}

/// Patch every source file of a generated package; returns the number of replacements
pub fn post_patch_package(package: &str, dir: &Path) -> Result<usize, CodegenError> {
    let mut total = 0;
    for file in rust_files(dir)? {
        let text = std::fs::read_to_string(&file).map_err(|e| CodegenError::io(&file, e))?;
        let (patched, hits) = patch_source(&text);
        if hits > 0 {
            write_if_changed(&file, &patched)?;
            debug!(file = %file.display(), hits, "Post-patched");
            total += hits;
        }
    }
    if total == 0 {
        warn!(package, "No post-patch target found; generator template may have changed");
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = r#"
    let local_var_content = local_var_resp.text().await?;
    if !local_var_status.is_client_error() && !local_var_status.is_server_error() {
        serde_json::from_str(&local_var_content).map_err(Error::from)
    } else {
"#;

    #[test]
    fn test_patch_is_idempotent() {
        let (once, hits) = patch_source(GENERATED);
        assert_eq!(hits, 1);
        assert!(once.contains("local_var_content.trim().is_empty()"));

        let (twice, hits) = patch_source(&once);
        assert_eq!(hits, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_package_walk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apis")).unwrap();
        std::fs::write(dir.path().join("apis/item_api.rs"), GENERATED).unwrap();
        std::fs::write(dir.path().join("lib.rs"), "pub mod apis;\n").unwrap();

        assert_eq!(post_patch_package("buy_browse", dir.path()).unwrap(), 1);
        assert_eq!(post_patch_package("buy_browse", dir.path()).unwrap(), 0);
    }
}
