//! Local contract cache
//!
//! Layout under the cache root:
//!
//! ```text
//! <category>_<call>_v<N>[_beta]_oas3.json   one cached contract per API
//! <package>/                                generator output per API
//! base_paths.json  flows.json  scopes.json  harvested summaries
//! digests.json                              SHA-256 of each cached contract
//! README.md
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::{CodegenError, ContractRef};

const README: &str = "\
# eBay contract cache

Written by `ebay-codegen`. Everything here is regenerated.

- `*_oas3.json`: eBay OpenAPI contracts, patched in place
- `<package>/`: generator output, one folder per API
- `base_paths.json`, `flows.json`, `scopes.json`: harvested metadata
- `digests.json`: SHA-256 of each contract, to spot upstream changes

Run with `EBAY_CODEGEN__OFFLINE=true` to rebuild from these files without
touching developer.ebay.com.
";

/// Summaries written next to the contracts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// package -> base path
    pub base_paths: BTreeMap<String, String>,
    /// package -> flow -> scopes
    pub flows: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// package -> operation id -> scopes
    pub scopes: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// contract filename -> hex digest
    pub digests: BTreeMap<String, String>,
}

/// Directory holding cached contracts and generator output
#[derive(Debug, Clone)]
pub struct ContractCache {
    root: PathBuf,
}

impl ContractCache {
    /// Open the cache, creating the directory when missing
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CodegenError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CodegenError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contract_path(&self, contract: &ContractRef) -> PathBuf {
        self.root.join(contract.filename())
    }

    pub fn package_dir(&self, package: &str) -> PathBuf {
        self.root.join(package)
    }

    pub fn write_contract(&self, contract: &ContractRef, body: &str) -> Result<PathBuf, CodegenError> {
        let path = self.contract_path(contract);
        write_if_changed(&path, body)?;
        Ok(path)
    }

    pub fn read(&self, path: &Path) -> Result<String, CodegenError> {
        fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))
    }

    /// Contracts currently in the cache, sorted by filename
    pub fn contracts(&self) -> Result<Vec<ContractRef>, CodegenError> {
        let entries = fs::read_dir(&self.root).map_err(|e| CodegenError::io(&self.root, e))?;
        let mut contracts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CodegenError::io(&self.root, e))?;
            let name = entry.file_name();
            if let Some(contract) = name.to_str().and_then(ContractRef::from_filename) {
                contracts.push(contract);
            }
        }
        contracts.sort_by_key(ContractRef::filename);
        Ok(contracts)
    }

    /// Write the summary files and the README
    pub fn write_summary(&self, summary: &Summary) -> Result<(), CodegenError> {
        self.write_json("base_paths.json", &summary.base_paths)?;
        self.write_json("flows.json", &summary.flows)?;
        self.write_json("scopes.json", &summary.scopes)?;
        self.write_json("digests.json", &summary.digests)?;
        write_if_changed(&self.root.join("README.md"), README)?;
        info!(apis = summary.base_paths.len(), root = %self.root.display(), "Cache summary written");
        Ok(())
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CodegenError> {
        let path = self.root.join(name);
        let mut text = serde_json::to_string_pretty(value)
            .map_err(|e| CodegenError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        text.push('\n');
        write_if_changed(&path, &text)?;
        Ok(())
    }
}

/// Hex SHA-256 of a contract body
pub fn digest(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

/// Write `contents` unless the file already holds exactly that; true when written
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool, CodegenError> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == contents {
            debug!(path = %path.display(), "Unchanged");
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CodegenError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| CodegenError::io(path, e))?;
    Ok(true)
}
