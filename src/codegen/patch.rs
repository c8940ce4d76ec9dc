//! Fixes for known defects in eBay's published contracts
//!
//! The table is versioned with the crate. A patch whose target is gone
//! (eBay fixed it, or the contract moved) is reported and skipped.

use serde_json::Value;
use tracing::{info, warn};

/// One edit to a contract document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchEdit {
    /// Rename a key in the object at `pointer`
    RenameProperty {
        pointer: &'static str,
        from: &'static str,
        to: &'static str,
    },
    /// Replace the value at `pointer` when it equals `from` (JSON text)
    ReplaceValue {
        pointer: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

/// A named fix for one contract file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractPatch {
    pub contract: &'static str,
    pub description: &'static str,
    pub edit: PatchEdit,
}

/// Known contract defects
pub static PATCHES: &[ContractPatch] = &[
    ContractPatch {
        contract: "sell_fulfillment_v1_oas3.json",
        description: "Address.postalcode is returned as postalCode",
        edit: PatchEdit::RenameProperty {
            pointer: "/components/schemas/Address/properties",
            from: "postalcode",
            to: "postalCode",
        },
    },
    ContractPatch {
        contract: "sell_finances_v1_oas3.json",
        description: "Finances is served from apiz, not api",
        edit: PatchEdit::ReplaceValue {
            pointer: "/servers/0/url",
            from: "\"https://api.ebay.com{basePath}\"",
            to: "\"https://apiz.ebay.com{basePath}\"",
        },
    },
    ContractPatch {
        contract: "sell_finances_v1_oas3.json",
        description: "Sandbox finances is served from apiz, not api",
        edit: PatchEdit::ReplaceValue {
            pointer: "/servers/1/url",
            from: "\"https://api.sandbox.ebay.com{basePath}\"",
            to: "\"https://apiz.sandbox.ebay.com{basePath}\"",
        },
    },
];

/// Outcome of patching one contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub applied: Vec<&'static str>,
    pub missed: Vec<&'static str>,
}

impl PatchReport {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Apply every patch targeting `contract` to `doc`
pub fn apply_patches(contract: &str, doc: &mut Value) -> PatchReport {
    apply_table(PATCHES, contract, doc)
}

pub fn apply_table(table: &[ContractPatch], contract: &str, doc: &mut Value) -> PatchReport {
    let mut report = PatchReport::default();
    for patch in table.iter().filter(|p| p.contract == contract) {
        if apply_edit(&patch.edit, doc) {
            info!(contract, patch = patch.description, "Contract patched");
            report.applied.push(patch.description);
        } else {
            warn!(contract, patch = patch.description, "Patch target not found; eBay may have fixed it");
            report.missed.push(patch.description);
        }
    }
    report
}

fn apply_edit(edit: &PatchEdit, doc: &mut Value) -> bool {
    match *edit {
        PatchEdit::RenameProperty { pointer, from, to } => {
            let Some(Value::Object(map)) = doc.pointer_mut(pointer) else {
                return false;
            };
            match map.remove(from) {
                Some(value) => {
                    map.insert(to.to_string(), value);
                    true
                }
                None => false,
            }
        }
        PatchEdit::ReplaceValue { pointer, from, to } => {
            let (Ok(from), Ok(to)) = (serde_json::from_str::<Value>(from), serde_json::from_str::<Value>(to)) else {
                return false;
            };
            match doc.pointer_mut(pointer) {
                Some(slot) if *slot == from => {
                    *slot = to;
                    true
                }
                _ => false,
            }
        }
    }
}
