//! Operation descriptors and call parameters
//!
//! The code generator turns each eBay operation into a static
//! [`OperationDescriptor`]. The dispatcher needs nothing else to build,
//! authorize, govern and page a call.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthFlow;

/// Where a parameter travels in the HTTP request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Path,
    Query,
    Header,
    Body,
}

/// Declared parameter of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Name on the wire
    pub name: &'static str,
    pub kind: ParamKind,
    /// Required parameters are positional in the generated method
    pub required: bool,
}

/// Whether an operation returns one response or a paged sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pagination {
    Single,
    Paged,
}

/// eBay host family serving an API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Host {
    /// api.ebay.com
    Api,
    /// apiz.ebay.com (Finances, Identity, ...)
    Apiz,
}

/// Everything known about an operation at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Facade method name, `<api>_<operation>`
    pub method_name: &'static str,
    /// Resource module (the contract's tag)
    pub module: &'static str,
    /// Owning API, e.g. `buy_browse`
    pub api: &'static str,
    /// e.g. `/buy/browse/v1`
    pub base_path: &'static str,
    pub operation_id: &'static str,
    pub http_method: &'static str,
    /// Path below the base path, with `{name}` placeholders
    pub path: &'static str,
    pub host: Host,
    pub flow: AuthFlow,
    pub params: &'static [ParamSpec],
    /// Rate-lookup resource names, most general first
    pub rate_keys: &'static [&'static str],
    pub pagination: Pagination,
    /// Array field holding page items, when the contract names one
    pub items_field: Option<&'static str>,
    /// Largest `limit` the endpoint accepts
    pub max_limit: Option<u32>,
}

impl OperationDescriptor {
    pub fn is_paged(&self) -> bool {
        self.pagination == Pagination::Paged
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Required parameters, in declaration order
    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {}{})", self.method_name, self.http_method, self.base_path, self.path)
    }
}

/// Values supplied for one call, keyed by wire name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, String>,
    body: Option<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a path, query or header parameter
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    /// Set a parameter only when a value is present
    pub fn with_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    /// Set the JSON request body
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn set(&mut self, name: &str, value: impl ToString) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether a value (or the body) is present for the parameter
    pub fn has(&self, spec: &ParamSpec) -> bool {
        match spec.kind {
            ParamKind::Body => self.body.is_some(),
            _ => self.values.contains_key(spec.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static GET_ITEM_PARAMS: [ParamSpec; 2] = [
        ParamSpec { name: "item_id", kind: ParamKind::Path, required: true },
        ParamSpec { name: "fieldgroups", kind: ParamKind::Query, required: false },
    ];

    static GET_ITEM: OperationDescriptor = OperationDescriptor {
        method_name: "buy_browse_get_item",
        module: "item",
        api: "buy_browse",
        base_path: "/buy/browse/v1",
        operation_id: "getItem",
        http_method: "GET",
        path: "/item/{item_id}",
        host: Host::Api,
        flow: AuthFlow::ClientCredentials,
        params: &GET_ITEM_PARAMS,
        rate_keys: &["buy.browse", "buy.browse.item"],
        pagination: Pagination::Single,
        items_field: None,
        max_limit: None,
    };

    #[test]
    fn test_descriptor_lookup() {
        assert!(!GET_ITEM.is_paged());
        assert_eq!(GET_ITEM.param("item_id").unwrap().kind, ParamKind::Path);
        assert_eq!(GET_ITEM.required_params().count(), 1);
        assert_eq!(GET_ITEM.to_string(), "buy_browse_get_item (GET /buy/browse/v1/item/{item_id})");
    }

    #[test]
    fn test_params_builder() {
        let params = Params::new()
            .with("item_id", "v1|110|0")
            .with_opt("fieldgroups", None::<&str>)
            .with("limit", 50);

        assert_eq!(params.get("item_id"), Some("v1|110|0"));
        assert_eq!(params.get("limit"), Some("50"));
        assert!(params.get("fieldgroups").is_none());
        assert!(params.has(&GET_ITEM_PARAMS[0]));
        assert!(!params.has(&ParamSpec { name: "body", kind: ParamKind::Body, required: true }));
    }
}
