//! Operation metadata harvested from a contract
//!
//! For every operation: base path, host family, auth flow (from the scopes
//! it declares), parameters, pagination, page item field, page-size cap and
//! a cleaned docstring.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{docstring, snake_case, CodegenError, ContractRef};
use crate::auth::AuthFlow;
use crate::operations::{Host, ParamKind, Pagination};

const HTTP_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Headers the transport sets itself
const MANAGED_HEADERS: [&str; 2] = ["authorization", "x-ebay-c-marketplace-id"];

/// Operations whose scopes are shared by both flows but that work with an
/// application token: (package, operation id or module)
pub static FLOW_OVERRIDES: &[(&str, &str)] = &[
    ("commerce_notification", "subscription"),
    ("sell_metadata", "getReturnPolicies"),
];

static MAX_IN_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bmax(?:imum)?(?:\s+value)?\s*(?:is|:)?\s*(\d+)").expect("valid regex")
});

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMeta {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

/// Everything emitted for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMeta {
    pub method_name: String,
    pub module: String,
    pub api: String,
    pub base_path: String,
    pub operation_id: String,
    pub http_method: String,
    pub path: String,
    pub host: Host,
    pub flow: AuthFlow,
    pub params: Vec<ParamMeta>,
    pub rate_keys: Vec<String>,
    pub pagination: Pagination,
    pub items_field: Option<String>,
    pub max_limit: Option<u32>,
    pub doc: String,
    pub scopes: Vec<String>,
}

/// Metadata for one API contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMeta {
    pub package: String,
    pub base_path: String,
    pub host: Host,
    /// flow name -> scopes
    pub flows: BTreeMap<String, Vec<String>>,
    pub operations: Vec<OperationMeta>,
}

/// Parse contract text, reporting the failure position
pub fn parse_contract(file: &str, text: &str) -> Result<Value, CodegenError> {
    serde_json::from_str(text).map_err(|e| CodegenError::Parse {
        file: file.to_string(),
        message: e.to_string(),
        line: e.line(),
        column: e.column(),
        offset: offset_of(text, e.line(), e.column()),
    })
}

/// Byte offset of a 1-based line and column
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let before: usize = text.split_inclusive('\n').take(line.saturating_sub(1)).map(str::len).sum();
    (before + column.saturating_sub(1)).min(text.len())
}

/// Harvest every operation of a parsed contract
pub fn harvest(contract: &ContractRef, doc: &Value) -> Result<ApiMeta, CodegenError> {
    let package = contract.package();
    let (base_path, host) = server_info(contract, doc);
    let (flows, scope_flows) = security_flows(doc);

    let mut operations = Vec::new();
    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let shared = item.get("parameters").and_then(Value::as_array).cloned().unwrap_or_default();
            for method in HTTP_METHODS {
                let Some(op) = item.get(method) else { continue };
                let Some(operation_id) = op.get("operationId").and_then(Value::as_str) else {
                    warn!(package = %package, path = %path, method, "Operation without operationId skipped");
                    continue;
                };

                let module = op
                    .get("tags")
                    .and_then(Value::as_array)
                    .and_then(|tags| tags.first())
                    .and_then(Value::as_str)
                    .map(snake_case)
                    .unwrap_or_else(|| "default".to_string());
                let scopes = operation_scopes(doc, op);
                let flow = select_flow(&package, operation_id, &module, &scopes, &scope_flows)?;
                let raw_params = merged_params(doc, &shared, op);
                let params = param_metas(&raw_params, op);
                let pagination = if has_query(&params, "offset") && has_query(&params, "limit") {
                    Pagination::Paged
                } else {
                    Pagination::Single
                };

                let (items_field, max_limit) = match pagination {
                    Pagination::Paged => (page_items_field(doc, op), limit_maximum(&raw_params)),
                    Pagination::Single => (None, None),
                };

                let doc_text = op
                    .get("summary")
                    .or_else(|| op.get("description"))
                    .and_then(Value::as_str)
                    .map(docstring::clean)
                    .unwrap_or_default();

                operations.push(OperationMeta {
                    method_name: format!("{}_{}", package, snake_case(operation_id)),
                    rate_keys: vec![
                        format!("{}.{}", contract.category, contract.call_name),
                        format!("{}.{}.{}", contract.category, contract.call_name, module),
                    ],
                    module,
                    api: package.clone(),
                    base_path: base_path.clone(),
                    operation_id: operation_id.to_string(),
                    http_method: method.to_uppercase(),
                    path: path.clone(),
                    host,
                    flow,
                    params,
                    pagination,
                    items_field,
                    max_limit,
                    doc: doc_text,
                    scopes,
                });
            }
        }
    }

    debug!(package = %package, operations = operations.len(), "Contract harvested");
    Ok(ApiMeta {
        package,
        base_path,
        host,
        flows,
        operations,
    })
}

/// Base path and host family from the first server entry
fn server_info(contract: &ContractRef, doc: &Value) -> (String, Host) {
    let fallback = format!("/{}/{}/v{}", contract.category, contract.call_name, contract.version);
    let Some(server) = doc.pointer("/servers/0") else {
        return (fallback, Host::Api);
    };
    let url = server.get("url").and_then(Value::as_str).unwrap_or("");
    let host = if url.contains("://apiz.") { Host::Apiz } else { Host::Api };

    let base_path = match server.pointer("/variables/basePath/default").and_then(Value::as_str) {
        Some(base) if url.contains("{basePath}") => base.to_string(),
        _ => url::Url::parse(url)
            .ok()
            .map(|u| u.path().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(fallback),
    };
    (base_path, host)
}

/// Declared flows with their scopes, and the flows each scope belongs to
fn security_flows(doc: &Value) -> (BTreeMap<String, Vec<String>>, BTreeMap<String, BTreeSet<AuthFlow>>) {
    let mut flows: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut scope_flows: BTreeMap<String, BTreeSet<AuthFlow>> = BTreeMap::new();

    let schemes = doc.pointer("/components/securitySchemes").and_then(Value::as_object);
    for scheme in schemes.into_iter().flat_map(Map::values) {
        let Some(declared) = scheme.get("flows").and_then(Value::as_object) else { continue };
        for (name, flow) in declared {
            let scopes: Vec<String> = flow
                .get("scopes")
                .and_then(Value::as_object)
                .map(|s| s.keys().cloned().collect())
                .unwrap_or_default();
            if let Some(auth_flow) = AuthFlow::from_openapi(name) {
                for scope in &scopes {
                    scope_flows.entry(scope.clone()).or_default().insert(auth_flow);
                }
            }
            flows.entry(name.clone()).or_default().extend(scopes);
        }
    }
    for scopes in flows.values_mut() {
        scopes.sort();
        scopes.dedup();
    }
    (flows, scope_flows)
}

/// Scopes from the operation's security, or the document default
fn operation_scopes(doc: &Value, op: &Value) -> Vec<String> {
    let security = op.get("security").or_else(|| doc.get("security"));
    let mut scopes: Vec<String> = security
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .flat_map(Map::values)
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    scopes.sort();
    scopes.dedup();
    scopes
}

/// The one flow every scope of the operation allows
pub fn select_flow(
    package: &str,
    operation_id: &str,
    module: &str,
    scopes: &[String],
    scope_flows: &BTreeMap<String, BTreeSet<AuthFlow>>,
) -> Result<AuthFlow, CodegenError> {
    let candidates: BTreeSet<AuthFlow> = if scopes.is_empty() {
        scope_flows.values().flatten().copied().collect()
    } else {
        let mut sets = scopes
            .iter()
            .map(|scope| scope_flows.get(scope).cloned().unwrap_or_default());
        let first = sets.next().unwrap_or_default();
        sets.fold(first, |acc, set| acc.intersection(&set).copied().collect())
    };

    if candidates.len() == 1 {
        if let Some(flow) = candidates.iter().next().copied() {
            return Ok(flow);
        }
    }
    let overridden = FLOW_OVERRIDES
        .iter()
        .any(|(p, target)| *p == package && (*target == operation_id || *target == module));
    if overridden {
        return Ok(AuthFlow::ClientCredentials);
    }
    Err(CodegenError::AmbiguousFlow {
        operation: format!("{}.{}", package, operation_id),
        flows: candidates.iter().map(|f| f.as_str().to_string()).collect(),
    })
}

/// Path-level parameters overlaid with operation parameters, `$ref`s resolved
fn merged_params(doc: &Value, shared: &[Value], op: &Value) -> Vec<Value> {
    let own = op.get("parameters").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut merged: Vec<Value> = Vec::new();
    for param in shared.iter().chain(own.iter()).map(|p| resolve(doc, p)) {
        let key = (param.get("name").cloned(), param.get("in").cloned());
        merged.retain(|p| (p.get("name").cloned(), p.get("in").cloned()) != key);
        merged.push(param);
    }
    merged
}

fn param_metas(raw: &[Value], op: &Value) -> Vec<ParamMeta> {
    let mut params: Vec<ParamMeta> = raw
        .iter()
        .filter_map(|p| {
            let name = p.get("name").and_then(Value::as_str)?;
            let kind = match p.get("in").and_then(Value::as_str)? {
                "path" => ParamKind::Path,
                "query" => ParamKind::Query,
                "header" if !MANAGED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) => ParamKind::Header,
                _ => return None,
            };
            let required = kind == ParamKind::Path || p.get("required").and_then(Value::as_bool).unwrap_or(false);
            Some(ParamMeta {
                name: name.to_string(),
                kind,
                required,
            })
        })
        .collect();

    if let Some(body) = op.get("requestBody") {
        params.push(ParamMeta {
            name: "body".to_string(),
            kind: ParamKind::Body,
            required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        });
    }
    params.sort_by_key(|p| p.kind);
    params
}

/// First array property of the 200 response, other than `warnings`
fn page_items_field(doc: &Value, op: &Value) -> Option<String> {
    let schema = op.pointer("/responses/200/content/application~1json/schema")?;
    let schema = resolve(doc, schema);
    let properties = schema.get("properties")?.as_object()?;
    properties
        .iter()
        .find(|(name, prop)| {
            name.as_str() != "warnings" && resolve(doc, prop).get("type").and_then(Value::as_str) == Some("array")
        })
        .map(|(name, _)| name.clone())
}

/// Largest accepted `limit`, from the schema or the description text
fn limit_maximum(raw: &[Value]) -> Option<u32> {
    let limit = raw.iter().find(|p| p.get("name").and_then(Value::as_str) == Some("limit"))?;
    if let Some(max) = limit.pointer("/schema/maximum").and_then(Value::as_u64) {
        return u32::try_from(max).ok();
    }
    let description = limit.get("description").and_then(Value::as_str)?;
    MAX_IN_DESCRIPTION
        .captures(description)
        .and_then(|caps| caps[1].parse().ok())
}

/// Follow a local `$ref`, once
fn resolve(doc: &Value, value: &Value) -> Value {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) => reference
            .strip_prefix('#')
            .and_then(|pointer| doc.pointer(pointer))
            .cloned()
            .unwrap_or(Value::Null),
        None => value.clone(),
    }
}

fn has_query(params: &[ParamMeta], name: &str) -> bool {
    params.iter().any(|p| p.kind == ParamKind::Query && p.name == name)
}
