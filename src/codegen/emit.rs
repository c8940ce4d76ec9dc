//! Render harvested operations into the facade source
//!
//! Output is deterministic: operations are sorted by api, module and
//! method name, and only the regions between anchor comments change.

use std::fmt::{self, Write as _};

use super::docstring::{wrap, WRAP_WIDTH};
use super::harvest::{OperationMeta, ParamMeta};
use super::{snake_case, CodegenError};
use crate::auth::AuthFlow;
use crate::operations::{Host, Pagination, ParamKind};

pub const PACKAGES_ANCHOR: &str = "packages";
pub const DESCRIPTORS_ANCHOR: &str = "descriptors";
pub const METHODS_ANCHOR: &str = "methods";

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "self",
    "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while", "yield",
];

/// Argument names the generated methods already use
const RESERVED: &[&str] = &["params", "body"];

/// Splice all three regions of `source`
pub fn emit(source: &str, operations: &[OperationMeta], packages: &[String]) -> Result<String, CodegenError> {
    let mut sorted: Vec<&OperationMeta> = operations.iter().collect();
    sorted.sort_by(|a, b| (&a.api, &a.module, &a.method_name).cmp(&(&b.api, &b.module, &b.method_name)));

    let mut packages: Vec<&String> = packages.iter().collect();
    packages.sort();
    packages.dedup();

    let text = splice(source, PACKAGES_ANCHOR, &render_packages(&packages))?;
    let text = splice(&text, DESCRIPTORS_ANCHOR, &render_descriptors(&sorted)?)?;
    splice(&text, METHODS_ANCHOR, &render_methods(&sorted)?)
}

/// Replace the lines between `// ANCHOR <name> BEGIN` and `// ANCHOR <name> END`
pub fn splice(source: &str, name: &str, body: &str) -> Result<String, CodegenError> {
    let begin = format!("// ANCHOR {} BEGIN", name);
    let end = format!("// ANCHOR {} END", name);

    let lines: Vec<&str> = source.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.trim() == begin)
        .ok_or_else(|| CodegenError::AnchorMissing(begin.clone()))?;
    let stop = lines[start + 1..]
        .iter()
        .position(|l| l.trim() == end)
        .map(|i| i + start + 1)
        .ok_or_else(|| CodegenError::AnchorMissing(end.clone()))?;

    let mut out = String::with_capacity(source.len() + body.len());
    for line in &lines[..=start] {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(body);
    for line in &lines[stop..] {
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}

pub fn render_packages(packages: &[&String]) -> String {
    packages.iter().map(|p| format!("pub mod {};\n", p)).collect()
}

pub fn render_descriptors(operations: &[&OperationMeta]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for op in operations {
        render_descriptor(&mut out, op)?;
        out.push('\n');
    }
    out.push_str("pub static OPERATIONS: &[&OperationDescriptor] = &[\n");
    for op in operations {
        writeln!(out, "    &{},", static_name(op))?;
    }
    out.push_str("];\n");
    Ok(out)
}

fn render_descriptor(out: &mut String, op: &OperationMeta) -> fmt::Result {
    writeln!(out, "pub static {}: OperationDescriptor = OperationDescriptor {{", static_name(op))?;
    writeln!(out, "    method_name: {:?},", op.method_name)?;
    writeln!(out, "    module: {:?},", op.module)?;
    writeln!(out, "    api: {:?},", op.api)?;
    writeln!(out, "    base_path: {:?},", op.base_path)?;
    writeln!(out, "    operation_id: {:?},", op.operation_id)?;
    writeln!(out, "    http_method: {:?},", op.http_method)?;
    writeln!(out, "    path: {:?},", op.path)?;
    writeln!(out, "    host: {},", host_literal(op.host))?;
    writeln!(out, "    flow: {},", flow_literal(op.flow))?;
    if op.params.is_empty() {
        out.push_str("    params: &[],\n");
    } else {
        out.push_str("    params: &[\n");
        for param in &op.params {
            writeln!(
                out,
                "        ParamSpec {{ name: {:?}, kind: {}, required: {} }},",
                param.name,
                kind_literal(param.kind),
                param.required
            )?;
        }
        out.push_str("    ],\n");
    }
    let keys: Vec<String> = op.rate_keys.iter().map(|k| format!("{:?}", k)).collect();
    writeln!(out, "    rate_keys: &[{}],", keys.join(", "))?;
    writeln!(out, "    pagination: {},", pagination_literal(op.pagination))?;
    match &op.items_field {
        Some(field) => writeln!(out, "    items_field: Some({:?}),", field)?,
        None => out.push_str("    items_field: None,\n"),
    }
    match op.max_limit {
        Some(max) => writeln!(out, "    max_limit: Some({}),", max)?,
        None => out.push_str("    max_limit: None,\n"),
    }
    out.push_str("};\n");
    Ok(())
}

pub fn render_methods(operations: &[&OperationMeta]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for (i, op) in operations.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_method(&mut out, op)?;
    }
    Ok(out)
}

fn render_method(out: &mut String, op: &OperationMeta) -> fmt::Result {
    if !op.doc.is_empty() {
        for line in wrap(&op.doc, WRAP_WIDTH) {
            writeln!(out, "    /// {}", line)?;
        }
        out.push_str("    ///\n");
    }
    writeln!(out, "    /// `{} {}{}`", op.http_method, op.base_path, op.path)?;

    let positional = positional_params(&op.params);
    let mut signature = String::from("&self");
    let mut call = String::from("params");
    for param in &positional {
        if param.kind == ParamKind::Body {
            signature.push_str(", body: Value");
            call.push_str(".body(body)");
        } else {
            let ident = arg_ident(&param.name);
            write!(signature, ", {}: &str", ident)?;
            write!(call, ".with({:?}, {})", param.name, ident)?;
        }
    }
    signature.push_str(", params: Params");

    let name = static_name(op);
    match op.pagination {
        Pagination::Single => {
            writeln!(out, "    pub async fn {}({}) -> Result<Value> {{", op.method_name, signature)?;
            writeln!(out, "        self.method_single(&{}, {}).await", name, call)?;
        }
        Pagination::Paged => {
            writeln!(out, "    pub fn {}({}) -> Result<Paged<Value>> {{", op.method_name, signature)?;
            writeln!(out, "        self.method_paged(&{}, {})", name, call)?;
        }
    }
    out.push_str("    }\n");
    Ok(())
}

/// Required parameters in declaration order, grouped by kind
pub fn positional_params(params: &[ParamMeta]) -> Vec<&ParamMeta> {
    let mut required: Vec<&ParamMeta> = params.iter().filter(|p| p.required).collect();
    required.sort_by_key(|p| p.kind);
    required
}

/// Rust identifier for a wire parameter name
pub fn arg_ident(name: &str) -> String {
    let mut ident = snake_case(name);
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert_str(0, "p_");
    }
    if KEYWORDS.contains(&ident.as_str()) || RESERVED.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

fn static_name(op: &OperationMeta) -> String {
    op.method_name.to_uppercase()
}

fn host_literal(host: Host) -> &'static str {
    match host {
        Host::Api => "Host::Api",
        Host::Apiz => "Host::Apiz",
    }
}

fn flow_literal(flow: AuthFlow) -> &'static str {
    match flow {
        AuthFlow::ClientCredentials => "AuthFlow::ClientCredentials",
        AuthFlow::AuthorizationCode => "AuthFlow::AuthorizationCode",
    }
}

fn kind_literal(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Path => "ParamKind::Path",
        ParamKind::Query => "ParamKind::Query",
        ParamKind::Header => "ParamKind::Header",
        ParamKind::Body => "ParamKind::Body",
    }
}

fn pagination_literal(pagination: Pagination) -> &'static str {
    match pagination {
        Pagination::Single => "Pagination::Single",
        Pagination::Paged => "Pagination::Paged",
    }
}
