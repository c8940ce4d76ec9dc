//! HTTP transport for eBay operations
//!
//! [`ApiClient`] turns an [`OperationDescriptor`] plus call [`Params`] into one
//! HTTP request, runs it through the middleware chain and returns the decoded
//! JSON body. It knows nothing about tokens or rate budgets; the dispatcher
//! handles those.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::operations::{Host, OperationDescriptor, ParamKind, Params};
use crate::signing::MiddlewareChain;

/// Header naming the marketplace a call targets
pub const MARKETPLACE_HEADER: &str = "X-EBAY-C-MARKETPLACE-ID";

const USER_AGENT: &str = concat!("ebay-rest/", env!("CARGO_PKG_VERSION"));

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Failure raised by the transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("eBay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    Request(String),

    #[error(transparent)]
    Middleware(crate::error::Error),
}

impl TransportError {
    /// HTTP status, when eBay answered
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Connection settings shared by every call of one facade
#[derive(Debug, Clone)]
pub struct Configuration {
    pub sandbox: bool,
    /// Marketplace sent in [`MARKETPLACE_HEADER`]
    pub site_id: String,
    /// Per-request timeout; `None` is unbounded
    pub timeout: Option<Duration>,
    api_base: Option<String>,
    apiz_base: Option<String>,
}

impl Configuration {
    pub fn new(sandbox: bool, site_id: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            sandbox,
            site_id: site_id.into(),
            timeout,
            api_base: None,
            apiz_base: None,
        }
    }

    /// Send calls for a host family to another base URL (proxies, tests)
    pub fn with_base_url(mut self, host: Host, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        match host {
            Host::Api => self.api_base = Some(base),
            Host::Apiz => self.apiz_base = Some(base),
        }
        self
    }

    /// Scheme and authority for a host family
    pub fn base_url(&self, host: Host) -> String {
        let overridden = match host {
            Host::Api => &self.api_base,
            Host::Apiz => &self.apiz_base,
        };
        if let Some(base) = overridden {
            return base.clone();
        }
        let name = match (host, self.sandbox) {
            (Host::Api, false) => "api.ebay.com",
            (Host::Api, true) => "api.sandbox.ebay.com",
            (Host::Apiz, false) => "apiz.ebay.com",
            (Host::Apiz, true) => "apiz.sandbox.ebay.com",
        };
        format!("https://{}", name)
    }
}

/// Executes descriptor-driven requests
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: Configuration,
    middleware: MiddlewareChain,
}

impl ApiClient {
    pub fn new(config: Configuration, middleware: MiddlewareChain) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
            middleware,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Full URL for a call, path placeholders filled and query attached
    pub fn url_for(&self, op: &OperationDescriptor, params: &Params) -> Result<Url, TransportError> {
        let mut path = op.path.to_string();
        for spec in op.params.iter().filter(|p| p.kind == ParamKind::Path) {
            let value = params
                .get(spec.name)
                .ok_or_else(|| TransportError::Request(format!("path parameter {} not set", spec.name)))?;
            let encoded = utf8_percent_encode(value, SEGMENT).to_string();
            path = path.replace(&format!("{{{}}}", spec.name), &encoded);
        }

        let raw = format!("{}{}{}", self.config.base_url(op.host), op.base_path, path);
        let mut url = Url::parse(&raw).map_err(|e| TransportError::Request(format!("{}: {}", raw, e)))?;

        let query: Vec<(&str, &str)> = op
            .params
            .iter()
            .filter(|p| p.kind == ParamKind::Query)
            .filter_map(|p| params.get(p.name).map(|v| (p.name, v)))
            .collect();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Send one call and decode its JSON body
    ///
    /// An empty body (including HTTP 204) yields `Value::Null`.
    #[instrument(skip(self, params, token), fields(operation = op.method_name))]
    pub async fn execute(
        &self,
        op: &OperationDescriptor,
        params: &Params,
        token: &str,
    ) -> Result<Value, TransportError> {
        let method = Method::from_bytes(op.http_method.as_bytes())
            .map_err(|_| TransportError::Request(format!("bad HTTP method {}", op.http_method)))?;
        let url = self.url_for(op, params)?;
        debug!(method = %method, url = %url, "eBay API request");

        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .header(MARKETPLACE_HEADER, &self.config.site_id);

        for spec in op.params.iter().filter(|p| p.kind == ParamKind::Header) {
            if let Some(value) = params.get(spec.name) {
                builder = builder.header(spec.name, value);
            }
        }
        if let Some(body) = params.body_value() {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let request = builder.build()?;
        let request = self
            .middleware
            .apply(request)
            .await
            .map_err(TransportError::Middleware)?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthFlow;
    use crate::operations::{Pagination, ParamSpec};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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
        params: &[
            ParamSpec { name: "item_id", kind: ParamKind::Path, required: true },
            ParamSpec { name: "fieldgroups", kind: ParamKind::Query, required: false },
        ],
        rate_keys: &["buy.browse", "buy.browse.item"],
        pagination: Pagination::Single,
        items_field: None,
        max_limit: None,
    };

    static PUT_ITEM: OperationDescriptor = OperationDescriptor {
        method_name: "sell_inventory_create_or_replace_inventory_item",
        module: "inventory_item",
        api: "sell_inventory",
        base_path: "/sell/inventory/v1",
        operation_id: "createOrReplaceInventoryItem",
        http_method: "PUT",
        path: "/inventory_item/{sku}",
        host: Host::Api,
        flow: AuthFlow::AuthorizationCode,
        params: &[
            ParamSpec { name: "sku", kind: ParamKind::Path, required: true },
            ParamSpec { name: "Content-Language", kind: ParamKind::Header, required: true },
            ParamSpec { name: "body", kind: ParamKind::Body, required: true },
        ],
        rate_keys: &["sell.inventory", "sell.inventory.inventory_item"],
        pagination: Pagination::Single,
        items_field: None,
        max_limit: None,
    };

    fn client(server: &MockServer) -> ApiClient {
        let config = Configuration::new(false, "EBAY_GB", Some(Duration::from_secs(5)))
            .with_base_url(Host::Api, server.uri());
        ApiClient::new(config, MiddlewareChain::new()).expect("http client")
    }

    #[test]
    fn test_hosts() {
        let live = Configuration::new(false, "EBAY_US", None);
        let sandbox = Configuration::new(true, "EBAY_US", None);
        assert_eq!(live.base_url(Host::Api), "https://api.ebay.com");
        assert_eq!(live.base_url(Host::Apiz), "https://apiz.ebay.com");
        assert_eq!(sandbox.base_url(Host::Api), "https://api.sandbox.ebay.com");
        assert_eq!(sandbox.base_url(Host::Apiz), "https://apiz.sandbox.ebay.com");
    }

    #[test]
    fn test_url_encodes_path_segments() {
        let config = Configuration::new(false, "EBAY_US", None);
        let client = ApiClient::new(config, MiddlewareChain::new()).unwrap();
        let params = Params::new().with("item_id", "v1|110|0").with("fieldgroups", "PRODUCT");

        let url = client.url_for(&GET_ITEM, &params).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.ebay.com/buy/browse/v1/item/v1%7C110%7C0?fieldgroups=PRODUCT"
        );
    }

    #[tokio::test]
    async fn test_get_sends_auth_and_marketplace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/buy/browse/v1/item/v1%7C42%7C0"))
            .and(query_param("fieldgroups", "COMPACT"))
            .and(header("authorization", "Bearer app-token"))
            .and(header("x-ebay-c-marketplace-id", "EBAY_GB"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"itemId": "v1|42|0"})))
            .expect(1)
            .mount(&server)
            .await;

        let params = Params::new().with("item_id", "v1|42|0").with("fieldgroups", "COMPACT");
        let value = client(&server).execute(&GET_ITEM, &params, "app-token").await.unwrap();
        assert_eq!(value["itemId"], "v1|42|0");
    }

    #[tokio::test]
    async fn test_no_content_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/sell/inventory/v1/inventory_item/SKU-1"))
            .and(header("content-language", "en-US"))
            .and(body_json(json!({"condition": "NEW"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let params = Params::new()
            .with("sku", "SKU-1")
            .with("Content-Language", "en-US")
            .body(json!({"condition": "NEW"}));
        let value = client(&server).execute(&PUT_ITEM, &params, "user-token").await.unwrap();
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"errors":[{"errorId":11001}]}"#))
            .mount(&server)
            .await;

        let params = Params::new().with("item_id", "missing");
        let err = client(&server).execute(&GET_ITEM, &params, "t").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, TransportError::Status { ref body, .. } if body.contains("11001")));
    }

    #[tokio::test]
    async fn test_missing_path_param() {
        let server = MockServer::start().await;
        let err = client(&server).execute(&GET_ITEM, &Params::new(), "t").await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
