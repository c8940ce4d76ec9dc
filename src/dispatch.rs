//! Call dispatcher
//!
//! Every facade method ends up here. A call is validated against its
//! descriptor, gets a token for the descriptor's auth flow, spends one unit
//! of the governor's budget and is then sent by the transport. Paged
//! operations repeat the last three steps for each page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::auth::{AuthFlow, TokenProvider};
use crate::config::ApiSettings;
use crate::error::{Error, ErrorCode, Result};
use crate::generated::DEVELOPER_ANALYTICS_GET_RATE_LIMITS;
use crate::governor::{RateGovernor, RateLimitsResponse};
use crate::operations::{OperationDescriptor, ParamKind, Params};
use crate::paging::{Page, PageFetcher, Paged};
use crate::transport::{ApiClient, TransportError};

/// Minimum spacing between two rate-limit refresh attempts
const REFRESH_RETRY: Duration = Duration::from_secs(60);

/// Field eBay uses for the total item count of a paged response
const TOTAL_FIELD: &str = "total";

/// Array eBay attaches to responses that is never the page payload
const WARNINGS_FIELD: &str = "warnings";

/// Executes operations on behalf of one facade
pub struct Dispatcher {
    client: ApiClient,
    governor: Arc<RateGovernor>,
    tokens: Arc<dyn TokenProvider>,
    settings: ApiSettings,
    refresh_gate: AsyncMutex<RefreshGate>,
}

impl Dispatcher {
    pub fn new(
        client: ApiClient,
        governor: Arc<RateGovernor>,
        tokens: Arc<dyn TokenProvider>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            client,
            governor,
            tokens,
            settings,
            refresh_gate: AsyncMutex::new(RefreshGate::default()),
        }
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// Run a single-response operation
    #[instrument(skip(self, params), fields(operation = op.method_name))]
    pub async fn method_single(&self, op: &'static OperationDescriptor, params: Params) -> Result<Value> {
        validate(op, &params)?;
        self.dispatch(op, &params).await
    }

    /// Bind a paged operation; nothing is sent until the first item is read
    pub fn method_paged(self: &Arc<Self>, op: &'static OperationDescriptor, mut params: Params) -> Result<Paged<Value>> {
        params.remove("offset");
        params.remove("limit");
        validate(op, &params)?;

        let limit = page_size(self.settings.page_size, op.max_limit);
        debug!(operation = op.method_name, limit, "Paged call bound");
        Ok(Paged::new(
            OperationPages {
                dispatcher: Arc::clone(self),
                op,
                params,
            },
            limit,
        ))
    }

    /// Token, governor, transport
    async fn dispatch(&self, op: &'static OperationDescriptor, params: &Params) -> Result<Value> {
        let token = self.token_for(op).await?;
        self.refresh_if_due().await?;

        if self.settings.throttle {
            self.governor
                .decrement_throttled(op.base_path, op.rate_keys, self.settings.timeout())
                .await?;
        } else {
            self.governor.decrement(op.base_path, op.rate_keys);
        }

        self.client
            .execute(op, params, &token)
            .await
            .map_err(|e| wrap_transport(op, e))
    }

    async fn token_for(&self, op: &OperationDescriptor) -> Result<String> {
        match op.flow {
            AuthFlow::ClientCredentials => self.application_token().await,
            AuthFlow::AuthorizationCode => {
                let user = self.settings.user_credential_id.as_deref().ok_or_else(|| {
                    Error::new(ErrorCode::NoUserCredential).with_detail(op.method_name)
                })?;
                self.tokens
                    .get_user_token(user)
                    .await
                    .map_err(|e| Error::new(ErrorCode::UserToken).with_detail(user).with_cause(e))
            }
        }
    }

    async fn application_token(&self) -> Result<String> {
        let app = &self.settings.application_credential_id;
        self.tokens
            .get_application_token(app)
            .await
            .map_err(|e| Error::new(ErrorCode::ApplicationToken).with_detail(app.as_str()).with_cause(e))
    }

    /// Fetch fresh rate limits when the governor asks for them
    ///
    /// Attempts are spaced at least [`REFRESH_RETRY`] apart. A failed attempt
    /// fails every call until the next attempt is allowed.
    async fn refresh_if_due(&self) -> Result<()> {
        if !self.governor.need_refresh() {
            return Ok(());
        }
        let mut gate = self.refresh_gate.lock().await;
        if !self.governor.need_refresh() {
            return Ok(());
        }
        if let Some(at) = gate.last_attempt {
            if at.elapsed() < REFRESH_RETRY {
                return match &gate.last_error {
                    Some(message) => Err(Error::new(ErrorCode::RateLimitRefresh)
                        .with_detail(format!("last attempt failed: {}", message))),
                    None => Ok(()),
                };
            }
        }
        gate.last_attempt = Some(Instant::now());

        info!(app = %self.settings.application_credential_id, "Fetching eBay rate limits");
        match self.fetch_rate_limits().await {
            Ok(response) => {
                gate.last_error = None;
                self.governor.refresh(response.into_records());
                Ok(())
            }
            Err(e) => {
                e.log();
                gate.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch_rate_limits(&self) -> Result<RateLimitsResponse> {
        let token = self
            .application_token()
            .await
            .map_err(|e| Error::new(ErrorCode::RateLimitRefresh).with_cause(e))?;
        let value = self
            .client
            .execute(&DEVELOPER_ANALYTICS_GET_RATE_LIMITS, &Params::new(), &token)
            .await
            .map_err(|e| Error::new(ErrorCode::RateLimitRefresh).with_cause(e))?;
        serde_json::from_value(value).map_err(|e| Error::new(ErrorCode::RateLimitRefresh).with_cause(e))
    }
}

/// Outcome of the last rate-limit refresh attempt
#[derive(Debug, Default)]
struct RefreshGate {
    last_attempt: Option<Instant>,
    /// Rendered error of the last attempt, if it failed
    last_error: Option<String>,
}

/// Page fetcher bound to one paged call
struct OperationPages {
    dispatcher: Arc<Dispatcher>,
    op: &'static OperationDescriptor,
    params: Params,
}

#[async_trait]
impl PageFetcher<Value> for OperationPages {
    async fn fetch(&mut self, offset: u64, limit: u32) -> Result<Page<Value>> {
        let params = self.params.clone().with("offset", offset).with("limit", limit);
        let value = self.dispatcher.dispatch(self.op, &params).await?;
        extract_page(self.op, value)
    }
}

/// Page size: configured size capped by the endpoint's maximum
pub fn page_size(configured: u32, max_limit: Option<u32>) -> u32 {
    match max_limit {
        Some(max) => configured.min(max),
        None => configured,
    }
    .max(1)
}

/// Split a page response into its items and the reported total
///
/// eBay omits the item array entirely when a page is empty.
pub fn extract_page(op: &OperationDescriptor, value: Value) -> Result<Page<Value>> {
    let Value::Object(mut body) = value else {
        return Err(Error::new(ErrorCode::MalformedPage).with_detail(format!("{}: not an object", op.method_name)));
    };

    let total = body.get(TOTAL_FIELD).and_then(Value::as_u64);
    let field = match op.items_field {
        Some(field) => Some(field.to_string()),
        None => body
            .iter()
            .find(|(name, v)| name.as_str() != WARNINGS_FIELD && v.is_array())
            .map(|(name, _)| name.clone()),
    };

    let items = match field.and_then(|f| body.remove(&f)) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(Error::new(ErrorCode::MalformedPage)
                .with_detail(format!("{}: item field is not an array", op.method_name)))
        }
    };

    Ok(Page { items, total })
}

/// Check supplied parameters against the descriptor
pub fn validate(op: &OperationDescriptor, params: &Params) -> Result<()> {
    if let Some(missing) = op.required_params().find(|p| !params.has(p)) {
        return Err(Error::new(ErrorCode::MissingParameter).with_detail(format!("{}: {}", op.method_name, missing.name)));
    }
    if let Some(unknown) = params.names().find(|name| op.param(name).is_none()) {
        return Err(Error::new(ErrorCode::UnknownParameter).with_detail(format!("{}: {}", op.method_name, unknown)));
    }
    if params.body_value().is_some() && !op.params.iter().any(|p| p.kind == ParamKind::Body) {
        return Err(Error::new(ErrorCode::UnknownParameter).with_detail(format!("{}: body", op.method_name)));
    }
    Ok(())
}

/// Middleware failures already carry a library error; anything else is 14001
fn wrap_transport(op: &OperationDescriptor, err: TransportError) -> Error {
    match err {
        TransportError::Middleware(inner) => inner,
        other => Error::new(ErrorCode::Transport).with_detail(op.method_name).with_cause(other),
    }
}
