//! Unified eBay API facade
//!
//! [`EbayApi`] is the whole public surface: one method per eBay operation
//! (see the `generated` module) plus name-based `call` and `paged` helpers.
//! Facades are shared through a process-wide registry keyed by
//! [`FacadeKey`], and every facade of one application shares one
//! [`RateGovernor`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::auth::{StaticTokenProvider, TokenProvider};
use crate::config::{ApiSettings, Settings};
use crate::dispatch::Dispatcher;
use crate::error::{Error, ErrorCode, Result};
use crate::generated;
use crate::governor::RateGovernor;
use crate::multiton::{Multiton, WeakRegistry};
use crate::operations::{Host, OperationDescriptor, Params};
use crate::paging::Paged;
use crate::signing::{MiddlewareChain, RequestMiddleware, SignatureMiddleware, Signer};
use crate::transport::{ApiClient, Configuration};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

/// Facades by key and governors by application id
///
/// Facades are released after an idle hour. A governor lives as long as any
/// facade of its application, so an application never has two governors.
#[derive(Default)]
pub struct Registry {
    facades: Multiton<FacadeKey, Arc<EbayApi>>,
    governors: WeakRegistry<String, RateGovernor>,
}

impl Registry {
    pub fn new(facades: Multiton<FacadeKey, Arc<EbayApi>>) -> Self {
        Self {
            facades,
            governors: WeakRegistry::new(),
        }
    }

    pub fn facades(&self) -> &Multiton<FacadeKey, Arc<EbayApi>> {
        &self.facades
    }

    pub fn governors(&self) -> &WeakRegistry<String, RateGovernor> {
        &self.governors
    }
}

/// Construction key of a facade
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FacadeKey {
    pub application_credential_id: String,
    pub user_credential_id: Option<String>,
    pub use_sandbox: bool,
    pub site_id: String,
    pub throttle: bool,
    /// Timeout in whole milliseconds; `None` is unbounded
    pub timeout_ms: Option<u64>,
}

impl From<&ApiSettings> for FacadeKey {
    fn from(settings: &ApiSettings) -> Self {
        Self {
            application_credential_id: settings.application_credential_id.clone(),
            user_credential_id: settings.user_credential_id.clone(),
            use_sandbox: settings.use_sandbox,
            site_id: settings.site_id.clone(),
            throttle: settings.throttle,
            timeout_ms: settings.timeout().map(|t| t.as_millis() as u64),
        }
    }
}

/// Client for every eBay REST operation
pub struct EbayApi {
    key: FacadeKey,
    dispatcher: Arc<Dispatcher>,
}

impl EbayApi {
    /// Shared facade for these settings, with no token source
    pub fn new(settings: ApiSettings) -> Result<Arc<Self>> {
        Self::builder(settings).build()
    }

    pub fn builder(settings: ApiSettings) -> EbayApiBuilder {
        EbayApiBuilder::new(settings)
    }

    /// Shared facade using the static tokens and key pair from settings
    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        let mut builder = Self::builder(settings.api.clone())
            .token_provider(Arc::new(StaticTokenProvider::from_settings(settings)));
        if let Some(key_pair_id) = &settings.credentials.key_pair_id {
            builder = builder.key_pair_id(key_pair_id);
        }
        builder.build()
    }

    pub fn key(&self) -> &FacadeKey {
        &self.key
    }

    pub fn settings(&self) -> &ApiSettings {
        self.dispatcher.settings()
    }

    /// Governor shared by every facade of this application
    pub fn governor(&self) -> &Arc<RateGovernor> {
        self.dispatcher.governor()
    }

    /// Every operation the facade knows, sorted by (api, module, method)
    pub fn operations() -> &'static [&'static OperationDescriptor] {
        generated::OPERATIONS
    }

    /// Call an operation by method name and return the raw JSON response
    ///
    /// For a paged operation this returns one page exactly as eBay sent it.
    pub async fn call(&self, method_name: &str, params: Params) -> Result<Value> {
        let op = lookup(method_name)?;
        self.method_single(op, params).await
    }

    /// Call an operation by name and decode the response into `T`
    pub async fn call_as<T: DeserializeOwned>(&self, method_name: &str, params: Params) -> Result<T> {
        let value = self.call(method_name, params).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::new(ErrorCode::ResponseDecode).with_detail(method_name).with_cause(e))
    }

    /// Iterate every item of a paged operation by name
    pub fn paged(&self, method_name: &str, params: Params) -> Result<Paged<Value>> {
        let op = lookup(method_name)?;
        if !op.is_paged() {
            return Err(Error::new(ErrorCode::UnknownOperation)
                .with_detail(format!("{} is not a paged operation", method_name)));
        }
        self.method_paged(op, params)
    }

    pub async fn method_single(&self, op: &'static OperationDescriptor, params: Params) -> Result<Value> {
        self.dispatcher.method_single(op, params).await
    }

    pub fn method_paged(&self, op: &'static OperationDescriptor, params: Params) -> Result<Paged<Value>> {
        self.dispatcher.method_paged(op, params)
    }

    /// Number of facades currently retained by the registry
    pub fn registry_len() -> usize {
        REGISTRY.facades.len()
    }

    /// Drop every registered facade and governor
    pub fn release_all() {
        REGISTRY.facades.clear();
        REGISTRY.governors.clear();
    }
}

fn lookup(method_name: &str) -> Result<&'static OperationDescriptor> {
    generated::find(method_name)
        .ok_or_else(|| Error::new(ErrorCode::UnknownOperation).with_detail(method_name))
}

/// Options that do not take part in the registry key
///
/// The first build for a key decides these; later builds with the same key
/// receive the already-registered facade.
pub struct EbayApiBuilder {
    settings: ApiSettings,
    tokens: Option<Arc<dyn TokenProvider>>,
    signer: Option<Arc<dyn Signer>>,
    key_pair_id: Option<String>,
    middleware: Vec<Arc<dyn RequestMiddleware>>,
    base_urls: Vec<(Host, String)>,
}

impl EbayApiBuilder {
    fn new(settings: ApiSettings) -> Self {
        Self {
            settings,
            tokens: None,
            signer: None,
            key_pair_id: None,
            middleware: Vec::new(),
            base_urls: Vec::new(),
        }
    }

    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn key_pair_id(mut self, key_pair_id: impl Into<String>) -> Self {
        self.key_pair_id = Some(key_pair_id.into());
        self
    }

    /// Extra middleware, run before the signature step
    pub fn middleware(mut self, layer: Arc<dyn RequestMiddleware>) -> Self {
        self.middleware.push(layer);
        self
    }

    pub fn base_url(mut self, host: Host, base: impl Into<String>) -> Self {
        self.base_urls.push((host, base.into()));
        self
    }

    /// Registered facade for the key, constructing it on first use
    pub fn build(self) -> Result<Arc<EbayApi>> {
        self.build_in(&REGISTRY)
    }

    /// As [`EbayApiBuilder::build`], against a caller-owned registry
    pub fn build_in(self, registry: &Registry) -> Result<Arc<EbayApi>> {
        let key = FacadeKey::from(&self.settings);
        let governor = registry
            .governors
            .get_or_init(&key.application_credential_id, RateGovernor::new);
        registry
            .facades
            .get_or_try_init(&key, || self.construct(key.clone(), governor))
    }

    fn construct(self, key: FacadeKey, governor: Arc<RateGovernor>) -> Result<Arc<EbayApi>> {
        let mut config = Configuration::new(
            self.settings.use_sandbox,
            self.settings.site_id.clone(),
            self.settings.timeout(),
        );
        for (host, base) in self.base_urls {
            config = config.with_base_url(host, base);
        }

        let mut chain = MiddlewareChain::new();
        for layer in self.middleware {
            chain.push(layer);
        }
        if let Some(signer) = self.signer {
            chain.push(Arc::new(SignatureMiddleware::new(signer, self.key_pair_id)));
        }

        let client = ApiClient::new(config, chain).map_err(|e| {
            Error::new(ErrorCode::MultitonConstruct)
                .with_detail(key.application_credential_id.as_str())
                .with_cause(e)
        })?;
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(StaticTokenProvider::new()));

        info!(
            app = %key.application_credential_id,
            sandbox = key.use_sandbox,
            site = %key.site_id,
            throttle = key.throttle,
            "eBay facade created"
        );
        let dispatcher = Arc::new(Dispatcher::new(client, governor, tokens, self.settings));
        Ok(Arc::new(EbayApi { key, dispatcher }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_instance() {
        let a = EbayApi::new(ApiSettings::new("facade-same")).unwrap();
        let b = EbayApi::new(ApiSettings::new("facade-same")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_key_fields_distinguish_instances() {
        let mut sandbox = ApiSettings::new("facade-distinct");
        sandbox.use_sandbox = true;
        let live = EbayApi::new(ApiSettings::new("facade-distinct")).unwrap();
        let sandbox = EbayApi::new(sandbox).unwrap();

        assert!(!Arc::ptr_eq(&live, &sandbox));
        assert!(Arc::ptr_eq(live.governor(), sandbox.governor()));
    }

    #[test]
    fn test_unbounded_timeout_key() {
        let mut settings = ApiSettings::new("facade-timeout");
        settings.timeout = -1.0;
        assert_eq!(FacadeKey::from(&settings).timeout_ms, None);
        settings.timeout = 2.5;
        assert_eq!(FacadeKey::from(&settings).timeout_ms, Some(2500));
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let api = EbayApi::new(ApiSettings::new("facade-unknown")).unwrap();
        let err = api.call("buy_browse_teleport", Params::new()).await.unwrap_err();
        assert_eq!(err.number(), 14002);

        let err = api.paged("buy_browse_get_item", Params::new()).err().unwrap();
        assert_eq!(err.number(), 14002);
    }

    #[test]
    fn test_operations_sorted() {
        let ops = EbayApi::operations();
        assert!(!ops.is_empty());
        let keys: Vec<_> = ops.iter().map(|o| (o.api, o.module, o.method_name)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_governor_outlives_idle_registry_entry() {
        use crate::clock::ManualClock;
        use chrono::Duration;

        let clock = Arc::new(ManualClock::default());
        let registry = Registry::new(Multiton::with_clock(Duration::hours(1), clock.clone()));

        let us = EbayApi::builder(ApiSettings::new("facade-long-lived")).build_in(&registry).unwrap();

        // calls through `us` never touch the registry
        clock.advance(Duration::minutes(61));
        let mut gb_settings = ApiSettings::new("facade-long-lived");
        gb_settings.site_id = "EBAY_GB".to_string();
        let gb = EbayApi::builder(gb_settings).build_in(&registry).unwrap();

        assert!(Arc::ptr_eq(us.governor(), gb.governor()));
        assert!(!registry.facades().contains(us.key()));

        let us_again = EbayApi::builder(ApiSettings::new("facade-long-lived")).build_in(&registry).unwrap();
        assert!(!Arc::ptr_eq(&us, &us_again));
        assert!(Arc::ptr_eq(us.governor(), us_again.governor()));
    }

    #[test]
    fn test_governor_released_with_last_facade() {
        let registry = Registry::default();
        let api = EbayApi::builder(ApiSettings::new("facade-released")).build_in(&registry).unwrap();
        assert_eq!(registry.governors().len(), 1);

        registry.facades().clear();
        drop(api);
        assert!(registry.governors().is_empty());
    }
}
