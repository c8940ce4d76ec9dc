//! Contract discovery on developer.ebay.com
//!
//! Breadth-first scrape from the "selling apps" and "buying apps" seed
//! pages: category pages, API index pages, API overview pages and finally
//! the OpenAPI contract links. Each stage fetches its pages concurrently,
//! paced by a shared rate limiter.

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use tracing::{debug, error, info};

use super::CodegenError;

/// Default seed pages
pub const SEED_PAGES: [&str; 2] = [
    "https://developer.ebay.com/develop/selling-apps",
    "https://developer.ebay.com/develop/buying-apps",
];

static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

static CONTRACT_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<category>[a-z]+)_(?P<call>[a-z0-9_]+?)_v(?P<version>\d+)(?P<beta>_beta)?_oas3\.json$")
        .expect("valid regex")
});

/// One scrape stage: which links on the previous stage's pages to follow
#[derive(Debug, Clone)]
pub struct LinkRule {
    pub stage: &'static str,
    /// Matched against the link's URL path
    pub pattern: Regex,
}

impl LinkRule {
    pub fn new(stage: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            stage,
            pattern: Regex::new(pattern)?,
        })
    }
}

/// Stages from the seed pages down to contract files
pub fn default_rules() -> Vec<LinkRule> {
    [
        ("category", r"^/develop/(?:selling|buying)-apps/[a-z0-9-]+/?$"),
        ("api-index", r"^/develop/api/[a-z0-9_-]+/?$"),
        ("overview", r"^/api-docs/[a-z]+/[a-z0-9_-]+/(?:static/)?overview\.html$"),
        ("contract", r"_oas3\.json$"),
    ]
    .into_iter()
    .filter_map(|(stage, pattern)| LinkRule::new(stage, pattern).ok())
    .collect()
}

/// A discovered OpenAPI contract
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractRef {
    /// `buy`, `sell`, `commerce`, ...
    pub category: String,
    /// `browse`, `inventory`, ...
    pub call_name: String,
    pub version: u32,
    pub beta: bool,
    pub url: String,
}

impl ContractRef {
    /// Parse a contract URL whose last segment is a canonical contract filename
    pub fn from_url(url: &str) -> Option<Self> {
        let filename = url.rsplit('/').next()?;
        let mut contract = Self::from_filename(filename)?;
        contract.url = url.to_string();
        Some(contract)
    }

    /// `sell_inventory_v1_oas3.json`, `developer_analytics_v1_beta_oas3.json`
    pub fn from_filename(filename: &str) -> Option<Self> {
        let caps = CONTRACT_FILE.captures(filename)?;
        Some(Self {
            category: caps["category"].to_string(),
            call_name: caps["call"].to_string(),
            version: caps["version"].parse().ok()?,
            beta: caps.name("beta").is_some(),
            url: String::new(),
        })
    }

    /// Package and API name, e.g. `sell_inventory`
    pub fn package(&self) -> String {
        format!("{}_{}", self.category, self.call_name)
    }

    pub fn filename(&self) -> String {
        format!(
            "{}_{}_v{}{}_oas3.json",
            self.category,
            self.call_name,
            self.version,
            if self.beta { "_beta" } else { "" }
        )
    }
}

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Paced scraper
#[derive(Clone)]
pub struct Discoverer {
    client: Client,
    limiter: Arc<Limiter>,
    concurrency: usize,
    seeds: Vec<String>,
    rules: Vec<LinkRule>,
}

impl Discoverer {
    pub fn new(requests_per_second: u32, concurrency: usize) -> Result<Self, CodegenError> {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("ebay-rest-codegen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CodegenError::Network {
                url: String::new(),
                source,
            })?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
            concurrency: concurrency.max(1),
            seeds: SEED_PAGES.iter().map(|s| s.to_string()).collect(),
            rules: default_rules(),
        })
    }

    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_rules(mut self, rules: Vec<LinkRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Fetch one page or contract body
    pub async fn fetch(&self, url: &str) -> Result<String, CodegenError> {
        self.limiter.until_ready().await;
        debug!(url, "Fetching");

        let network = |source: reqwest::Error| CodegenError::Network {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(network)?;
        response.text().await.map_err(network)
    }

    /// Walk every stage and return the contracts found, sorted
    ///
    /// A network failure aborts the whole scrape. The developer site may be
    /// blocking us; retrying later is the only remedy.
    pub async fn discover(&self) -> Result<Vec<ContractRef>, CodegenError> {
        let mut frontier: BTreeSet<String> = self.seeds.iter().cloned().collect();

        for rule in &self.rules {
            let pages: Vec<Result<(String, String), CodegenError>> = stream::iter(frontier.iter().cloned())
                .map(|url| async move {
                    let body = self.fetch(&url).await?;
                    Ok::<_, CodegenError>((url, body))
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            let mut next = BTreeSet::new();
            for page in pages {
                let (url, body) = page.map_err(|e| {
                    error!(error = %e, "Contract discovery aborted; the developer site may be rate limiting this host");
                    e
                })?;
                next.extend(extract_links(&url, &body, &rule.pattern));
            }

            info!(stage = rule.stage, pages = frontier.len(), links = next.len(), "Discovery stage complete");
            frontier = next;
        }

        let contracts: BTreeSet<ContractRef> = frontier.iter().filter_map(|url| ContractRef::from_url(url)).collect();
        Ok(contracts.into_iter().collect())
    }
}

/// Absolute URLs of the links on a page whose path matches `pattern`
pub fn extract_links(page_url: &str, body: &str, pattern: &Regex) -> BTreeSet<String> {
    let Ok(base) = Url::parse(page_url) else {
        return BTreeSet::new();
    };
    HREF.captures_iter(body)
        .filter_map(|caps| base.join(caps[1].trim()).ok())
        .filter(|url| pattern.is_match(url.path()))
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_contract_filename() {
        let c = ContractRef::from_filename("sell_inventory_v1_oas3.json").unwrap();
        assert_eq!((c.category.as_str(), c.call_name.as_str(), c.version, c.beta), ("sell", "inventory", 1, false));
        assert_eq!(c.package(), "sell_inventory");

        let c = ContractRef::from_filename("developer_analytics_v1_beta_oas3.json").unwrap();
        assert!(c.beta);
        assert_eq!(c.filename(), "developer_analytics_v1_beta_oas3.json");

        let c = ContractRef::from_filename("sell_marketing_ads_v1_oas3.json").unwrap();
        assert_eq!(c.call_name, "marketing_ads");

        assert!(ContractRef::from_filename("sell_inventory_v1_oas2.json").is_none());
    }

    #[test]
    fn test_extract_links() {
        let pattern = Regex::new(r"^/develop/api/[a-z0-9_-]+/?$").unwrap();
        let body = r##"
            <a href="/develop/api/sell/ignored">x</a>
            <a href="/develop/api/inventory_api">Inventory</a>
            <a href='https://developer.ebay.com/develop/api/browse_api#top'>Browse</a>
            <a href="mailto:someone@example.com">mail</a>
        "##;
        let links = extract_links("https://developer.ebay.com/develop/selling-apps/listing", body, &pattern);
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec![
                "https://developer.ebay.com/develop/api/browse_api".to_string(),
                "https://developer.ebay.com/develop/api/inventory_api".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_walks_stages() {
        let server = MockServer::start().await;
        let page = |body: &str| ResponseTemplate::new(200).set_body_string(body.to_string());

        Mock::given(method("GET"))
            .and(path("/develop/selling-apps"))
            .respond_with(page(r#"<a href="/develop/selling-apps/listing">Listing</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/develop/selling-apps/listing"))
            .respond_with(page(r#"<a href="/develop/api/inventory_api">Inventory</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/develop/api/inventory_api"))
            .respond_with(page(r#"<a href="/api-docs/sell/inventory/overview.html">Overview</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api-docs/sell/inventory/overview.html"))
            .respond_with(page(
                r#"<a href="/api-docs/master/sell/inventory/openapi/3/sell_inventory_v1_oas3.json">JSON</a>"#,
            ))
            .mount(&server)
            .await;

        let discoverer = Discoverer::new(100, 4)
            .unwrap()
            .with_seeds(vec![format!("{}/develop/selling-apps", server.uri())]);
        let contracts = discoverer.discover().await.unwrap();

        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].package(), "sell_inventory");
        assert!(contracts[0].url.starts_with(&server.uri()));
    }

    #[tokio::test]
    async fn test_network_failure_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let discoverer = Discoverer::new(100, 2)
            .unwrap()
            .with_seeds(vec![format!("{}/develop/selling-apps", server.uri())]);
        let err = discoverer.discover().await.unwrap_err();
        assert!(matches!(err, CodegenError::Network { .. }));
    }
}
