//! End-to-end regeneration run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::cache::{digest, write_if_changed, ContractCache, Summary};
use super::dedupe::dedupe;
use super::emit::emit;
use super::flatten::flatten_package;
use super::generate::Generator;
use super::harvest::{harvest, parse_contract, OperationMeta};
use super::patch::apply_patches;
use super::post_patch::post_patch_package;
use super::{CodegenError, ContractRef, Discoverer};
use crate::config::CodegenSettings;

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub contracts: usize,
    pub operations: usize,
    /// Packages spliced into the facade as modules
    pub packages: Vec<String>,
    /// Whether the facade source was rewritten
    pub output_changed: bool,
}

pub struct Pipeline {
    settings: CodegenSettings,
    discoverer: Option<Discoverer>,
    generator: Generator,
}

impl Pipeline {
    pub fn new(settings: CodegenSettings) -> Self {
        let generator = Generator::new(settings.generator_command.clone());
        Self {
            settings,
            discoverer: None,
            generator,
        }
    }

    /// Use a preconfigured scraper instead of the default seeds
    pub fn with_discoverer(mut self, discoverer: Discoverer) -> Self {
        self.discoverer = Some(discoverer);
        self
    }

    #[instrument(skip(self), fields(offline = self.settings.offline, output = %self.settings.output.display()))]
    pub async fn run(&self) -> Result<PipelineReport, CodegenError> {
        let cache = ContractCache::open(&self.settings.cache_dir)?;

        let contracts = if self.settings.offline {
            let cached = cache.contracts()?;
            info!(contracts = cached.len(), "Offline run, using cached contracts");
            cached
        } else {
            self.download(&cache).await?
        };

        let modules_dir = self
            .settings
            .output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut summary = Summary::default();
        let mut operations: Vec<OperationMeta> = Vec::new();
        let mut packages = Vec::new();

        for contract in &contracts {
            let package = contract.package();
            let filename = contract.filename();
            let path = cache.contract_path(contract);

            let text = cache.read(&path)?;
            let mut doc = parse_contract(&filename, &text)?;
            let text = if apply_patches(&filename, &mut doc).changed() {
                let patched = pretty(&path, &doc)?;
                write_if_changed(&path, &patched)?;
                patched
            } else {
                text
            };
            summary.digests.insert(filename.clone(), digest(&text));

            let generated_dir = cache.package_dir(&package);
            let module_dir = modules_dir.join(&package);
            if self.generator.generate(&package, &path, &generated_dir).await? {
                post_patch_package(&package, &generated_dir)?;
                flatten_package(&package, &generated_dir, &module_dir)?;
            }
            if module_dir.join("mod.rs").is_file() {
                packages.push(package.clone());
            }

            let api = harvest(contract, &doc)?;
            summary.base_paths.insert(package.clone(), api.base_path.clone());
            summary.flows.insert(package.clone(), api.flows.clone());
            let scopes: BTreeMap<String, Vec<String>> = api
                .operations
                .iter()
                .map(|op| (op.operation_id.clone(), op.scopes.clone()))
                .collect();
            summary.scopes.insert(package, scopes);
            operations.extend(api.operations);
        }

        cache.write_summary(&summary)?;

        let source = std::fs::read_to_string(&self.settings.output)
            .map_err(|e| CodegenError::io(&self.settings.output, e))?;
        let rendered = emit(&source, &operations, &packages)?;
        let output_changed = write_if_changed(&self.settings.output, &rendered)?;

        let report = PipelineReport {
            contracts: contracts.len(),
            operations: operations.len(),
            packages,
            output_changed,
        };
        info!(
            contracts = report.contracts,
            operations = report.operations,
            packages = report.packages.len(),
            output_changed,
            "Facade regenerated"
        );
        Ok(report)
    }

    /// Discover, dedupe and cache the current contracts
    async fn download(&self, cache: &ContractCache) -> Result<Vec<ContractRef>, CodegenError> {
        let discoverer = match &self.discoverer {
            Some(d) => d.clone(),
            None => Discoverer::new(self.settings.requests_per_second, self.settings.concurrency)?,
        };

        let found = discoverer.discover().await?;
        let found_count = found.len();
        let contracts = dedupe(found);
        if contracts.is_empty() {
            warn!("Discovery found no contracts");
        }
        info!(found = found_count, kept = contracts.len(), "Contracts discovered");

        let bodies: Vec<Result<(ContractRef, String), CodegenError>> = stream::iter(contracts.iter().cloned())
            .map(|contract| {
                let discoverer = &discoverer;
                async move {
                    let body = discoverer.fetch(&contract.url).await?;
                    Ok::<_, CodegenError>((contract, body))
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for body in bodies {
            let (contract, body) = body?;
            cache.write_contract(&contract, &body)?;
        }
        Ok(contracts)
    }
}

fn pretty(path: &Path, doc: &Value) -> Result<String, CodegenError> {
    let mut text = serde_json::to_string_pretty(doc)
        .map_err(|e| CodegenError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    text.push('\n');
    Ok(text)
}
