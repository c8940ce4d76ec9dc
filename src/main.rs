//! ebay-codegen
//!
//! Regenerates `src/generated/mod.rs` from the current eBay OpenAPI
//! contracts. Set `EBAY_CODEGEN__OFFLINE=true` to rebuild from the cache.

use anyhow::Context;
use tracing::info;

use ebay_rest::codegen::Pipeline;
use ebay_rest::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ebay_rest=info")),
        )
        .json()
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;

    info!(
        "Starting ebay-codegen v{} (cache {}, output {})",
        env!("CARGO_PKG_VERSION"),
        settings.codegen.cache_dir.display(),
        settings.codegen.output.display()
    );

    let report = Pipeline::new(settings.codegen)
        .run()
        .await
        .map_err(ebay_rest::Error::from)
        .context("Code generation failed")?;

    info!(
        contracts = report.contracts,
        operations = report.operations,
        packages = report.packages.len(),
        changed = report.output_changed,
        "Done"
    );
    Ok(())
}
