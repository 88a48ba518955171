//! Seed dataset download
//!
//! Fetches the palmerpenguins CSV into the seed location. An existing seed
//! is never overwritten.

use anyhow::{bail, Context};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use penguin_common::features::{SPECIES_COLUMN, TIMESTAMP_COLUMN};
use penguin_common::NumericFeature;

use crate::history::RawTable;

pub const PALMER_PENGUINS_URL: &str =
    "https://raw.githubusercontent.com/allisonhorst/palmerpenguins/main/inst/extdata/penguins.csv";

const USER_AGENT: &str = concat!("penguin-web/", env!("CARGO_PKG_VERSION"));

/// What `fetch_seed` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded { rows: usize },
}

/// Download the dataset to `seed_path` unless a seed is already there
pub async fn fetch_seed(url: &str, seed_path: &Path) -> anyhow::Result<FetchOutcome> {
    if tokio::fs::try_exists(seed_path).await.unwrap_or(false) {
        info!("Seed dataset already present at {}, skipping download", seed_path.display());
        return Ok(FetchOutcome::AlreadyPresent);
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(60))
        .build()
        .context("Failed to build HTTP client")?;

    debug!(url = %url, "Downloading seed dataset");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Download from {} returned HTTP {}", url, status.as_u16());
    }

    let body = response.text().await.context("Failed to read response body")?;
    let rows = install_seed(&body, seed_path).await?;
    info!(rows, "Seed dataset written to {}", seed_path.display());

    Ok(FetchOutcome::Downloaded { rows })
}

/// Check downloaded text looks like the dataset and write it out
///
/// Returns the number of data rows.
pub async fn install_seed(body: &str, seed_path: &Path) -> anyhow::Result<usize> {
    let table = RawTable::from_reader(body.as_bytes()).context("Downloaded file is not CSV")?;

    let required = std::iter::once(SPECIES_COLUMN)
        .chain(std::iter::once("island"))
        .chain(NumericFeature::ALL.iter().map(|f| f.name()));
    for column in required {
        if !table.has_column(column) {
            bail!("Downloaded file has no '{}' column", column);
        }
    }
    if !table.has_column(TIMESTAMP_COLUMN) {
        debug!("Downloaded file has no '{}' column", TIMESTAMP_COLUMN);
    }

    if let Some(parent) = seed_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(seed_path, body)
        .await
        .with_context(|| format!("Failed to write {}", seed_path.display()))?;

    Ok(table.rows.len())
}
