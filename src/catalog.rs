use crate::error::{GvmError, Result};
use crate::version::Version;
use regex::Regex;
use reqwest::Client;
use std::collections::BTreeSet;

const INDEX_URL: &str = "https://go.dev/dl/";

/// Release identifiers as they appear in the index document: `go1.21.3`,
/// `go1.21`, `go1.22rc2`, `go1.4beta1`.
const VERSION_PATTERN: &str = r"go([0-9]+(?:\.[0-9]+){0,2}(?:beta[0-9]+|rc[0-9]+)?)";

/// Lazily-fetched catalog of publishable Go releases, scraped from the
/// download index page.
pub struct Catalog {
    client: Client,
    index_url: String,
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_index_url(INDEX_URL)
    }

    pub fn with_index_url(index_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()
                .unwrap(),
            index_url: index_url.into(),
        }
    }

    /// Fetch the index and return every release identifier found, deduplicated
    /// and sorted with the numeric comparator. An empty result means "no
    /// versions found", not an error.
    pub async fn list_remote(&self, include_unstable: bool) -> Result<Vec<Version>> {
        let body = self
            .client
            .get(&self.index_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(scrape_versions(&body, include_unstable))
    }

    /// Newest release: the last element of the sorted remote list.
    pub async fn latest(&self, include_unstable: bool) -> Result<Version> {
        self.list_remote(include_unstable)
            .await?
            .pop()
            .ok_or(GvmError::NoVersions)
    }

    /// Map the literal token `latest` through the remote catalog; any other
    /// token passes through as-is. An unknown version is only discovered
    /// later, at download time.
    pub async fn resolve(&self, token: &str, include_unstable: bool) -> Result<Version> {
        if token == "latest" {
            self.latest(include_unstable).await
        } else {
            token.parse()
        }
    }
}

fn scrape_versions(body: &str, include_unstable: bool) -> Vec<Version> {
    let pattern = Regex::new(VERSION_PATTERN).expect("version pattern");

    let set: BTreeSet<Version> = pattern
        .captures_iter(body)
        .filter_map(|caps| caps[1].parse::<Version>().ok())
        .filter(|v| include_unstable || v.is_stable())
        .collect();

    set.into_iter().collect()
}
