use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::info;

use crate::{
    provider::{Provider, PublicationPayload},
    record::{MetricsRecord, Publication},
};

pub const DEFAULT_MAX_PUBLICATIONS: usize = 10;

/// Any failure while talking to the provider or normalising its answer.
#[derive(Debug, Error)]
#[error("failed to fetch profile {profile_id} from {provider}: {cause:#}")]
pub struct FetchError {
    pub profile_id: String,
    pub provider: &'static str,
    cause: anyhow::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Whether to harvest publication details at all.
    pub publications: bool,
    /// How many listed publications to fill, in provider order.
    pub max_publications: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            publications: true,
            max_publications: DEFAULT_MAX_PUBLICATIONS,
        }
    }
}

/// Fetch and normalise the profile `profile_id`.
///
/// Either every part of the record is obtained or nothing is returned; provider errors of any
/// kind surface as a single [`FetchError`].
pub fn fetch_record(
    provider: &dyn Provider,
    profile_id: &str,
    options: &FetchOptions,
) -> Result<MetricsRecord, FetchError> {
    collect(provider, profile_id, options).map_err(|cause| FetchError {
        profile_id: profile_id.to_string(),
        provider: provider.name(),
        cause,
    })
}

fn collect(
    provider: &dyn Provider,
    profile_id: &str,
    options: &FetchOptions,
) -> anyhow::Result<MetricsRecord> {
    let author = provider.author(profile_id)?;
    info!(provider = provider.name(), profile_id, "profile fetched");

    let publications = if options.publications {
        let listed = author.publications.unwrap_or_default();
        fill_publications(provider, listed, options.max_publications)?
    } else {
        Vec::new()
    };

    Ok(MetricsRecord {
        citation_count: author.citedby.unwrap_or(0),
        h_index: author.hindex.unwrap_or(0),
        i10_index: author.i10index.unwrap_or(0),
        // BTreeMap iteration is already ascending and unique by year.
        year_series: author.cites_per_year.unwrap_or_default().into_iter().collect(),
        publications,
    })
}

fn fill_publications(
    provider: &dyn Provider,
    listed: Vec<PublicationPayload>,
    cap: usize,
) -> anyhow::Result<Vec<Publication>> {
    let listed: Vec<_> = listed.into_iter().take(cap).collect();

    let bar = ProgressBar::new(listed.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{prefix:>12} [{bar:25}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix("Publications");

    let mut out = Vec::with_capacity(listed.len());
    for (index, publication) in listed.into_iter().enumerate() {
        let filled = provider
            .fill_publication(publication)
            .with_context(|| format!("failed to fill publication #{}", index + 1))?;
        out.push(normalize_publication(filled));
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(out)
}

fn normalize_publication(p: PublicationPayload) -> Publication {
    let bib = p.bib;
    Publication {
        title: bib.title.unwrap_or_else(|| "Untitled".to_string()),
        authors: bib.author.unwrap_or_default(),
        venue: bib
            .venue
            .or(bib.journal)
            .unwrap_or_else(|| "Unknown".to_string()),
        year: bib.pub_year.map(|y| y.to_string()).unwrap_or_default(),
        link: p
            .pub_url
            .or(p.eprint_url)
            .unwrap_or_else(|| "#".to_string()),
    }
}
