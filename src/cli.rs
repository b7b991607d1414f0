use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::{
    fetcher::DEFAULT_MAX_PUBLICATIONS,
    provider::{
        Provider,
        json::JsonProvider,
        scholar::{DEFAULT_BASE_URL, ScholarProvider},
    },
    runner::Variant,
};

pub const DEFAULT_SCHOLAR_ID: &str = "ULBrgQcAAAAJ";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `data` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
    #[command(flatten)]
    pub settings: Settings,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Update the metrics, the citation graph and the publication list
    Data,
    /// Update the metrics and the citation graph only
    Citations,
}

impl From<Command> for Variant {
    fn from(command: Command) -> Self {
        match command {
            Command::Data => Variant::Data,
            Command::Citations => Variant::Citations,
        }
    }
}

/// Everything a run needs besides the variant. Flags win over environment variables.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Profile identifier to look up
    #[arg(
        long,
        env = "SCHOLAR_ID",
        default_value = DEFAULT_SCHOLAR_ID,
        allow_hyphen_values = true,
        global = true
    )]
    pub scholar_id: String,

    /// HTML page holding the stat blocks
    #[arg(long, env = "SCHOLAR_PAGE", default_value = "index.html", global = true)]
    pub page: PathBuf,

    /// Script holding the `citationData` and `publications` declarations
    #[arg(long, env = "SCHOLAR_SCRIPT", default_value = "scholar.js", global = true)]
    pub script: PathBuf,

    /// Read the profile from a JSON file instead of querying Google Scholar
    #[arg(long, env = "SCHOLAR_PAYLOAD", value_name = "FILE", global = true)]
    pub payload: Option<PathBuf>,

    #[arg(long, env = "SCHOLAR_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: Url,

    /// Number of listed publications to fetch details for
    #[arg(long, default_value_t = DEFAULT_MAX_PUBLICATIONS, global = true)]
    pub max_publications: usize,

    #[arg(long, value_name = "SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Report what would change without writing any file
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl Settings {
    pub fn provider(&self) -> Box<dyn Provider> {
        match &self.payload {
            Some(path) => Box::new(JsonProvider::new(path.clone())),
            None => Box::new(ScholarProvider::new(
                self.base_url.clone(),
                Duration::from_secs(self.timeout_secs),
            )),
        }
    }
}

#[cfg(test)]
impl Default for Settings {
    fn default() -> Self {
        Self {
            scholar_id: DEFAULT_SCHOLAR_ID.to_string(),
            page: PathBuf::from("index.html"),
            script: PathBuf::from("scholar.js"),
            payload: None,
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap(),
            max_publications: DEFAULT_MAX_PUBLICATIONS,
            timeout_secs: 30,
            dry_run: false,
        }
    }
}
