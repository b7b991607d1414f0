use std::collections::BTreeMap;

use serde::Deserialize;

pub mod json;
pub mod scholar;

/// An academic-profile data source queried by profile identifier.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Look up the author profile, including the listed (unfilled) publications.
    fn author(&self, profile_id: &str) -> anyhow::Result<AuthorPayload>;

    /// Fetch the full details of one listed publication.
    fn fill_publication(&self, publication: PublicationPayload)
    -> anyhow::Result<PublicationPayload>;
}

/// Author profile as a provider reports it. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorPayload {
    #[serde(default)]
    pub citedby: Option<u64>,
    #[serde(default)]
    pub hindex: Option<u64>,
    #[serde(default)]
    pub i10index: Option<u64>,
    /// Citations received per year. JSON object keys are parsed as integers.
    #[serde(default)]
    pub cites_per_year: Option<BTreeMap<u16, u64>>,
    #[serde(default)]
    pub publications: Option<Vec<PublicationPayload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicationPayload {
    #[serde(default)]
    pub bib: BibPayload,
    #[serde(default)]
    pub pub_url: Option<String>,
    #[serde(default)]
    pub eprint_url: Option<String>,
    /// Provider-specific key for the detail lookup.
    #[serde(default)]
    pub author_pub_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BibPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub pub_year: Option<YearField>,
}

/// A publication year, which providers report either as text or as a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum YearField {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for YearField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}
