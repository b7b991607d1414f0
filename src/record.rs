/// Citation metrics for one profile, normalised from a single provider response.
///
/// A record is only ever built from a complete fetch; there is no partially populated state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsRecord {
    pub citation_count: u64,
    pub h_index: u64,
    pub i10_index: u64,
    /// `(year, count)` pairs, ascending by year, years unique.
    pub year_series: Vec<(u16, u64)>,
    /// Empty unless publications were requested.
    pub publications: Vec<Publication>,
}

/// A publication summary as rendered into the script asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publication {
    pub title: String,
    pub authors: String,
    pub venue: String,
    pub year: String,
    /// A URL, or `#` when the provider has none.
    pub link: String,
}

impl MetricsRecord {
    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.year_series.iter().map(|&(year, _)| year)
    }

    pub fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.year_series.iter().map(|&(_, count)| count)
    }
}
