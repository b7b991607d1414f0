use std::{collections::BTreeMap, time::Duration};

use anyhow::{Context, bail};
use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::provider::{AuthorPayload, Provider, PublicationPayload, YearField};

pub const DEFAULT_BASE_URL: &str = "https://scholar.google.com";

/// Scholar serves a captcha to clients that do not look like a browser.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.10 Safari/605.1.1";

/// Scrapes Google Scholar profile and publication pages.
#[derive(Debug)]
pub struct ScholarProvider {
    agent: ureq::Agent,
    base_url: Url,
}

impl ScholarProvider {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        let cfg = ureq::Agent::config_builder()
            .timeout_connect(Some(timeout.min(Duration::from_secs(5))))
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(cfg),
            base_url,
        }
    }

    fn profile_url(&self, profile_id: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.join("citations")?;
        url.query_pairs_mut()
            .append_pair("user", profile_id)
            .append_pair("hl", "en")
            .append_pair("cstart", "0")
            .append_pair("pagesize", "100");
        Ok(url)
    }

    fn detail_url(&self, author_pub_id: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.join("citations")?;
        url.query_pairs_mut()
            .append_pair("view_op", "view_citation")
            .append_pair("hl", "en")
            .append_pair("citation_for_view", author_pub_id);
        Ok(url)
    }

    fn fetch(&self, url: &Url) -> anyhow::Result<String> {
        debug!(%url, "requesting");
        let body = self
            .agent
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .call()
            .with_context(|| format!("failed request for URL {url}"))?
            .into_body()
            .read_to_string()
            .context("failed to read response body")?;
        Ok(body)
    }
}

impl Provider for ScholarProvider {
    fn name(&self) -> &'static str {
        "scholar"
    }

    fn author(&self, profile_id: &str) -> anyhow::Result<AuthorPayload> {
        let url = self.profile_url(profile_id)?;
        let html = self.fetch(&url)?;
        parse_profile(&html, &self.base_url)
            .with_context(|| format!("unexpected profile page for {profile_id}"))
    }

    fn fill_publication(
        &self,
        publication: PublicationPayload,
    ) -> anyhow::Result<PublicationPayload> {
        let Some(id) = publication.author_pub_id.clone() else {
            warn!(
                title = publication.bib.title.as_deref().unwrap_or_default(),
                "publication has no detail link, keeping the listed fields"
            );
            return Ok(publication);
        };
        let url = self.detail_url(&id)?;
        let html = self.fetch(&url)?;
        Ok(merge_detail(publication, &html, &self.base_url))
    }
}

// ----------------------------
// Profile page
// ----------------------------

static PROFILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"id="gsc_prf_in""#).unwrap());
static STAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<td class="gsc_rsb_std">([^<]*)</td>"#).unwrap());
static GRAPH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="gsc_g_t"[^>]*>\s*(\d{4})\s*</span>"#).unwrap());
static GRAPH_BAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(<a\b[^>]*\bclass="gsc_g_a"[^>]*>)\s*<span class="gsc_g_al">([^<]*)</span>"#)
        .unwrap()
});
static Z_INDEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"z-index:\s*(\d+)").unwrap());
static ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<tr class="gsc_a_tr">(.*?)</tr>"#).unwrap());
static ROW_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<a\b([^>]*\bclass="gsc_a_at"[^>]*)>(.*?)</a>"#).unwrap());
static ROW_GRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div class="gs_gray">(.*?)</div>"#).unwrap());
static ROW_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<td class="gsc_a_y">\s*<span[^>]*>\s*(\d{4})\s*</span>"#).unwrap()
});
static PUB_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"citation_for_view=([^"&\s]+)"#).unwrap());

fn parse_profile(html: &str, base: &Url) -> anyhow::Result<AuthorPayload> {
    if !PROFILE_NAME_RE.is_match(html) {
        bail!("no author header found (unknown profile or request blocked)");
    }

    // All-time and since-year columns alternate: citations, h-index, i10-index.
    let stats: Vec<Option<u64>> = STAT_RE
        .captures_iter(html)
        .map(|c| parse_count(&c[1]))
        .collect();
    let stat = |i: usize| stats.get(i).copied().flatten();

    Ok(AuthorPayload {
        citedby: stat(0),
        hindex: stat(2),
        i10index: stat(4),
        cites_per_year: Some(parse_graph(html)),
        publications: Some(parse_rows(html, base)),
    })
}

/// Year labels run left to right; each bar's trailing `z-index:N` places it `N` slots from the
/// right. Years without a bar had no citations.
fn parse_graph(html: &str) -> BTreeMap<u16, u64> {
    let years: Vec<u16> = GRAPH_YEAR_RE
        .captures_iter(html)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    let mut counts = vec![0u64; years.len()];
    for bar in GRAPH_BAR_RE.captures_iter(html) {
        let slot = Z_INDEX_RE
            .captures_iter(&bar[1])
            .last()
            .and_then(|z| z[1].parse::<usize>().ok());
        match (slot, parse_count(&bar[2])) {
            (Some(z), Some(count)) if (1..=years.len()).contains(&z) => {
                counts[years.len() - z] = count;
            }
            _ => debug!(bar = &bar[0], "ignoring unplaceable graph bar"),
        }
    }
    years.into_iter().zip(counts).collect()
}

fn parse_rows(html: &str, base: &Url) -> Vec<PublicationPayload> {
    ROW_RE
        .captures_iter(html)
        .map(|row| {
            let row = &row[1];
            let mut publication = PublicationPayload::default();
            if let Some(title) = ROW_TITLE_RE.captures(row) {
                publication.bib.title = non_empty(html_text(&title[2]));
                let attrs = decode_entities(&title[1]);
                publication.author_pub_id = PUB_ID_RE.captures(&attrs).map(|c| c[1].to_string());
                if publication.author_pub_id.is_none() {
                    publication.pub_url = href(&title[1], base);
                }
            }
            if let Some(authors) = ROW_GRAY_RE.captures(row) {
                publication.bib.author = non_empty(join_authors(&html_text(&authors[1])));
            }
            publication.bib.pub_year = ROW_YEAR_RE
                .captures(row)
                .map(|c| YearField::Text(c[1].to_string()));
            publication
        })
        .collect()
}

// ----------------------------
// Publication detail page
// ----------------------------

static DETAIL_TITLE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a\b([^>]*\bclass="gsc_oci_title_link"[^>]*)>(.*?)</a>"#).unwrap()
});
static DETAIL_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div id="gsc_oci_title">(.*?)</div>"#).unwrap());
static DETAIL_EPRINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="gsc_oci_title_ggi">\s*<a\b([^>]*)>"#).unwrap()
});
static DETAIL_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<div class="gsc_oci_field">(.*?)</div>\s*<div class="gsc_oci_value">(.*?)</div>"#,
    )
    .unwrap()
});
static LEADING_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());
static HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bhref="([^"]*)""#).unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Overlay the fields of a detail page on a listed publication.
fn merge_detail(mut publication: PublicationPayload, html: &str, base: &Url) -> PublicationPayload {
    if let Some(link) = DETAIL_TITLE_LINK_RE.captures(html) {
        publication.bib.title = non_empty(html_text(&link[2])).or(publication.bib.title);
        publication.pub_url = href(&link[1], base).or(publication.pub_url);
    } else if let Some(title) = DETAIL_TITLE_RE.captures(html) {
        publication.bib.title = non_empty(html_text(&title[1])).or(publication.bib.title);
    }
    if let Some(eprint) = DETAIL_EPRINT_RE.captures(html) {
        publication.eprint_url = href(&eprint[1], base);
    }

    let bib = &mut publication.bib;
    for field in DETAIL_FIELD_RE.captures_iter(html) {
        let value = html_text(&field[2]);
        if value.is_empty() {
            continue;
        }
        match html_text(&field[1]).as_str() {
            "Authors" => bib.author = Some(join_authors(&value)),
            "Publication date" => {
                bib.pub_year = LEADING_YEAR_RE
                    .captures(&value)
                    .map(|c| YearField::Text(c[1].to_string()));
            }
            "Journal" => bib.journal = Some(value),
            "Conference" | "Book" | "Source" if bib.venue.is_none() => bib.venue = Some(value),
            _ => {}
        }
    }
    publication
}

/// `"A, B, C"` becomes `"A and B and C"`.
fn join_authors(list: &str) -> String {
    list.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(" and ")
}

// ----------------------------
// Helpers
// ----------------------------

fn parse_count(s: &str) -> Option<u64> {
    s.trim().replace(',', "").parse().ok()
}

fn href(attrs: &str, base: &Url) -> Option<String> {
    let raw = decode_entities(&HREF_RE.captures(attrs)?[1]);
    if raw.is_empty() || raw.starts_with("javascript:") {
        return None;
    }
    Some(base.join(&raw).map_or(raw, |u| u.to_string()))
}

fn html_text(fragment: &str) -> String {
    normalize_ws(&decode_entities(&TAG_RE.replace_all(fragment, " ")))
}

fn decode_entities(raw: &str) -> String {
    unescape_with(raw, resolve_html5_entity).map_or_else(|_| raw.to_string(), |s| s.into_owned())
}

fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
