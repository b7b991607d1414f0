use std::{collections::HashMap, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    patch::{self, Change, PatchError, WriteMode},
    record::{MetricsRecord, Publication},
    template::{SlotPattern, Template},
};

pub const CITATION_DATA: &str = "citationData";
pub const PUBLICATIONS: &str = "publications";

// Both blocks run from their introducer to the first terminator.
static CITATION_DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"const citationData = \{[^}]*\};").unwrap());
static PUBLICATIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"const publications = \[[^\]]*\];").unwrap());

/// A declaration block of the script asset that can be regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    CitationSeries,
    Publications,
}

impl Block {
    fn slot(self) -> SlotPattern<'static> {
        match self {
            Self::CitationSeries => SlotPattern::new(CITATION_DATA, &CITATION_DATA_RE),
            Self::Publications => SlotPattern::new(PUBLICATIONS, &PUBLICATIONS_RE),
        }
    }

    fn render(self, record: &MetricsRecord) -> String {
        match self {
            Self::CitationSeries => citation_data_block(record),
            Self::Publications => publications_block(&record.publications),
        }
    }
}

/// Replace each of `blocks` in `text` with a literal serialised from `record`.
pub fn render_script(
    text: &str,
    record: &MetricsRecord,
    blocks: &[Block],
) -> Result<String, PatchError> {
    let patterns: Vec<_> = blocks.iter().map(|b| b.slot()).collect();
    let template = Template::parse(text, &patterns)?;
    let values: HashMap<_, _> = blocks
        .iter()
        .map(|b| (b.slot().name, b.render(record)))
        .collect();
    Ok(template.render(&values))
}

pub fn patch_script(
    path: &Path,
    record: &MetricsRecord,
    blocks: &[Block],
    mode: WriteMode,
) -> Result<Change, PatchError> {
    patch::rewrite_file(path, mode, |text| render_script(text, record, blocks))
}

fn citation_data_block(record: &MetricsRecord) -> String {
    let years: Vec<String> = record.years().map(|y| y.to_string()).collect();
    let counts: Vec<String> = record.counts().map(|c| c.to_string()).collect();
    format!(
        "const citationData = {{\n    years: [{}],\n    citations: [{}]\n}};",
        years.join(", "),
        counts.join(", ")
    )
}

fn publications_block(publications: &[Publication]) -> String {
    let mut out = String::from("const publications = [\n");
    for p in publications {
        out.push_str("    {\n");
        out.push_str(&format!("        title: {},\n", js_string(&p.title)));
        out.push_str(&format!("        authors: {},\n", js_string(&p.authors)));
        out.push_str(&format!("        venue: {},\n", js_string(&p.venue)));
        out.push_str(&format!("        year: {},\n", js_string(&p.year)));
        out.push_str(&format!("        link: {}\n", js_string(&p.link)));
        out.push_str("    },\n");
    }
    out.push_str("];");
    out
}

/// Quote `s` as a double-quoted JavaScript string literal.
///
/// `]` is written as a `\u` escape so the regenerated publications block never contains its own
/// terminator early.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ']' => out.push_str("\\u005D"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() && (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04X}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"// Google Scholar Configuration
const SCHOLAR_USER_ID = 'ULBrgQcAAAAJ';

const publications = [
    {
        title: "REE ultra-rich karst bauxite deposits",
        authors: "Cristina Villanova-de-Benavent and Joaquín A Proenza",
        venue: "Ore Geology Reviews",
        year: "2023",
        link: "https://doi.org/10.1016/j.oregeorev.2023.105422"
    },
];

// Citation data by year
const citationData = {
    years: [2023, 2024, 2025],
    citations: [2, 2, 13]
};

function createCitationGraph() {
    const data = { labels: citationData.years };
}
"#;

    /// Decode a double-quoted JavaScript string literal.
    fn unquote_js(lit: &str) -> String {
        let inner = lit
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .expect("quoted literal");
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                assert_ne!(c, '"', "unescaped quote inside literal: {lit}");
                out.push(c);
                continue;
            }
            match chars.next().expect("dangling escape") {
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'u' => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let code = u32::from_str_radix(&hex, 16).expect("hex escape");
                    out.push(char::from_u32(code).expect("scalar value"));
                }
                other => out.push(other),
            }
        }
        out
    }

    fn parse_list(block: &str, key: &str) -> Vec<u64> {
        let re = Regex::new(&format!(r"{key}: \[([^\]]*)\]")).unwrap();
        let inner = re.captures(block).expect("list present")[1].to_string();
        inner
            .split(", ")
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().expect("integer"))
            .collect()
    }

    fn parse_publications(block: &str) -> Vec<Publication> {
        let field = |name: &str, obj: &str| {
            let re = Regex::new(&format!(r#"(?m)^\s*{name}: ("(?:[^"\\]|\\.)*"),?$"#)).unwrap();
            unquote_js(&re.captures(obj).expect("field present")[1])
        };
        let obj_re = Regex::new(r"(?s)    \{\n(.*?)\n    \},").unwrap();
        obj_re
            .captures_iter(block)
            .map(|c| {
                let obj = &c[1];
                Publication {
                    title: field("title", obj),
                    authors: field("authors", obj),
                    venue: field("venue", obj),
                    year: field("year", obj),
                    link: field("link", obj),
                }
            })
            .collect()
    }

    fn scenario_record() -> MetricsRecord {
        MetricsRecord {
            citation_count: 120,
            h_index: 8,
            i10_index: 5,
            year_series: vec![(2020, 10), (2021, 40), (2022, 70)],
            publications: Vec::new(),
        }
    }

    #[test]
    fn citation_block_matches_expected_layout() {
        let out = render_script(SCRIPT, &scenario_record(), &[Block::CitationSeries]).unwrap();
        assert!(out.contains(
            "const citationData = {\n    years: [2020, 2021, 2022],\n    citations: [10, 40, 70]\n};"
        ));
        assert!(!out.contains("2025"));
        // Publications untouched when not requested.
        assert!(out.contains("REE ultra-rich karst bauxite deposits"));
        assert!(out.ends_with("const data = { labels: citationData.years };\n}\n"));
    }

    #[test]
    fn citation_block_parses_back_in_order() {
        let series = proptest::collection::btree_map(1900u16..2100, 0u64..100_000, 0..30);
        proptest::proptest!(|(map in series)| {
            let record = MetricsRecord {
                year_series: map.into_iter().collect(),
                ..MetricsRecord::default()
            };
            let block = citation_data_block(&record);
            let years = parse_list(&block, "years");
            let counts = parse_list(&block, "citations");
            proptest::prop_assert_eq!(years.len(), counts.len());
            let pairs: Vec<(u16, u64)> = years
                .into_iter()
                .map(|y| u16::try_from(y).unwrap())
                .zip(counts)
                .collect();
            proptest::prop_assert_eq!(pairs, record.year_series);
        })
    }

    #[test]
    fn empty_series_renders_empty_lists() {
        let block = citation_data_block(&MetricsRecord::default());
        assert_eq!(block, "const citationData = {\n    years: [],\n    citations: []\n};");
    }

    #[test]
    fn embedded_quotes_round_trip() {
        let publication = Publication {
            title: r#"He said "hello""#.to_string(),
            authors: "O'Brien and D'Angelo".to_string(),
            venue: r"Proc. [Workshop] \ Notes".to_string(),
            year: "2024".to_string(),
            link: "#".to_string(),
        };
        let record = MetricsRecord {
            publications: vec![publication.clone()],
            ..scenario_record()
        };
        let out = render_script(
            SCRIPT,
            &record,
            &[Block::CitationSeries, Block::Publications],
        )
        .unwrap();
        assert!(out.contains(r#"title: "He said \"hello\"","#));

        // The regenerated block is found again by its own pattern, in one piece.
        let block = PUBLICATIONS_RE.find(&out).expect("block present").as_str();
        assert!(block.ends_with("    },\n];"));
        assert_eq!(parse_publications(block), vec![publication]);
    }

    #[test]
    fn js_string_round_trips_arbitrary_text() {
        proptest::proptest!(|(s in "\\PC{0,40}")| {
            proptest::prop_assert_eq!(unquote_js(&js_string(&s)), s);
        })
    }

    #[test]
    fn regeneration_is_idempotent() {
        let record = MetricsRecord {
            publications: vec![Publication {
                title: "A [bracketed] title".to_string(),
                authors: "A and B".to_string(),
                venue: "Unknown".to_string(),
                year: String::new(),
                link: "https://example.org/paper".to_string(),
            }],
            ..scenario_record()
        };
        let blocks = [Block::CitationSeries, Block::Publications];
        let once = render_script(SCRIPT, &record, &blocks).unwrap();
        let twice = render_script(&once, &record, &blocks).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn no_publications_renders_empty_array() {
        let out = render_script(SCRIPT, &scenario_record(), &[Block::Publications]).unwrap();
        assert!(out.contains("const publications = [\n];"));
        assert!(!out.contains("REE ultra-rich"));
    }

    #[test]
    fn missing_block_is_an_error() {
        let without = SCRIPT.replace("const publications", "let publications");
        let err = render_script(&without, &scenario_record(), &[Block::CitationSeries, Block::Publications])
            .unwrap_err();
        assert!(matches!(err, PatchError::AnchorNotFound { slot: PUBLICATIONS }));
    }
}
