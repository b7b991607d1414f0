use std::{collections::HashMap, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{
    patch::{self, Change, PatchError, WriteMode},
    record::MetricsRecord,
    template::{SlotPattern, Template},
};

pub const CITATIONS: &str = "Citations";
pub const H_INDEX: &str = "h-index";
pub const I10_INDEX: &str = "i10-index";

/// `<div class="stat-item"><div class="stat-number">N</div><div class="stat-label">LABEL</div>`,
/// with any whitespace between the tags. Only `N` is a slot.
fn stat_anchor(label: &str) -> Regex {
    Regex::new(&format!(
        r#"<div class="stat-item">\s*<div class="stat-number">(?P<value>\d+)</div>\s*<div class="stat-label">{}</div>"#,
        regex::escape(label)
    ))
    .unwrap()
}

static CITATIONS_RE: Lazy<Regex> = Lazy::new(|| stat_anchor(CITATIONS));
static H_INDEX_RE: Lazy<Regex> = Lazy::new(|| stat_anchor(H_INDEX));
static I10_INDEX_RE: Lazy<Regex> = Lazy::new(|| stat_anchor(I10_INDEX));

/// Rewrite the three stat numbers of `text` from `record`.
pub fn render_page(text: &str, record: &MetricsRecord) -> Result<String, PatchError> {
    let template = Template::parse(
        text,
        &[
            SlotPattern::new(CITATIONS, &CITATIONS_RE),
            SlotPattern::new(H_INDEX, &H_INDEX_RE),
            SlotPattern::new(I10_INDEX, &I10_INDEX_RE),
        ],
    )?;

    let values = HashMap::from([
        (CITATIONS, record.citation_count.to_string()),
        (H_INDEX, record.h_index.to_string()),
        (I10_INDEX, record.i10_index.to_string()),
    ]);
    for (slot, value) in &values {
        let previous: Vec<_> = template.slot_values(slot).collect();
        debug!(slot, ?previous, new = %value, "stat slot");
    }

    Ok(template.render(&values))
}

pub fn patch_page(path: &Path, record: &MetricsRecord, mode: WriteMode) -> Result<Change, PatchError> {
    patch::rewrite_file(path, mode, |text| render_page(text, record))
}
