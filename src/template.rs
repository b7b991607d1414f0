//! Slot-based view of a hand-authored document.
//!
//! A document is parsed once against a set of [`SlotPattern`]s. Everything outside the slots is
//! kept as literal text and reproduced byte for byte on [`Template::render`]. Parsing fails when
//! any pattern is absent, so a missing anchor can never turn into a silent no-op.

use std::collections::HashMap;

use regex::Regex;

use crate::patch::PatchError;

/// A named mutable region, located by `regex`.
///
/// When the regex has a capture group called `value`, only that group is the slot and the rest
/// of the match stays literal. Otherwise the whole match is the slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotPattern<'r> {
    pub name: &'static str,
    pub regex: &'r Regex,
}

impl<'r> SlotPattern<'r> {
    pub const fn new(name: &'static str, regex: &'r Regex) -> Self {
        Self { name, regex }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot { name: &'static str, current: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split `text` into literal segments and slots.
    ///
    /// Every occurrence of every pattern becomes a slot. Fails with
    /// [`PatchError::AnchorNotFound`] when a pattern matches nowhere and with
    /// [`PatchError::OverlappingSlots`] when two matches share bytes.
    pub fn parse(text: &str, patterns: &[SlotPattern<'_>]) -> Result<Self, PatchError> {
        let mut spans: Vec<(usize, usize, &'static str)> = Vec::new();
        for pattern in patterns {
            let before = spans.len();
            for caps in pattern.regex.captures_iter(text) {
                if let Some(m) = caps.name("value").or_else(|| caps.get(0)) {
                    spans.push((m.start(), m.end(), pattern.name));
                }
            }
            if spans.len() == before {
                return Err(PatchError::AnchorNotFound { slot: pattern.name });
            }
        }

        spans.sort_by_key(|&(start, end, _)| (start, end));
        for pair in spans.windows(2) {
            let (_, first_end, first) = pair[0];
            let (second_start, _, second) = pair[1];
            if second_start < first_end {
                return Err(PatchError::OverlappingSlots { first, second });
            }
        }

        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0;
        for (start, end, name) in spans {
            if start > cursor {
                segments.push(Segment::Literal(text[cursor..start].to_string()));
            }
            segments.push(Segment::Slot {
                name,
                current: text[start..end].to_string(),
            });
            cursor = end;
        }
        if cursor < text.len() {
            segments.push(Segment::Literal(text[cursor..].to_string()));
        }

        Ok(Self { segments })
    }

    /// Current contents of every occurrence of slot `name`, in document order.
    pub fn slot_values<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.segments.iter().filter_map(move |s| match s {
            Segment::Slot { name: n, current } if *n == name => Some(current.as_str()),
            _ => None,
        })
    }

    /// Reassemble the document with each slot replaced by `values[name]`.
    ///
    /// Slots without an entry keep their current contents.
    pub fn render(&self, values: &HashMap<&str, String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot { name, current } => {
                    out.push_str(values.get(*name).map_or(current.as_str(), String::as_str))
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num_re() -> Regex {
        Regex::new(r"n=(?P<value>\d+);").unwrap()
    }

    #[test]
    fn parse_then_render_without_values_is_identity() {
        let re = num_re();
        proptest::proptest!(|(lead in "[a-z <>/]{0,20}", n in 0u32..100_000, tail in "[a-z <>/]{0,20}")| {
            let text = format!("{lead}n={n};{tail}");
            let t = Template::parse(&text, &[SlotPattern::new("n", &re)]).unwrap();
            proptest::prop_assert_eq!(t.render(&HashMap::new()), text);
        })
    }

    #[test]
    fn render_replaces_only_the_value_group() {
        let re = num_re();
        let t = Template::parse("<p>n=1;</p><p>n=2;</p>", &[SlotPattern::new("n", &re)]).unwrap();
        assert_eq!(t.slot_values("n").collect::<Vec<_>>(), vec!["1", "2"]);
        let values = HashMap::from([("n", "42".to_string())]);
        assert_eq!(t.render(&values), "<p>n=42;</p><p>n=42;</p>");
    }

    #[test]
    fn whole_match_is_slot_without_value_group() {
        let re = Regex::new(r"\[[^\]]*\]").unwrap();
        let t = Template::parse("a [x, y] b", &[SlotPattern::new("list", &re)]).unwrap();
        let values = HashMap::from([("list", "[z]".to_string())]);
        assert_eq!(t.render(&values), "a [z] b");
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let re = num_re();
        let err = Template::parse("nothing here", &[SlotPattern::new("n", &re)]).unwrap_err();
        assert!(matches!(err, PatchError::AnchorNotFound { slot: "n" }));
    }

    #[test]
    fn overlapping_slots_are_rejected() {
        let a = Regex::new(r"abc").unwrap();
        let b = Regex::new(r"bcd").unwrap();
        let err = Template::parse("xabcdx", &[SlotPattern::new("a", &a), SlotPattern::new("b", &b)])
            .unwrap_err();
        assert!(matches!(
            err,
            PatchError::OverlappingSlots {
                first: "a",
                second: "b"
            }
        ));
    }

    #[test]
    fn slots_are_order_insensitive() {
        let a = Regex::new(r"a=(?P<value>\d+)").unwrap();
        let b = Regex::new(r"b=(?P<value>\d+)").unwrap();
        let text = "b=1 a=2";
        let values = HashMap::from([("a", "7".to_string()), ("b", "8".to_string())]);
        let ab = Template::parse(text, &[SlotPattern::new("a", &a), SlotPattern::new("b", &b)]).unwrap();
        let ba = Template::parse(text, &[SlotPattern::new("b", &b), SlotPattern::new("a", &a)]).unwrap();
        assert_eq!(ab.render(&values), "b=8 a=7");
        assert_eq!(ab.render(&values), ba.render(&values));
    }
}
