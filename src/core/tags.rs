//! Placeholder codec for inline structural markup
//!
//! Game text carries inline markup (colored spans, status tags) that
//! translation backends would mangle. Upstream, markup is swapped for
//! `TAG<n>` placeholders; after translation the placeholders are swapped
//! back. Backends rewrite placeholders freely — `TAG0` may come back as
//! `【tag 0】` or `标签0` — so restoration must accept every variant.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::models::TagMap;

/// Square-bracketed markup recognized by [`encode_tags`]
fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\[\]]+\]").expect("markup regex"))
}

/// Replace square-bracketed markup with `TAG<n>` placeholders and return
/// the encoded text together with the placeholder -> markup map.
/// Identical markup strings share one placeholder id.
pub fn encode_tags(text: &str) -> (String, TagMap) {
    let mut map = TagMap::new();
    let mut next_id = 0usize;

    let encoded = markup_regex().replace_all(text, |caps: &regex::Captures<'_>| {
        let markup = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let existing = map
            .iter()
            .find(|(_, v)| v.as_str() == markup)
            .map(|(k, _)| k.clone());
        let id = match existing {
            Some(id) => id,
            None => {
                let id = next_id.to_string();
                next_id += 1;
                map.insert(id.clone(), markup.to_string());
                id
            }
        };
        format!("TAG{id}")
    });

    (encoded.into_owned(), map)
}

/// Restore original markup for every placeholder variant referencing an id
/// in `tag_map`.
///
/// Tolerated variants: surrounding bracket styles `[]`, `【】`, `{}`, `<>`,
/// `()`, `（）`, `@`; `TAG` / `标签` / `标记` labels, case-insensitive; an
/// optional `_` or space between label and id. Decoding text without
/// placeholders, or with an empty map, returns the input unchanged.
pub fn restore_tags(translated: &str, tag_map: &TagMap) -> String {
    if translated.is_empty() {
        return String::new();
    }
    if tag_map.is_empty() {
        return translated.to_string();
    }

    // Longer ids first, so "TAG12" is never half-eaten by id "1".
    let mut ids: Vec<&String> = tag_map.keys().collect();
    ids.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut text = translated.to_string();
    for id in ids {
        let markup = &tag_map[id];
        let pattern = format!(
            r"[\[【\{{<(（@]*\s*(?:[Tt][Aa][Gg]|标签|标记)[_\s]*{}\s*[\]】\}}>)）@]*",
            regex::escape(id)
        );
        // Per-id compile; tag maps hold a handful of entries at most.
        match Regex::new(&pattern) {
            Ok(re) => {
                text = re.replace_all(&text, regex::NoExpand(markup)).into_owned();
            }
            Err(e) => {
                tracing::warn!("skipping malformed tag pattern for id {id}: {e}");
            }
        }
    }
    text
}
