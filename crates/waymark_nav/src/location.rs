//! URL helpers for link interception and deep links
//!
//! A deep link names its target either through a `sec`/`section` query
//! parameter or the fragment. Both are stripped from the address bar once
//! the engine has acted on them.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use url::Url;

/// Query parameters naming a target section, in precedence order
pub const SECTION_QUERY_KEYS: [&str; 2] = ["sec", "section"];

/// Fragment of `href` if it points at the document at `current`
///
/// Accepts `#id`, `/#id` on the same path, and absolute URLs with the same
/// origin and path. Returns `None` for other pages and empty fragments.
pub fn same_page_fragment(current: &Url, href: &str) -> Option<String> {
    let target = current.join(href).ok()?;
    if target.origin() != current.origin() || target.path() != current.path() {
        return None;
    }
    target
        .fragment()
        .filter(|fragment| !fragment.is_empty())
        .map(decode_fragment)
}

pub fn fragment_id(url: &Url) -> Option<String> {
    url.fragment().filter(|f| !f.is_empty()).map(decode_fragment)
}

/// Percent-decoded fragment; malformed UTF-8 keeps the raw text
fn decode_fragment(fragment: &str) -> String {
    percent_decode_str(fragment)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| fragment.to_string())
}

/// Anchor ids named by `sec`/`section`, in key precedence order
pub fn query_targets(url: &Url) -> Vec<String> {
    SECTION_QUERY_KEYS
        .iter()
        .filter_map(|key| {
            url.query_pairs()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

/// Candidate anchor ids for a page load: query parameters first, then the hash
pub fn deep_link_candidates(url: &Url, allow_query: bool) -> Vec<String> {
    let mut candidates = if allow_query { query_targets(url) } else { Vec::new() };
    candidates.extend(fragment_id(url));
    candidates
}

/// Candidate anchor ids after history navigation: the hash first
pub fn history_candidates(url: &Url, allow_query: bool) -> Vec<String> {
    let mut candidates: Vec<String> = fragment_id(url).into_iter().collect();
    if allow_query {
        candidates.extend(query_targets(url));
    }
    candidates
}

fn is_section_key(key: &str) -> bool {
    SECTION_QUERY_KEYS.contains(&key)
}

pub fn has_section_query(url: &Url) -> bool {
    url.query_pairs().any(|(k, _)| is_section_key(&k))
}

/// `url` without `sec`/`section`, keeping every other parameter
pub fn strip_section_query(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_section_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}

pub fn without_fragment(url: &Url) -> Url {
    let mut clean = url.clone();
    clean.set_fragment(None);
    clean
}

pub fn with_fragment(url: &Url, anchor_id: &str) -> Url {
    let mut target = url.clone();
    target.set_fragment(Some(anchor_id));
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_page_fragment_forms() {
        let current = url("https://shop.example/products/tee");
        assert_eq!(same_page_fragment(&current, "#sizes").as_deref(), Some("sizes"));
        assert_eq!(
            same_page_fragment(&current, "/products/tee#sizes").as_deref(),
            Some("sizes")
        );
        assert_eq!(
            same_page_fragment(&current, "https://shop.example/products/tee?x=1#sizes").as_deref(),
            Some("sizes")
        );
    }

    #[test]
    fn test_root_fragment_link_on_home_page() {
        let home = url("https://shop.example/");
        assert_eq!(same_page_fragment(&home, "/#pricing").as_deref(), Some("pricing"));

        let other = url("https://shop.example/about");
        assert_eq!(same_page_fragment(&other, "/#pricing"), None);
    }

    #[test]
    fn test_foreign_or_empty_links_rejected() {
        let current = url("https://shop.example/");
        assert_eq!(same_page_fragment(&current, "https://other.example/#pricing"), None);
        assert_eq!(same_page_fragment(&current, "#"), None);
        assert_eq!(same_page_fragment(&current, "/cart"), None);
    }

    #[test]
    fn test_fragments_are_percent_decoded() {
        let current = url("https://shop.example/");
        assert_eq!(same_page_fragment(&current, "#caf%C3%A9").as_deref(), Some("café"));
        assert_eq!(same_page_fragment(&current, "#café").as_deref(), Some("café"));
        assert_eq!(
            same_page_fragment(&current, "#size%20guide").as_deref(),
            Some("size guide")
        );
        assert_eq!(fragment_id(&url("https://shop.example/#caf%C3%A9")).as_deref(), Some("café"));
        // Not valid UTF-8 once decoded
        assert_eq!(fragment_id(&url("https://shop.example/#a%FF")).as_deref(), Some("a%FF"));
    }

    #[test]
    fn test_deep_link_candidates_order() {
        let u = url("https://shop.example/?section=faq&sec=pricing#intro");
        assert_eq!(deep_link_candidates(&u, true), ["pricing", "faq", "intro"]);
        assert_eq!(deep_link_candidates(&u, false), ["intro"]);
        assert!(deep_link_candidates(&url("https://shop.example/?sec="), true).is_empty());
    }

    #[test]
    fn test_history_candidates_prefer_hash() {
        let u = url("https://shop.example/?sec=pricing#intro");
        assert_eq!(history_candidates(&u, true), ["intro", "pricing"]);
        assert_eq!(history_candidates(&u, false), ["intro"]);
    }

    #[test]
    fn test_strip_section_query_keeps_other_params() {
        let u = url("https://shop.example/?utm=mail&sec=pricing#x");
        assert_eq!(strip_section_query(&u).as_str(), "https://shop.example/?utm=mail#x");

        let only = url("https://shop.example/?sec=pricing");
        assert_eq!(strip_section_query(&only).as_str(), "https://shop.example/");
        assert!(has_section_query(&only));
        assert!(!has_section_query(&strip_section_query(&only)));
    }

    #[test]
    fn test_fragment_helpers() {
        let u = url("https://shop.example/#old");
        assert_eq!(without_fragment(&u).as_str(), "https://shop.example/");
        assert_eq!(with_fragment(&u, "pricing").as_str(), "https://shop.example/#pricing");
    }
}
