//! Typed configuration
//!
//! Hosts describe the engine declaratively through attributes on a controlling
//! element or script tag. [`ConfigResolver`] turns that attribute map into an
//! immutable [`Configuration`] once, at initialization.
//!
//! Resolution never fails: a malformed value is logged and replaced by the
//! documented default.
//!
//! # Example
//!
//! ```rust
//! use waymark_core::config::{Alignment, ConfigResolver, OffsetSpec};
//!
//! let config = ConfigResolver::new().resolve([
//!     ("data-offset", "#site-header"),
//!     ("data-duration", "450"),
//!     ("align", "center"),
//! ]);
//!
//! assert!(matches!(config.offset, OffsetSpec::Selector(_)));
//! assert_eq!(config.duration_ms, 450);
//! assert_eq!(config.alignment, Alignment::Center);
//! ```

use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::selector::Selector;

/// Global scroll offset: fixed pixels or the live height of an element
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetSpec {
    Pixels(i32),
    /// Measured on every scroll, since sticky headers change height
    Selector(Selector),
}

impl OffsetSpec {
    /// Interpret an offset attribute: selectors start with `#`, `.` or `[`
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.starts_with(['#', '.', '[']) {
            return Selector::parse(value)
                .map(OffsetSpec::Selector)
                .map_err(|source| ConfigError::InvalidSelector {
                    name: "offset".into(),
                    source,
                });
        }
        let pixels = parse_int("offset", value)?;
        Ok(OffsetSpec::Pixels(saturate_i32(pixels)))
    }
}

/// Where the target lands inside the viewport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Target top just below the offset
    #[default]
    Start,
    /// Target centered in the region below the offset
    Center,
}

impl FromStr for Alignment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "top" => Ok(Alignment::Start),
            "center" | "middle" => Ok(Alignment::Center),
            _ => Err(ConfigError::InvalidAlignment {
                name: "align".into(),
                value: s.to_string(),
            }),
        }
    }
}

/// Immutable configuration snapshot for one controller instance
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Configuration {
    pub offset: OffsetSpec,
    pub alignment: Alignment,
    /// Scroll animation duration (0 = instant)
    pub duration_ms: u32,
    pub auto_hide: bool,
    pub auto_hide_delay_ms: u32,
    pub show_progress: bool,
    pub active_class: String,
    /// Push `#id` history entries instead of keeping the address bar clean
    pub update_url: bool,
    /// Honor `?sec=` / `?section=` deep links
    pub allow_query: bool,
    pub menu_selector: Selector,
    /// Links whose clicks are considered for interception
    pub link_selector: Selector,
    pub anchor_selector: Selector,
    pub progress_selector: Selector,
    pub hidden_class: String,
    pub menu_label: String,
    pub link_label_prefix: String,
    /// Quiescence window for mutation-driven rebuilds
    pub rebuild_debounce_ms: u32,
    /// Settle time before an initial-load deep link scrolls
    pub initial_load_delay_ms: u32,
    /// Fraction of the viewport excluded from the bottom of the observed region
    pub bottom_margin: f32,
    /// Minimum visible fraction for a section to count as intersecting
    pub visibility_threshold: f32,
}

impl Configuration {
    pub const DEFAULT_OFFSET: i32 = 80;
    pub const DEFAULT_DURATION_MS: u32 = 600;
    pub const DEFAULT_AUTO_HIDE_DELAY_MS: u32 = 3000;
    pub const DEFAULT_REBUILD_DEBOUNCE_MS: u32 = 100;
    pub const DEFAULT_INITIAL_LOAD_DELAY_MS: u32 = 100;
    pub const DEFAULT_BOTTOM_MARGIN: f32 = 0.4;
    pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.1;
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            offset: OffsetSpec::Pixels(Self::DEFAULT_OFFSET),
            alignment: Alignment::Start,
            duration_ms: Self::DEFAULT_DURATION_MS,
            auto_hide: false,
            auto_hide_delay_ms: Self::DEFAULT_AUTO_HIDE_DELAY_MS,
            show_progress: false,
            active_class: "active-anchor".into(),
            update_url: false,
            allow_query: true,
            menu_selector: Selector::class("anchor-navigation"),
            link_selector: Selector::tag("a"),
            anchor_selector: Selector::class("section-anchor").with_attribute("id"),
            progress_selector: Selector::class("scroll-progress-bar"),
            hidden_class: "nav-hidden".into(),
            menu_label: "Page navigation".into(),
            link_label_prefix: "Go to".into(),
            rebuild_debounce_ms: Self::DEFAULT_REBUILD_DEBOUNCE_MS,
            initial_load_delay_ms: Self::DEFAULT_INITIAL_LOAD_DELAY_MS,
            bottom_margin: Self::DEFAULT_BOTTOM_MARGIN,
            visibility_threshold: Self::DEFAULT_VISIBILITY_THRESHOLD,
        }
    }
}

/// Builds a [`Configuration`] from declarative attributes
#[derive(Clone, Debug, Default)]
pub struct ConfigResolver {
    defaults: Configuration,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve against custom defaults instead of the documented ones
    pub fn with_defaults(defaults: Configuration) -> Self {
        Self { defaults }
    }

    /// Resolve an attribute map
    ///
    /// Names may be given in dataset form (`headerOffset`) or as raw
    /// attributes (`data-header-offset`).
    pub fn resolve<I, K, V>(&self, attributes: I) -> Configuration
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let attrs: FxHashMap<String, String> = attributes
            .into_iter()
            .map(|(k, v)| (dataset_key(k.as_ref()), v.as_ref().to_string()))
            .collect();

        for key in attrs.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!(attribute = %key, "ignoring unknown configuration attribute");
            }
        }

        let d = &self.defaults;
        let get = |names: &[&str]| names.iter().find_map(|n| attrs.get(*n).map(String::as_str));

        Configuration {
            offset: soft(
                get(&["offset", "headerOffset"]).map(OffsetSpec::parse),
                &d.offset,
            ),
            alignment: soft(get(&["align"]).map(Alignment::from_str), &d.alignment),
            duration_ms: soft(
                get(&["duration", "scrollDuration"]).map(|v| parse_ms("duration", v)),
                &d.duration_ms,
            ),
            auto_hide: soft(
                get(&["autoHide"]).map(|v| parse_bool("autoHide", v)),
                &d.auto_hide,
            ),
            auto_hide_delay_ms: soft(
                get(&["autoHideDelay"]).map(|v| parse_ms("autoHideDelay", v)),
                &d.auto_hide_delay_ms,
            ),
            show_progress: soft(
                get(&["showProgress"]).map(|v| parse_bool("showProgress", v)),
                &d.show_progress,
            ),
            active_class: text(get(&["activeClass"]), &d.active_class),
            update_url: soft(
                get(&["updateUrl"]).map(|v| parse_bool("updateUrl", v)),
                &d.update_url,
            ),
            allow_query: soft(
                get(&["allowQuery"]).map(|v| parse_bool("allowQuery", v)),
                &d.allow_query,
            ),
            menu_selector: soft(
                get(&["menuSelector"]).map(|v| parse_selector("menuSelector", v)),
                &d.menu_selector,
            ),
            link_selector: soft(
                get(&["linkSelector", "selector"]).map(|v| parse_selector("linkSelector", v)),
                &d.link_selector,
            ),
            anchor_selector: soft(
                get(&["anchorSelector"]).map(|v| parse_selector("anchorSelector", v)),
                &d.anchor_selector,
            ),
            progress_selector: soft(
                get(&["progressSelector"]).map(|v| parse_selector("progressSelector", v)),
                &d.progress_selector,
            ),
            hidden_class: text(get(&["hiddenClass"]), &d.hidden_class),
            menu_label: text(get(&["menuLabel"]), &d.menu_label),
            link_label_prefix: d.link_label_prefix.clone(),
            rebuild_debounce_ms: d.rebuild_debounce_ms,
            initial_load_delay_ms: d.initial_load_delay_ms,
            bottom_margin: d.bottom_margin,
            visibility_threshold: d.visibility_threshold,
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "offset",
    "headerOffset",
    "align",
    "duration",
    "scrollDuration",
    "autoHide",
    "autoHideDelay",
    "showProgress",
    "activeClass",
    "updateUrl",
    "allowQuery",
    "menuSelector",
    "linkSelector",
    "selector",
    "anchorSelector",
    "progressSelector",
    "hiddenClass",
    "menuLabel",
];

fn soft<T: Clone>(parsed: Option<Result<T, ConfigError>>, default: &T) -> T {
    match parsed {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            debug!(%err, "falling back to default");
            default.clone()
        }
        None => default.clone(),
    }
}

fn text(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// `data-header-offset` → `headerOffset`; dataset keys pass through
pub fn dataset_key(name: &str) -> String {
    let Some(rest) = name.strip_prefix("data-") else {
        if name.contains('-') {
            return camel_case(name);
        }
        return name.to_string();
    };
    camel_case(rest)
}

fn camel_case(kebab: &str) -> String {
    let mut out = String::with_capacity(kebab.len());
    let mut upper = false;
    for c in kebab.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Integer parsing with `parseInt` leniency: optional sign, leading digits,
/// trailing garbage ignored (`"80px"` is 80)
pub fn parse_int(name: &str, value: &str) -> Result<i64, ConfigError> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let invalid = || ConfigError::InvalidInteger {
        name: name.to_string(),
        value: value.to_string(),
    };
    if end == 0 {
        return Err(invalid());
    }
    let magnitude: i64 = digits[..end].parse().map_err(|_| invalid())?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Millisecond values; negatives clamp to zero
fn parse_ms(name: &str, value: &str) -> Result<u32, ConfigError> {
    let n = parse_int(name, value)?;
    Ok(n.clamp(0, u32::MAX as i64) as u32)
}

pub fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_selector(name: &str, value: &str) -> Result<Selector, ConfigError> {
    Selector::parse(value).map_err(|source| ConfigError::InvalidSelector {
        name: name.to_string(),
        source,
    })
}

pub(crate) fn saturate_i32(n: i64) -> i32 {
    n.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [(&str, &str); 0] = [];

    #[test]
    fn test_defaults_when_empty() {
        let config = ConfigResolver::new().resolve(NONE);
        assert_eq!(config, Configuration::default());
        assert_eq!(config.offset, OffsetSpec::Pixels(80));
        assert_eq!(config.duration_ms, 600);
        assert_eq!(config.auto_hide_delay_ms, 3000);
        assert_eq!(config.active_class, "active-anchor");
        assert!(!config.update_url);
    }

    #[test]
    fn test_parse_int_is_lenient_like_parse_int() {
        assert_eq!(parse_int("x", "80"), Ok(80));
        assert_eq!(parse_int("x", " 80px"), Ok(80));
        assert_eq!(parse_int("x", "-12"), Ok(-12));
        assert!(parse_int("x", "px80").is_err());
        assert!(parse_int("x", "").is_err());
        assert!(parse_int("x", "-").is_err());
    }

    #[test]
    fn test_malformed_numbers_fall_back() {
        let config = ConfigResolver::new().resolve([
            ("duration", "fast"),
            ("autoHideDelay", "soon"),
            ("offset", "tall"),
        ]);
        assert_eq!(config.duration_ms, 600);
        assert_eq!(config.auto_hide_delay_ms, 3000);
        assert_eq!(config.offset, OffsetSpec::Pixels(80));
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let config = ConfigResolver::new().resolve([("duration", "-300")]);
        assert_eq!(config.duration_ms, 0);
    }

    #[test]
    fn test_selector_offsets_are_deferred() {
        for value in ["#site-header", ".sticky", "[data-header]"] {
            let config = ConfigResolver::new().resolve([("offset", value)]);
            match config.offset {
                OffsetSpec::Selector(selector) => assert_eq!(selector.as_str(), value),
                other => panic!("expected selector offset, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_broken_selector_offset_falls_back() {
        for value in ["#header:hover", "#", ".a + .b"] {
            let config = ConfigResolver::new().resolve([("offset", value)]);
            assert_eq!(config.offset, OffsetSpec::Pixels(80), "offset {value:?}");
        }
    }

    #[test]
    fn test_nested_selector_offset() {
        let config =
            ConfigResolver::new().resolve([("offset", "#shopify-section-header .header")]);
        match config.offset {
            OffsetSpec::Selector(selector) => {
                assert_eq!(selector.as_str(), "#shopify-section-header .header")
            }
            other => panic!("expected selector offset, got {other:?}"),
        }
    }

    #[test]
    fn test_link_selector() {
        let config = ConfigResolver::new().resolve(NONE);
        assert_eq!(config.link_selector.as_str(), "a");

        let config = ConfigResolver::new().resolve([("data-link-selector", "a[href^=\"#\"]")]);
        assert_eq!(config.link_selector.as_str(), "a[href^=\"#\"]");

        let config = ConfigResolver::new().resolve([("selector", ".toc a")]);
        assert_eq!(config.link_selector.as_str(), ".toc a");

        let config = ConfigResolver::new().resolve([("linkSelector", "a:hover")]);
        assert_eq!(config.link_selector.as_str(), "a");
    }

    #[test]
    fn test_data_attribute_names() {
        let config = ConfigResolver::new().resolve([
            ("data-header-offset", "64"),
            ("data-scroll-duration", "0"),
            ("data-auto-hide", "TRUE"),
            ("data-show-progress", "true"),
            ("data-update-url", "yes"),
        ]);
        assert_eq!(config.offset, OffsetSpec::Pixels(64));
        assert_eq!(config.duration_ms, 0);
        assert!(config.auto_hide);
        assert!(config.show_progress);
        // "yes" is not a boolean
        assert!(!config.update_url);
    }

    #[test]
    fn test_primary_name_wins_over_alias() {
        let config = ConfigResolver::new().resolve([("offset", "10"), ("headerOffset", "99")]);
        assert_eq!(config.offset, OffsetSpec::Pixels(10));
    }

    #[test]
    fn test_alignment() {
        assert_eq!("center".parse::<Alignment>(), Ok(Alignment::Center));
        assert_eq!("START".parse::<Alignment>(), Ok(Alignment::Start));
        let config = ConfigResolver::new().resolve([("align", "diagonal")]);
        assert_eq!(config.alignment, Alignment::Start);
    }

    #[test]
    fn test_string_overrides() {
        let config = ConfigResolver::new().resolve([
            ("menuSelector", "#toc"),
            ("activeClass", "is-current"),
            ("hiddenClass", "  "),
        ]);
        assert_eq!(config.menu_selector.as_str(), "#toc");
        assert_eq!(config.active_class, "is-current");
        assert_eq!(config.hidden_class, "nav-hidden");
    }

    #[test]
    fn test_dataset_key() {
        assert_eq!(dataset_key("data-auto-hide-delay"), "autoHideDelay");
        assert_eq!(dataset_key("auto-hide"), "autoHide");
        assert_eq!(dataset_key("offset"), "offset");
    }

    #[test]
    fn test_serializes_to_json() {
        let config = ConfigResolver::new().resolve([("offset", "#hdr")]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["offset"]["selector"], "#hdr");
        assert_eq!(json["alignment"], "start");
        assert_eq!(json["menu_selector"], ".anchor-navigation");
    }
}
