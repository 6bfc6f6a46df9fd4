//! Core data model for extraction results.
//!
//! The absent-marker convention: `None` (JSON `null`) means "no usable
//! value", which is distinct from an empty string. Selector-keyed output
//! must keep first-occurrence order, which `serde_json`'s default object
//! type does not, so [`OrderedMap`] carries its own serde impls.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Default navigation timeout in milliseconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 10_000;

/// Screenshot capture defaults to a desktop-sized viewport. Element
/// extraction imposes no default and uses the browser's own.
pub const DEFAULT_SCREENSHOT_VIEWPORT: Viewport = Viewport {
    width: 1920,
    height: 1080,
};

/// Navigation readiness criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitUntil {
    /// Return once the DOM is parsed (`document.readyState` leaves "loading").
    #[default]
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// Return once the load event fired (all subresources fetched).
    #[serde(rename = "load")]
    Load,
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Per-request options. Every field is optional on the wire; field names
/// match what the front-end form submits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeOptions {
    /// Navigation timeout in milliseconds.
    pub timeout: u64,
    pub wait_until: WaitUntil,
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
    /// Extra attempts beyond the first: `retries = N` allows N+1 total tries.
    pub retries: u32,
    /// Capture the full scrollable document instead of the viewport
    /// (screenshot requests only).
    pub full_page: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_NAVIGATION_TIMEOUT_MS,
            wait_until: WaitUntil::default(),
            user_agent: None,
            viewport: None,
            retries: 0,
            full_page: false,
        }
    }
}

/// One matched element: normalized text plus collected attributes.
///
/// An element with neither text nor attributes is still a valid record with
/// both fields absent, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, String>>,
}

/// Collapse internal whitespace runs to single spaces and trim.
///
/// Returns `None` when nothing remains: the absent-marker, not `""`.
/// Idempotent: normalizing already-normalized text is a no-op.
pub fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Selector-keyed extraction output: one key per distinct requested
/// selector in first-occurrence order, empty sequence for zero matches.
pub type ExtractionResult = OrderedMap<Vec<ElementRecord>>;

/// One reconstructed table row. All rows from one table share the identical
/// key set, derived once from header inference; `None` cells are absent.
pub type TableRow = OrderedMap<Option<String>>;

/// Raster capture of a rendered page. Raw PNG bytes; base64/data-URL
/// shaping happens at the wire layer.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub data: Vec<u8>,
}

impl Screenshot {
    /// Render as an inline `data:` URL for direct use in an `<img>` source.
    pub fn to_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.data))
    }
}

/// String-keyed map preserving insertion order.
///
/// Lookups are linear, which is fine at per-request selector counts.
/// Serializes and deserializes as a JSON object in entry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a value, replacing in place when the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for MapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}
