//! Detail-extraction contract types.
//!
//! `DetailExtraction` is the stable boundary between the field extractor and
//! its callers (the reconciliation dispatcher and the HTTP API surface). The
//! serialized shape must not change when the transport does.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Which evaluation table a classified structure represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Technical,
    Financial,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Technical => write!(f, "technical"),
            TableKind::Financial => write!(f, "financial"),
        }
    }
}

/// Label/value pairs extracted from a detail document's basic-info block.
///
/// Keys are normalized (lowercase, trailing colon stripped, whitespace
/// collapsed) while values are kept as written. Insertion order is
/// preserved because the first-seen key order later becomes the basic-info
/// sink's header row. A key collision keeps the original position and
/// overwrites the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicInfo {
    entries: Vec<(String, String)>,
}

impl BasicInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair; a repeated key overwrites in place.
    pub fn insert(&mut self, key: String, value: String) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for BasicInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BasicInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BasicInfoVisitor;

        impl<'de> Visitor<'de> for BasicInfoVisitor {
            type Value = BasicInfo;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of label/value strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut info = BasicInfo::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    info.insert(key, value);
                }
                Ok(info)
            }
        }

        deserializer.deserialize_map(BasicInfoVisitor)
    }
}

/// A classified evaluation table.
///
/// Rows keep the cell widths found in the document. The financial table's
/// headers carry a synthetic trailing `Winner` column that extraction never
/// populates, so its rows are one column narrower than its headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Basic-info section of the extraction payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfoSection {
    pub bid_info: BasicInfo,
}

/// Everything extracted from one detail document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailExtraction {
    pub basic_info: BasicInfoSection,
    pub technical_evaluation: Option<EvaluationTable>,
    pub financial_evaluation: Option<EvaluationTable>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_in_place() {
        let mut info = BasicInfo::new();
        info.insert("bid number".into(), "GEM/2024/1".into());
        info.insert("quantity".into(), "5".into());
        info.insert("bid number".into(), "GEM/2024/2".into());

        assert_eq!(info.len(), 2);
        assert_eq!(info.get("bid number"), Some("GEM/2024/2"));
        assert_eq!(info.keys().collect::<Vec<_>>(), ["bid number", "quantity"]);
    }

    #[test]
    fn serializes_as_ordered_map() {
        let mut info = BasicInfo::new();
        info.insert("bid number".into(), "GEM/2024/1".into());
        info.insert("item".into(), "Desktop".into());

        let payload = DetailExtraction {
            basic_info: BasicInfoSection { bid_info: info },
            technical_evaluation: None,
            financial_evaluation: None,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"basic_info":{"bid_info":{"bid number":"GEM/2024/1","item":"Desktop"}},"technical_evaluation":null,"financial_evaluation":null}"#
        );

        let back: DetailExtraction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
