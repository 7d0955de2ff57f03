/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::ops::Deref;

use ahash::AHashMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess};

/// A decoded response document.
///
/// Object members are kept in source order, as bucket and label ordering
/// follows the order in which the server returned them.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Document>),
    Object(DocumentMap),
}

/// Object members in source order, with a key index for lookups.
#[derive(Clone, Debug, Default)]
pub struct DocumentMap {
    entries: Vec<(String, Document)>,
    index: AHashMap<String, usize>,
}

impl DocumentMap {
    pub fn with_capacity(capacity: usize) -> Self {
        DocumentMap {
            entries: Vec::with_capacity(capacity),
            index: AHashMap::with_capacity(capacity),
        }
    }

    /// Insert a member, a duplicated key keeps its first position
    pub fn insert(&mut self, key: String, value: Document) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    #[inline]
    pub fn as_slice(&self) -> &[(String, Document)] {
        &self.entries
    }
}

impl Deref for DocumentMap {
    type Target = [(String, Document)];

    fn deref(&self) -> &Self::Target {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a DocumentMap {
    type Item = &'a (String, Document);
    type IntoIter = std::slice::Iter<'a, (String, Document)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl PartialEq for DocumentMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<(String, Document)> for DocumentMap {
    fn from_iter<T: IntoIterator<Item = (String, Document)>>(iter: T) -> Self {
        let mut map = DocumentMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Document {
    pub fn from_slice(buf: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(buf)
    }

    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Document)]> {
        match self {
            Document::Object(map) => Some(map.as_slice()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Document::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "bool",
            Document::Number(_) => "number",
            Document::String(_) => "string",
            Document::Array(_) => "array",
            Document::Object(_) => "object",
        }
    }

    /// Render a scalar as a label value.
    ///
    /// Integral numbers are printed without a fractional part, so histogram
    /// keys like `5.0` become `5`.
    pub fn to_label_value(&self) -> Option<String> {
        match self {
            Document::String(s) => Some(s.clone()),
            Document::Bool(b) => Some(b.to_string()),
            Document::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            Document::Null | Document::Array(_) | Document::Object(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> de::Visitor<'de> for DocumentVisitor {
            type Value = Document;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a json value")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Document::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Document::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Document::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Document::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Document::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Document::Number(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Document::Number(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Document::String(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(Document::String(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(v) = seq.next_element::<Document>()? {
                    items.push(v);
                }
                Ok(Document::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = DocumentMap::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, Document>()? {
                    entries.insert(k, v);
                }
                Ok(Document::Object(entries))
            }
        }

        deserializer.deserialize_any(DocumentVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_order() {
        let doc = Document::from_slice(br#"{"z": 1, "a": {"y": true, "b": null}, "m": [1, "x"]}"#)
            .unwrap();
        let entries = doc.as_object().unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);

        let a = doc.get("a").unwrap();
        assert_eq!(a.get("y"), Some(&Document::Bool(true)));
        assert_eq!(a.get("b"), Some(&Document::Null));
        assert_eq!(
            doc.get("m"),
            Some(&Document::Array(vec![
                Document::Number(1.0),
                Document::String("x".to_string())
            ]))
        );
        assert!(doc.get("none").is_none());
    }

    #[test]
    fn label_value() {
        assert_eq!(Document::Number(5.0).to_label_value().unwrap(), "5");
        assert_eq!(Document::Number(-3.0).to_label_value().unwrap(), "-3");
        assert_eq!(Document::Number(1.5).to_label_value().unwrap(), "1.5");
        assert_eq!(Document::Bool(false).to_label_value().unwrap(), "false");
        assert_eq!(
            Document::String("eu".to_string()).to_label_value().unwrap(),
            "eu"
        );
        assert!(Document::Null.to_label_value().is_none());
    }

    #[test]
    fn duplicated_key() {
        let doc = Document::from_slice(br#"{"a": 1, "b": 2, "a": 3}"#).unwrap();
        let keys: Vec<&str> = doc.as_object().unwrap().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Document::Number(3.0)));
    }

    #[test]
    fn large_object() {
        const COUNT: usize = 100_000;

        let mut buf = String::from(r#"{"indices":{"#);
        for i in 0..COUNT {
            if i > 0 {
                buf.push(',');
            }
            buf.push_str(&format!(r#""index-{i:06}":{{"primaries":{{"docs":{{"count":{i}}}}}}}"#));
        }
        buf.push_str("}}");

        let start = std::time::Instant::now();
        let doc = Document::from_slice(buf.as_bytes()).unwrap();
        assert!(start.elapsed() < std::time::Duration::from_secs(10));

        let indices = doc.get("indices").unwrap();
        assert_eq!(indices.as_object().unwrap().len(), COUNT);
        assert_eq!(indices.as_object().unwrap()[COUNT - 1].0, "index-099999");
        let docs = indices
            .get("index-054321")
            .and_then(|v| v.get("primaries"))
            .and_then(|v| v.get("docs"))
            .and_then(|v| v.get("count"));
        assert_eq!(docs, Some(&Document::Number(54321.0)));
    }

    #[test]
    fn invalid() {
        assert!(Document::from_slice(b"{\"a\": ").is_err());
    }
}
