/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

mod block;

mod cluster_health;
mod indices_aliases;
mod indices_mappings;
mod indices_stats;
mod nodes_stats;
mod query;

#[derive(Debug, Error, PartialEq)]
pub enum MalformedDocument {
    #[error("missing field {0}")]
    MissingField(String),
    #[error("invalid value for field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl MalformedDocument {
    fn type_mismatch(field: impl Into<String>, expected: &'static str, found: &Document) -> Self {
        MalformedDocument::TypeMismatch {
            field: field.into(),
            expected,
            found: found.kind(),
        }
    }
}

/// The shape of response a job receives, selecting how it is flattened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseAdapter {
    Search,
    ClusterHealth,
    NodesStats,
    IndicesStats { per_index: bool },
    IndicesAliases,
    IndicesMappings,
}

impl ResponseAdapter {
    pub fn flatten(
        &self,
        prefix: &str,
        doc: &Document,
    ) -> Result<Vec<MetricTuple>, MalformedDocument> {
        let root = if prefix.is_empty() {
            MetricPath::default()
        } else {
            MetricPath::new([prefix])
        };
        let mut out = Vec::new();
        match self {
            ResponseAdapter::Search => query::flatten(&root, doc, &mut out)?,
            ResponseAdapter::ClusterHealth => cluster_health::flatten(&root, doc, &mut out)?,
            ResponseAdapter::NodesStats => nodes_stats::flatten(&root, doc, &mut out)?,
            ResponseAdapter::IndicesStats { per_index } => {
                indices_stats::flatten(&root, doc, *per_index, &mut out)?
            }
            ResponseAdapter::IndicesAliases => indices_aliases::flatten(&root, doc, &mut out)?,
            ResponseAdapter::IndicesMappings => indices_mappings::flatten(&root, doc, &mut out)?,
        }
        Ok(out)
    }
}

#[inline]
fn emit(out: &mut Vec<MetricTuple>, path: MetricPath, labels: &LabelSet, value: f64) {
    out.push(MetricTuple::new(path, labels.clone(), value));
}

fn require<'a>(
    doc: &'a Document,
    key: &str,
    field: &str,
) -> Result<&'a Document, MalformedDocument> {
    if doc.as_object().is_none() {
        return Err(MalformedDocument::type_mismatch(
            field.rsplit_once('.').map(|(p, _)| p).unwrap_or("."),
            "object",
            doc,
        ));
    }
    doc.get(key)
        .ok_or_else(|| MalformedDocument::MissingField(field.to_string()))
}

fn require_object<'a>(
    doc: &'a Document,
    key: &str,
    field: &str,
) -> Result<&'a [(String, Document)], MalformedDocument> {
    let v = require(doc, key, field)?;
    v.as_object()
        .ok_or_else(|| MalformedDocument::type_mismatch(field, "object", v))
}

fn require_bool(doc: &Document, key: &str, field: &str) -> Result<bool, MalformedDocument> {
    let v = require(doc, key, field)?;
    v.as_bool()
        .ok_or_else(|| MalformedDocument::type_mismatch(field, "bool", v))
}

fn require_f64(doc: &Document, key: &str, field: &str) -> Result<f64, MalformedDocument> {
    let v = require(doc, key, field)?;
    v.as_f64()
        .ok_or_else(|| MalformedDocument::type_mismatch(field, "number", v))
}

fn require_str<'a>(
    doc: &'a Document,
    key: &str,
    field: &str,
) -> Result<&'a str, MalformedDocument> {
    let v = require(doc, key, field)?;
    v.as_str()
        .ok_or_else(|| MalformedDocument::type_mismatch(field, "string", v))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn render(tuples: &[MetricTuple]) -> Vec<String> {
        tuples
            .iter()
            .map(|t| {
                let labels: Vec<String> = t
                    .labels
                    .iter_joined()
                    .map(|(k, v)| format!("{k}=\"{v}\""))
                    .collect();
                if labels.is_empty() {
                    format!("{}={}", t.metric_name(), t.value)
                } else {
                    format!("{}{{{}}}={}", t.metric_name(), labels.join(","), t.value)
                }
            })
            .collect()
    }

    #[test]
    fn require_fields() {
        let doc = Document::from_slice(br#"{"a": 1, "b": "x"}"#).unwrap();
        assert_eq!(require_f64(&doc, "a", "a").unwrap(), 1.0);
        assert_eq!(
            require_f64(&doc, "c", "c"),
            Err(MalformedDocument::MissingField("c".to_string()))
        );
        assert_eq!(
            require_bool(&doc, "b", "b"),
            Err(MalformedDocument::TypeMismatch {
                field: "b".to_string(),
                expected: "bool",
                found: "string",
            })
        );

        let doc = Document::Number(1.0);
        assert!(matches!(
            require(&doc, "a", "x.a"),
            Err(MalformedDocument::TypeMismatch { expected: "object", .. })
        ));
    }

    #[test]
    fn empty_prefix() {
        let doc = Document::from_slice(br#"{"x": {"a": 1}}"#).unwrap();
        let tuples = ResponseAdapter::IndicesAliases.flatten("", &doc);
        assert!(tuples.is_err());

        let doc = Document::from_slice(br#"{"i": {"aliases": {"a": {}}}}"#).unwrap();
        let tuples = ResponseAdapter::IndicesAliases.flatten("", &doc).unwrap();
        assert_eq!(render(&tuples), ["alias{index=\"i\",alias=\"a\"}=1"]);
    }
}
