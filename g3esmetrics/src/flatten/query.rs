/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{MalformedDocument, emit, require, require_bool, require_f64};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

pub(super) fn flatten(
    root: &MetricPath,
    doc: &Document,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    if require_bool(doc, "timed_out", "timed_out")? {
        return Ok(());
    }

    let no_labels = LabelSet::default();

    let hits = require(doc, "hits", "hits")?;
    let total = match require(hits, "total", "hits.total")? {
        Document::Number(n) => *n,
        v @ Document::Object(_) => require_f64(v, "value", "hits.total.value")?,
        v => {
            return Err(MalformedDocument::type_mismatch("hits.total", "number", v));
        }
    };
    emit(out, root.join("hits"), &no_labels, total);

    let took = require_f64(doc, "took", "took")?;
    emit(out, root.join_all(&["took", "milliseconds"]), &no_labels, took);

    let Some(aggs) = doc.get("aggregations") else {
        return Ok(());
    };
    let Some(aggs) = aggs.as_object() else {
        return Err(MalformedDocument::type_mismatch("aggregations", "object", aggs));
    };
    for (name, agg) in aggs {
        let Some(entries) = agg.as_object() else {
            return Err(MalformedDocument::type_mismatch(
                format!("aggregations.{name}"),
                "object",
                agg,
            ));
        };
        walk_agg(name, entries, &root.join(name), &no_labels, out)?;
    }
    Ok(())
}

fn walk_agg(
    agg_key: &str,
    entries: &[(String, Document)],
    path: &MetricPath,
    labels: &LabelSet,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    for (key, value) in entries {
        if key.contains("_as_string") || key == "after_key" {
            continue;
        }

        match value {
            Document::Array(buckets) if key == "buckets" => {
                walk_bucket_list(agg_key, buckets, path, labels, out)?
            }
            Document::Object(buckets) if key == "buckets" => {
                for (bucket_key, bucket) in buckets {
                    let Some(bucket_entries) = bucket.as_object() else {
                        return Err(MalformedDocument::type_mismatch(
                            format!("{path}.buckets.{bucket_key}"),
                            "object",
                            bucket,
                        ));
                    };
                    let bucket_labels = labels.with(agg_key, bucket_key);
                    walk_agg(bucket_key, bucket_entries, path, &bucket_labels, out)?;
                }
            }
            Document::Object(children) => walk_agg(key, children, &path.join(key), labels, out)?,
            Document::Bool(b) => emit(out, path.join(key), labels, if *b { 1.0 } else { 0.0 }),
            Document::Number(n) => emit(out, path.join(key), labels, *n),
            Document::Array(_) | Document::String(_) | Document::Null => {}
        }
    }
    Ok(())
}

fn walk_bucket_list(
    agg_key: &str,
    buckets: &[Document],
    path: &MetricPath,
    labels: &LabelSet,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    for (i, bucket) in buckets.iter().enumerate() {
        let Some(entries) = bucket.as_object() else {
            return Err(MalformedDocument::type_mismatch(
                format!("{path}.buckets.{i}"),
                "object",
                bucket,
            ));
        };

        let (bucket_key, bucket_labels) = match bucket.get("key") {
            Some(Document::Object(fields)) => {
                let mut bucket_labels = labels.clone();
                let mut values = Vec::with_capacity(fields.len());
                for (field, v) in fields {
                    let v = v.to_label_value().unwrap_or_else(|| "null".to_string());
                    bucket_labels = bucket_labels.with(&format!("{agg_key}_{field}"), &v);
                    values.push(v);
                }
                (values.join("_"), bucket_labels)
            }
            Some(v) => {
                let Some(bucket_key) = v.to_label_value() else {
                    return Err(MalformedDocument::type_mismatch(
                        format!("{path}.buckets.{i}.key"),
                        "scalar",
                        v,
                    ));
                };
                let bucket_labels = labels.with(agg_key, &bucket_key);
                (bucket_key, bucket_labels)
            }
            None => {
                let bucket_key = format!("filter_{i}");
                let bucket_labels = labels.with(agg_key, &bucket_key);
                (bucket_key, bucket_labels)
            }
        };

        let entries: Vec<(String, Document)> = entries
            .iter()
            .filter(|(k, _)| k != "key")
            .cloned()
            .collect();
        walk_agg(&bucket_key, &entries, path, &bucket_labels, out)?;
    }
    Ok(())
}
