/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::block::{BlockLayout, BucketDictKeys};
use super::{MalformedDocument, emit, require_bool, require_str};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

const LAYOUT: BlockLayout = BlockLayout {
    excluded_keys: &["timed_out"],
    bucket_dict_keys: BucketDictKeys::All,
    singular_forms: &[("indices", "index"), ("shards", "shard")],
    bucket_list_keys: &[],
    prelude: Some(emit_status),
};

const STATUS_COLORS: [&str; 3] = ["green", "yellow", "red"];

/// Emit `status` as 0/1/2 for green/yellow/red, so that a sum over many
/// blocks is 0 only if all of them are green, plus one-hot per color.
fn emit_status(
    block: &Document,
    path: &MetricPath,
    labels: &LabelSet,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    let field = if path.is_empty() {
        "status".to_string()
    } else {
        format!("{path}.status")
    };
    let status = require_str(block, "status", &field)?;
    let Some(level) = STATUS_COLORS.iter().position(|c| *c == status) else {
        return Err(MalformedDocument::TypeMismatch {
            field,
            expected: "green|yellow|red",
            found: "string",
        });
    };

    emit(out, path.join("status"), labels, level as f64);
    for (i, color) in STATUS_COLORS.iter().enumerate() {
        let v = if i == level { 1.0 } else { 0.0 };
        emit(out, path.join_all(&["status", color]), labels, v);
    }
    Ok(())
}

pub(super) fn flatten(
    root: &MetricPath,
    doc: &Document,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    if require_bool(doc, "timed_out", "timed_out")? {
        return Ok(());
    }
    LAYOUT.walk(doc, root, &LabelSet::default(), out)
}
