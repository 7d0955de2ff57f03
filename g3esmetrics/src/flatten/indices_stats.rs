/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::block::{BlockLayout, BucketDictKeys};
use super::{MalformedDocument, require, require_f64, require_object};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

const LAYOUT: BlockLayout = BlockLayout {
    excluded_keys: &[],
    bucket_dict_keys: BucketDictKeys::Only(&["fields"]),
    singular_forms: &[("fields", "field")],
    bucket_list_keys: &[],
    prelude: None,
};

pub(super) fn flatten(
    root: &MetricPath,
    doc: &Document,
    per_index: bool,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    if let Some(meta) = doc.get("_shards") {
        let failed = require_f64(meta, "failed", "_shards.failed")?;
        if failed > 0.0 {
            return Ok(());
        }
    }

    if per_index {
        let indices = require_object(doc, "indices", "indices")?;
        for (index, stats) in indices {
            let labels = LabelSet::default().with("index", index);
            LAYOUT.walk(stats, root, &labels, out)?;
        }
    } else {
        let all = require(doc, "_all", "_all")?;
        let labels = LabelSet::default().with("index", "_all");
        LAYOUT.walk(all, root, &labels, out)?;
    }
    Ok(())
}
