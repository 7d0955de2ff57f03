/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{MalformedDocument, emit, require_object};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

pub(super) fn flatten(
    root: &MetricPath,
    doc: &Document,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    let Some(indices) = doc.as_object() else {
        return Err(MalformedDocument::type_mismatch(".", "object", doc));
    };

    let path = root.join("alias");
    for (index, data) in indices {
        let aliases = require_object(data, "aliases", &format!("{index}.aliases"))?;
        let labels = LabelSet::default().with("index", index);
        for (alias, _) in aliases {
            emit(out, path.clone(), &labels.with("alias", alias), 1.0);
        }
    }
    Ok(())
}
