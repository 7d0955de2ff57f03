/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{MalformedDocument, emit, require, require_object, require_str};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

#[derive(Default)]
struct FieldCounts(Vec<(String, f64)>);

impl FieldCounts {
    fn add(&mut self, field_type: &str) {
        match self.0.iter_mut().find(|(t, _)| t == field_type) {
            Some((_, n)) => *n += 1.0,
            None => self.0.push((field_type.to_string(), 1.0)),
        }
    }

    fn count_object(&mut self, object: &Document, field: &str) -> Result<(), MalformedDocument> {
        let properties = require_object(object, "properties", &format!("{field}.properties"))?;
        for (name, mapping) in properties {
            let name = format!("{field}.properties.{name}");
            if mapping.get("properties").is_some() {
                self.add("object");
                self.count_object(mapping, &name)?;
                continue;
            }

            self.add(require_str(mapping, "type", &format!("{name}.type"))?);
            // multi-fields, indexed in more than one way
            if let Some(fields) = mapping.get("fields") {
                let Some(fields) = fields.as_object() else {
                    return Err(MalformedDocument::type_mismatch(
                        format!("{name}.fields"),
                        "object",
                        fields,
                    ));
                };
                for (sub, sub_mapping) in fields {
                    let sub_type =
                        require_str(sub_mapping, "type", &format!("{name}.fields.{sub}.type"))?;
                    self.add(sub_type);
                }
            }
        }
        Ok(())
    }
}

fn count_index(index: &str, mappings: &Document) -> Result<FieldCounts, MalformedDocument> {
    let mut counts = FieldCounts::default();
    let field = format!("{index}.mappings");

    if mappings.get("properties").is_some() {
        counts.count_object(mappings, &field)?;
        return Ok(counts);
    }

    // before 7.x the mappings root is keyed by mapping type
    let Some(types) = mappings.as_object() else {
        return Err(MalformedDocument::type_mismatch(field, "object", mappings));
    };
    for (mapping_type, type_mappings) in types {
        if mapping_type == "_default_" || type_mappings.get("properties").is_none() {
            continue;
        }
        counts.count_object(type_mappings, &format!("{field}.{mapping_type}"))?;
    }
    Ok(counts)
}

pub(super) fn flatten(
    root: &MetricPath,
    doc: &Document,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    let Some(indices) = doc.as_object() else {
        return Err(MalformedDocument::type_mismatch(".", "object", doc));
    };

    let path = root.join_all(&["field", "count"]);
    for (index, data) in indices {
        let mappings = require(data, "mappings", &format!("{index}.mappings"))?;
        let counts = count_index(index, mappings)?;
        let labels = LabelSet::default().with("index", index);
        for (field_type, n) in counts.0 {
            emit(out, path.clone(), &labels.with("field_type", &field_type), n);
        }
    }
    Ok(())
}
