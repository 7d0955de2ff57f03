/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{MalformedDocument, emit};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

pub(super) type BlockPrelude = fn(
    &Document,
    &MetricPath,
    &LabelSet,
    &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument>;

pub(super) enum BucketDictKeys {
    All,
    Only(&'static [&'static str]),
}

/// Describes how the keys of a statistics block are walked.
pub(super) struct BlockLayout {
    pub(super) excluded_keys: &'static [&'static str],
    pub(super) bucket_dict_keys: BucketDictKeys,
    /// container key -> label key, the container key is used if absent
    pub(super) singular_forms: &'static [(&'static str, &'static str)],
    /// container key -> name field of each list element
    pub(super) bucket_list_keys: &'static [(&'static str, &'static str)],
    /// called for every block before its keys are walked
    pub(super) prelude: Option<BlockPrelude>,
}

impl BlockLayout {
    fn is_bucket_dict(&self, key: &str) -> bool {
        match self.bucket_dict_keys {
            BucketDictKeys::All => true,
            BucketDictKeys::Only(keys) => keys.contains(&key),
        }
    }

    fn singular<'a>(&self, key: &'a str) -> &'a str {
        self.singular_forms
            .iter()
            .find(|(plural, _)| *plural == key)
            .map(|(_, singular)| *singular)
            .unwrap_or(key)
    }

    fn bucket_list_name_field(&self, key: &str) -> Option<&'static str> {
        self.bucket_list_keys
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, name)| *name)
    }

    pub(super) fn walk(
        &self,
        block: &Document,
        path: &MetricPath,
        labels: &LabelSet,
        out: &mut Vec<MetricTuple>,
    ) -> Result<(), MalformedDocument> {
        let Some(entries) = block.as_object() else {
            return Err(MalformedDocument::type_mismatch(
                path.to_string(),
                "object",
                block,
            ));
        };

        if let Some(prelude) = self.prelude {
            prelude(block, path, labels, out)?;
        }

        for (key, value) in entries {
            if self.excluded_keys.contains(&key.as_str()) {
                continue;
            }

            match value {
                Document::Bool(b) => emit(out, path.join(key), labels, if *b { 1.0 } else { 0.0 }),
                Document::Number(n) => emit(out, path.join(key), labels, *n),
                Document::Object(children) => {
                    let child_path = path.join(key);
                    if self.is_bucket_dict(key) {
                        let label_key = self.singular(key);
                        for (child_key, child) in children {
                            let child_labels = labels.with(label_key, child_key);
                            self.walk(child, &child_path, &child_labels, out)?;
                        }
                    } else {
                        self.walk(value, &child_path, labels, out)?;
                    }
                }
                Document::Array(items) => {
                    let Some(name_field) = self.bucket_list_name_field(key) else {
                        continue;
                    };
                    let child_path = path.join(key);
                    for (i, item) in items.iter().enumerate() {
                        // fall back to the position if the element has no name,
                        // which is not stable if the server reorders the list
                        let name = item
                            .get(name_field)
                            .and_then(Document::to_label_value)
                            .unwrap_or_else(|| i.to_string());
                        let child_labels = labels.with(name_field, &name);
                        self.walk(item, &child_path, &child_labels, out)?;
                    }
                }
                Document::Null | Document::String(_) => {}
            }
        }
        Ok(())
    }
}
