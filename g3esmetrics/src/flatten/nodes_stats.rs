/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::block::{BlockLayout, BucketDictKeys};
use super::{MalformedDocument, require_f64, require_object, require_str};
use crate::document::Document;
use crate::types::{LabelSet, MetricPath, MetricTuple};

const LAYOUT: BlockLayout = BlockLayout {
    excluded_keys: &["timestamp"],
    bucket_dict_keys: BucketDictKeys::Only(&["pools", "collectors", "buffer_pools", "thread_pool"]),
    singular_forms: &[
        ("pools", "pool"),
        ("collectors", "collector"),
        ("buffer_pools", "buffer_pool"),
    ],
    bucket_list_keys: &[("data", "path"), ("devices", "device_name")],
    prelude: None,
};

pub(super) fn flatten(
    root: &MetricPath,
    doc: &Document,
    out: &mut Vec<MetricTuple>,
) -> Result<(), MalformedDocument> {
    if let Some(meta) = doc.get("_nodes") {
        let failed = require_f64(meta, "failed", "_nodes.failed")?;
        if failed > 0.0 {
            return Ok(());
        }
    }

    let nodes = require_object(doc, "nodes", "nodes")?;
    for (node_id, node) in nodes {
        let name = require_str(node, "name", &format!("nodes.{node_id}.name"))?;
        let labels = LabelSet::default()
            .with("node_id", node_id)
            .with("node_name", name);
        LAYOUT.walk(node, root, &labels, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::ResponseAdapter;
    use crate::flatten::tests::render;

    fn flatten(json: &str) -> Result<Vec<String>, MalformedDocument> {
        let doc = Document::from_slice(json.as_bytes()).unwrap();
        ResponseAdapter::NodesStats
            .flatten("es", &doc)
            .map(|t| render(&t))
    }

    #[test]
    fn node() {
        let r = flatten(
            r#"{"_nodes": {"total": 1, "successful": 1, "failed": 0},
                "cluster_name": "c",
                "nodes": {"n1": {
                    "timestamp": 1700000000000, "name": "node-a", "roles": ["data"],
                    "jvm": {
                        "mem": {"pools": {"young": {"used_in_bytes": 10}}},
                        "gc": {"collectors": {"old": {"collection_count": 2}}}
                    },
                    "thread_pool": {"search": {"queue": 0}},
                    "fs": {"data": [{"path": "/d", "free_in_bytes": 5}],
                           "io_stats": {"devices": [{"device_name": "sda", "operations": 7}]}}
                }}}"#,
        )
        .unwrap();
        let l = "node_id=\"n1\",node_name=\"node-a\"";
        assert_eq!(
            r,
            [
                format!("es_jvm_mem_pools_used_in_bytes{{{l},pool=\"young\"}}=10"),
                format!("es_jvm_gc_collectors_collection_count{{{l},collector=\"old\"}}=2"),
                format!("es_thread_pool_queue{{{l},thread_pool=\"search\"}}=0"),
                format!("es_fs_data_free_in_bytes{{{l},path=\"/d\"}}=5"),
                format!("es_fs_io_stats_devices_operations{{{l},device_name=\"sda\"}}=7"),
            ]
        );
    }

    #[test]
    fn failed_nodes() {
        let r = flatten(r#"{"_nodes": {"failed": 1}, "nodes": {}}"#).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn missing_name() {
        assert_eq!(
            flatten(r#"{"nodes": {"n1": {"jvm": {}}}}"#),
            Err(MalformedDocument::MissingField("nodes.n1.name".to_string()))
        );
    }
}
