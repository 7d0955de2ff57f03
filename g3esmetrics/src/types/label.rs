/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;

/// A label name restricted to `[A-Za-z0-9_]`, never starting with a digit or `__`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelKey(String);

impl LabelKey {
    pub fn new(raw: &str) -> Self {
        let mut key = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() || c == '_' {
                key.push(c);
            } else {
                key.push('_');
            }
        }
        if key.starts_with(|c: char| c.is_ascii_digit()) {
            key.replace_range(0..1, "_");
        }
        let leading = key.bytes().take_while(|b| *b == b'_').count();
        if leading > 1 {
            key.replace_range(0..leading, "_");
        }
        LabelKey(key)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered raw labels collected while walking a document.
///
/// The set is shared, `with` always returns a new set. Extending an existing
/// key appends one more value component to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelSet {
    inner: Arc<Vec<(String, Vec<String>)>>,
}

impl LabelSet {
    pub fn with(&self, key: &str, component: &str) -> LabelSet {
        let mut inner = Vec::clone(&self.inner);
        match inner.iter_mut().find(|(k, _)| k == key) {
            Some((_, components)) => components.push(component.to_string()),
            None => inner.push((key.to_string(), vec![component.to_string()])),
        }
        LabelSet {
            inner: Arc::new(inner),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate over keys with their joined display values
    pub fn iter_joined(&self) -> impl Iterator<Item = (&str, String)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.join("_")))
    }

    pub fn get_joined(&self, key: &str) -> Option<String> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.join("_"))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key() {
        assert_eq!(LabelKey::new("__reserved").as_str(), "_reserved");
        assert_eq!(LabelKey::new("___x").as_str(), "_x");
        assert_eq!(LabelKey::new("_x").as_str(), "_x");
        assert_eq!(LabelKey::new("node.name").as_str(), "node_name");
        assert_eq!(LabelKey::new("a:b").as_str(), "a_b");
        assert_eq!(LabelKey::new("9lives").as_str(), "_lives");
        assert_eq!(LabelKey::new(".._x").as_str(), "_x");
    }

    #[test]
    fn extend() {
        let root = LabelSet::default();
        let a = root.with("status", "ok");
        let b = a.with("status", "inner");
        let c = a.with("region", "eu");
        assert!(root.is_empty());
        assert_eq!(a.get_joined("status").unwrap(), "ok");
        assert_eq!(b.get_joined("status").unwrap(), "ok_inner");
        assert_eq!(b.len(), 1);
        assert_eq!(c.len(), 2);
        let keys: Vec<&str> = c.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["status", "region"]);
    }
}
