/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

/// A metric name restricted to `[A-Za-z0-9_:]`, never starting with a digit.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricName(String);

#[inline]
fn char_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

#[inline]
fn char_allowed_at_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

impl MetricName {
    /// Join the segments with `_` and replace every disallowed char
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let mut name = String::new();
        for (i, seg) in segments.iter().enumerate() {
            if i > 0 {
                name.push('_');
            }
            for c in seg.as_ref().chars() {
                if name.is_empty() {
                    name.push(if char_allowed_at_start(c) { c } else { '_' });
                } else {
                    name.push(if char_allowed(c) { c } else { '_' });
                }
            }
        }
        MetricName(name)
    }

    pub fn new(raw: &str) -> Self {
        Self::from_segments(&[raw])
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
