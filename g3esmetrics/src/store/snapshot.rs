/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use super::MetricFamily;
use crate::types::{LabelKey, MetricName};

/// A read-only copy of one metric family, samples sorted by label values.
#[derive(Clone, Debug, PartialEq)]
pub struct FamilySnapshot {
    pub name: MetricName,
    pub label_keys: Vec<LabelKey>,
    pub samples: Vec<(Vec<String>, f64)>,
}

impl FamilySnapshot {
    pub(super) fn new(name: &MetricName, family: &MetricFamily) -> Self {
        let samples = if family.label_keys().is_empty() {
            // a single unlabeled value
            family
                .values()
                .iter()
                .next()
                .map(|(k, v)| vec![(k.clone(), *v)])
                .unwrap_or_default()
        } else {
            family
                .values()
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect()
        };
        FamilySnapshot {
            name: name.clone(),
            label_keys: family.label_keys().to_vec(),
            samples,
        }
    }

    pub(super) fn single(name: MetricName, value: f64) -> Self {
        FamilySnapshot {
            name,
            label_keys: Vec::new(),
            samples: vec![(Vec::new(), value)],
        }
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{c}")?,
        }
    }
    Ok(())
}

impl fmt::Display for FamilySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label_values, value) in &self.samples {
            f.write_str(self.name.as_str())?;
            if !self.label_keys.is_empty() {
                f.write_str("{")?;
                for (i, (k, v)) in self.label_keys.iter().zip(label_values).enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}=\"")?;
                    write_escaped(f, v)?;
                    f.write_str("\"")?;
                }
                f.write_str("}")?;
            }
            writeln!(f, " {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let mut family = MetricFamily::new(vec![LabelKey::new("status"), LabelKey::new("host")]);
        family.insert(vec!["ok".to_string(), "a\"b".to_string()], 40.0);
        family.insert(vec!["error".to_string(), "c".to_string()], 2.5);
        let snap = FamilySnapshot::new(&MetricName::new("q1_status_doc_count"), &family);
        assert_eq!(
            snap.to_string(),
            "q1_status_doc_count{status=\"error\",host=\"c\"} 2.5\n\
             q1_status_doc_count{status=\"ok\",host=\"a\\\"b\"} 40\n"
        );

        let snap = FamilySnapshot::single(MetricName::new("q1_up"), 1.0);
        assert_eq!(snap.to_string(), "q1_up 1\n");
    }
}
