/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::anyhow;

use super::FamilySet;

/// Merge a fresh family set into the previous one.
///
/// Values present in `new` always win. Values only present in `old` are kept,
/// or reset to 0 if `zero_missing` is set. A family whose label keys changed
/// is taken from `new` as a whole.
pub fn merge(old: &FamilySet, new: &FamilySet, zero_missing: bool) -> FamilySet {
    let mut merged = new.clone();

    for (name, old_family) in old {
        match merged.get_mut(name) {
            Some(new_family) => {
                if !old_family.same_key_set(new_family.label_keys()) {
                    continue;
                }
                let old_family = old_family.reorder_as(new_family.shared_keys());
                for (label_values, v) in old_family.values() {
                    if new_family.get(label_values).is_none() {
                        let v = if zero_missing { 0.0 } else { *v };
                        new_family.insert(label_values.clone(), v);
                    }
                }
            }
            None => {
                let mut family = old_family.clone();
                if zero_missing {
                    family.values_mut().values_mut().for_each(|v| *v = 0.0);
                }
                merged.insert(name.clone(), family);
            }
        }
    }

    merged
}

/// What to do with series of the previous cycle that are not refreshed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StalePolicy {
    Preserve,
    #[default]
    Drop,
    Zero,
}

impl StalePolicy {
    /// Resolve the new state after a failed cycle
    pub fn on_error(self, old: &FamilySet) -> FamilySet {
        match self {
            StalePolicy::Preserve => old.clone(),
            StalePolicy::Drop => FamilySet::new(),
            StalePolicy::Zero => merge(old, &FamilySet::new(), true),
        }
    }

    /// Resolve the new state after a successful cycle
    pub fn on_missing(self, old: &FamilySet, new: FamilySet) -> FamilySet {
        match self {
            StalePolicy::Preserve => merge(old, &new, false),
            StalePolicy::Drop => new,
            StalePolicy::Zero => merge(old, &new, true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StalePolicy::Preserve => "preserve",
            StalePolicy::Drop => "drop",
            StalePolicy::Zero => "zero",
        }
    }
}

impl FromStr for StalePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(StalePolicy::Preserve),
            "drop" => Ok(StalePolicy::Drop),
            "zero" => Ok(StalePolicy::Zero),
            _ => Err(anyhow!("unsupported stale policy {s}")),
        }
    }
}
