/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::ffi::{OsStr, OsString};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use yaml_rust::{Yaml, YamlLoader, yaml};

pub(crate) fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

pub(crate) fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

pub(crate) fn get_required_str<'a>(map: &'a yaml::Hash, k: &str) -> anyhow::Result<&'a str> {
    let key = Yaml::String(k.to_owned());
    match map.get(&key) {
        Some(Yaml::String(s)) => Ok(s),
        Some(_) => Err(anyhow!("invalid string value for required key {k}")),
        None => Err(anyhow!("no required key {k} found in this map")),
    }
}

/// Call `f` on every doc of a multi-doc yaml file
pub(crate) fn foreach_doc<F>(path: &Path, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(usize, &Yaml) -> anyhow::Result<()>,
{
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    for (i, doc) in docs.iter().enumerate() {
        f(i, doc).context(format!("failed to parse doc {i} in {}", path.display()))?;
    }
    Ok(())
}

pub(crate) fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(value) {
                    Ok(Duration::from_secs(u))
                } else if let Ok(f) = f64::from_str(value) {
                    Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
                } else {
                    Err(anyhow!("invalid duration string"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            if let Ok(u) = u64::try_from(*value) {
                Ok(Duration::from_secs(u))
            } else {
                Err(anyhow!("unsupported duration string"))
            }
        }
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer' or 'real'"
        )),
    }
}

pub(crate) fn as_nonzero_usize(v: &Yaml) -> anyhow::Result<NonZeroUsize> {
    match v {
        Yaml::String(s) => Ok(NonZeroUsize::from_str(s)?),
        Yaml::Integer(i) => {
            let u = usize::try_from(*i)?;
            Ok(NonZeroUsize::try_from(u)?)
        }
        _ => Err(anyhow!(
            "yaml value type for 'nonzero usize' should be 'string' or 'integer'"
        )),
    }
}

pub(crate) fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' / 'integer' / 'real'"
        )),
    }
}

pub(crate) fn as_list<T, F>(v: &Yaml, convert: F) -> anyhow::Result<Vec<T>>
where
    F: Fn(&Yaml) -> anyhow::Result<T>,
{
    let mut vec = Vec::new();
    match v {
        Yaml::Array(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let node = convert(v).context(format!("invalid value for list element #{i}"))?;
                vec.push(node);
            }
        }
        _ => {
            let node = convert(v).context("invalid single value for the list")?;
            vec.push(node);
        }
    }
    Ok(vec)
}

/// Convert a yaml value into json, for request bodies written inline
pub(crate) fn as_json(v: &Yaml) -> anyhow::Result<serde_json::Value> {
    use serde_json::Value;

    match v {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(*b)),
        Yaml::Integer(i) => Ok(Value::from(*i)),
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| anyhow!("f64 value {s} can not be used in json"))
        }
        Yaml::String(s) => Ok(Value::String(s.to_string())),
        Yaml::Array(seq) => {
            let mut items = Vec::with_capacity(seq.len());
            for (i, v) in seq.iter().enumerate() {
                items.push(as_json(v).context(format!("invalid value for list element #{i}"))?);
            }
            Ok(Value::Array(items))
        }
        Yaml::Hash(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map.iter() {
                let key = as_string(k).context("invalid key for json object")?;
                let value = as_json(v).context(format!("invalid value for key {key}"))?;
                obj.insert(key, value);
            }
            Ok(Value::Object(obj))
        }
        _ => Err(anyhow!("unsupported yaml value type for json")),
    }
}

/// Load maps that are given inline, or as paths to files and directories.
pub(crate) struct HybridParser {
    conf_dir: PathBuf,
    conf_extension: Option<OsString>,
}

impl HybridParser {
    pub(crate) fn new(conf_dir: &Path, conf_extension: Option<&OsStr>) -> Self {
        HybridParser {
            conf_dir: PathBuf::from(conf_dir),
            conf_extension: conf_extension.map(|v| v.to_os_string()),
        }
    }

    pub(crate) fn foreach_map<F>(&self, value: &Yaml, f: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&yaml::Hash) -> anyhow::Result<()>,
    {
        match value {
            Yaml::String(path) => self.load_path(path, f).context(format!(
                "value is a string {path}, which should be a valid path",
            ))?,
            Yaml::Array(seq) => self
                .load_array(seq, f)
                .context(format!("value is an array, with {} objects", seq.len()))?,
            _ => return Err(anyhow!("value should be a path or an array")),
        }
        Ok(())
    }

    fn get_final_path(&self, path: &str) -> anyhow::Result<PathBuf> {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return Ok(path);
        }
        let mut final_path = self.conf_dir.clone();
        final_path.push(path);
        Ok(final_path.canonicalize()?)
    }

    fn load_array<F>(&self, entries: &[Yaml], f: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&yaml::Hash) -> anyhow::Result<()>,
    {
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                Yaml::String(path) => self
                    .load_path(path, f)
                    .context(format!("#{i}: failed to load path {path}"))?,
                Yaml::Hash(value) => f(value).context(format!("#{i}: failed to load map"))?,
                _ => return Err(anyhow!("#{i}: value should be a path or a map")),
            }
        }
        Ok(())
    }

    fn load_path<F>(&self, path: &str, f: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&yaml::Hash) -> anyhow::Result<()>,
    {
        let path = self.get_final_path(path)?;
        if path.is_dir() {
            self.load_dir(&path, f).context(format!(
                "failed to load conf from directory {}",
                path.display()
            ))?;
        } else if path.is_file() {
            self.load_file(&path, f)
                .context(format!("failed to load conf from file {}", path.display()))?;
        } else {
            return Err(anyhow!(
                "path {} should be a directory or file",
                path.display()
            ));
        }
        Ok(())
    }

    fn load_dir<F>(&self, path: &Path, f: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&yaml::Hash) -> anyhow::Result<()>,
    {
        let mut files = Vec::new();
        for d_entry in std::fs::read_dir(path)? {
            let d_entry = d_entry?;

            let file_name = d_entry.path();
            if let Some(conf_extension) = &self.conf_extension {
                let Some(extension) = file_name.extension() else {
                    continue;
                };
                if extension != conf_extension {
                    continue;
                }
            }

            // NOTE symlink is followed
            if file_name.is_file() {
                files.push(file_name);
            }
        }
        // job order should not depend on the file system
        files.sort();

        for file in files {
            self.load_file(&file, f)
                .context(format!("failed to load conf from file {}", file.display()))?;
        }
        Ok(())
    }

    fn load_file<F>(&self, path: &Path, f: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&yaml::Hash) -> anyhow::Result<()>,
    {
        foreach_doc(path, |i, doc| match doc {
            Yaml::Hash(value) => f(value),
            _ => Err(anyhow!("doc {i} in {} should be a map", path.display())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(s: &str) -> Yaml {
        YamlLoader::load_from_str(s).unwrap().pop().unwrap()
    }

    #[test]
    fn key() {
        assert_eq!(normalize("Abc"), "abc");
        assert_eq!(normalize("On-Error"), "on_error");
    }

    #[test]
    fn foreach_kv_err() {
        let yaml = doc("123: 1");
        let hash = yaml.as_hash().unwrap();
        assert!(foreach_kv(hash, |_, _| Ok(())).is_err());

        let yaml = doc("a: 1");
        let hash = yaml.as_hash().unwrap();
        assert!(foreach_kv(hash, |k, _| Err(anyhow!("error at {k}"))).is_err());
    }

    #[test]
    fn duration() {
        assert_eq!(
            as_duration(&doc("1m30s")).unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(as_duration(&doc("15")).unwrap(), Duration::from_secs(15));
        assert_eq!(
            as_duration(&doc("0.5")).unwrap(),
            Duration::from_millis(500)
        );
        assert!(as_duration(&doc("-1")).is_err());
        assert!(as_duration(&doc("[1]")).is_err());
    }

    #[test]
    fn list() {
        let v = as_list(&doc("[a, b]"), as_string).unwrap();
        assert_eq!(v, ["a", "b"]);
        let v = as_list(&doc("a"), as_string).unwrap();
        assert_eq!(v, ["a"]);
        assert!(as_list(&doc("[a, [b]]"), as_string).is_err());
    }

    #[test]
    fn json() {
        let v = as_json(&doc("query: {term: {level: error}}\nsize: 0\nrate: 0.5\nx: [true, ~]"))
            .unwrap();
        assert_eq!(
            v.to_string(),
            r#"{"query":{"term":{"level":"error"}},"rate":0.5,"size":0,"x":[true,null]}"#
        );
    }
}
