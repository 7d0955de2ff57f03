/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::yaml_util::{as_list, as_string, foreach_kv, normalize};

const DEFAULT_HOST: &str = "http://localhost:9200";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    pub hosts: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            hosts: vec![DEFAULT_HOST.to_string()],
            username: None,
            password: None,
        }
    }
}

impl ClusterConfig {
    pub(crate) fn parse(v: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            return Err(anyhow!("yaml value type for cluster config should be 'map'"));
        };

        let mut config = ClusterConfig::default();
        foreach_kv(map, |k, v| config.set(k, v))?;
        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize(k).as_str() {
            "hosts" | "host" => {
                self.hosts = as_list(v, as_string)
                    .context(format!("invalid string list value for key {k}"))?;
                Ok(())
            }
            "username" => {
                self.username = Some(as_string(v)?);
                Ok(())
            }
            "password" => {
                self.password = Some(as_string(v)?);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&mut self) -> anyhow::Result<()> {
        if self.hosts.is_empty() {
            return Err(anyhow!("no hosts set"));
        }
        for host in self.hosts.iter_mut() {
            let url = reqwest::Url::parse(host)
                .map_err(|e| anyhow!("invalid host url {host}: {e}"))?;
            match url.scheme() {
                "http" | "https" => {}
                s => return Err(anyhow!("unsupported scheme {s} in host url {host}")),
            }
            while host.ends_with('/') {
                host.pop();
            }
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(anyhow!("username and password should be set together"));
        }
        Ok(())
    }
}
