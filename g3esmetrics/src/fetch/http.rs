/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;

use super::{DocumentFetcher, FetchError};
use crate::config::{ClusterConfig, JobEndpoint};
use crate::document::Document;

const MAX_ERROR_BODY_LEN: usize = 512;

#[derive(Debug, PartialEq, Eq)]
struct EndpointRequest<'a> {
    post: bool,
    path_and_query: String,
    body: Option<&'a str>,
}

impl<'a> EndpointRequest<'a> {
    fn get(path_and_query: String) -> Self {
        EndpointRequest {
            post: false,
            path_and_query,
            body: None,
        }
    }

    fn new(endpoint: &'a JobEndpoint) -> Self {
        match endpoint {
            JobEndpoint::Search { indices, query } => EndpointRequest {
                post: true,
                path_and_query: format!("/{indices}/_search"),
                body: Some(query),
            },
            JobEndpoint::ClusterHealth { level } => {
                EndpointRequest::get(format!("/_cluster/health?level={}", level.as_str()))
            }
            JobEndpoint::NodesStats { metrics } => {
                if metrics.is_empty() {
                    EndpointRequest::get("/_nodes/stats".to_string())
                } else {
                    EndpointRequest::get(format!("/_nodes/stats/{}", metrics.join(",")))
                }
            }
            JobEndpoint::IndicesStats {
                metrics, fields, ..
            } => {
                let mut path = "/_all/_stats".to_string();
                if !metrics.is_empty() {
                    path.push('/');
                    path.push_str(&metrics.join(","));
                }
                if !fields.is_empty() {
                    path.push_str("?fields=");
                    path.push_str(&fields.join(","));
                }
                EndpointRequest::get(path)
            }
            JobEndpoint::IndicesAliases => EndpointRequest::get("/_alias".to_string()),
            JobEndpoint::IndicesMappings => EndpointRequest::get("/_mapping".to_string()),
        }
    }
}

/// Fetch documents over HTTP, trying the configured hosts in order.
pub struct HttpFetcher {
    client: reqwest::Client,
    hosts: Vec<String>,
    auth: Option<(String, String)>,
}

impl HttpFetcher {
    pub fn new(config: &ClusterConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow!("failed to create http client: {e}"))?;
        let auth = match (&config.username, &config.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        };
        Ok(HttpFetcher {
            client,
            hosts: config.hosts.clone(),
            auth,
        })
    }

    async fn fetch_from(
        &self,
        host: &str,
        req: &EndpointRequest<'_>,
    ) -> Result<Document, FetchError> {
        let url = format!("{host}{}", req.path_and_query);
        let mut builder = if req.post {
            self.client.post(&url)
        } else {
            self.client.get(&url)
        };
        if let Some(body) = req.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }
        if let Some((username, password)) = &self.auth {
            builder = builder.basic_auth(username, Some(password));
        }

        let response = builder.send().await.map_err(|e| FetchError::Request {
            url: url.clone(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<unable to read body>"));
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_LEN).collect(),
            });
        }

        let buf = response.bytes().await.map_err(|e| FetchError::Request {
            url: url.clone(),
            source: e,
        })?;
        Document::from_slice(&buf).map_err(|e| FetchError::Decode { url, source: e })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &JobEndpoint) -> Result<Document, FetchError> {
        let req = EndpointRequest::new(endpoint);

        let mut last_err = FetchError::NoHost;
        for host in &self.hosts {
            match self.fetch_from(host, &req).await {
                Ok(doc) => return Ok(doc),
                Err(e @ FetchError::Request { .. }) => {
                    // connection level error, try the next host
                    debug!("failed to fetch from host {host}: {e}");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        if self.hosts.len() > 1 {
            warn!("all {} hosts are unavailable", self.hosts.len());
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthLevel;

    #[test]
    fn request() {
        let e = JobEndpoint::Search {
            indices: "a,b".to_string(),
            query: "{}".to_string(),
        };
        assert_eq!(
            EndpointRequest::new(&e),
            EndpointRequest {
                post: true,
                path_and_query: "/a,b/_search".to_string(),
                body: Some("{}"),
            }
        );

        let e = JobEndpoint::ClusterHealth {
            level: HealthLevel::Shards,
        };
        assert_eq!(
            EndpointRequest::new(&e).path_and_query,
            "/_cluster/health?level=shards"
        );

        let e = JobEndpoint::NodesStats {
            metrics: Vec::new(),
        };
        assert_eq!(EndpointRequest::new(&e).path_and_query, "/_nodes/stats");
        let e = JobEndpoint::NodesStats {
            metrics: vec!["jvm".to_string(), "fs".to_string()],
        };
        assert_eq!(EndpointRequest::new(&e).path_and_query, "/_nodes/stats/jvm,fs");

        let e = JobEndpoint::IndicesStats {
            per_index: true,
            metrics: vec!["fielddata".to_string()],
            fields: vec!["*".to_string()],
        };
        let req = EndpointRequest::new(&e);
        assert!(!req.post);
        assert_eq!(req.path_and_query, "/_all/_stats/fielddata?fields=*");

        assert_eq!(
            EndpointRequest::new(&JobEndpoint::IndicesAliases).path_and_query,
            "/_alias"
        );
        assert_eq!(
            EndpointRequest::new(&JobEndpoint::IndicesMappings).path_and_query,
            "/_mapping"
        );
    }

    #[tokio::test]
    async fn no_host() {
        let config = ClusterConfig {
            hosts: Vec::new(),
            username: None,
            password: None,
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        let r = fetcher.fetch(&JobEndpoint::IndicesAliases).await;
        assert!(matches!(r, Err(FetchError::NoHost)));
    }
}
