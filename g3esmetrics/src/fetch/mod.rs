/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use thiserror::Error;

use crate::config::JobEndpoint;
use crate::document::Document;

mod http;
pub use http::HttpFetcher;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no host available")]
    NoHost,
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Fetch the response document of a job endpoint.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, endpoint: &JobEndpoint) -> Result<Document, FetchError>;
}
