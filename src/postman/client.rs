use super::SyncError;
use crate::runtime_config::RuntimeConfig;
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "X-Api-Key";

/// Blocking client for the Postman collections API.
#[derive(Debug, Clone)]
pub struct PostmanClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl PostmanClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, SyncError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| SyncError::Transport {
            uid: String::new(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, SyncError> {
        Self::new(config.postman_api_url.clone(), config.postman_timeout)
    }

    #[must_use]
    pub fn collection_url(&self, uid: &str) -> String {
        format!("{}/collections/{}", self.base_url, uid)
    }

    /// GET the collection, returning the raw body.
    pub fn fetch_collection(&self, uid: &str, api_key: &str) -> Result<String, SyncError> {
        let url = self.collection_url(uid);
        debug!(collection_uid = %uid, url = %url, "Fetching collection");
        let res = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .map_err(|e| transport(uid, &e))?;
        read_success(uid, res)
    }

    /// PUT the full collection document.
    pub fn put_collection(&self, uid: &str, api_key: &str, body: String) -> Result<(), SyncError> {
        let url = self.collection_url(uid);
        debug!(collection_uid = %uid, url = %url, bytes = body.len(), "Writing collection");
        let res = self
            .http
            .put(&url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| transport(uid, &e))?;
        read_success(uid, res).map(|_| ())
    }
}

fn transport(uid: &str, e: &reqwest::Error) -> SyncError {
    SyncError::Transport {
        uid: uid.to_string(),
        reason: e.to_string(),
    }
}

fn read_success(uid: &str, res: reqwest::blocking::Response) -> Result<String, SyncError> {
    let status = res.status();
    let body = res.text().map_err(|e| transport(uid, &e))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(SyncError::Status {
            uid: uid.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
