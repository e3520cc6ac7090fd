use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("github api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
}

impl GithubApiError {
    pub fn status(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match *self {
            GithubApiError::Http { status, .. } => status,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            GithubApiError::Http { endpoint, .. } => endpoint.as_str(),
        }
    }
}

/// Read surface of the GitHub REST API used by the survey.
///
/// Listings return the raw JSON objects so callers can keep every field the
/// API sent, not just the ones a payload struct happens to name.
#[async_trait]
pub trait GithubClient: Send + Sync {
    async fn fetch_org(&self, org: &str) -> Result<Value>;
    async fn list_org_repos(&self, org: &str) -> Result<Vec<Value>>;
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<Value>>;
    async fn list_pulls(&self, org: &str, repo: &str) -> Result<Vec<Value>>;
    async fn list_releases(&self, org: &str, repo: &str) -> Result<Vec<Value>>;
}

pub struct RestGithubClient {
    http: Client,
    base: Url,
    page_size: u32,
}

impl RestGithubClient {
    pub fn new(api_url: &str, token: &str, user_agent: &str, page_size: u32) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {token}"))
            .context("token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );

        let http = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .context("building http client")?;

        let mut base = Url::parse(api_url).context("invalid api url")?;
        // Url::join treats the last path segment as a file unless the base
        // ends with a slash.
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        Ok(Self {
            http,
            base,
            page_size,
        })
    }

    /// Single authenticated GET; the parsed body is returned as-is.
    async fn get_json(&self, url: Url) -> Result<Value> {
        let endpoint = url.path().trim_start_matches('/').to_string();
        debug!(endpoint = %endpoint, "dispatching github request");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {endpoint}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubApiError::status(status, endpoint).into());
        }
        response
            .json::<Value>()
            .await
            .with_context(|| format!("decoding response for {endpoint}"))
    }

    async fn get_json_array(&self, url: Url) -> Result<Vec<Value>> {
        let value = self.get_json(url).await?;
        match value {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            _ => Err(anyhow!("expected array response")),
        }
    }

    /// Walks a listing endpoint page by page, accumulating every item.
    ///
    /// Pages are 1-based and requested at the configured size. The loop ends
    /// only on an empty page; a short page does not end it early, matching
    /// the upstream pagination contract.
    async fn get_paginated(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let mut collected = Vec::new();
        let mut page = 1u32;
        loop {
            let mut url = self.join(path)?;
            Self::with_query(&mut url, params);
            Self::with_query(
                &mut url,
                &[
                    ("per_page", self.page_size.to_string()),
                    ("page", page.to_string()),
                ],
            );
            let items = self.get_json_array(url).await?;
            if items.is_empty() {
                break;
            }
            collected.extend(items);
            page += 1;
        }
        Ok(collected)
    }

    fn join(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn with_query(url: &mut Url, params: &[(&str, String)]) {
        let mut query_pairs = url.query_pairs_mut();
        for (key, val) in params {
            query_pairs.append_pair(key, val);
        }
    }
}

#[async_trait]
impl GithubClient for RestGithubClient {
    async fn fetch_org(&self, org: &str) -> Result<Value> {
        let url = self.join(&format!("orgs/{org}"))?;
        self.get_json(url).await
    }

    async fn list_org_repos(&self, org: &str) -> Result<Vec<Value>> {
        self.get_paginated(&format!("orgs/{org}/repos"), &[]).await
    }

    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<Value>> {
        self.get_paginated(&format!("repos/{org}/{repo}/branches"), &[])
            .await
    }

    async fn list_pulls(&self, org: &str, repo: &str) -> Result<Vec<Value>> {
        let params = [
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ];
        self.get_paginated(&format!("repos/{org}/{repo}/pulls"), &params)
            .await
    }

    async fn list_releases(&self, org: &str, repo: &str) -> Result<Vec<Value>> {
        self.get_paginated(&format!("repos/{org}/{repo}/releases"), &[])
            .await
    }
}
