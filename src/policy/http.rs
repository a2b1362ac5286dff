use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::authority::PolicyAuthority;
use super::model::{ClearanceLevel, ClearanceLevelUpdate, FunctionId, FunctionPermission};
use crate::error::{AuthError, FetchError, DEFAULT_AUTH_MESSAGE};
use crate::identity::{LoginRequest, LoginResponse, TokenStore};

/// REST client for the policy authority.
///
/// Every request except login carries the current bearer credential when the
/// token store holds a valid one.
#[derive(Clone)]
pub struct HttpPolicyAuthority {
    base: Url,
    client: reqwest::Client,
    tokens: Option<Arc<TokenStore>>,
}

// `{"message": "..."}` or `{"message": ["..", ".."]}`, whichever the backend sends.
fn message_from_body(text: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(text).ok()?;
    match v.get("message")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|i| i.as_str()).collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        _ => None,
    }
}

async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    message_from_body(&text)
        .or_else(|| {
            let t = text.trim();
            if t.is_empty() { None } else { Some(t.to_string()) }
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
    resp.json::<T>().await.map_err(|e| FetchError::payload(e.to_string()))
}

impl HttpPolicyAuthority {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid policy authority URL '{}'", base))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base, client, tokens: None })
    }

    /// Attach the token store whose credential is sent as `Authorization`.
    pub fn with_tokens(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn base(&self) -> &Url { &self.base }

    // Joined by hand so a base with a path prefix (`https://host/api`) keeps it.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn function_url(&self, level: i32, function: &FunctionId) -> String {
        self.url(&format!("clearance-levels/{}/functions/{}", level, urlencoding::encode(function.as_str())))
    }

    fn authorized(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.tokens.as_ref().and_then(|t| t.bearer_header()) {
            Some(h) => rb.header(AUTHORIZATION, h),
            None => rb,
        }
    }

    async fn send(&self, rb: RequestBuilder) -> Result<Response, FetchError> {
        let resp = self.authorized(rb).send().await.map_err(|e| FetchError::transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let msg = error_message(resp).await;
            debug!(target: "stockgate::policy", "authority answered {}: {}", status, msg);
            return Err(FetchError::status(status.as_u16(), msg));
        }
        Ok(resp)
    }
}

impl PolicyAuthority for HttpPolicyAuthority {
    fn login<'a>(&'a self, req: &'a LoginRequest) -> BoxFuture<'a, Result<LoginResponse, AuthError>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(self.url("auth/login"))
                .json(req)
                .send()
                .await
                .map_err(|e| AuthError::Transport { message: e.to_string() })?;
            if !resp.status().is_success() {
                let text = resp.text().await.unwrap_or_default();
                let msg = message_from_body(&text).unwrap_or_else(|| DEFAULT_AUTH_MESSAGE.to_string());
                return Err(AuthError::Rejected { message: msg });
            }
            resp.json::<LoginResponse>()
                .await
                .map_err(|e| AuthError::Transport { message: format!("unreadable login response: {}", e) })
        })
    }

    fn fetch_levels(&self) -> BoxFuture<'_, Result<Vec<ClearanceLevel>, FetchError>> {
        Box::pin(async move {
            let resp = self.send(self.client.get(self.url("clearance-levels"))).await?;
            read_json(resp).await
        })
    }

    fn create_level<'a>(&'a self, level: &'a ClearanceLevel) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>> {
        Box::pin(async move {
            let resp = self.send(self.client.post(self.url("clearance-levels")).json(level)).await?;
            read_json(resp).await
        })
    }

    fn update_level<'a>(&'a self, level: i32, update: &'a ClearanceLevelUpdate) -> BoxFuture<'a, Result<ClearanceLevel, FetchError>> {
        Box::pin(async move {
            let url = self.url(&format!("clearance-levels/{}", level));
            let resp = self.send(self.client.put(url).json(update)).await?;
            read_json(resp).await
        })
    }

    fn delete_level(&self, level: i32) -> BoxFuture<'_, Result<(), FetchError>> {
        Box::pin(async move {
            let url = self.url(&format!("clearance-levels/{}", level));
            self.send(self.client.delete(url)).await.map(|_| ())
        })
    }

    fn add_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(async move {
            let rb = self.client.post(self.function_url(level, function)).json(&serde_json::json!({}));
            self.send(rb).await.map(|_| ())
        })
    }

    fn remove_function<'a>(&'a self, level: i32, function: &'a FunctionId) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(async move {
            self.send(self.client.delete(self.function_url(level, function))).await.map(|_| ())
        })
    }

    fn fetch_functions(&self) -> BoxFuture<'_, Result<Vec<FunctionPermission>, FetchError>> {
        Box::pin(async move {
            let resp = self.send(self.client.get(self.url("clearance-levels/functions"))).await?;
            read_json(resp).await
        })
    }

    fn create_functions<'a>(&'a self, functions: &'a [FunctionPermission]) -> BoxFuture<'a, Result<(), FetchError>> {
        Box::pin(async move {
            let rb = self.client.post(self.url("clearance-levels/functions/batch")).json(functions);
            self.send(rb).await.map(|_| ())
        })
    }
}
