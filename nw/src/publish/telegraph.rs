//! Telegraph API client
//!
//! Form-encoded POSTs against `api.telegra.ph`. Every response carries an
//! `{ok, result, error}` envelope; `ok: false` is reported as an API error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::PublishError;
use super::markdown::Node;

pub const API_BASE: &str = "https://api.telegra.ph";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> Result<T, PublishError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(PublishError::Api("response has no result".to_string())),
            (false, _) => Err(PublishError::Api(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }
}

/// A created account; the token is a secret and must not be printed
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub short_name: String,
    pub access_token: Option<String>,
    pub auth_url: Option<String>,
}

/// A created or edited page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub path: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Content to put on a page
#[derive(Debug, Clone)]
pub struct PageContent<'a> {
    pub title: &'a str,
    pub nodes: &'a [Node],
    pub author_name: Option<&'a str>,
    pub author_url: Option<&'a str>,
}

/// Page operations used by the publish flow
#[async_trait]
pub trait PageApi: Send + Sync {
    async fn create_page(&self, content: &PageContent<'_>) -> Result<Page, PublishError>;

    async fn edit_page(&self, path: &str, content: &PageContent<'_>) -> Result<Page, PublishError>;
}

fn http_client(timeout: Duration) -> Result<Client, PublishError> {
    Ok(Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?)
}

async fn post_form<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    form: &[(&str, String)],
) -> Result<T, PublishError> {
    debug!(%url, "post_form: called");
    let response = http.post(url).form(form).send().await?;

    let status = response.status().as_u16();
    let body = response.text().await?;
    if !(200..300).contains(&status) {
        warn!(%status, "post_form: HTTP error");
        return Err(PublishError::Http { status, message: body });
    }

    serde_json::from_str::<Envelope<T>>(&body)?.into_result()
}

/// Create a Telegraph account (no token needed)
pub async fn create_account(
    short_name: &str,
    author_name: Option<&str>,
    author_url: Option<&str>,
    timeout: Duration,
) -> Result<Account, PublishError> {
    debug!(%short_name, "create_account: called");
    let mut form = vec![("short_name", short_name.to_string())];
    push_optional(&mut form, "author_name", author_name);
    push_optional(&mut form, "author_url", author_url);

    let http = http_client(timeout)?;
    post_form(&http, &format!("{}/createAccount", API_BASE), &form).await
}

fn push_optional(form: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        form.push((key, value.to_string()));
    }
}

/// Telegraph client bound to one access token
pub struct TelegraphClient {
    access_token: String,
    base_url: String,
    http: Client,
}

impl TelegraphClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        Self::with_base_url(access_token, API_BASE, timeout)
    }

    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        Ok(Self {
            access_token: access_token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: http_client(timeout)?,
        })
    }

    /// Form fields for createPage/editPage; content is JSON-encoded nodes
    fn page_form(&self, path: Option<&str>, content: &PageContent<'_>) -> Result<Vec<(&'static str, String)>, PublishError> {
        let mut form = vec![("access_token", self.access_token.clone())];
        if let Some(path) = path {
            form.push(("path", path.to_string()));
        }
        form.push(("title", content.title.to_string()));
        form.push(("content", serde_json::to_string(content.nodes)?));
        form.push(("return_content", "false".to_string()));
        push_optional(&mut form, "author_name", content.author_name);
        push_optional(&mut form, "author_url", content.author_url);
        Ok(form)
    }
}

#[async_trait]
impl PageApi for TelegraphClient {
    async fn create_page(&self, content: &PageContent<'_>) -> Result<Page, PublishError> {
        debug!(title = %content.title, "create_page: called");
        let form = self.page_form(None, content)?;
        post_form(&self.http, &format!("{}/createPage", self.base_url), &form).await
    }

    async fn edit_page(&self, path: &str, content: &PageContent<'_>) -> Result<Page, PublishError> {
        debug!(%path, title = %content.title, "edit_page: called");
        let form = self.page_form(Some(path), content)?;
        post_form(&self.http, &format!("{}/editPage", self.base_url), &form).await
    }
}
