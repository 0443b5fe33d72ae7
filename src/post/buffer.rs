use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::{PostError, Publisher, UpdateOptions};

const DEFAULT_BASE_URL: &str = "https://api.bufferapp.com/1";
const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB

/// A social profile connected to the Buffer account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub service: String,
    pub service_id: String,
    pub service_username: String,
    pub formatted_username: String,
    pub default: bool,
    pub timezone: String,
    pub avatar: String,
    pub created_at: i64,
}

/// A queued update as echoed back by Buffer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Update {
    pub id: String,
    pub text: String,
    pub profile_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateResponse {
    success: bool,
    message: Option<String>,
    updates: Vec<Update>,
}

/// Client for the Buffer v1 REST API.
pub struct BufferClient {
    http: reqwest::Client,
    token: SecretString,
    base: Url,
}

impl BufferClient {
    /// Build a client. `base_url` overrides the public API root, which must be
    /// HTTPS unless it points at localhost.
    pub fn new(
        http: reqwest::Client,
        token: SecretString,
        base_url: Option<&str>,
    ) -> Result<Self, PostError> {
        let raw = base_url.unwrap_or(DEFAULT_BASE_URL);

        if !raw.starts_with("https://") {
            let is_localhost =
                raw.starts_with("http://127.0.0.1") || raw.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %raw, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(PostError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %raw, "Using non-HTTPS Buffer base URL (localhost only)");
        }
        if base_url.is_some() {
            tracing::info!(base_url = %raw, "Using custom Buffer API base URL");
        }

        // Trailing slash so Url::join appends instead of replacing the last segment
        let base = Url::parse(&format!("{}/", raw.trim_end_matches('/')))
            .map_err(|_| PostError::InvalidUrl)?;

        Ok(Self { http, token, base })
    }

    fn endpoint(&self, resource: &str) -> Result<Url, PostError> {
        let mut url = self
            .base
            .join(&format!("{resource}.json"))
            .map_err(|_| PostError::InvalidUrl)?;
        url.query_pairs_mut()
            .append_pair("access_token", self.token.expose_secret());
        Ok(url)
    }

    /// List the profiles connected to the account.
    pub async fn profiles(&self) -> Result<Vec<Profile>, PostError> {
        let response = self.http.get(self.endpoint("profiles")?).send().await?;
        let body = read_success_body(response).await?;
        let profiles: Vec<Profile> = serde_json::from_slice(&body)?;
        tracing::debug!(count = profiles.len(), "Fetched Buffer profiles");
        Ok(profiles)
    }

    /// Queue a post on each of `profile_ids`.
    ///
    /// Link media fields are only sent when `link_url` is set; empty title
    /// and description are omitted.
    pub async fn create_update(
        &self,
        profile_ids: &[String],
        options: &UpdateOptions,
    ) -> Result<Vec<Update>, PostError> {
        let form = update_form(profile_ids, options);
        let response = self
            .http
            .post(self.endpoint("updates/create")?)
            .form(&form)
            .send()
            .await?;
        let body = read_success_body(response).await?;
        let parsed: CreateResponse = serde_json::from_slice(&body)?;

        if !parsed.success {
            let message = parsed
                .message
                .unwrap_or_else(|| "buffer returned success=false".to_string());
            return Err(PostError::Rejected(message));
        }

        tracing::info!(
            profiles = profile_ids.len(),
            updates = parsed.updates.len(),
            "Queued Buffer update"
        );
        Ok(parsed.updates)
    }
}

impl Publisher for BufferClient {
    async fn publish(&self, profile_ids: &[String], update: &UpdateOptions) -> Result<(), PostError> {
        self.create_update(profile_ids, update).await.map(|_| ())
    }
}

fn update_form<'a>(profile_ids: &'a [String], options: &'a UpdateOptions) -> Vec<(&'static str, &'a str)> {
    let mut form = vec![("text", options.content.as_str())];
    form.extend(profile_ids.iter().map(|id| ("profile_ids[]", id.as_str())));

    if !options.link_url.is_empty() {
        form.push(("media[link]", options.link_url.as_str()));
        if !options.link_title.is_empty() {
            form.push(("media[title]", options.link_title.as_str()));
        }
        if !options.link_description.is_empty() {
            form.push(("media[description]", options.link_description.as_str()));
        }
    }
    form
}

async fn read_success_body(response: reqwest::Response) -> Result<Vec<u8>, PostError> {
    if !response.status().is_success() {
        return Err(PostError::HttpStatus(response.status().as_u16()));
    }

    if let Some(len) = response.content_length() {
        if len as usize > MAX_RESPONSE_SIZE {
            return Err(PostError::ResponseTooLarge(MAX_RESPONSE_SIZE));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > MAX_RESPONSE_SIZE {
            return Err(PostError::ResponseTooLarge(MAX_RESPONSE_SIZE));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
