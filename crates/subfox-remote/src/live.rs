//! PostgREST-style adapter for the hosted table.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use subfox_config::RemoteConfig;
use subfox_core::{RemoteError, RemoteFactory, RemoteStore, SessionContext};
use subfox_domain::{OwnerId, Subscription, SubscriptionDraft, SubscriptionId, SubscriptionPatch};
use tracing::{debug, instrument};

use crate::row::{patch_body, RemoteRow};

const REST_PATH: &str = "rest/v1";

struct Connection {
    client: Client,
    endpoint: String,
    anon_key: String,
    bearer: String,
}

/// Remote store speaking to `{url}/rest/v1/{table}` on behalf of one user.
///
/// Construction never fails. Missing settings or a client that cannot be
/// built make every call return [`RemoteError::NotConfigured`].
pub struct LiveAdapter {
    connection: Result<Connection, RemoteError>,
    owner: OwnerId,
}

impl LiveAdapter {
    pub fn new(config: &RemoteConfig, context: &SessionContext) -> Self {
        Self {
            connection: connect(config, context.access_token()),
            owner: context.owner().clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.connection.is_ok()
    }

    fn request(
        &self,
        method: Method,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, RemoteError> {
        let connection = self.connection.as_ref().map_err(Clone::clone)?;
        Ok(connection
            .client
            .request(method, &connection.endpoint)
            .query(query)
            .header("apikey", &connection.anon_key)
            .bearer_auth(&connection.bearer))
    }

    fn owner_filter(&self) -> (&'static str, String) {
        ("user_id", format!("eq.{}", self.owner))
    }

    fn row_filter(&self, id: &SubscriptionId) -> Vec<(&'static str, String)> {
        vec![("id", format!("eq.{id}")), self.owner_filter()]
    }

    async fn insert_rows(&self, rows: Vec<RemoteRow>) -> Result<Vec<Subscription>, RemoteError> {
        let request = self
            .request(Method::POST, &[])?
            .header("Prefer", "return=representation")
            .json(&rows);
        let rows: Vec<RemoteRow> = decode(send(request).await?).await?;
        rows.into_iter().map(RemoteRow::into_subscription).collect()
    }
}

#[async_trait]
impl RemoteStore for LiveAdapter {
    #[instrument(skip(self), fields(owner = %self.owner))]
    async fn list_all(&self) -> Result<Vec<Subscription>, RemoteError> {
        let request = self.request(
            Method::GET,
            &[("select", "*".to_string()), self.owner_filter()],
        )?;
        let rows: Vec<RemoteRow> = decode(send(request).await?).await?;
        debug!(count = rows.len(), "rows listed");
        rows.into_iter().map(RemoteRow::into_subscription).collect()
    }

    #[instrument(skip(self, draft), fields(owner = %self.owner))]
    async fn insert_one(&self, draft: &SubscriptionDraft) -> Result<Subscription, RemoteError> {
        self.insert_rows(vec![RemoteRow::from_draft(&self.owner, draft)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no row".into()))
    }

    #[instrument(skip(self, drafts), fields(owner = %self.owner, count = drafts.len()))]
    async fn insert_many(
        &self,
        drafts: &[SubscriptionDraft],
    ) -> Result<Vec<Subscription>, RemoteError> {
        let rows = drafts
            .iter()
            .map(|draft| RemoteRow::from_draft(&self.owner, draft))
            .collect();
        self.insert_rows(rows).await
    }

    #[instrument(skip(self, patch), fields(owner = %self.owner))]
    async fn update_one(
        &self,
        id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> Result<(), RemoteError> {
        let request = self
            .request(Method::PATCH, &self.row_filter(id))?
            .json(&patch_body(patch));
        send(request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %self.owner))]
    async fn delete_one(&self, id: &SubscriptionId) -> Result<(), RemoteError> {
        let request = self.request(Method::DELETE, &self.row_filter(id))?;
        send(request).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "live"
    }
}

/// Builds a [`LiveAdapter`] per session from the configured backend.
#[derive(Debug, Clone)]
pub struct LiveFactory {
    config: RemoteConfig,
}

impl LiveFactory {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }
}

impl RemoteFactory for LiveFactory {
    fn connect(&self, context: &SessionContext) -> Arc<dyn RemoteStore> {
        Arc::new(LiveAdapter::new(&self.config, context))
    }
}

fn connect(config: &RemoteConfig, access_token: Option<&str>) -> Result<Connection, RemoteError> {
    let url = config
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| RemoteError::NotConfigured("remote.url is not set".into()))?;
    let anon_key = config
        .anon_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| RemoteError::NotConfigured("remote.anon_key is not set".into()))?;
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|err| RemoteError::NotConfigured(err.to_string()))?;
    Ok(Connection {
        client,
        endpoint: format!("{}/{}/{}", url.trim_end_matches('/'), REST_PATH, config.table),
        bearer: access_token.map_or_else(|| anon_key.clone(), str::to_string),
        anon_key,
    })
}

async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
    let response = request
        .send()
        .await
        .map_err(|err| RemoteError::Transport(err.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let body = response
        .text()
        .await
        .map_err(|err| RemoteError::Transport(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| RemoteError::Decode(err.to_string()))
}
