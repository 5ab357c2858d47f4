use crate::domain::ports::{RemoteStore, SnapshotSource, StoreRequest};
use crate::domain::{EntitySnapshot, MatchSnapshot, StoreError};
use crate::interface_adapters::protocol::{EntityPatchDto, GameStateRow, PlayerRow, winner_wire};
use crate::use_cases::SessionEvent;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Where a request goes and what it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Maps a store request onto the REST/RPC surface of the store.
pub fn route(request: &StoreRequest, session_id: &str) -> Route {
    let own_row = format!("rest/v1/players?id=eq.{session_id}");
    let (method, path, body) = match request {
        StoreRequest::UpdateOwnEntity(patch) => (
            Method::PATCH,
            own_row,
            Some(json!(EntityPatchDto::from(patch))),
        ),
        StoreRequest::StartMatch { participant_ids } => (
            Method::POST,
            "rest/v1/rpc/start_dungeon_match".to_string(),
            Some(json!({ "player_ids": participant_ids })),
        ),
        StoreRequest::Tag { victim_id } => (
            Method::POST,
            "rest/v1/rpc/tag_player".to_string(),
            Some(json!({ "victim_id": victim_id })),
        ),
        StoreRequest::TriggerWin { winner } => (
            Method::POST,
            "rest/v1/rpc/trigger_win".to_string(),
            Some(json!({ "winner": winner_wire(*winner) })),
        ),
        StoreRequest::ReturnToLobby => (
            Method::POST,
            "rest/v1/rpc/return_to_lobby".to_string(),
            Some(json!({})),
        ),
        StoreRequest::SendChat { text } => (
            Method::POST,
            "rest/v1/messages".to_string(),
            Some(json!({ "sender_id": session_id, "text": text })),
        ),
        StoreRequest::DeleteOwnEntity => (Method::DELETE, own_row, None),
    };
    Route { method, path, body }
}

// Thin reqwest client for the row store and its RPCs.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session_id: String,
    failures: mpsc::Sender<SessionEvent>,
}

impl StoreClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        session_id: impl Into<String>,
        failures: mpsc::Sender<SessionEvent>,
    ) -> Result<Self, reqwest::Error> {
        // No request timeout: the session never blocks on the store.
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            session_id: session_id.into(),
            failures,
        })
    }

    /// Awaited form of `DeleteOwnEntity`, used during teardown.
    pub async fn delete_own_entity(&self) -> Result<(), StoreError> {
        self.execute(&StoreRequest::DeleteOwnEntity).await.map(|_| ())
    }

    async fn execute(&self, request: &StoreRequest) -> Result<reqwest::Response, StoreError> {
        let Route { method, path, body } = route(request, &self.session_id);
        self.send(method, &path, body).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response, StoreError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_rows<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows = self
            .send(Method::GET, path, None)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<T>(row) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(path, error = %e, "dropping undecodable row");
                    None
                }
            })
            .collect())
    }
}

impl RemoteStore for StoreClient {
    fn submit(&self, request: StoreRequest) {
        let client = self.clone();
        tokio::spawn(async move {
            debug!(request = request.name(), "store request");
            if let Err(error) = client.execute(&request).await {
                // The session may already be gone during teardown.
                let _ = client
                    .failures
                    .send(SessionEvent::RequestFailed { request, error })
                    .await;
            }
        });
    }
}

#[async_trait]
impl SnapshotSource for StoreClient {
    async fn list_entities(&self) -> Result<Vec<EntitySnapshot>, StoreError> {
        let rows: Vec<PlayerRow> = self
            .get_rows("rest/v1/players?select=*,profiles(username)")
            .await?;
        Ok(rows.into_iter().map(EntitySnapshot::from).collect())
    }

    async fn read_match(&self) -> Result<Option<MatchSnapshot>, StoreError> {
        let rows: Vec<GameStateRow> = self.get_rows("rest/v1/game_state?id=eq.1").await?;
        Ok(rows.into_iter().next().map(MatchSnapshot::from))
    }
}
