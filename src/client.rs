use dotenv::dotenv;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use tracing::{debug, info};

use crate::error::{BridgeError, BridgeResult};
use crate::query::ReadQuery;

// Backend paths, relative to ASTRA_API_BASE_URL.
pub const LOGON_PATH: &str = "/logon.ashx";
pub const ROOM_SEARCH_PATH: &str = "/~api/query/roomsearch";
pub const ROOMS_PATH: &str = "/~api/query/room";
pub const CALENDAR_WEEK_GRID_PATH: &str = "/~api/calendar/calendarweekgrid";
pub const EVENT_REQUEST_FORM_PATH: &str = "/~api/query/EventReqForm";
pub const ROOM_CONFIGURATION_PATH: &str = "/~api/query/roomconfiguration";
pub const ORGANIZATION_PATH: &str = "/~api/query/organization";
pub const EVENT_REQUEST_PATH: &str = "/~api/query/eventrequest";
pub const CUSTOMER_PATH: &str = "/~api/query/customer";
pub const USER_PATH: &str = "/~api/query/user";
pub const RESERVATION_NUMBER_PATH: &str = "/~api/events/GetReservationNumber";
pub const ENTITY_PATH: &str = "/~api/Entity";

/// Positional result rows from the entity-query API. Column order follows
/// the requested projection, or the collection default when none was sent.
#[derive(Debug, Deserialize)]
pub struct QueryRows {
    pub data: Vec<Vec<Value>>,
}

/// Credentialed client for the Astra scheduling API.
///
/// The backend authenticates sessions, not requests: one logon call sets a
/// session cookie that the client's cookie store replays afterwards. A 401
/// on any call means the session lapsed, so the client logs on again and
/// retries that one request.
pub struct AstraClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl AstraClient {
    /// Create a client from environment variables.
    pub fn new() -> Self {
        dotenv().ok();

        let base_url =
            env::var("ASTRA_API_BASE_URL").expect("ASTRA_API_BASE_URL must be set in environment");
        let username =
            env::var("ASTRA_API_USERNAME").expect("ASTRA_API_USERNAME must be set in environment");
        let password =
            env::var("ASTRA_API_PASSWORD").expect("ASTRA_API_PASSWORD must be set in environment");

        Self::with_credentials(base_url, username, password)
    }

    /// Create a client for an explicit endpoint. Used by tests.
    pub fn with_credentials(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to construct HTTP client");

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client,
            base_url,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Establish a backend session. The resulting cookie lives in the
    /// client's cookie store; callers never see it.
    pub async fn logon(&self) -> BridgeResult<()> {
        let url = format!("{}{}", self.base_url, LOGON_PATH);
        debug!("Establishing backend session for {}", self.username);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|err| BridgeError::query_transport("logon", err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::query_status("logon", status, body));
        }

        info!("Backend session established for {}", self.username);
        Ok(())
    }

    async fn get_with_session(
        &self,
        operation: &'static str,
        url: &str,
        params: &[(&str, String)],
    ) -> BridgeResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|err| BridgeError::query_transport(operation, err))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Session lapsed during {} query, logging on again", operation);
        self.logon().await?;
        self.client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|err| BridgeError::query_transport(operation, err))
    }

    /// Run an entity query and return its positional rows.
    pub async fn query_rows(
        &self,
        operation: &'static str,
        path: &str,
        query: ReadQuery,
    ) -> BridgeResult<Vec<Vec<Value>>> {
        let url = format!("{}{}", self.base_url, path);
        let params = query.into_params();
        debug!("GET {} for {} query", url, operation);

        let response = self.get_with_session(operation, &url, &params).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::query_status(operation, status, body));
        }

        let rows: QueryRows = response
            .json()
            .await
            .map_err(|err| BridgeError::query_transport(operation, err))?;
        debug!("{} query returned {} rows", operation, rows.data.len());
        Ok(rows.data)
    }

    /// GET an endpoint that answers with a bare (sometimes JSON-quoted)
    /// scalar, such as the reservation-number generator.
    pub async fn get_text(&self, operation: &'static str, path: &str) -> BridgeResult<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} for {}", url, operation);

        let response = self.get_with_session(operation, &url, &[]).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| BridgeError::query_transport(operation, err))?;
        if !status.is_success() {
            return Err(BridgeError::query_status(operation, status, body));
        }

        Ok(body.trim().trim_matches('"').to_string())
    }

    /// Submit a composite create-document to the entity-write endpoint.
    pub async fn create_entities<T: Serialize>(&self, document: &T) -> BridgeResult<()> {
        let url = format!("{}{}", self.base_url, ENTITY_PATH);
        info!("Submitting composite create-document to {}", url);

        let mut response = self
            .client
            .post(&url)
            .json(document)
            .send()
            .await
            .map_err(BridgeError::write_transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Session lapsed during entity write, logging on again");
            self.logon().await?;
            response = self
                .client
                .post(&url)
                .json(document)
                .send()
                .await
                .map_err(BridgeError::write_transport)?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::write_status(status, body));
        }

        info!("Composite create accepted by backend");
        Ok(())
    }
}
