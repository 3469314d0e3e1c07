//! Power BI backend: ROPC token exchange followed by one DAX query over the
//! REST API.

use std::{fmt, time::Duration};

use api_types::{
    query::{ApiErrorBody, ExecuteQueries},
    token::{PasswordGrant, TokenError, TokenResponse},
};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::{
    Backend, CredentialResolver, ExpenseTable, FailurePolicy, SourceError, flatten, normalize,
};

pub const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/token";
pub const POWER_BI_SCOPE: &str = "https://analysis.windows.net/powerbi/api";
pub const API_BASE: &str = "https://api.powerbi.com/v1.0/myorg";
/// The semantic-model table that mirrors the relational expenses query.
pub const EXPENSES_DAX: &str = "EVALUATE 'Operating_Expenses_SQL'";

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);
/// Error bodies are logged and returned; keep them readable.
const MAX_ERROR_BODY: usize = 512;

/// Bearer token returned by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Secrets the Power BI backend needs.
#[derive(Clone, Default)]
pub struct PowerBiCredentials {
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub dataset_id: String,
}

impl PowerBiCredentials {
    pub fn resolve(resolver: &CredentialResolver) -> Self {
        Self {
            client_id: resolver.resolve("PBI_CLIENT_ID", ""),
            username: resolver.resolve("PBI_USERNAME", ""),
            password: resolver.resolve("PBI_PASSWORD", ""),
            dataset_id: resolver.resolve("PBI_DATASET_ID", ""),
        }
    }
}

impl fmt::Debug for PowerBiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerBiCredentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"***")
            .field("dataset_id", &self.dataset_id)
            .finish()
    }
}

/// Thin client for the two REST calls.
#[derive(Clone, Debug)]
pub struct PowerBiClient {
    http: Client,
    token_url: String,
    scope: String,
    api_base: String,
}

impl Default for PowerBiClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl PowerBiClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            token_url: TOKEN_URL.to_string(),
            scope: POWER_BI_SCOPE.to_string(),
            api_base: API_BASE.to_string(),
        }
    }

    pub fn token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    pub fn scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    pub fn api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Exchanges user credentials for a bearer token (OAuth 2.0 ROPC grant).
    ///
    /// Missing credentials are reported before any request is sent. A
    /// rejected grant is not retried.
    pub async fn get_token(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, SourceError> {
        let missing: Vec<&str> = [
            ("PBI_CLIENT_ID", client_id),
            ("PBI_USERNAME", username),
            ("PBI_PASSWORD", password),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.trim().is_empty().then_some(key))
        .collect();
        if !missing.is_empty() {
            return Err(SourceError::Configuration(format!(
                "missing secrets: {}",
                missing.join(", ")
            )));
        }

        tracing::debug!(token_url = %self.token_url, "requesting access token");
        let res = self
            .http
            .post(&self.token_url)
            .form(&PasswordGrant::new(&self.scope, client_id, username, password))
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = token_error_message(res).await;
            return Err(SourceError::Authentication {
                status: status.as_u16(),
                message,
            });
        }

        let body = res.json::<TokenResponse>().await?;
        match body.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken(token)),
            _ => Err(SourceError::Protocol(
                "token response has no access_token".to_string(),
            )),
        }
    }

    /// Runs `query` against the dataset and returns the JSON body as is.
    pub async fn execute(
        &self,
        token: &AccessToken,
        dataset_id: &str,
        query: &str,
    ) -> Result<Value, SourceError> {
        let endpoint = format!("{}/datasets/{dataset_id}/executeQueries", self.api_base);

        tracing::debug!(%endpoint, "executing DAX query");
        let res = self
            .http
            .post(&endpoint)
            .bearer_auth(token.secret())
            .json(&ExecuteQueries::single(query))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let message = query_error_message(status, res).await;
            return Err(SourceError::Query(message));
        }

        Ok(res.json::<Value>().await?)
    }
}

async fn token_error_message(res: Response) -> String {
    let text = res.text().await.unwrap_or_default();
    match serde_json::from_str::<TokenError>(&text) {
        Ok(TokenError {
            error_description: Some(description),
            ..
        }) => description,
        Ok(TokenError {
            error: Some(error), ..
        }) => error,
        _ => truncate(text),
    }
}

async fn query_error_message(status: StatusCode, res: Response) -> String {
    let text = res.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .and_then(|error| error.message.or(error.code))
        .unwrap_or_else(|| truncate(text));
    format!("{status}: {detail}")
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

/// Fetches the expenses table from the semantic model.
#[derive(Debug)]
pub struct PowerBiSource {
    client: PowerBiClient,
    credentials: PowerBiCredentials,
    query: String,
    policy: FailurePolicy,
}

impl PowerBiSource {
    pub fn new(client: PowerBiClient, credentials: PowerBiCredentials) -> Self {
        Self {
            client,
            credentials,
            query: EXPENSES_DAX.to_string(),
            policy: FailurePolicy::default_for(Backend::PowerBi),
        }
    }

    pub fn query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn fetch_expenses(&self) -> Result<ExpenseTable, SourceError> {
        let result = self.fetch().await;
        self.policy.apply(Backend::PowerBi, result)
    }

    async fn fetch(&self) -> Result<ExpenseTable, SourceError> {
        let credentials = &self.credentials;
        if credentials.dataset_id.trim().is_empty() {
            return Err(SourceError::Configuration(
                "missing secret: PBI_DATASET_ID".to_string(),
            ));
        }

        let token = self
            .client
            .get_token(
                &credentials.client_id,
                &credentials.username,
                &credentials.password,
            )
            .await?;
        let raw = self
            .client
            .execute(&token, &credentials.dataset_id, &self.query)
            .await?;
        let records = normalize(flatten(&raw)?);

        tracing::info!(rows = records.len(), "fetched expenses from Power BI");
        Ok(ExpenseTable::new(Backend::PowerBi, records))
    }
}
