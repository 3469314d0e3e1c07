//! Wire types for the Power BI REST endpoints the engine talks to.
//!
//! Every field the service may omit or send as `null` is optional so a
//! partially populated envelope still deserializes; the engine decides what
//! counts as "no data" and what counts as a malformed response.

use serde::{Deserialize, Serialize};

pub mod token {
    use super::*;

    /// Form body of an OAuth 2.0 resource-owner-password-credentials grant.
    #[derive(Debug, Serialize)]
    pub struct PasswordGrant<'a> {
        pub grant_type: &'static str,
        pub resource: &'a str,
        pub client_id: &'a str,
        pub username: &'a str,
        pub password: &'a str,
    }

    impl<'a> PasswordGrant<'a> {
        pub fn new(resource: &'a str, client_id: &'a str, username: &'a str, password: &'a str) -> Self {
            Self {
                grant_type: "password",
                resource,
                client_id,
                username,
                password,
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct TokenResponse {
        pub access_token: Option<String>,
        pub token_type: Option<String>,
        /// Seconds; the authority sends it as a string or as a number.
        pub expires_in: Option<serde_json::Value>,
    }

    /// Error body returned by the authority on a rejected grant.
    #[derive(Debug, Deserialize)]
    pub struct TokenError {
        pub error: Option<String>,
        pub error_description: Option<String>,
    }
}

pub mod query {
    use super::*;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExecuteQueries {
        pub queries: Vec<DaxQuery>,
        pub serializer_settings: SerializerSettings,
    }

    impl ExecuteQueries {
        /// A single query with null cells kept in the result rows.
        pub fn single(query: &str) -> Self {
            Self {
                queries: vec![DaxQuery {
                    query: query.to_string(),
                }],
                serializer_settings: SerializerSettings {
                    include_nulls: true,
                },
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct DaxQuery {
        pub query: String,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializerSettings {
        pub include_nulls: bool,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct ExecuteQueriesResponse {
        #[serde(default)]
        pub results: Option<Vec<QueryResult>>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct QueryResult {
        #[serde(default)]
        pub tables: Option<Vec<ResultTable>>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct ResultTable {
        #[serde(default)]
        pub columns: Option<Vec<ResultColumn>>,
        /// Either JSON objects keyed by column name or positional arrays.
        #[serde(default)]
        pub rows: Option<Vec<serde_json::Value>>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResultColumn {
        pub name: Option<String>,
        pub data_type: Option<String>,
    }

    /// Error envelope of a non-2xx `executeQueries` response.
    #[derive(Debug, Deserialize)]
    pub struct ApiErrorBody {
        pub error: Option<ApiError>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ApiError {
        pub code: Option<String>,
        pub message: Option<String>,
    }
}
