use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};

use engine::{
    Backend, Dashboard, DistributionBase, FailurePolicy, PowerBiClient, PowerBiCredentials,
    PowerBiSource, SourceError,
};

/// Canned responses of the identity provider and the REST API, plus what
/// they were asked.
#[derive(Clone)]
struct MockPowerBi {
    token: (StatusCode, Value),
    query: (StatusCode, Value),
    token_calls: Arc<AtomicUsize>,
    query_calls: Arc<AtomicUsize>,
    last_form: Arc<Mutex<HashMap<String, String>>>,
    last_query: Arc<Mutex<Option<(String, String, Value)>>>,
}

impl MockPowerBi {
    fn new() -> Self {
        Self {
            token: (StatusCode::OK, json!({ "access_token": "t0ken", "expires_in": "3599" })),
            query: (StatusCode::OK, expenses_response()),
            token_calls: Arc::new(AtomicUsize::new(0)),
            query_calls: Arc::new(AtomicUsize::new(0)),
            last_form: Arc::new(Mutex::new(HashMap::new())),
            last_query: Arc::new(Mutex::new(None)),
        }
    }

    fn token(mut self, status: StatusCode, body: Value) -> Self {
        self.token = (status, body);
        self
    }

    fn query(mut self, status: StatusCode, body: Value) -> Self {
        self.query = (status, body);
        self
    }

    fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    async fn serve(&self) -> SocketAddr {
        let app = Router::new()
            .route("/token", post(token))
            .route("/datasets/{dataset_id}/executeQueries", post(execute_queries))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

async fn token(
    State(mock): State<MockPowerBi>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    mock.token_calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_form.lock().unwrap() = form;
    let (status, body) = mock.token;
    (status, Json(body)).into_response()
}

async fn execute_queries(
    State(mock): State<MockPowerBi>,
    Path(dataset_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.query_calls.fetch_add(1, Ordering::SeqCst);
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *mock.last_query.lock().unwrap() = Some((dataset_id, authorization, body));
    let (status, body) = mock.query;
    (status, Json(body)).into_response()
}

fn expenses_response() -> Value {
    json!({
        "results": [{
            "tables": [{
                "rows": [
                    {
                        "Operating_Expenses_SQL[Period]": "24-01-15",
                        "Operating_Expenses_SQL[Department]": "Ops",
                        "Operating_Expenses_SQL[Type_of_expense]": "Fuel",
                        "Operating_Expenses_SQL[Parent_Description]": "Transport",
                        "Operating_Expenses_SQL[Sum]": 100.5,
                        "Operating_Expenses_SQL[DistributionBase]": "Direct"
                    },
                    {
                        "Operating_Expenses_SQL[Period]": "24-02-01",
                        "Operating_Expenses_SQL[Department]": null,
                        "Operating_Expenses_SQL[Type_of_expense]": "Rent",
                        "Operating_Expenses_SQL[Sum]": "50"
                    }
                ]
            }]
        }]
    })
}

fn credentials() -> PowerBiCredentials {
    PowerBiCredentials {
        client_id: "client".to_string(),
        username: "analyst@example.com".to_string(),
        password: "p@ss word".to_string(),
        dataset_id: "ds-42".to_string(),
    }
}

fn client(addr: SocketAddr) -> PowerBiClient {
    PowerBiClient::default()
        .token_url(&format!("http://{addr}/token"))
        .scope("https://analysis.windows.net/powerbi/api")
        .api_base(&format!("http://{addr}/"))
}

#[tokio::test]
async fn fetch_returns_normalized_records() {
    let mock = MockPowerBi::new();
    let addr = mock.serve().await;

    let table = PowerBiSource::new(client(addr), credentials())
        .fetch_expenses()
        .await
        .unwrap();

    assert_eq!(table.backend, Backend::PowerBi);
    assert!(!table.degraded);
    assert_eq!(table.len(), 2);

    let fuel = &table.records[0];
    assert_eq!(fuel.department, "Ops");
    assert_eq!(fuel.sum, Some(100.5));
    assert_eq!(fuel.distribution_base, DistributionBase::Direct);

    let rent = &table.records[1];
    assert_eq!(rent.department, "Other");
    assert_eq!(rent.parent_description, "Unspecified");
    assert_eq!(rent.sum, Some(50.0));
    assert_eq!(rent.distribution_base, DistributionBase::Undefined);
}

#[tokio::test]
async fn requests_carry_the_grant_and_the_query() {
    let mock = MockPowerBi::new();
    let addr = mock.serve().await;

    PowerBiSource::new(client(addr), credentials())
        .query("EVALUATE 'Other'")
        .fetch_expenses()
        .await
        .unwrap();

    let form = mock.last_form.lock().unwrap().clone();
    assert_eq!(form["grant_type"], "password");
    assert_eq!(form["resource"], "https://analysis.windows.net/powerbi/api");
    assert_eq!(form["client_id"], "client");
    assert_eq!(form["username"], "analyst@example.com");
    assert_eq!(form["password"], "p@ss word");

    let (dataset_id, authorization, body) = mock.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(dataset_id, "ds-42");
    assert_eq!(authorization, "Bearer t0ken");
    assert_eq!(
        body,
        json!({
            "queries": [{ "query": "EVALUATE 'Other'" }],
            "serializerSettings": { "includeNulls": true }
        })
    );
}

#[tokio::test]
async fn missing_credentials_are_reported_before_any_request() {
    let mock = MockPowerBi::new();
    let addr = mock.serve().await;
    let credentials = PowerBiCredentials {
        client_id: String::new(),
        password: " ".to_string(),
        ..credentials()
    };

    let err = PowerBiSource::new(client(addr), credentials)
        .policy(FailurePolicy::DegradeToEmpty)
        .fetch_expenses()
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SourceError::Configuration("missing secrets: PBI_CLIENT_ID, PBI_PASSWORD".to_string())
    );
    assert_eq!(mock.token_calls(), 0);
}

#[tokio::test]
async fn missing_dataset_is_reported_before_the_token_call() {
    let mock = MockPowerBi::new();
    let addr = mock.serve().await;
    let credentials = PowerBiCredentials {
        dataset_id: String::new(),
        ..credentials()
    };

    let err = PowerBiSource::new(client(addr), credentials)
        .fetch_expenses()
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(mock.token_calls(), 0);
}

#[tokio::test]
async fn rejected_grant_is_an_authentication_error() {
    let mock = MockPowerBi::new().token(
        StatusCode::UNAUTHORIZED,
        json!({
            "error": "invalid_grant",
            "error_description": "AADSTS50126: Invalid username or password."
        }),
    );
    let addr = mock.serve().await;

    let err = PowerBiSource::new(client(addr), credentials())
        .fetch_expenses()
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SourceError::Authentication {
            status: 401,
            message: "AADSTS50126: Invalid username or password.".to_string(),
        }
    );
    assert_eq!(mock.token_calls(), 1);
    assert_eq!(mock.query_calls(), 0);
}

#[tokio::test]
async fn token_response_without_token_is_a_protocol_error() {
    let mock = MockPowerBi::new().token(StatusCode::OK, json!({ "token_type": "Bearer" }));
    let addr = mock.serve().await;

    let err = PowerBiSource::new(client(addr), credentials())
        .fetch_expenses()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Protocol(_)));
    assert_eq!(mock.query_calls(), 0);
}

#[tokio::test]
async fn failed_query_is_a_query_error() {
    let mock = MockPowerBi::new().query(
        StatusCode::BAD_REQUEST,
        json!({ "error": { "code": "DatasetExecuteQueriesError", "message": "bad DAX" } }),
    );
    let addr = mock.serve().await;

    let err = PowerBiSource::new(client(addr), credentials())
        .fetch_expenses()
        .await
        .unwrap_err();
    assert_eq!(err, SourceError::Query("400 Bad Request: bad DAX".to_string()));

    let table = PowerBiSource::new(client(addr), credentials())
        .policy(FailurePolicy::DegradeToEmpty)
        .fetch_expenses()
        .await
        .unwrap();
    assert!(table.is_empty());
    assert!(table.degraded);
}

#[tokio::test]
async fn empty_result_is_an_empty_table() {
    let mock = MockPowerBi::new().query(StatusCode::OK, json!({ "results": [{ "tables": [] }] }));
    let addr = mock.serve().await;

    let table = PowerBiSource::new(client(addr), credentials())
        .fetch_expenses()
        .await
        .unwrap();
    assert!(table.is_empty());
    assert!(!table.degraded);
}

#[tokio::test]
async fn unreachable_identity_provider_is_a_connection_error() {
    // Bind and drop to get a port nobody listens on.
    let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    let err = PowerBiSource::new(client(addr), credentials())
        .fetch_expenses()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Connection(_)));
}

#[tokio::test]
async fn dashboard_serves_the_cached_table() {
    let mock = MockPowerBi::new();
    let addr = mock.serve().await;
    let dashboard = Dashboard::builder()
        .source(PowerBiSource::new(client(addr), credentials()))
        .build()
        .unwrap();

    let first = dashboard.expenses().await.unwrap();
    let second = dashboard.expenses().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(mock.token_calls(), 1);
    assert_eq!(mock.query_calls(), 1);

    let refreshed = dashboard.refresh().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(refreshed.len(), 2);
    assert_eq!(mock.query_calls(), 2);
}

#[tokio::test]
async fn dashboard_retries_after_a_degraded_fetch() {
    let mock = MockPowerBi::new().query(StatusCode::INTERNAL_SERVER_ERROR, json!({}));
    let addr = mock.serve().await;
    let dashboard = Dashboard::builder()
        .source(
            PowerBiSource::new(client(addr), credentials()).policy(FailurePolicy::DegradeToEmpty),
        )
        .build()
        .unwrap();

    assert!(dashboard.expenses().await.unwrap().degraded);
    assert!(dashboard.expenses().await.unwrap().degraded);
    assert_eq!(mock.query_calls(), 2);
}

#[test]
fn dashboard_needs_a_source() {
    let err = Dashboard::builder().build().unwrap_err();
    assert!(err.is_configuration());
}
