use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use openctx_client::{
    Client, ClientEnv, ClientError, HeaderTemplateCredentials, MemorySink, ProviderError, RawConfiguration,
    StaticConfiguration,
};
use openctx_types::{AnnotationsParams, Capabilities, ItemsParams, ProviderSettings, Selector};
use serde_json::{Value, json};

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<(HeaderMap, Value)>>,
}

impl Recorded {
    fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

async fn provider(State(recorded): State<Arc<Recorded>>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    recorded.requests.lock().unwrap().push((headers, body));
    Json(match method.as_str() {
        "capabilities" => json!({ "result": { "selector": [{ "path": "**/*.go" }] } }),
        "items" => json!({ "result": [{ "title": "remote", "url": "https://docs.example/remote" }] }),
        "annotations" => json!({ "result": [{ "uri": "file:///main.go", "item": { "title": "remote note" } }] }),
        _ => json!({ "error": { "code": -32601, "message": "unknown method" } }),
    })
}

async fn failing(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({ "error": { "code": 42, "message": "quota exceeded", "data": { "retry": false } } }))
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

/// Start a local provider server and return its base URL.
async fn serve(recorded: Arc<Recorded>) -> String {
    let router = Router::new()
        .route("/ok", post(provider))
        .route("/error", post(failing))
        .route("/down", post(unavailable))
        .with_state(recorded);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

fn settings() -> ProviderSettings {
    let mut settings = ProviderSettings::new();
    settings.insert("repo".to_string(), json!("openctx"));
    settings
}

#[tokio::test]
async fn remote_providers_receive_settings_and_credentials() {
    let recorded = Arc::new(Recorded::default());
    let base = serve(recorded.clone()).await;
    let ok = format!("{base}/ok");

    let raw = RawConfiguration::default().with_provider(&ok, settings());
    let credentials = HeaderTemplateCredentials::default().with_header(&ok, "Authorization", "Bearer test-token");
    let env = ClientEnv::new(Arc::new(StaticConfiguration::new(raw))).with_credentials(Arc::new(credentials));
    let client = Client::new(env).unwrap();

    let items = client.items(ItemsParams::query("remote")).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].value.title, "remote");
    assert_eq!(items[0].provider_uri, ok);

    let requests = recorded.requests.lock().unwrap().clone();
    let (headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer test-token");
    assert_eq!(body["method"], "items");
    assert_eq!(body["params"], json!({ "query": "remote" }));
    assert_eq!(body["settings"], json!({ "repo": "openctx" }));
}

#[tokio::test]
async fn remote_annotations_are_gated_by_fetched_capabilities() {
    let recorded = Arc::new(Recorded::default());
    let base = serve(recorded.clone()).await;
    let ok = format!("{base}/ok");

    let raw = RawConfiguration::default().with_provider(&ok, settings());
    let client = Client::new(ClientEnv::new(Arc::new(StaticConfiguration::new(raw)))).unwrap();

    let annotations = client.annotations(AnnotationsParams::new("file:///main.go", "package main")).await;
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].value.item.title, "remote note");

    let skipped = client.annotations(AnnotationsParams::new("file:///main.rs", "fn main() {}")).await;
    assert!(skipped.is_empty());

    // Capabilities are fetched once and reused for the second resource.
    assert_eq!(recorded.methods(), vec!["capabilities", "annotations"]);
}

#[tokio::test]
async fn error_envelopes_become_provider_errors() {
    let base = serve(Arc::new(Recorded::default())).await;
    let failing = format!("{base}/error");
    let client = Client::new(ClientEnv::new(Arc::new(StaticConfiguration::default()))).unwrap();

    match client.capabilities(&failing).await {
        Err(ClientError::Provider(ProviderError::Provider { code, message, data, .. })) => {
            assert_eq!(code, 42);
            assert_eq!(message, "quota exceeded");
            assert_eq!(data, Some(json!({ "retry": false })));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn http_failures_are_isolated_from_other_providers() {
    let recorded = Arc::new(Recorded::default());
    let base = serve(recorded.clone()).await;
    let (ok, down) = (format!("{base}/ok"), format!("{base}/down"));

    let raw = RawConfiguration::default()
        .with_debug(true)
        .with_provider(&down, ProviderSettings::new())
        .with_provider(&ok, ProviderSettings::new());
    let sink = Arc::new(MemorySink::new(64));
    let env = ClientEnv::new(Arc::new(StaticConfiguration::new(raw))).with_log_sink(sink.clone());
    let client = Client::new(env).unwrap();

    let items = client.items(ItemsParams::default()).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].provider_uri, ok);

    let error = client.capabilities(&down).await.unwrap_err();
    assert!(error.to_string().contains("HTTP 503"));
    assert!(sink.messages().iter().any(|message| message.contains("HTTP 503")));
}

#[tokio::test]
async fn capabilities_work_for_unconfigured_providers() {
    let recorded = Arc::new(Recorded::default());
    let base = serve(recorded).await;
    let client = Client::new(ClientEnv::new(Arc::new(StaticConfiguration::default()))).unwrap();

    let capabilities = client.capabilities(&format!("{base}/ok")).await.unwrap();
    assert_eq!(capabilities, Capabilities::with_selectors(vec![Selector::path("**/*.go")]));
}
