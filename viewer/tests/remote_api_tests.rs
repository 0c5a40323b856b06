use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use story_engine::{
    AssetError, AssetLoader, Catalog, GestureConfig, PlaybackConfig, Preloader, StorySession,
};
use story_viewer::remote_api::router;
use story_viewer::{DriverCommand, DriverExit, SessionDriver};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower::ServiceExt;

struct InstantLoader;

impl AssetLoader for InstantLoader {
    async fn fetch(&self, _url: &str) -> Result<(), AssetError> {
        Ok(())
    }
}

fn spawn_driver() -> (mpsc::UnboundedSender<DriverCommand>, JoinHandle<DriverExit>) {
    let catalog = Catalog::from_json(
        r#"[
            {"id":"a","image":"/a.jpg","user":{"name":"Ada"}},
            {"id":"b","image":"/b.jpg"},
            {"id":"c","image":"/c.jpg"}
        ]"#,
        &PlaybackConfig::default(),
    )
    .expect("catalog should parse");
    let session = StorySession::open(
        catalog.clone(),
        0,
        PlaybackConfig::default(),
        GestureConfig::default(),
        tokio::time::Instant::now().into_std(),
    );
    let (driver, tx) = SessionDriver::new(session, Preloader::new(catalog, InstantLoader));
    (tx, tokio::spawn(driver.run()))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let response = router(tx).oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn state_returns_the_current_frame() {
    let (tx, handle) = spawn_driver();
    let app = router(tx.clone());

    let response = app.oneshot(get("/api/session/state")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let frame = json_body(response).await;
    assert_eq!(frame["storyId"], "a");
    assert_eq!(frame["authorName"], "Ada");
    assert_eq!(frame["counterLabel"], "1 / 3");
    assert_eq!(frame["segments"].as_array().map(Vec::len), Some(3));
    assert_eq!(frame["playback"]["totalCount"], 3);

    tx.send(DriverCommand::Close).unwrap();
    assert_eq!(handle.await.unwrap(), DriverExit::Closed);
}

#[tokio::test]
async fn intent_and_key_routes_drive_the_session() {
    let (tx, handle) = spawn_driver();
    let app = router(tx.clone());

    let response = app
        .clone()
        .oneshot(post("/api/session/intent", json!({"intent": "advance"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["outcome"], "moved");
    assert_eq!(body["frame"]["counterLabel"], "2 / 3");
    assert_eq!(body["frame"]["authorName"], "User");

    let response = app
        .clone()
        .oneshot(post("/api/session/key", json!({"key": "Tab"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["outcome"], Value::Null);

    let response = app
        .clone()
        .oneshot(post(
            "/api/session/click",
            json!({"x": 10.0, "surface": {"width": 0.0}}),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["outcome"], Value::Null);

    let response = app
        .clone()
        .oneshot(post("/api/session/asset-ready", json!({"index": 42})))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["accepted"], false);

    // Past the intent gate's cooldown.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    let response = app
        .oneshot(post("/api/session/intent", json!({"intent": "close"})))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["outcome"], "closed");
    assert_eq!(handle.await.unwrap(), DriverExit::Closed);
}

#[tokio::test]
async fn unknown_intent_is_rejected() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let response = router(tx)
        .oneshot(post("/api/session/intent", json!({"intent": "jump"})))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn pointer_down_is_accepted_without_waiting() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let response = router(tx)
        .oneshot(post("/api/session/pointer/down", json!({"x": 5.0, "y": 6.0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(matches!(
        rx.recv().await,
        Some(DriverCommand::PointerDown { x, y }) if x == 5.0 && y == 6.0
    ));
}

#[tokio::test]
async fn ended_session_is_unavailable() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let response = router(tx)
        .oneshot(get("/api/session/state"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn silent_session_times_out() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let hold = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Some(cmd) = rx.recv().await {
            held.push(cmd);
        }
        held.len()
    });

    let response = router(tx)
        .oneshot(get("/api/session/state"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(hold.await.unwrap(), 1);
}
