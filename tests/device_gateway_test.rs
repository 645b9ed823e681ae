mod helpers;

use helpers::{ClientAppBuilder, DeviceFlowBuilder, TestDb};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use syzygy::cache::AppInfoCache;
use syzygy::settings::Settings;
use syzygy::storage::{self, UserCodeStatus};
use syzygy::web::{self, AppState};

/// Start the gateway router on an ephemeral port, returning its base URL
/// (which is also the issuer the gateway builds its redirect targets from).
async fn spawn_gateway(db: DatabaseConnection) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    let mut settings = Settings::default();
    settings.server.host = "127.0.0.1".to_string();
    settings.server.port = addr.port();

    let state = AppState {
        settings: Arc::new(settings),
        db,
        app_cache: AppInfoCache::new(),
    };
    let app = web::router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Gateway server failed");
    });

    format!("http://127.0.0.1:{}", addr.port())
}

/// HTTP client that surfaces redirects instead of following them
fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build client")
}

fn location_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .expect("No Location header")
        .to_str()
        .expect("Bad Location header")
        .to_string()
}

fn query_pairs(location: &str) -> Vec<(String, String)> {
    let (_, qs) = location.split_once('?').expect("No query string");
    serde_urlencoded::from_str(qs).expect("Bad query string")
}

fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn test_missing_or_blank_code_redirects_to_entry_page() {
    let test_db = TestDb::new().await;
    let base = spawn_gateway(test_db.connection().clone()).await;
    let client = http_client();

    for url in [
        format!("{base}/device"),
        format!("{base}/device?user_code="),
        format!("{base}/device?user_code=%20%20"),
    ] {
        let response = client.get(&url).send().await.expect("Request failed");
        assert_eq!(response.status(), 307);
        assert_eq!(location_of(&response), format!("{base}/device_entry"));
    }
}

#[tokio::test]
async fn test_unknown_code_indistinguishable_from_blank() {
    let test_db = TestDb::new().await;
    let base = spawn_gateway(test_db.connection().clone()).await;
    let client = http_client();

    let response = client
        .get(format!("{base}/device?user_code=XXXX-0000"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), 307);
    assert_eq!(location_of(&response), format!("{base}/device_entry"));
}

#[tokio::test]
async fn test_full_flow_with_synthesized_callback() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    ClientAppBuilder::new("app1").with_name("MyApp").create(db).await;
    DeviceFlowBuilder::new("ABCD-1234")
        .for_client("app1")
        .with_scope("read write")
        .create(db)
        .await;

    let base = spawn_gateway(db.clone()).await;
    let client = http_client();

    let response = client
        .get(format!("{base}/device?user_code=ABCD-1234"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), 307);

    let location = location_of(&response);
    assert!(
        location.starts_with(&format!("{base}/authorize?")),
        "hand-off must target the authorize endpoint, got {location}"
    );

    let pairs = query_pairs(&location);
    let expected_callback = format!("{base}/device_success?appName=MyApp");
    assert_eq!(param(&pairs, "client_id"), Some("app1"));
    assert_eq!(param(&pairs, "response_type"), Some("device"));
    assert_eq!(param(&pairs, "redirect_uri"), Some(expected_callback.as_str()));
    assert_eq!(param(&pairs, "scope"), Some("read write"));
    assert_eq!(param(&pairs, "nonce"), Some("ABCD-1234"));
    assert_eq!(param(&pairs, "user_code"), None);

    // The code is consumed and the synthesized callback persisted
    let status = storage::get_user_code_status(db, "ABCD-1234")
        .await
        .expect("Query failed");
    assert_eq!(status, Some(UserCodeStatus::Used));
    let app = storage::get_client_app(db, "app1")
        .await
        .expect("Query failed")
        .expect("Client app not found");
    assert_eq!(app.callback_uri.as_deref(), Some(expected_callback.as_str()));

    // Resubmitting the consumed code falls back to the entry page with no
    // further writes
    let replay = client
        .get(format!("{base}/device?user_code=ABCD-1234"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(replay.status(), 307);
    assert_eq!(location_of(&replay), format!("{base}/device_entry"));

    let app_after = storage::get_client_app(db, "app1")
        .await
        .expect("Query failed")
        .expect("Client app not found");
    assert_eq!(app_after.callback_uri, app.callback_uri);
}

#[tokio::test]
async fn test_registered_callback_used_verbatim() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    ClientAppBuilder::new("app2")
        .with_name("Registered App")
        .with_callback("https://client.example.com/cb")
        .create(db)
        .await;
    DeviceFlowBuilder::new("WXYZ-5678").for_client("app2").create(db).await;

    let base = spawn_gateway(db.clone()).await;
    let client = http_client();

    let response = client
        .get(format!("{base}/device?user_code=WXYZ-5678"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), 307);

    let pairs = query_pairs(&location_of(&response));
    assert_eq!(
        param(&pairs, "redirect_uri"),
        Some("https://client.example.com/cb")
    );

    // The registered value is authoritative; nothing was rewritten
    let app = storage::get_client_app(db, "app2")
        .await
        .expect("Query failed")
        .expect("Client app not found");
    assert_eq!(app.callback_uri.as_deref(), Some("https://client.example.com/cb"));
}

#[tokio::test]
async fn test_extra_query_params_carried_through_handoff() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    ClientAppBuilder::new("app1").with_name("MyApp").create(db).await;
    DeviceFlowBuilder::new("ABCD-1234").for_client("app1").create(db).await;

    let base = spawn_gateway(db.clone()).await;
    let client = http_client();

    let response = client
        .get(format!(
            "{base}/device?user_code=ABCD-1234&ui_locales=en&display=page"
        ))
        .send()
        .await
        .expect("Request failed");

    let pairs = query_pairs(&location_of(&response));
    assert_eq!(param(&pairs, "ui_locales"), Some("en"));
    assert_eq!(param(&pairs, "display"), Some("page"));
}

#[tokio::test]
async fn test_concurrent_submissions_single_handoff() {
    let test_db = TestDb::new().await;
    let db = test_db.connection();

    ClientAppBuilder::new("app1").with_name("MyApp").create(db).await;
    DeviceFlowBuilder::new("ABCD-1234").for_client("app1").create(db).await;

    let base = spawn_gateway(db.clone()).await;
    let client = http_client();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let client = client.clone();
        let url = format!("{base}/device?user_code=ABCD-1234");
        handles.push(tokio::spawn(async move {
            client.get(&url).send().await.expect("Request failed")
        }));
    }

    let mut handoffs = 0;
    let mut entry_redirects = 0;
    for handle in handles {
        let response = handle.await.expect("task panicked");
        assert_eq!(response.status(), 307);
        let location = location_of(&response);
        if location.starts_with(&format!("{base}/authorize?")) {
            handoffs += 1;
        } else {
            assert_eq!(location, format!("{base}/device_entry"));
            entry_redirects += 1;
        }
    }
    assert_eq!(handoffs, 1);
    assert_eq!(entry_redirects, 3);
}

#[tokio::test]
async fn test_entry_and_success_pages_render() {
    let test_db = TestDb::new().await;
    let base = spawn_gateway(test_db.connection().clone()).await;
    let client = http_client();

    let entry = client
        .get(format!("{base}/device_entry?user_code=ABCD-1234"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(entry.status(), 200);
    let entry_body = entry.text().await.expect("Failed to read body");
    assert!(entry_body.contains(r#"action="/device""#));
    assert!(entry_body.contains("ABCD-1234"));

    let success = client
        .get(format!("{base}/device_success?appName=My%20App"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(success.status(), 200);
    let success_body = success.text().await.expect("Failed to read body");
    assert!(success_body.contains("My App"));

    // Reflected application names are escaped
    let hostile = client
        .get(format!("{base}/device_success?appName=%3Cscript%3E"))
        .send()
        .await
        .expect("Request failed");
    let hostile_body = hostile.text().await.expect("Failed to read body");
    assert!(!hostile_body.contains("<script>"));
    assert!(hostile_body.contains("&lt;script&gt;"));
}
