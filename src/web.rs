//! HTTP surface of the device gateway.
//!
//! One route does the real work: `GET /device` validates and consumes the
//! submitted user code, resolves the client's redirect target, and hands the
//! browser off to the downstream interactive authorization endpoint. The
//! entry and success pages exist so the gateway's redirects land somewhere.
//!
//! All user-input failures collapse into the same redirect to the entry
//! page; only operational failures surface as server errors. Lower layers
//! never write to the response; this module is the only place that maps
//! conditions to HTTP.
use crate::cache::AppInfoCache;
use crate::errors::SyzygyError;
use crate::handoff::AuthorizeHandoff;
use crate::resolver;
use crate::settings::Settings;
use crate::verifier;
use axum::body::Body;
use axum::extract::{Query, RawQuery, State};
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use miette::IntoDiagnostic;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
    pub app_cache: AppInfoCache,
}

// Security headers middleware
async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/device", get(device_authorize))
        .route("/device_entry", get(device_entry_page))
        .route("/device_success", get(device_success_page))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

pub async fn serve(settings: Settings, db: DatabaseConnection) -> miette::Result<()> {
    let state = AppState {
        settings: Arc::new(settings),
        db,
        app_cache: AppInfoCache::new(),
    };

    let addr: SocketAddr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    )
    .parse()
    .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let app = router(state);

    tracing::info!(%addr, "Device gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}

/// GET /device - validate the user code and hand off to authorization.
///
/// Blank, unknown, and already-consumed codes all produce the same redirect
/// to the entry page. A verified code continues as a redirect to the
/// downstream authorize endpoint carrying the overlaid device-flow
/// parameters.
async fn device_authorize(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Response, (StatusCode, String)> {
    let inbound: Vec<(String, String)> = raw
        .as_deref()
        .map(|q| serde_urlencoded::from_str(q).unwrap_or_default())
        .unwrap_or_default();

    let user_code = inbound
        .iter()
        .find(|(k, _)| k == "user_code")
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default();

    if user_code.is_empty() {
        return Ok(Redirect::temporary(&state.settings.device_entry_url()).into_response());
    }

    let device = match verifier::verify_user_code(&state.db, &user_code)
        .await
        .map_err(internal_error)?
    {
        Some(device) => device,
        None => {
            // Uniform rejection: wrong, replayed, and expired codes look alike
            tracing::debug!("user code failed verification");
            return Ok(Redirect::temporary(&state.settings.device_entry_url()).into_response());
        }
    };

    let callback_uri = resolver::resolve_callback_uri(
        &state.db,
        &state.app_cache,
        &state.settings.device_success_url(),
        &device.client_id,
    )
    .await
    .map_err(internal_error)?;

    tracing::info!(client_id = %device.client_id, "device flow verified, handing off");

    let handoff = AuthorizeHandoff::new(device, callback_uri, &user_code);
    let location = handoff.location(&state.settings.authorize_url(), &inbound);
    Ok(Redirect::temporary(&location).into_response())
}

fn internal_error(err: SyzygyError) -> (StatusCode, String) {
    tracing::error!(%err, "device gateway failure");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

#[derive(Deserialize)]
struct DeviceEntryQuery {
    user_code: Option<String>,
}

/// GET /device_entry - page where the user types the code from the device
async fn device_entry_page(Query(query): Query<DeviceEntryQuery>) -> Html<String> {
    let prefilled_code = html_escape(query.user_code.as_deref().unwrap_or(""));

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Device Verification</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        .container {{ background: #f5f5f5; padding: 30px; border-radius: 8px; }}
        h1 {{ margin-top: 0; }}
        input {{ font-size: 18px; padding: 10px; width: 100%; box-sizing: border-box; margin: 10px 0; }}
        button {{ background: #007bff; color: white; border: none; padding: 12px 24px; font-size: 16px; border-radius: 4px; cursor: pointer; }}
        button:hover {{ background: #0056b3; }}
        .instructions {{ background: white; padding: 15px; border-left: 4px solid #007bff; margin-bottom: 20px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Device Verification</h1>
        <div class="instructions">
            <p>Enter the code shown on your device to continue.</p>
        </div>
        <form method="GET" action="/device">
            <input type="text" name="user_code" placeholder="Enter code (e.g., WDJB-MJHT)" value="{}" required autofocus>
            <button type="submit">Continue</button>
        </form>
    </div>
</body>
</html>"#,
        prefilled_code
    );

    Html(html)
}

#[derive(Deserialize)]
struct DeviceSuccessQuery {
    #[serde(rename = "appName")]
    app_name: Option<String>,
}

/// GET /device_success - interaction-success page; also the target of
/// synthesized fallback redirect URIs, parameterized by application name.
async fn device_success_page(Query(query): Query<DeviceSuccessQuery>) -> Html<String> {
    let app_name = html_escape(query.app_name.as_deref().unwrap_or("your application"));

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Device Connected</title>
    <style>
        body {{ font-family: sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }}
        .container {{ background: #d4edda; border: 1px solid #c3e6cb; padding: 30px; border-radius: 8px; text-align: center; }}
        h1 {{ color: #155724; margin-top: 0; }}
        p {{ color: #155724; font-size: 18px; }}
        .checkmark {{ font-size: 48px; color: #28a745; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="checkmark">&#10003;</div>
        <h1>Device Connected</h1>
        <p>You have signed in to {}. You can now return to your device.</p>
    </div>
</body>
</html>"#,
        app_name
    );

    Html(html)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
