//! Admin panel: session gate, pages, and the JSON API fronting the remote
//! key service.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::{self, PanelConfig};
use crate::expiry;
use crate::normalize;
use crate::remote::{ApiClient, ApiError, Payload};

const SESSION_COOKIE: &str = "keywarden_session";

/// An authenticated operator session. Lives until logout or restart.
#[derive(Clone, Debug)]
struct Session {
    token: String,
    username: String,
}

/// Shared panel state.
pub struct AppState {
    config: RwLock<PanelConfig>,
    config_path: PathBuf,
    sessions: RwLock<Vec<Session>>,
    api: ApiClient,
}

impl AppState {
    pub fn new(config: PanelConfig, config_path: PathBuf, api: ApiClient) -> Self {
        Self {
            config: RwLock::new(config),
            config_path,
            sessions: RwLock::new(Vec::new()),
            api,
        }
    }

    fn create_session(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.write().push(Session {
            token: token.clone(),
            username: username.to_string(),
        });
        token
    }

    fn validate_session(&self, token: &str) -> Option<String> {
        self.sessions
            .read()
            .iter()
            .find(|s| s.token == token)
            .map(|s| s.username.clone())
    }

    fn remove_session(&self, token: &str) {
        self.sessions.write().retain(|s| s.token != token);
    }

    /// Snapshot of the current configuration, safe to hold across awaits.
    fn config_snapshot(&self) -> PanelConfig {
        self.config.read().clone()
    }
}

/// Build the panel router.
pub fn panel_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", get(logout_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/settings", get(settings_page).post(settings_handler))
        .route("/static/*path", get(static_handler))
        .route("/api/keys", get(api_keys))
        .route("/api/key/create", post(api_create_key))
        .route("/api/key/delete", post(api_delete_key))
        .route("/api/key/update", post(api_update_key))
        .route("/api/key/check", get(api_check_key))
        .with_state(state)
}

/// Session token from the request cookies.
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name == SESSION_COOKIE).then(|| value.to_string())
        })
}

fn authenticated(headers: &HeaderMap, state: &AppState) -> Option<String> {
    let token = session_token(headers)?;
    state.validate_session(&token)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "not logged in"})),
    )
        .into_response()
}

fn missing_key() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "missing key"})),
    )
        .into_response()
}

/// Map a remote-call outcome to the panel's JSON envelope.
fn proxy_result(result: Result<Payload, ApiError>) -> Response {
    match result {
        Ok(payload) => Json(json!({"ok": true, "result": payload})).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "remote key operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// The key identifier from a request body, if usable.
fn key_param(body: &Value) -> Option<String> {
    match body.get("key")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn index_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Redirect {
    if authenticated(&headers, &state).is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if authenticated(&headers, &state).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(LOGIN_HTML.to_string()).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    let password = form.password.trim();
    let config = state.config_snapshot();

    if config.verify_login(username, password) {
        let token = state.create_session(username);
        return Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header(header::LOCATION, "/dashboard")
            .header(
                header::SET_COOKIE,
                format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict"),
            )
            .body(Body::empty())
            .unwrap();
    }

    tracing::warn!(username, "failed login attempt");
    Html(LOGIN_HTML.replace(
        "<!-- ERROR -->",
        r#"<div class="error">Invalid credentials</div>"#,
    ))
    .into_response()
}

async fn logout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.remove_session(&token);
    }
    Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header(header::LOCATION, "/login")
        .header(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0"),
        )
        .body(Body::empty())
        .unwrap()
}

async fn dashboard_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(username) = authenticated(&headers, &state) else {
        return Redirect::to("/login").into_response();
    };
    let config = state.config_snapshot();
    let api_base = if config.api_base.is_empty() {
        "(not configured)"
    } else {
        config.api_base.as_str()
    };
    let html = DASHBOARD_HTML
        .replace("{{USERNAME}}", &username)
        .replace("{{API_BASE}}", api_base);
    Html(html).into_response()
}

async fn settings_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if authenticated(&headers, &state).is_none() {
        return Redirect::to("/login").into_response();
    }
    let config = state.config_snapshot();
    Html(render_settings(&config, "")).into_response()
}

fn render_settings(config: &PanelConfig, message: &str) -> String {
    SETTINGS_HTML
        .replace("{{API_BASE}}", &config.api_base)
        .replace("{{ADMIN_USER}}", &config.admin_user)
        .replace("<!-- MESSAGE -->", message)
}

#[derive(Deserialize)]
struct SettingsForm {
    #[serde(default)]
    api_base: String,
    #[serde(default)]
    admin_user: String,
    #[serde(default)]
    admin_pass: String,
}

async fn settings_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SettingsForm>,
) -> Response {
    if authenticated(&headers, &state).is_none() {
        return Redirect::to("/login").into_response();
    }
    let api_base = form.api_base.trim();
    let admin_user = form.admin_user.trim();
    let admin_pass = form.admin_pass.trim();

    // Hash before taking the config lock.
    let new_hash = if admin_pass.is_empty() {
        None
    } else {
        match config::hash_password(admin_pass) {
            Ok(hash) => Some(hash),
            Err(err) => {
                tracing::warn!(error = %err, "password hashing failed");
                let config = state.config_snapshot();
                return Html(render_settings(
                    &config,
                    r#"<div class="error">Could not update the password</div>"#,
                ))
                .into_response();
            }
        }
    };

    let updated = {
        let mut config = state.config.write();
        if !api_base.is_empty() {
            config.api_base = api_base.to_string();
        }
        if !admin_user.is_empty() {
            config.admin_user = admin_user.to_string();
        }
        if let Some(hash) = new_hash {
            config.admin_password_hash = hash;
        }
        config.clone()
    };

    let message = match updated.save(&state.config_path) {
        Ok(()) => r#"<div class="success">Settings saved</div>"#,
        Err(err) => {
            tracing::warn!(error = %err, "saving config failed");
            r#"<div class="error">Settings updated but could not be written to disk</div>"#
        }
    };
    Html(render_settings(&updated, message)).into_response()
}

async fn static_handler(UrlPath(path): UrlPath<String>) -> Response {
    if path.contains("..") {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    let full = PathBuf::from("static").join(&path);
    match tokio::fs::read(&full).await {
        Ok(content) => {
            let mime_type = mime_guess::from_path(&full).first_or_text_plain();
            ([(header::CONTENT_TYPE, mime_type.to_string())], content).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn api_keys(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if authenticated(&headers, &state).is_none() {
        return unauthorized();
    }
    let config = state.config_snapshot();
    let records = match state
        .api
        .fetch_keys(&config.api_base, &config.auto_try_list_endpoints)
        .await
    {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "key listing failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response();
        }
    };

    let keys: Vec<Value> = records
        .iter()
        .map(|item| {
            let record = normalize::normalize(item);
            json!({
                "key": record.key,
                "total": record.total,
                "remaining": record.remaining,
                "expires_at": record.expires_at,
                "days_left": expiry::days_left(&record.expires_at),
                "raw": record.raw,
            })
        })
        .collect();
    Json(json!({"keys": keys})).into_response()
}

async fn api_create_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    if authenticated(&headers, &state).is_none() {
        return unauthorized();
    }
    let body = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    let payload = json!({
        "custom_key": body.get("custom_key"),
        "total_requests": body.get("total_requests"),
        "expiry_days": body.get("expiry_days"),
        "notes": body.get("notes").cloned().unwrap_or_else(|| json!("")),
    });
    let config = state.config_snapshot();
    proxy_result(state.api.create_key(&config.api_base, &payload).await)
}

async fn api_delete_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    if authenticated(&headers, &state).is_none() {
        return unauthorized();
    }
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let Some(key) = key_param(&body) else {
        return missing_key();
    };
    let config = state.config_snapshot();
    proxy_result(state.api.delete_key(&config.api_base, &key).await)
}

async fn api_update_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    if authenticated(&headers, &state).is_none() {
        return unauthorized();
    }
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    if key_param(&body).is_none() {
        return missing_key();
    }
    let config = state.config_snapshot();
    proxy_result(state.api.update_key(&config.api_base, &body).await)
}

#[derive(Deserialize)]
struct CheckParams {
    key: Option<String>,
}

async fn api_check_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CheckParams>,
) -> Response {
    if authenticated(&headers, &state).is_none() {
        return unauthorized();
    }
    let Some(key) = params.key.filter(|k| !k.is_empty()) else {
        return missing_key();
    };
    let config = state.config_snapshot();
    proxy_result(state.api.check_key(&config.api_base, &key).await)
}

const LOGIN_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Keywarden - Login</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #10141f;
            color: #e8eaf0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }
        .login-box {
            background: #1a2133;
            border: 1px solid #2a3350;
            border-radius: 12px;
            padding: 36px;
            width: 100%;
            max-width: 380px;
        }
        .login-box h1 { font-size: 22px; text-align: center; }
        .login-box p { color: #7f8bb3; font-size: 13px; text-align: center; margin: 6px 0 24px; }
        label { display: block; color: #9aa6cc; font-size: 13px; margin-bottom: 6px; }
        input {
            width: 100%;
            padding: 10px 14px;
            margin-bottom: 18px;
            border: 1px solid #2a3350;
            border-radius: 8px;
            background: #10141f;
            color: #e8eaf0;
            font-size: 15px;
        }
        input:focus { outline: none; border-color: #5b8def; }
        button {
            width: 100%;
            padding: 12px;
            border: none;
            border-radius: 8px;
            background: #5b8def;
            color: #fff;
            font-size: 15px;
            font-weight: 600;
            cursor: pointer;
        }
        button:hover { background: #6f9cf2; }
        .error {
            background: #3a1f26;
            border: 1px solid #ff6b6b;
            color: #ff6b6b;
            border-radius: 8px;
            padding: 10px;
            margin-bottom: 18px;
            text-align: center;
            font-size: 14px;
        }
    </style>
</head>
<body>
    <div class="login-box">
        <h1>Keywarden</h1>
        <p>Remote API key panel</p>
        <!-- ERROR -->
        <form method="POST" action="/login">
            <label for="username">Username</label>
            <input type="text" id="username" name="username" required autocomplete="username">
            <label for="password">Password</label>
            <input type="password" id="password" name="password" required autocomplete="current-password">
            <button type="submit">Sign In</button>
        </form>
    </div>
</body>
</html>"##;

const SETTINGS_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Keywarden - Settings</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #10141f;
            color: #e8eaf0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }
        .settings-box {
            background: #1a2133;
            border: 1px solid #2a3350;
            border-radius: 12px;
            padding: 36px;
            width: 100%;
            max-width: 460px;
        }
        h1 { font-size: 20px; margin-bottom: 22px; }
        label { display: block; color: #9aa6cc; font-size: 13px; margin-bottom: 6px; }
        .hint { color: #5d6889; font-size: 12px; margin: -12px 0 18px; }
        input {
            width: 100%;
            padding: 10px 14px;
            margin-bottom: 18px;
            border: 1px solid #2a3350;
            border-radius: 8px;
            background: #10141f;
            color: #e8eaf0;
            font-size: 15px;
        }
        input:focus { outline: none; border-color: #5b8def; }
        button {
            width: 100%;
            padding: 12px;
            border: none;
            border-radius: 8px;
            background: #5b8def;
            color: #fff;
            font-size: 15px;
            font-weight: 600;
            cursor: pointer;
            margin-bottom: 14px;
        }
        button:hover { background: #6f9cf2; }
        .back { display: block; text-align: center; color: #5b8def; text-decoration: none; font-size: 14px; }
        .error, .success {
            border-radius: 8px;
            padding: 10px;
            margin-bottom: 18px;
            text-align: center;
            font-size: 14px;
        }
        .error { background: #3a1f26; border: 1px solid #ff6b6b; color: #ff6b6b; }
        .success { background: #1d3326; border: 1px solid #51cf66; color: #51cf66; }
    </style>
</head>
<body>
    <div class="settings-box">
        <h1>Settings</h1>
        <!-- MESSAGE -->
        <form method="POST" action="/settings">
            <label for="api_base">API base URL</label>
            <input type="text" id="api_base" name="api_base" value="{{API_BASE}}" placeholder="https://keys.example.com">
            <label for="admin_user">Admin username</label>
            <input type="text" id="admin_user" name="admin_user" value="{{ADMIN_USER}}">
            <label for="admin_pass">New admin password</label>
            <input type="password" id="admin_pass" name="admin_pass" autocomplete="new-password">
            <div class="hint">Leave a field blank to keep its current value.</div>
            <button type="submit">Save</button>
        </form>
        <a class="back" href="/dashboard">Back to dashboard</a>
    </div>
</body>
</html>"##;

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Keywarden - Dashboard</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #10141f;
            color: #e8eaf0;
            min-height: 100vh;
        }
        .header {
            background: #1a2133;
            border-bottom: 1px solid #2a3350;
            padding: 16px 28px;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }
        .header h1 { font-size: 20px; display: inline; }
        .header .base { color: #7f8bb3; font-size: 13px; margin-left: 14px; }
        .nav a { color: #9aa6cc; text-decoration: none; margin-left: 18px; font-size: 14px; }
        .nav a:hover { color: #fff; }
        .nav .logout { color: #ff6b6b; }
        .container { max-width: 1100px; margin: 0 auto; padding: 28px; }
        .card {
            background: #1a2133;
            border: 1px solid #2a3350;
            border-radius: 12px;
            padding: 22px;
            margin-bottom: 24px;
        }
        .card h2 { font-size: 16px; margin-bottom: 16px; }
        .create-form { display: flex; gap: 12px; flex-wrap: wrap; align-items: flex-end; }
        .create-form div { flex: 1; min-width: 140px; }
        label { display: block; color: #9aa6cc; font-size: 12px; margin-bottom: 5px; }
        input {
            width: 100%;
            padding: 8px 12px;
            border: 1px solid #2a3350;
            border-radius: 8px;
            background: #10141f;
            color: #e8eaf0;
            font-size: 14px;
        }
        input:focus { outline: none; border-color: #5b8def; }
        button {
            padding: 9px 16px;
            border: none;
            border-radius: 8px;
            background: #5b8def;
            color: #fff;
            font-size: 13px;
            font-weight: 600;
            cursor: pointer;
        }
        button:hover { background: #6f9cf2; }
        button.danger { background: #b33a3a; }
        button.danger:hover { background: #cc4444; }
        button.ghost { background: #2a3350; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 11px 12px; text-align: left; border-bottom: 1px solid #222b42; font-size: 14px; }
        th { color: #7f8bb3; font-size: 12px; text-transform: uppercase; letter-spacing: 1px; }
        .mono { font-family: 'Menlo', 'Monaco', monospace; font-size: 13px; }
        .empty { color: #5d6889; text-align: center; padding: 28px 0; }
        #banner {
            display: none;
            background: #3a1f26;
            border: 1px solid #ff6b6b;
            color: #ff6b6b;
            border-radius: 8px;
            padding: 10px 14px;
            margin-bottom: 20px;
            font-size: 14px;
        }
        #detail {
            background: #10141f;
            border: 1px solid #2a3350;
            border-radius: 8px;
            padding: 14px;
            font-size: 13px;
            white-space: pre-wrap;
            word-break: break-all;
            color: #9aa6cc;
        }
    </style>
</head>
<body>
    <div class="header">
        <div>
            <h1>Keywarden</h1>
            <span class="base">{{API_BASE}}</span>
        </div>
        <div class="nav">
            <span>{{USERNAME}}</span>
            <a href="/settings">Settings</a>
            <a class="logout" href="/logout">Logout</a>
        </div>
    </div>
    <div class="container">
        <div id="banner"></div>
        <div class="card">
            <h2>Create key</h2>
            <form class="create-form" onsubmit="createKey(event)">
                <div>
                    <label for="custom_key">Custom key (optional)</label>
                    <input type="text" id="custom_key" name="custom_key">
                </div>
                <div>
                    <label for="total_requests">Total requests</label>
                    <input type="number" id="total_requests" name="total_requests" min="1">
                </div>
                <div>
                    <label for="expiry_days">Expiry (days)</label>
                    <input type="number" id="expiry_days" name="expiry_days" min="1">
                </div>
                <div>
                    <label for="notes">Notes</label>
                    <input type="text" id="notes" name="notes">
                </div>
                <button type="submit">Create</button>
            </form>
        </div>
        <div class="card">
            <h2>Keys <button class="ghost" onclick="loadKeys()">Refresh</button></h2>
            <table>
                <thead>
                    <tr>
                        <th>Key</th>
                        <th>Remaining</th>
                        <th>Total</th>
                        <th>Expires</th>
                        <th>Days left</th>
                        <th>Actions</th>
                    </tr>
                </thead>
                <tbody id="keys-table"></tbody>
            </table>
        </div>
        <div class="card">
            <h2>Details</h2>
            <pre id="detail">Select "Check" on a key to see its status.</pre>
        </div>
    </div>
    <script>
        async function api(path, opts) {
            const r = await fetch(path, opts);
            const data = await r.json().catch(() => ({}));
            if (!r.ok) { throw new Error(data.error || ('HTTP ' + r.status)); }
            return data;
        }
        function showError(msg) {
            const banner = document.getElementById('banner');
            banner.textContent = msg;
            banner.style.display = msg ? 'block' : 'none';
        }
        async function loadKeys() {
            showError('');
            try {
                const data = await api('/api/keys');
                const rows = data.keys.map(k => `<tr>
                    <td class="mono">${k.key}</td>
                    <td>${k.remaining ?? '-'}</td>
                    <td>${k.total ?? '-'}</td>
                    <td>${k.expires_at || '-'}</td>
                    <td>${k.days_left ?? '-'}</td>
                    <td>
                        <button class="ghost" onclick="checkKey('${k.key}')">Check</button>
                        <button class="ghost" onclick="editKey('${k.key}')">Edit</button>
                        <button class="danger" onclick="deleteKey('${k.key}')">Delete</button>
                    </td>
                </tr>`).join('');
                document.getElementById('keys-table').innerHTML =
                    rows || '<tr><td colspan="6" class="empty">No keys</td></tr>';
            } catch (e) { showError(e.message); }
        }
        async function createKey(ev) {
            ev.preventDefault();
            const f = ev.target;
            const body = {
                custom_key: f.custom_key.value || null,
                total_requests: f.total_requests.value ? Number(f.total_requests.value) : null,
                expiry_days: f.expiry_days.value ? Number(f.expiry_days.value) : null,
                notes: f.notes.value
            };
            try {
                await api('/api/key/create', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify(body)
                });
                f.reset();
                loadKeys();
            } catch (e) { showError(e.message); }
        }
        async function deleteKey(key) {
            if (!confirm('Delete key ' + key + '?')) return;
            try {
                await api('/api/key/delete', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ key })
                });
                loadKeys();
            } catch (e) { showError(e.message); }
        }
        async function checkKey(key) {
            try {
                const data = await api('/api/key/check?key=' + encodeURIComponent(key));
                document.getElementById('detail').textContent = JSON.stringify(data.result, null, 2);
            } catch (e) { showError(e.message); }
        }
        async function editKey(key) {
            const total = prompt('New total request quota for ' + key + ' (blank keeps current):');
            if (total === null) return;
            const expiry = prompt('New expiry in days (blank keeps current):');
            if (expiry === null) return;
            const body = { key };
            if (total) body.total_requests = Number(total);
            if (expiry) body.expiry_days = Number(expiry);
            try {
                await api('/api/key/update', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify(body)
                });
                loadKeys();
            } catch (e) { showError(e.message); }
        }
        loadKeys();
    </script>
</body>
</html>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = PanelConfig {
            admin_password_hash: config::hash_password("secret").unwrap(),
            ..PanelConfig::default()
        };
        Arc::new(AppState::new(
            config,
            dir.path().join("keywarden.json"),
            ApiClient::new(),
        ))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthenticated_api_calls_get_401() {
        let dir = tempfile::tempdir().unwrap();
        let app = panel_router(test_state(&dir));
        let response = app
            .oneshot(Request::get("/api/keys").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "not logged in"}));
    }

    #[tokio::test]
    async fn unauthenticated_pages_redirect_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let app = panel_router(test_state(&dir));
        for path in ["/", "/dashboard", "/settings"] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status().is_redirection(), "{path}");
            assert_eq!(response.headers()[header::LOCATION], "/login");
        }
    }

    #[tokio::test]
    async fn login_sets_session_cookie_and_opens_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let app = panel_router(test_state(&dir));

        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=secret"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("keywarden_session="));

        let response = app
            .oneshot(
                Request::get("/dashboard")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_credentials_do_not_create_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let app = panel_router(state.clone());

        let response = app
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=admin&password=wrong"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(state.sessions.read().is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_a_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let token = state.create_session("admin");
        let cookie = format!("{SESSION_COOKIE}={token}");
        let app = panel_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/key/delete")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "missing key"}));

        let response = app
            .oneshot(
                Request::get("/api/key/check")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_base_reports_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let token = state.create_session("admin");
        let app = panel_router(state);

        let response = app
            .oneshot(
                Request::get("/api/keys")
                    .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"error": "API base not configured"})
        );
    }

    #[tokio::test]
    async fn logout_removes_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let token = state.create_session("admin");
        let app = panel_router(state.clone());

        let response = app
            .oneshot(
                Request::get("/logout")
                    .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(state.validate_session(&token).is_none());
    }
}
