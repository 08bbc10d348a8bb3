use axum::{
    extract::{ Path, State },
    http::{ HeaderMap, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::{ error, warn };
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;

use crate::assistant::CoachGateway;
use crate::auth::{ AuthUser, SessionContext };
use crate::history::HistoryStore;
use crate::models::chat::Role;
use crate::models::profile::{ ChecklistItem, UserProfile, PROFILE_SCHEMA_VERSION };
use crate::store::DocumentStore;

const USERS_COLLECTION: &str = "users";
const CHECKLIST_COLLECTION: &str = "checklist";
const HISTORY_LIMIT: usize = 50;

const MSG_MESSAGE_REQUIRED: &str = "El mensaje es requerido";
const MSG_REQUEST_FAILED: &str = "Error al procesar la solicitud";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn CoachGateway>,
    pub history: Arc<dyn HistoryStore>,
    pub store: Arc<dyn DocumentStore>,
    pub sessions: SessionContext,
    pub api_key: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/coach", post(coach_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/profile", get(get_profile_handler).put(put_profile_handler))
        .route("/checklist", get(list_checklist_handler).post(add_checklist_handler))
        .route(
            "/checklist/{id}",
            axum::routing::patch(update_checklist_handler).delete(delete_checklist_handler)
        )
        .route("/history/{thread_id}", get(history_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "error": message }))
}

/// Static X-API-Key gate, applied to every route but /health when a key
/// is configured.
async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: Next
) -> Response {
    if let Some(required) = &state.api_key {
        let provided = headers.get("X-API-Key").and_then(|v| v.to_str().ok());
        if provided != Some(required.as_str()) {
            warn!("Request rejected: bad or missing API key");
            return (StatusCode::UNAUTHORIZED, error_body("No autorizado")).into_response();
        }
    }
    next.run(request).await
}

/// Resolves the acting user from the Authorization bearer token.
async fn session_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, Response> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, error_body("Sesión requerida")).into_response()
        })?;

    state
        .sessions.resolve(token).await
        .ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, error_body("Sesión inválida")).into_response()
        })
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// --- Coach ---

#[derive(Deserialize)]
struct CoachRequest {
    message: Option<String>,
    #[serde(rename = "threadId")]
    thread_id: Option<String>,
}

#[derive(Serialize)]
struct CoachResponse {
    response: String,
    #[serde(rename = "threadId")]
    thread_id: String,
}

async fn coach_handler(
    State(state): State<AppState>,
    Json(req): Json<CoachRequest>
) -> Response {
    let message = match req.message.as_deref() {
        Some(m) if !m.trim().is_empty() => m,
        _ => {
            return (StatusCode::BAD_REQUEST, error_body(MSG_MESSAGE_REQUIRED)).into_response();
        }
    };

    match state.gateway.send_message(message, req.thread_id.as_deref()).await {
        Ok(resp) => {
            // History is best-effort; a storage hiccup must not fail
            // the exchange that already happened upstream.
            if
                let Err(e) = state.history.add_message(
                    &resp.thread_id,
                    Role::User.as_str(),
                    message
                ).await
            {
                error!("Failed to record user message: {}", e);
            }
            if
                let Err(e) = state.history.add_message(
                    &resp.thread_id,
                    Role::Assistant.as_str(),
                    &resp.reply_text
                ).await
            {
                error!("Failed to record assistant reply: {}", e);
            }

            Json(CoachResponse {
                response: resp.reply_text,
                thread_id: resp.thread_id,
            }).into_response()
        }
        Err(e) => {
            // Error kinds are collapsed at this boundary; the client
            // falls back on its own.
            error!("Coach request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(thread_id): Path<String>
) -> Response {
    match state.history.get_conversation(&thread_id, HISTORY_LIMIT).await {
        Ok(convo) => Json(convo).into_response(),
        Err(e) => {
            error!("Failed to load conversation {}: {}", thread_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

// --- Auth ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    nombre: String,
    email: String,
    password: String,
    pais_origen: String,
    pais_destino: String,
    motivo_migracion: String,
    nivel_educativo: Option<String>,
    experiencia_laboral: Option<String>,
    estado_documentos: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    token: String,
    user: AuthUser,
}

async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>
) -> Response {
    if req.password.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, error_body("La contraseña es requerida")).into_response();
    }

    let mut profile = UserProfile {
        id: "pendiente".to_string(),
        nombre: req.nombre.clone(),
        email: req.email.trim().to_lowercase(),
        pais_origen: req.pais_origen,
        pais_destino: req.pais_destino,
        motivo_migracion: req.motivo_migracion,
        nivel_educativo: req.nivel_educativo,
        experiencia_laboral: req.experiencia_laboral,
        estado_documentos: req.estado_documentos,
        photo_url: None,
        auth_provider: Some("password".to_string()),
        schema_version: PROFILE_SCHEMA_VERSION,
        created_at: None,
        updated_at: None,
    };
    if let Err(e) = profile.validate() {
        return (StatusCode::BAD_REQUEST, error_body(&e)).into_response();
    }

    let provider = state.sessions.provider();
    let user = match provider.sign_up(&profile.email, &req.password, &req.nombre).await {
        Ok(user) => user,
        Err(e) => {
            return (StatusCode::CONFLICT, error_body(&e.to_string())).into_response();
        }
    };
    profile.id = user.uid.clone();

    let doc = match serde_json::to_value(&profile) {
        Ok(doc) => doc,
        Err(e) => {
            error!("Failed to serialize profile: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response();
        }
    };
    if let Err(e) = state.store.set(USERS_COLLECTION, &user.uid, doc).await {
        error!("Failed to store profile for {}: {}", user.uid, e);
        return (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response();
    }

    match provider.sign_in(&user.email, &req.password).await {
        Ok((user, token)) =>
            (StatusCode::CREATED, Json(SessionResponse { token, user })).into_response(),
        Err(e) => {
            error!("Sign-in after registration failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

async fn login_handler(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    match state.sessions.provider().sign_in(&req.email, &req.password).await {
        Ok((user, token)) => Json(SessionResponse { token, user }).into_response(),
        Err(_) => (StatusCode::UNAUTHORIZED, error_body("Credenciales inválidas")).into_response(),
    }
}

async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(token) = token {
        if let Err(e) = state.sessions.provider().sign_out(token).await {
            error!("Sign-out failed: {}", e);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

// --- Profile ---

async fn get_profile_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match session_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => {
            return resp;
        }
    };

    match state.store.get(USERS_COLLECTION, &user.uid).await {
        Ok(Some(doc)) => Json(doc).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("Perfil no encontrado")).into_response(),
        Err(e) => {
            error!("Failed to load profile for {}: {}", user.uid, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

async fn put_profile_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut profile): Json<UserProfile>
) -> Response {
    let user = match session_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => {
            return resp;
        }
    };

    // The profile id always comes from the session, never the body.
    profile.id = user.uid.clone();
    if let Err(e) = profile.validate() {
        return (StatusCode::BAD_REQUEST, error_body(&e)).into_response();
    }

    let doc = match serde_json::to_value(&profile) {
        Ok(doc) => doc,
        Err(e) => {
            error!("Failed to serialize profile: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response();
        }
    };

    match state.store.set(USERS_COLLECTION, &user.uid, doc).await {
        Ok(()) =>
            match state.store.get(USERS_COLLECTION, &user.uid).await {
                Ok(Some(stored)) => Json(stored).into_response(),
                _ => StatusCode::NO_CONTENT.into_response(),
            }
        Err(e) => {
            error!("Failed to store profile for {}: {}", user.uid, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

// --- Checklist ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewChecklistItem {
    title: String,
    category: String,
    description: Option<String>,
    due_date: Option<chrono::DateTime<chrono::Utc>>,
}

async fn list_checklist_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match session_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => {
            return resp;
        }
    };

    match state.store.query_eq(CHECKLIST_COLLECTION, "userId", &json!(user.uid)).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => {
            error!("Failed to load checklist for {}: {}", user.uid, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

async fn add_checklist_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewChecklistItem>
) -> Response {
    let user = match session_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => {
            return resp;
        }
    };

    let item = ChecklistItem {
        id: Uuid::new_v4().to_string(),
        user_id: user.uid.clone(),
        title: req.title,
        description: req.description,
        category: req.category,
        completed: false,
        due_date: req.due_date,
        created_at: None,
        updated_at: None,
    };
    if let Err(e) = item.validate() {
        return (StatusCode::BAD_REQUEST, error_body(&e)).into_response();
    }

    let doc = match serde_json::to_value(&item) {
        Ok(doc) => doc,
        Err(e) => {
            error!("Failed to serialize checklist item: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response();
        }
    };

    match state.store.set(CHECKLIST_COLLECTION, &item.id, doc).await {
        Ok(()) =>
            match state.store.get(CHECKLIST_COLLECTION, &item.id).await {
                Ok(Some(stored)) => (StatusCode::CREATED, Json(stored)).into_response(),
                _ => (StatusCode::CREATED, Json(item)).into_response(),
            }
        Err(e) => {
            error!("Failed to store checklist item: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

/// Loads the item and checks it belongs to the session user; foreign
/// items read as missing.
async fn owned_checklist_item(
    state: &AppState,
    user: &AuthUser,
    id: &str
) -> Result<Value, Response> {
    match state.store.get(CHECKLIST_COLLECTION, id).await {
        Ok(Some(doc)) if doc.get("userId") == Some(&json!(user.uid)) => Ok(doc),
        Ok(_) =>
            Err((StatusCode::NOT_FOUND, error_body("Item no encontrado")).into_response()),
        Err(e) => {
            error!("Failed to load checklist item {}: {}", id, e);
            Err(
                (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
            )
        }
    }
}

async fn update_checklist_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(partial): Json<Value>
) -> Response {
    let user = match session_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => {
            return resp;
        }
    };
    let mut merged = match owned_checklist_item(&state, &user, &id).await {
        Ok(doc) => doc,
        Err(resp) => {
            return resp;
        }
    };

    // Ownership and identity fields are not patchable.
    let mut partial = partial;
    if let Some(map) = partial.as_object_mut() {
        map.remove("id");
        map.remove("userId");
    }

    // The merged record must still be a valid checklist item before
    // anything reaches the store.
    if let (Some(target), Some(changes)) = (merged.as_object_mut(), partial.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    let item = match serde_json::from_value::<ChecklistItem>(merged) {
        Ok(item) => item,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, error_body(&format!("Item inválido: {}", e)))
                .into_response();
        }
    };
    if let Err(e) = item.validate() {
        return (StatusCode::BAD_REQUEST, error_body(&e)).into_response();
    }

    match state.store.update(CHECKLIST_COLLECTION, &id, partial).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, error_body("Item no encontrado")).into_response(),
        Err(e) => {
            error!("Failed to update checklist item {}: {}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}

async fn delete_checklist_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>
) -> Response {
    let user = match session_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => {
            return resp;
        }
    };
    if let Err(resp) = owned_checklist_item(&state, &user, &id).await {
        return resp;
    }

    match state.store.delete(CHECKLIST_COLLECTION, &id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, error_body("Item no encontrado")).into_response(),
        Err(e) => {
            error!("Failed to delete checklist item {}: {}", id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(MSG_REQUEST_FAILED)).into_response()
        }
    }
}
