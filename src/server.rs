// http server - signup/login, allergy-filtered catalog, personal journal,
// contact inbox, admin panel, and the ai chat endpoint

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, header, request::Parts},
    routing::{get, post, put},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::core::{
    AdminConfig, AuthConfig, ContactMessage, Db, Gemini, JournalProduct, JournalRecipe, NewUser,
    User, UserUpdate, assistant_prompt, hash_password, is_safe, issue_token, relay,
    verify_password, verify_token,
};
use crate::Error;

pub struct ServerConfig {
    pub db_url: String,
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub models: Vec<String>,
    pub jwt_secret: String,
    pub admin_user: String,
    pub admin_pass: String,
    pub admin_key: String,
}

struct AppState {
    db: Db,
    gemini: Gemini,
    models: Vec<String>,
    auth: AuthConfig,
    admin: AdminConfig,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn detail(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: message.to_string(),
        }),
    )
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Extractor for a logged-in user. Verifies the Bearer token and exposes
/// the claims to the handler.
struct AuthUser(#[allow(dead_code)] crate::core::Claims);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Access Denied: No Token"))?;

        let claims = verify_token(&state.auth, token)
            .map_err(|_| detail(StatusCode::FORBIDDEN, "Invalid Token"))?;

        Ok(Self(claims))
    }
}

/// Extractor for admin endpoints: the x-admin-key header must match the
/// configured admin secret.
struct AdminKey;

impl FromRequestParts<Arc<AppState>> for AdminKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if !state.admin.key_matches(key) {
            return Err(detail(StatusCode::UNAUTHORIZED, "Admin key invalid"));
        }

        Ok(Self)
    }
}

pub struct Server;

impl Server {
    pub async fn run(config: ServerConfig) -> Result<(), Error> {
        let db = Db::connect(&config.db_url).await?;
        let gemini = Gemini::new(config.api_key)?;

        let state = Arc::new(AppState {
            db,
            gemini,
            models: config.models,
            auth: AuthConfig {
                jwt_secret: config.jwt_secret,
            },
            admin: AdminConfig {
                username: config.admin_user,
                password: config.admin_pass,
                admin_key: config.admin_key,
            },
        });

        let app = Router::new()
            .route("/health", get(health))
            .route("/signup", post(signup))
            .route("/login", post(login))
            .route("/stats/summary", get(stats_summary))
            .route("/user/{id}", get(profile))
            .route("/recipes/{id}", get(safe_recipes))
            .route("/products/{id}", get(safe_products))
            .route("/my-recipes/add", post(add_journal_recipe))
            .route("/my-recipes/{id}", get(journal_recipes))
            .route("/my-products/add", post(add_journal_product))
            .route("/my-products/{id}", get(journal_products))
            .route("/contact", post(contact))
            .route("/chat", post(chat))
            .route("/admin/users", get(admin_list_users).post(admin_create_user))
            .route(
                "/admin/users/{id}",
                put(admin_update_user).delete(admin_delete_user),
            )
            .route("/admin/messages", get(admin_messages))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let addr = format!("{}:{}", config.host, config.port);
        tracing::info!(%addr, "server running");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// --- signup / login ---

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    age: Option<i64>,
    allergy: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let password_hash = hash_password(&req.password)
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

    let new_user = NewUser {
        username: req.username,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        email: req.email,
        phone: req.phone,
        age: req.age,
        allergy_trigger: req.allergy.clone(),
    };

    let user_id = state.db.create_user(&new_user).await.map_err(|e| {
        tracing::warn!(error = %e, "signup failed");
        detail(StatusCode::BAD_REQUEST, "Username/Email taken or DB Error")
    })?;

    state
        .db
        .log_activity(
            Some(user_id),
            "SIGNUP",
            &format!(
                "Age: {}, Allergy: {}",
                new_user.age.map_or("unknown".to_string(), |a| a.to_string()),
                req.allergy.as_deref().unwrap_or("None")
            ),
        )
        .await;

    Ok(Json(MessageResponse {
        message: "User created",
    }))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    user_id: Option<i64>,
    allergy: Option<String>,
    token: String,
    is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_key: Option<String>,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // static admin credentials take priority over database users
    if state.admin.is_admin_login(&req.username, &req.password) {
        tracing::info!("admin logged in");
        return Ok(Json(LoginResponse {
            user_id: None,
            allergy: None,
            token: "admin-token-placeholder".to_string(),
            is_admin: true,
            admin_key: Some(state.admin.admin_key.clone()),
        }));
    }

    let user = state
        .db
        .user_by_username(&req.username)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "login lookup failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
        })?
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Invalid login"))?;

    let matches = verify_password(&req.password, &user.password)
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

    if !matches {
        return Err(detail(StatusCode::UNAUTHORIZED, "Invalid login"));
    }

    let token = issue_token(&state.auth, user.user_id, &user.username)
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

    state
        .db
        .log_activity(Some(user.user_id), "LOGIN", "User logged in successfully")
        .await;

    Ok(Json(LoginResponse {
        user_id: Some(user.user_id),
        allergy: user.allergy_trigger,
        token,
        is_admin: false,
        admin_key: None,
    }))
}

// --- stats ---

async fn stats_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let total_users = state
        .db
        .user_count()
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Unable to load stats"))?;

    Ok(Json(serde_json::json!({ "total_users": total_users })))
}

// --- profile ---

#[derive(Serialize)]
struct ProfileResponse {
    username: String,
    first_name: String,
    last_name: String,
    email: Option<String>,
    phone: Option<String>,
    age: Option<i64>,
    allergy: Option<String>,
    joined_date: String,
}

// created_at is stored as "YYYY-MM-DD HH:MM:SS"; clients only want the date
fn joined_date(created_at: &str) -> String {
    NaiveDateTime::parse_from_str(created_at, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date().to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

async fn profile(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = fetch_user(&state, id).await?;

    Ok(Json(ProfileResponse {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        phone: user.phone,
        age: user.age,
        allergy: user.allergy_trigger,
        joined_date: joined_date(&user.created_at),
    }))
}

async fn fetch_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    state
        .db
        .user_by_id(id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user lookup failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
        })?
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "User not found"))
}

// --- allergy-filtered catalog ---

#[derive(Serialize)]
struct SafeRecipe {
    title: String,
    tags: String,
    icon: Option<String>,
}

async fn safe_recipes(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<SafeRecipe>>, ApiError> {
    let user = fetch_user(&state, id).await?;
    let allergy = user.allergy_trigger.unwrap_or_default();

    let recipes = state
        .db
        .recipes()
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error"))?;

    let safe = recipes
        .into_iter()
        .filter(|r| is_safe(&allergy, r.contains_allergens.as_deref()))
        .map(|r| SafeRecipe {
            title: r.title,
            tags: format!("Safe (No {allergy})"),
            icon: r.image_placeholder,
        })
        .collect();

    Ok(Json(safe))
}

#[derive(Serialize)]
struct SafeProduct {
    name: String,
    shop: String,
    price: f64,
}

async fn safe_products(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<SafeProduct>>, ApiError> {
    let user = fetch_user(&state, id).await?;
    let allergy = user.allergy_trigger.unwrap_or_default();

    let products = state
        .db
        .products()
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error"))?;

    let safe = products
        .into_iter()
        .filter(|p| is_safe(&allergy, p.contains_allergens.as_deref()))
        .map(|p| SafeProduct {
            name: p.name,
            shop: p.shop,
            price: p.price,
        })
        .collect();

    Ok(Json(safe))
}

// --- personal journal ---

#[derive(Deserialize)]
struct AddRecipeRequest {
    user_id: i64,
    title: String,
    ingredients: String,
    instructions: String,
}

async fn add_journal_recipe(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddRecipeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .db
        .add_journal_recipe(req.user_id, &req.title, &req.ingredients, &req.instructions)
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error"))?;

    state
        .db
        .log_activity(
            Some(req.user_id),
            "ADD_RECIPE",
            &format!("Title: {}", req.title),
        )
        .await;

    Ok(Json(MessageResponse { message: "Saved" }))
}

async fn journal_recipes(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<JournalRecipe>>, ApiError> {
    let entries = state
        .db
        .journal_recipes(id)
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error"))?;

    Ok(Json(entries))
}

#[derive(Deserialize)]
struct AddProductRequest {
    user_id: i64,
    product_name: String,
    shop: Option<String>,
    safety_status: String,
    notes: Option<String>,
}

async fn add_journal_product(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddProductRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .db
        .add_journal_product(
            req.user_id,
            &req.product_name,
            req.shop.as_deref(),
            &req.safety_status,
            req.notes.as_deref(),
        )
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error"))?;

    state
        .db
        .log_activity(
            Some(req.user_id),
            "ADD_PRODUCT",
            &format!("Product: {} ({})", req.product_name, req.safety_status),
        )
        .await;

    Ok(Json(MessageResponse { message: "Saved" }))
}

async fn journal_products(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<JournalProduct>>, ApiError> {
    let entries = state
        .db
        .journal_products(id)
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server Error"))?;

    Ok(Json(entries))
}

// --- contact form ---

#[derive(Deserialize)]
struct ContactRequest {
    name: String,
    email: String,
    message: String,
}

async fn contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.name.is_empty() || req.email.is_empty() || req.message.is_empty() {
        return Err(detail(StatusCode::BAD_REQUEST, "Please fill in all fields"));
    }

    state
        .db
        .add_contact_message(&req.name, &req.email, &req.message)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to store contact message");
            detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error. Please try again later.",
            )
        })?;

    Ok(Json(MessageResponse {
        message: "Message received",
    }))
}

// --- ai chat ---

#[derive(Deserialize)]
struct ChatRequest {
    user_id: i64,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn chat(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.is_empty() {
        return Err(detail(StatusCode::BAD_REQUEST, "Missing info."));
    }

    let user = fetch_user(&state, req.user_id).await?;
    let allergy = user.allergy_trigger.as_deref().unwrap_or("none");

    tracing::info!(user = %user.first_name, "ai chat request");
    let prompt = assistant_prompt(&req.message, allergy, &user.first_name);

    let outcome = relay(&state.gemini, &state.models, &prompt).await;
    if let crate::core::RelayOutcome::Exhausted { last_error } = &outcome {
        tracing::error!(%last_error, "all chat models failed");
    }

    // exhaustion is still a 200: the chat window renders the failure text
    Ok(Json(ChatResponse {
        reply: outcome.into_reply(),
    }))
}

// --- admin panel ---

async fn admin_list_users(
    _key: AdminKey,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .db
        .list_users()
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server error"))?;

    Ok(Json(users))
}

#[derive(Deserialize)]
struct AdminCreateRequest {
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    age: Option<i64>,
    allergy_trigger: Option<String>,
}

async fn admin_create_user(
    _key: AdminKey,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminCreateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.username.is_empty()
        || req.password.is_empty()
        || req.first_name.is_empty()
        || req.last_name.is_empty()
    {
        return Err(detail(StatusCode::BAD_REQUEST, "Missing required fields"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?;

    let new_user = NewUser {
        username: req.username,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        email: None,
        phone: None,
        age: req.age,
        allergy_trigger: req.allergy_trigger,
    };

    state.db.create_user(&new_user).await.map_err(|e| {
        tracing::warn!(error = %e, "admin create failed");
        detail(StatusCode::BAD_REQUEST, "Unable to create user")
    })?;

    Ok(Json(MessageResponse {
        message: "User created",
    }))
}

#[derive(Deserialize)]
struct AdminUpdateRequest {
    username: Option<String>,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    age: Option<i64>,
    allergy_trigger: Option<String>,
}

async fn admin_update_user(
    _key: AdminKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AdminUpdateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let password_hash = match req.password {
        Some(password) => Some(
            hash_password(&password)
                .map_err(|e| detail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()))?,
        ),
        None => None,
    };

    let update = UserUpdate {
        username: req.username,
        password_hash,
        first_name: req.first_name,
        last_name: req.last_name,
        age: req.age,
        allergy_trigger: req.allergy_trigger,
    };

    if update.is_empty() {
        return Err(detail(StatusCode::BAD_REQUEST, "No fields to update"));
    }

    let updated = state.db.update_user(id, &update).await.map_err(|e| {
        tracing::warn!(error = %e, "admin update failed");
        detail(StatusCode::BAD_REQUEST, "Unable to update user")
    })?;

    if !updated {
        return Err(detail(StatusCode::NOT_FOUND, "User not found"));
    }

    Ok(Json(MessageResponse {
        message: "User updated",
    }))
}

async fn admin_delete_user(
    _key: AdminKey,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state.db.delete_user(id).await.map_err(|e| {
        tracing::warn!(error = %e, "admin delete failed");
        detail(StatusCode::BAD_REQUEST, "Unable to delete user")
    })?;

    if !deleted {
        return Err(detail(StatusCode::NOT_FOUND, "User not found"));
    }

    Ok(Json(MessageResponse {
        message: "User deleted",
    }))
}

async fn admin_messages(
    _key: AdminKey,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContactMessage>>, ApiError> {
    let messages = state
        .db
        .contact_messages()
        .await
        .map_err(|_| detail(StatusCode::INTERNAL_SERVER_ERROR, "Server error"))?;

    Ok(Json(messages))
}
