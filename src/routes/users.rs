use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    error::{AppError, Result},
    middleware::auth_middleware,
    models::{
        LoginRequest, NewUser, RefreshTokenRequest, RegisterRequest, TokenResponse,
        UpdateUserRequest, User, UserResponse, UserRole, UserStatus,
    },
    queries::user_queries,
    utils::jwt::{self, Claims, TokenType},
};

const MIN_PASSWORD_LEN: usize = 5;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/{id}", get(read_user).put(update_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/token/refresh", post(refresh_token))
        .merge(protected)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_registration(payload: &RegisterRequest) -> Result<()> {
    if payload.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username cannot be empty".to_string()));
    }

    if non_blank(&payload.email).is_none() && non_blank(&payload.phone).is_none() {
        return Err(AppError::BadRequest(
            "Either email or phone is required".to_string(),
        ));
    }

    if let Some(email) = non_blank(&payload.email) {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }
    }

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

fn issue_tokens(state: &AppState, user: &User) -> Result<TokenResponse> {
    Ok(TokenResponse {
        access_token: jwt::generate_access_token(&state.config.auth, user.id, user.role)?,
        token_type: "bearer",
        refresh_token: jwt::generate_refresh_token(&state.config.auth, user.id, user.role)?,
        id: user.id,
    })
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>> {
    validate_registration(&payload)?;

    let email = non_blank(&payload.email);
    let phone = non_blank(&payload.phone);

    if let Some(email) = &email {
        if user_queries::find_by_email(&state.db, email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
    }
    if let Some(phone) = &phone {
        if user_queries::find_by_phone(&state.db, phone).await?.is_some() {
            return Err(AppError::Conflict("Phone already exists".to_string()));
        }
    }

    let password_hash = bcrypt::hash(&payload.password, state.config.auth.password_cost)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = user_queries::create_user(
        &state.db,
        &NewUser {
            username: payload.username.trim().to_string(),
            email,
            phone,
            password_hash,
        },
    )
    .await?;

    tracing::info!("Registered user {}", user.id);
    Ok(Json(UserResponse::from(user)))
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let invalid = || AppError::Unauthorized("Incorrect email or password".to_string());

    let user = user_queries::find_by_email_or_phone(&state.db, payload.email_phone.trim())
        .await?
        .ok_or_else(invalid)?;

    let password_hash = user.password.as_ref().ok_or_else(invalid)?;

    let is_valid = bcrypt::verify(&payload.password, password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {}", e)))?;

    if !is_valid {
        return Err(invalid());
    }

    if user.status == UserStatus::Inactive {
        return Err(AppError::Forbidden("Inactive user".to_string()));
    }

    Ok(Json(issue_tokens(&state, &user)?))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>> {
    let claims = jwt::verify_token(&state.config.auth, &payload.refresh_token, TokenType::Refresh)?;

    let user = user_queries::find_by_id(&state.db, claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

    if user.status == UserStatus::Inactive {
        return Err(AppError::Forbidden("Inactive user".to_string()));
    }

    Ok(Json(issue_tokens(&state, &user)?))
}

fn ensure_self_or_admin(claims: &Claims, user_id: i32) -> Result<()> {
    if claims.role == UserRole::Admin || claims.user_id()? == user_id {
        return Ok(());
    }
    Err(AppError::Forbidden("Not allowed to access this user".to_string()))
}

pub async fn read_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>> {
    ensure_self_or_admin(&claims, id)?;

    let user = user_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    ensure_self_or_admin(&claims, id)?;

    let user = user_queries::update_user(&state.db, id, &payload).await?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, phone: Option<&str>, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: "asha".to_string(),
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_needs_email_or_phone() {
        let err = validate_registration(&request(None, Some(" "), "secret")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(validate_registration(&request(None, Some("9999999999"), "secret")).is_ok());
        assert!(validate_registration(&request(Some("a@b.in"), None, "secret")).is_ok());
    }

    #[test]
    fn registration_checks_password_and_email_shape() {
        assert!(validate_registration(&request(Some("a@b.in"), None, "1234")).is_err());
        assert!(validate_registration(&request(Some("not-an-email"), None, "secret")).is_err());
    }

    #[test]
    fn users_may_only_read_themselves_unless_admin() {
        let claims = |sub: &str, role| Claims {
            sub: sub.to_string(),
            role,
            typ: TokenType::Access,
            exp: 0,
        };

        assert!(ensure_self_or_admin(&claims("4", UserRole::Customer), 4).is_ok());
        assert!(ensure_self_or_admin(&claims("4", UserRole::Customer), 5).is_err());
        assert!(ensure_self_or_admin(&claims("1", UserRole::Admin), 5).is_ok());
    }
}
