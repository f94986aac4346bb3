use axum::{
    extract::State,
    response::Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{encode, EncodingKey, Header};
use chrono::Utc;
use mongodb::Collection;
use mongodb::bson::{doc, oid::ObjectId};
use validator::Validate;

use crate::state::AppState;
use crate::errors::{AppError, Result};
use crate::models::user::{
    AuthResponse, Claims, LoginUser, RegisterUser, User, UserResponse,
};

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUser>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    let collection: Collection<User> = state.db.collection("users");

    let existing_user = collection
        .find_one(doc! { "email": &payload.email })
        .await?;

    if existing_user.is_some() {
        return Err(AppError::conflict("An account with this email already exists"));
    }

    // Hash password
    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|_| AppError::service("Password hashing failed"))?;

    let now = Utc::now();
    let user = User {
        _id: Some(ObjectId::new()),
        name: payload.name.clone(),
        email: payload.email.clone(),
        phone: payload.phone.clone(),
        password_hash,
        role: payload.role,
        created_at: now,
        updated_at: now,
    };

    collection
        .insert_one(&user)
        .await
        .map_err(AppError::from_write_error)?;

    let token = sign_token(&user, &state.config.jwt_secret)?;

    tracing::info!("✅ Registered {} account for {}", user.role.as_str(), user.email);

    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginUser>,
) -> Result<Json<AuthResponse>> {
    let collection: Collection<User> = state.db.collection("users");

    let user = collection
        .find_one(doc! { "email": &payload.email })
        .await?
        .ok_or(AppError::AuthError)?;

    let valid = verify(&payload.password, &user.password_hash)
        .map_err(|_| AppError::AuthError)?;

    if !valid {
        return Err(AppError::AuthError);
    }

    let token = sign_token(&user, &state.config.jwt_secret)?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(&user),
        token,
    }))
}

fn sign_token(user: &User, secret: &str) -> Result<String> {
    let claims = Claims {
        sub: user._id.map(|id| id.to_hex()).unwrap_or_default(),
        email: user.email.clone(),
        role: user.role,
        exp: (Utc::now().timestamp() + 86400) as usize, // 24 hours
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|_| AppError::service("Token signing failed"))
}
