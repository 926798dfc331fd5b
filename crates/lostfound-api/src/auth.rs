use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, response::IntoResponse};
use tracing::{debug, info};

use lostfound_db::Database;
use lostfound_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use lostfound_types::models::UserProfile;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::{require, run_db};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    hasher: Argon2<'static>,
    /// Verified against when the roll number is unknown, so that path costs
    /// the same as a wrong password.
    dummy_hash: String,
}

impl AppStateInner {
    pub fn new(db: Database) -> anyhow::Result<AppState> {
        Self::with_hasher(db, Argon2::default())
    }

    pub fn with_hasher(db: Database, hasher: Argon2<'static>) -> anyhow::Result<AppState> {
        let dummy_hash = hash_password(&hasher, "lostfound-dummy-password")?;
        Ok(Arc::new(Self {
            db,
            hasher,
            dummy_hash,
        }))
    }
}

fn hash_password(hasher: &Argon2<'_>, password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(hasher: &Argon2<'_>, password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
    Ok(hasher.verify_password(password.as_bytes(), &parsed).is_ok())
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    const MISSING: &str = "All fields are required";
    let roll_number = require(req.roll_number, MISSING)?;
    let password = require(req.password, MISSING)?;
    let name = require(req.name, MISSING)?;
    let phone_number = require(req.phone_number, MISSING)?;

    let roll = roll_number.clone();
    let user_id = run_db(&state, move |state| {
        // Cheap pre-check before paying for the hash; the UNIQUE constraint
        // still decides races between concurrent registrations.
        if state.db.get_user_by_roll_number(&roll_number)?.is_some() {
            return Err(ApiError::Conflict);
        }

        let password_hash = hash_password(&state.hasher, &password)?;
        state
            .db
            .create_user(&roll_number, &password_hash, &name, &phone_number)?
            .ok_or(ApiError::Conflict)
    })
    .await?;

    info!("Registered user {} ({})", user_id, roll);

    Ok(Json(RegisterResponse {
        success: true,
        message: "Registration successful".into(),
        user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    const MISSING: &str = "Roll number and password are required";
    let roll_number = require(req.roll_number, MISSING)?;
    let password = require(req.password, MISSING)?;

    let user = run_db(&state, move |state| {
        match state.db.get_user_by_roll_number(&roll_number)? {
            Some(user) => {
                if verify_password(&state.hasher, &password, &user.password)? {
                    Ok(user)
                } else {
                    Err(ApiError::InvalidCredentials)
                }
            }
            None => {
                verify_password(&state.hasher, &password, &state.dummy_hash)?;
                Err(ApiError::InvalidCredentials)
            }
        }
    })
    .await?;

    debug!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        user: UserProfile {
            id: user.id,
            roll_number: user.roll_number,
            name: user.name,
            phone_number: user.phone_number,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hasher = Argon2::default();
        let hash = hash_password(&hasher, "hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hasher, "hunter22", &hash).unwrap());
        assert!(!verify_password(&hasher, "hunter23", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = Argon2::default();
        let a = hash_password(&hasher, "pw").unwrap();
        let b = hash_password(&hasher, "pw").unwrap();
        assert_ne!(a, b);
    }
}
