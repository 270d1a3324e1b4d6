//! Authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginRequest, LoginResponse, RegisterRequest, Role, User, UserClaims},
    repository::{optional, Repository},
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Create a staff account with the `user` role
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        if optional(self.repository.users.find_by_email(&request.email).await)?.is_some() {
            return Err(AppError::Conflict("email is already registered".to_string()));
        }

        let hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.name, &request.email, &hash, Role::User)
            .await?;
        tracing::info!("User {} registered", user.id);
        Ok(user)
    }

    /// Authenticate by email and password and issue a JWT
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let user = optional(self.repository.users.find_by_email(&request.email).await)?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user, &request.password)? {
            tracing::warn!("Failed login for {}", request.email);
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let claims = UserClaims::new(&user, self.config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: claims.exp - claims.iat,
            user,
        })
    }

    /// Create the configured admin account if it does not exist yet
    pub async fn ensure_admin(&self) -> AppResult<Option<User>> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password) else {
            return Ok(None);
        };

        if optional(self.repository.users.find_by_email(email).await)?.is_some() {
            return Ok(None);
        }

        let hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create("Administrator", email, &hash, Role::Admin)
            .await?;
        tracing::info!("Bootstrap admin {} created", user.email);
        Ok(Some(user))
    }

    /// Current user profile
    pub async fn me(&self, user_id: Uuid) -> AppResult<User> {
        self.repository.users.find_by_id(user_id).await
    }
}

/// Verify user password
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
