use std::sync::Arc;

use anyhow::{anyhow, Context};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::ApiError;
use crate::config::Config;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::user::{
    AuthResponse, LoginRequest, RegisterRequest, User, UserEmailIndex, UserProfile, UserRole,
};
use crate::store::{self, keys, DocumentStore};

pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    jwt_service: JwtService,
    access_token_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_service: JwtService) -> Self {
        let access_token_ttl_seconds = std::env::var("JWT_ACCESS_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600); // Default: 1 hour

        Self {
            store,
            jwt_service,
            access_token_ttl_seconds,
        }
    }

    fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        Ok(hash(password, DEFAULT_COST).context("Failed to hash password")?)
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, ApiError> {
        Ok(verify(password, password_hash).context("Failed to verify password")?)
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ApiError> {
        req.validate()
            .map_err(|e| ApiError::validation(format!("Validation error: {}", e)))?;

        let role = req.role.unwrap_or_default();
        if role == UserRole::Admin {
            return Err(ApiError::validation(
                "Admin accounts cannot be self-registered",
            ));
        }

        let email_key = keys::user_email(&req.email);
        let existing = store::load::<UserEmailIndex>(self.store.as_ref(), &email_key).await?;
        if existing.is_some() {
            return Err(ApiError::validation("User with this email already exists"));
        }

        let password_hash = self.hash_password(&req.password)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: req.email.trim().to_lowercase(),
            password_hash,
            name: req.name,
            role,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        store::save(self.store.as_ref(), &keys::user(&user.id), &user).await?;
        store::save(
            self.store.as_ref(),
            &email_key,
            &UserEmailIndex {
                user_id: user.id.clone(),
            },
        )
        .await?;

        let access_token = self.generate_access_token(&user)?;

        tracing::info!("User registered: {} ({})", user.id, user.role.as_str());

        Ok(AuthResponse {
            access_token,
            user: UserProfile::from(user),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        req.validate()
            .map_err(|e| ApiError::validation(format!("Validation error: {}", e)))?;

        let email_key = keys::user_email(&req.email);
        let index = store::load::<UserEmailIndex>(self.store.as_ref(), &email_key)
            .await?
            .ok_or_else(|| ApiError::validation("Invalid email or password"))?;

        let mut user = store::load::<User>(self.store.as_ref(), &keys::user(&index.user_id))
            .await?
            .ok_or_else(|| ApiError::validation("Invalid email or password"))?;

        if !self.verify_password(&req.password, &user.password_hash)? {
            return Err(ApiError::validation("Invalid email or password"));
        }

        user.last_login_at = Some(Utc::now());
        store::save(self.store.as_ref(), &keys::user(&user.id), &user).await?;

        let access_token = self.generate_access_token(&user)?;

        tracing::info!("User logged in: {}", user.id);

        Ok(AuthResponse {
            access_token,
            user: UserProfile::from(user),
        })
    }

    pub async fn current_user(&self, user_id: &str) -> Result<UserProfile, ApiError> {
        let user = store::load::<User>(self.store.as_ref(), &keys::user(user_id))
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        Ok(UserProfile::from(user))
    }

    fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user.id.clone(),
            role: user.role.as_str().to_string(),
            exp: (now + self.access_token_ttl_seconds) as usize,
            iat: now as usize,
        };

        self.jwt_service
            .generate_token(claims)
            .map_err(|e| ApiError::Storage(anyhow!("Failed to generate token: {}", e)))
    }

    /// Ensures the configured admin account exists. Registration never
    /// produces admins; this runs at startup (and in test setup).
    pub async fn seed_admin(&self, config: &Config) -> Result<(), ApiError> {
        let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
            tracing::debug!("No admin credentials configured, skipping admin seed");
            return Ok(());
        };

        let email_key = keys::user_email(email);
        if store::load::<UserEmailIndex>(self.store.as_ref(), &email_key)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let now = Utc::now();
        let admin = User {
            id: Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            password_hash: self.hash_password(password)?,
            name: "Administrator".to_string(),
            role: UserRole::Admin,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        store::save(self.store.as_ref(), &keys::user(&admin.id), &admin).await?;
        store::save(
            self.store.as_ref(),
            &email_key,
            &UserEmailIndex {
                user_id: admin.id.clone(),
            },
        )
        .await?;

        tracing::info!("Seeded admin account: {}", admin.email);
        Ok(())
    }
}
