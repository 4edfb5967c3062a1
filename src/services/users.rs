use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::config;
use crate::database::models::{Plan, PremiumUser, Role, User, UserProfile};
use crate::database::{Repository, StoreError};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::required;
use crate::state::AppState;
use crate::types::{timestamp, ACTIVE};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub company: Option<String>,
    pub is_festival_manager: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

/// Token plus the public view of the account
#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Emails are compared trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

pub struct UserService {
    users: Repository<User>,
    premium: Repository<PremiumUser>,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: Repository::new(state.store.clone()),
            premium: Repository::new(state.store.clone()),
        }
    }

    pub async fn find_one_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self.users.select_one(json!({ "email": normalize_email(email) })).await?)
    }

    /// Active accounts for a set of emails, used to notify invited team members
    pub async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<User>, ApiError> {
        if emails.is_empty() {
            return Ok(vec![]);
        }
        let emails: Vec<String> = emails.iter().map(|e| normalize_email(e)).collect();
        Ok(self
            .users
            .select_any(FilterData::where_(json!({ "email": { "$in": emails }, "status": ACTIVE })))
            .await?)
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, ApiError> {
        Ok(self.users.select_ids(ids).await?)
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<Session, ApiError> {
        let first_name = required(&request.first_name, "firstName", "Please provide firstName")?;
        let last_name = required(&request.last_name, "lastName", "Please provide lastName")?;
        let email = normalize_email(required(&request.email, "email", "Please provide email")?);
        let password = required(&request.password, "password", "Please provide password")?;
        let password2 = required(&request.password2, "password2", "Please confirm your password")?;

        if !looks_like_email(&email) {
            return Err(ApiError::field("email", "Please provide a valid email"));
        }
        if password != password2 {
            return Err(ApiError::field("password2", "Passwords do not match"));
        }
        if self.find_one_by_email(&email).await?.is_some() {
            return Err(ApiError::field("email", "Email already exists"));
        }

        let premium = self.premium.select_one(json!({ "email": email })).await?;
        let hash = hash_password(password).map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Failed to create user")
        })?;

        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password: hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            company: request.company.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            role: Role::User,
            is_festival_manager: request.is_festival_manager.unwrap_or(false),
            is_verified: false,
            login_attempts: 0,
            locked_until: None,
            plan: if premium.is_some() { Plan::Premium } else { Plan::Free },
            last_logged_in: None,
            date: Utc::now(),
            status: ACTIVE,
        };

        match self.users.insert(&user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(ApiError::field("email", "Email already exists")),
            Err(e) => return Err(e.into()),
        }
        if let Some(entry) = premium {
            self.premium.delete(json!({ "_id": entry.id })).await?;
        }

        info!(user = %user.id, plan = ?user.plan, "User registered");
        let token = generate_jwt(&Claims::user(user.id, &user.email))?;
        Ok(Session { token, user: UserProfile::from(&user) })
    }

    /// Wrong email and wrong password answer the same; repeated failures lock the account
    pub async fn login(&self, request: LoginRequest) -> Result<Session, ApiError> {
        let email = normalize_email(required(&request.email, "email", "Please provide email")?);
        let password = required(&request.password, "password", "Please provide password")?;
        let invalid = || ApiError::bad_request("Invalid email or password");

        let user = self
            .users
            .select_one(json!({ "email": email, "status": ACTIVE }))
            .await?
            .ok_or_else(invalid)?;

        let now = Utc::now();
        if let Some(until) = user.locked_until {
            if until > now {
                return Err(ApiError::too_many_requests("Account is temporarily locked. Please try again later"));
            }
        }

        let security = &config::config().security;
        if !verify_password(password, &user.password) {
            let attempts = user.login_attempts + 1;
            if attempts >= security.max_login_attempts {
                let until = now + Duration::minutes(security.lockout_minutes);
                self.users
                    .update_one(
                        json!({ "_id": user.id }),
                        json!({ "loginAttempts": 0, "lockedUntil": timestamp::format(&until) }),
                    )
                    .await?;
                warn!(user = %user.id, "Account locked after repeated failed logins");
                return Err(ApiError::too_many_requests("Account is temporarily locked. Please try again later"));
            }
            self.users
                .update_one(json!({ "_id": user.id }), json!({ "loginAttempts": attempts }))
                .await?;
            return Err(invalid());
        }

        let user = self
            .users
            .update_404(
                json!({ "_id": user.id }),
                json!({ "loginAttempts": 0, "lockedUntil": null, "lastLoggedIn": timestamp::format(&now) }),
                "User",
            )
            .await?;
        let token = generate_jwt(&Claims::user(user.id, &user.email))?;
        Ok(Session { token, user: UserProfile::from(&user) })
    }

    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<UserProfile, ApiError> {
        let mut patch = serde_json::Map::new();
        if let Some(first_name) = update.first_name.as_deref().map(str::trim) {
            if first_name.is_empty() {
                return Err(ApiError::field("firstName", "firstName cannot be empty"));
            }
            patch.insert("firstName".into(), json!(first_name));
        }
        if let Some(last_name) = update.last_name.as_deref().map(str::trim) {
            if last_name.is_empty() {
                return Err(ApiError::field("lastName", "lastName cannot be empty"));
            }
            patch.insert("lastName".into(), json!(last_name));
        }
        if let Some(company) = update.company {
            patch.insert("company".into(), json!(company.trim()));
        }

        let user = self
            .users
            .update_404(json!({ "_id": user_id, "status": ACTIVE }), patch.into(), "User")
            .await?;
        Ok(UserProfile::from(&user))
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        Ok(generate_jwt(&Claims::user(user.id, &user.email))?)
    }

    /// Pre-registers an email for the premium plan; it is consumed at signup
    pub async fn create_premium_user(&self, email: &str, created_by: Option<Uuid>) -> Result<PremiumUser, ApiError> {
        let email = normalize_email(email);
        if !looks_like_email(&email) {
            return Err(ApiError::field("email", "Please provide a valid email"));
        }
        let exists = || ApiError::bad_request("User already exists. Please check with the admin");
        if self.find_one_by_email(&email).await?.is_some() || self.find_premium_user(&email).await?.is_some() {
            return Err(exists());
        }

        let entry = PremiumUser {
            id: Uuid::new_v4(),
            email,
            created_by,
            created_at: Utc::now(),
        };
        match self.premium.insert(&entry).await {
            Ok(()) => Ok(entry),
            Err(StoreError::Duplicate(_)) => Err(exists()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_premium_user(&self, email: &str) -> Result<Option<PremiumUser>, ApiError> {
        Ok(self.premium.select_one(json!({ "email": normalize_email(email) })).await?)
    }

    pub async fn list_premium_users(&self) -> Result<Vec<PremiumUser>, ApiError> {
        Ok(self.premium.select_any(FilterData::default().order("email asc")).await?)
    }

    pub async fn delete_premium_user(&self, email: &str) -> Result<u64, ApiError> {
        Ok(self.premium.delete(json!({ "email": normalize_email(email) })).await?)
    }
}
