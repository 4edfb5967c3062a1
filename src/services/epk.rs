use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config;
use crate::database::models::{EmailData, Epk, EpkMember, EpkTemplate, NotificationType, User};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::mail::{templates, Mailer};
use crate::middleware::required;
use crate::services::notifications::NotificationService;
use crate::services::projects::ProjectService;
use crate::services::signers::{removal_emails, validate_additions, EmailReport, MemberInput, RemoveInput};
use crate::services::users::{normalize_email, UserService};
use crate::state::AppState;
use crate::storage::MediaStorage;
use crate::types::ACTIVE;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEpk {
    pub epk_name: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEpk {
    pub epk_name: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpkOverview {
    #[serde(flatten)]
    pub epk: Epk,
    pub members: Vec<EpkMember>,
    pub template_count: i64,
}

/// How the caller relates to an EPK they can see
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EpkAccess {
    Owner,
    Member,
}

fn positive(value: Option<f64>, field: &str) -> Result<f64, ApiError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(_) => Err(ApiError::field(field, format!("{} must be a positive number", field))),
        None => Err(ApiError::field(field, format!("Please provide {}", field))),
    }
}

pub struct EpkService {
    epks: Repository<Epk>,
    members: Repository<EpkMember>,
    templates: Repository<EpkTemplate>,
    projects: ProjectService,
    users: UserService,
    notifications: NotificationService,
    mailer: Arc<dyn Mailer>,
    storage: MediaStorage,
}

impl EpkService {
    pub fn new(state: &AppState) -> Self {
        Self {
            epks: Repository::new(state.store.clone()),
            members: Repository::new(state.store.clone()),
            templates: Repository::new(state.store.clone()),
            projects: ProjectService::new(state),
            users: UserService::new(state),
            notifications: NotificationService::new(state),
            mailer: state.mailer.clone(),
            storage: state.storage.clone(),
        }
    }

    pub async fn create_epk(&self, user_id: Uuid, request: CreateEpk) -> Result<Epk, ApiError> {
        let epk_name = required(&request.epk_name, "epkName", "Please provide epkName")?.to_string();
        let width = positive(request.width, "width")?;
        let height = positive(request.height, "height")?;
        let project_id = crate::middleware::required_id(&request.project_id, "projectId", "Please provide projectId")?;
        self.projects.require_project(user_id, project_id).await?;

        let epk = Epk {
            id: Uuid::new_v4(),
            epk_name,
            width,
            height,
            project_id,
            user_id,
            status: ACTIVE,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.epks.insert(&epk).await?;
        info!(epk = %epk.id, "EPK created");
        Ok(epk)
    }

    pub async fn find_one_epk(&self, where_clause: Value) -> Result<Option<Epk>, ApiError> {
        Ok(self.epks.select_one(where_clause).await?)
    }

    /// Owned EPKs plus those the caller was added to, newest first
    pub async fn get_all(&self, user: &User) -> Result<Vec<EpkOverview>, ApiError> {
        let member_of: Vec<Uuid> = self
            .members
            .select_any(FilterData::where_(json!({ "email": normalize_email(&user.email), "status": ACTIVE })))
            .await?
            .into_iter()
            .map(|m| m.epk_id)
            .collect();

        let epks = self
            .epks
            .select_any(
                FilterData::where_(json!({
                    "status": ACTIVE,
                    "$or": [{ "userId": user.id }, { "_id": { "$in": member_of } }],
                }))
                .order("createdAt desc"),
            )
            .await?;

        let mut overviews = Vec::with_capacity(epks.len());
        for epk in epks {
            overviews.push(self.overview(epk).await?);
        }
        Ok(overviews)
    }

    /// Members and template count for one EPK
    pub async fn overview(&self, epk: Epk) -> Result<EpkOverview, ApiError> {
        let members = self.active_members(epk.id).await?;
        let template_count = self.templates.count(json!({ "epkId": epk.id, "status": ACTIVE })).await?;
        Ok(EpkOverview { epk, members, template_count })
    }

    /// Active EPK visible to the caller, or 404
    pub async fn check_access(&self, user: &User, epk_id: Uuid) -> Result<(Epk, EpkAccess), ApiError> {
        let epk = self
            .find_one_epk(json!({ "_id": epk_id, "status": ACTIVE }))
            .await?
            .ok_or_else(|| ApiError::not_found("Epk not found"))?;
        if epk.user_id == user.id {
            return Ok((epk, EpkAccess::Owner));
        }
        if self.check_member(epk_id, &user.email).await?.is_some() {
            return Ok((epk, EpkAccess::Member));
        }
        Err(ApiError::not_found("Epk not found"))
    }

    /// Owner-only actions; members get 403
    pub async fn require_owner(&self, user: &User, epk_id: Uuid) -> Result<Epk, ApiError> {
        match self.check_access(user, epk_id).await? {
            (epk, EpkAccess::Owner) => Ok(epk),
            (_, EpkAccess::Member) => Err(ApiError::forbidden("Only the owner can change this Epk")),
        }
    }

    pub async fn find_one_and_update(&self, where_clause: Value, patch: Value) -> Result<Epk, ApiError> {
        Ok(self.epks.update_404(where_clause, patch, "Epk").await?)
    }

    pub async fn update_epk(&self, user: &User, epk_id: Uuid, update: UpdateEpk) -> Result<Epk, ApiError> {
        let epk = self.require_owner(user, epk_id).await?;

        let mut patch = serde_json::Map::new();
        if let Some(name) = update.epk_name.as_deref().map(str::trim) {
            if name.is_empty() {
                return Err(ApiError::field("epkName", "epkName cannot be empty"));
            }
            patch.insert("epkName".into(), json!(name));
        }
        if update.width.is_some() {
            patch.insert("width".into(), json!(positive(update.width, "width")?));
        }
        if update.height.is_some() {
            patch.insert("height".into(), json!(positive(update.height, "height")?));
        }

        self.find_one_and_update(json!({ "_id": epk.id }), patch.into()).await
    }

    /// Removes the EPK with its members, templates and preview images
    pub async fn delete_epk(&self, user: &User, epk_id: Uuid) -> Result<u64, ApiError> {
        let epk = self.require_owner(user, epk_id).await?;

        let templates = self
            .templates
            .select_any(FilterData::where_(json!({ "epkId": epk.id })))
            .await?;
        for template in &templates {
            self.storage.delete_quietly(&template.preview).await;
        }
        self.templates.delete(json!({ "epkId": epk.id })).await?;
        self.delete_members(json!({ "epkId": epk.id })).await?;
        let deleted = self.epks.delete(json!({ "_id": epk.id })).await?;
        info!(epk = %epk.id, templates = templates.len(), "EPK deleted");
        Ok(deleted)
    }

    pub async fn active_members(&self, epk_id: Uuid) -> Result<Vec<EpkMember>, ApiError> {
        Ok(self
            .members
            .select_any(FilterData::where_(json!({ "epkId": epk_id, "status": ACTIVE })))
            .await?)
    }

    pub async fn members(&self, user: &User, epk_id: Uuid) -> Result<Vec<EpkMember>, ApiError> {
        self.check_access(user, epk_id).await?;
        self.active_members(epk_id).await
    }

    pub async fn check_member(&self, epk_id: Uuid, email: &str) -> Result<Option<EpkMember>, ApiError> {
        Ok(self
            .members
            .select_one(json!({ "epkId": epk_id, "email": normalize_email(email), "status": ACTIVE }))
            .await?)
    }

    pub async fn create_members(&self, members: &[EpkMember]) -> Result<(), ApiError> {
        Ok(self.members.insert_many(members).await?)
    }

    pub async fn delete_members(&self, where_clause: Value) -> Result<u64, ApiError> {
        Ok(self.members.delete(where_clause).await?)
    }

    pub async fn update_member(&self, member_id: Uuid, patch: Value) -> Result<EpkMember, ApiError> {
        Ok(self.members.update_404(json!({ "_id": member_id }), patch, "Member").await?)
    }

    /// Adds and removes team members; added users with an account are notified
    pub async fn update_team(
        &self,
        user: &User,
        epk_id: Uuid,
        additions: &[MemberInput],
        removals: &[RemoveInput],
    ) -> Result<Vec<EpkMember>, ApiError> {
        let epk = self.require_owner(user, epk_id).await?;

        let removed = removal_emails(removals);
        let existing: HashSet<String> = self
            .active_members(epk.id)
            .await?
            .into_iter()
            .map(|m| m.email)
            .filter(|email| !removed.contains(email))
            .collect();
        let additions = validate_additions(&user.email, additions, &existing, "epk", "You can't add yourself as a member")?;

        if !removed.is_empty() {
            self.delete_members(json!({ "epkId": epk.id, "email": { "$in": removed } })).await?;
        }

        let now = Utc::now();
        let records: Vec<EpkMember> = additions
            .iter()
            .map(|m| EpkMember {
                id: Uuid::new_v4(),
                epk_id: epk.id,
                name: m.name.clone(),
                email: m.email.clone(),
                created_by: user.id,
                status: ACTIVE,
                emailsent: false,
                email_data: None,
                created_at: now,
                updated_at: None,
            })
            .collect();
        self.create_members(&records).await?;

        let emails: Vec<String> = records.iter().map(|m| m.email.clone()).collect();
        for registered in self.users.find_by_emails(&emails).await? {
            self.notifications
                .notify_quietly(
                    registered.id,
                    NotificationType::Epk,
                    format!("{} added you to the EPK {}", user.first_name, epk.epk_name),
                    Some(format!("/app/epk/{}", epk.id)),
                )
                .await;
        }

        self.active_members(epk.id).await
    }

    /// Emails members not yet invited
    pub async fn send_invitations(
        &self,
        user: &User,
        epk_id: Uuid,
        subject: Option<&str>,
        message: Option<&str>,
    ) -> Result<EmailReport, ApiError> {
        let epk = self.require_owner(user, epk_id).await?;
        let link = format!("{}/app/epk/{}", config::config().server.frontend_url.trim_end_matches('/'), epk.id);
        let subject = subject.map(str::trim).filter(|s| !s.is_empty());
        let sender_name = format!("{} {}", user.first_name, user.last_name);

        let mut report = EmailReport::default();
        for member in self.active_members(epk.id).await? {
            if member.emailsent {
                continue;
            }
            let mail = templates::epk_invitation(&member.email, &member.name, sender_name.trim(), &epk.epk_name, subject, message, &link);
            let sent_subject = mail.subject.clone();

            if let Err(e) = self.mailer.send(mail).await {
                warn!(member = %member.id, error = %e, "Failed to send EPK invitation");
                report.failed.push(member.email);
                continue;
            }

            let email_data = EmailData {
                subject: sent_subject,
                message: message.map(str::to_string),
                expires_at: None,
                sent_at: Utc::now(),
            };
            self.update_member(member.id, json!({ "emailsent": true, "emailData": email_data })).await?;
            report.sent.push(member.email);
        }
        Ok(report)
    }
}
