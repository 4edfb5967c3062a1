use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::config;
use crate::database::models::{NotificationType, Prop, PropMember, User};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::mail::{templates, Mailer};
use crate::middleware::{required, required_id};
use crate::services::notifications::NotificationService;
use crate::services::projects::ProjectService;
use crate::services::signers::{removal_emails, validate_additions, MemberInput, RemoveInput};
use crate::services::users::{normalize_email, UserService};
use crate::state::AppState;
use crate::types::{PageQuery, Paged, ACTIVE, REMOVED};

/// Fields a props listing may be sorted by
pub const SORTABLE_FIELDS: &[&str] = &["item", "cast", "sceneNumber", "sceneHeading", "shootDate", "createdAt"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropInput {
    pub props_id: Option<String>,
    pub project_id: Option<String>,
    pub item: Option<String>,
    pub image: Option<Vec<String>>,
    pub scene_number: Option<String>,
    pub scene_heading: Option<String>,
    pub shoot_date: Option<String>,
    pub notes: Option<String>,
    pub cast: Option<String>,
    pub approved: Option<bool>,
    pub acquired: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PropsQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    #[serde(rename = "type")]
    pub direction: Option<String>,
}

impl PropsQuery {
    /// `"<field> <asc|desc>"`; unknown fields sort by `createdAt`, direction defaults to `desc`
    pub fn order(&self) -> String {
        let field = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|f| SORTABLE_FIELDS.contains(f))
            .unwrap_or("createdAt");
        let direction = match self.direction.as_deref().map(|d| d.trim().to_ascii_lowercase()) {
            Some(d) if d == "asc" => "asc",
            _ => "desc",
        };
        format!("{} {}", field, direction)
    }

    pub fn page(&self) -> PageQuery {
        PageQuery { page: self.page.clone(), limit: self.limit.clone() }
    }
}

/// Patch for the fields a prop update may change
fn prop_patch(input: &PropInput) -> Result<Value, ApiError> {
    let mut patch = serde_json::Map::new();
    if let Some(item) = input.item.as_deref().map(str::trim) {
        if item.is_empty() {
            return Err(ApiError::field("item", "Please provide item"));
        }
        patch.insert("item".into(), json!(item));
    }
    if let Some(image) = &input.image {
        patch.insert("image".into(), json!(image));
    }
    for (key, value) in [
        ("sceneNumber", &input.scene_number),
        ("sceneHeading", &input.scene_heading),
        ("shootDate", &input.shoot_date),
        ("notes", &input.notes),
        ("cast", &input.cast),
    ] {
        if let Some(value) = value {
            patch.insert(key.into(), json!(value));
        }
    }
    if let Some(approved) = input.approved {
        patch.insert("approved".into(), json!(approved));
    }
    if let Some(acquired) = input.acquired {
        patch.insert("acquired".into(), json!(acquired));
    }
    Ok(patch.into())
}

pub struct PropService {
    props: Repository<Prop>,
    members: Repository<PropMember>,
    projects: ProjectService,
    users: UserService,
    notifications: NotificationService,
    mailer: Arc<dyn Mailer>,
}

impl PropService {
    pub fn new(state: &AppState) -> Self {
        Self {
            props: Repository::new(state.store.clone()),
            members: Repository::new(state.store.clone()),
            projects: ProjectService::new(state),
            users: UserService::new(state),
            notifications: NotificationService::new(state),
            mailer: state.mailer.clone(),
        }
    }

    pub async fn create(&self, user_id: Uuid, input: PropInput) -> Result<Prop, ApiError> {
        let item = required(&input.item, "item", "Please provide item")?.to_string();
        let project_id = required_id(&input.project_id, "projectId", "Please provide projectId")?;
        self.projects.require_project(user_id, project_id).await?;

        let prop = Prop {
            id: Uuid::new_v4(),
            item,
            image: input.image.unwrap_or_default(),
            scene_number: input.scene_number,
            scene_heading: input.scene_heading,
            shoot_date: input.shoot_date,
            notes: input.notes,
            cast: input.cast,
            approved: input.approved.unwrap_or(false),
            acquired: input.acquired.unwrap_or(false),
            project_id,
            user_id,
            status: ACTIVE,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.props.insert(&prop).await?;
        Ok(prop)
    }

    /// Active prop the caller owns or was added to; also reports ownership
    pub async fn check_access(&self, user: &User, prop_id: Uuid) -> Result<(Prop, bool), ApiError> {
        let prop = self
            .props
            .select_404(json!({ "_id": prop_id, "status": ACTIVE }), "Prop")
            .await?;
        if prop.user_id == user.id {
            return Ok((prop, true));
        }
        let member = self
            .members
            .count(json!({ "propId": prop.id, "email": normalize_email(&user.email), "status": ACTIVE }))
            .await?;
        if member > 0 {
            Ok((prop, false))
        } else {
            Err(ApiError::not_found("Prop not found"))
        }
    }

    async fn require_owner(&self, user: &User, prop_id: Uuid) -> Result<Prop, ApiError> {
        match self.check_access(user, prop_id).await? {
            (prop, true) => Ok(prop),
            (_, false) => Err(ApiError::forbidden("Only the owner can change this prop")),
        }
    }

    pub async fn update(&self, user: &User, prop_id: Uuid, input: &PropInput) -> Result<Prop, ApiError> {
        let (prop, _) = self.check_access(user, prop_id).await?;
        let patch = prop_patch(input)?;
        Ok(self.props.update_404(json!({ "_id": prop.id }), patch, "Prop").await?)
    }

    /// Owned props plus shared ones, sorted and paginated
    pub async fn list(&self, user: &User, query: &PropsQuery) -> Result<Paged<Prop>, ApiError> {
        let shared: Vec<Uuid> = self
            .members
            .select_any(FilterData::where_(json!({ "email": normalize_email(&user.email), "status": ACTIVE })))
            .await?
            .into_iter()
            .map(|m| m.prop_id)
            .collect();

        let mut where_clause = json!({
            "status": ACTIVE,
            "$or": [{ "userId": user.id }, { "_id": { "$in": shared } }],
        });
        if let Some(project_id) = crate::middleware::optional_id(&query.project_id, "projectId")? {
            where_clause["projectId"] = json!(project_id);
        }

        let page_query = query.page();
        let (page, limit) = page_query.resolve();
        let (_, offset) = page_query.offset();
        let items = self
            .props
            .select_any(FilterData::where_(where_clause.clone()).order(query.order()).limit(limit, offset))
            .await?;
        let total = self.props.count(where_clause).await?;
        Ok(Paged { items, total, page, limit })
    }

    pub async fn remove(&self, user: &User, prop_id: Uuid) -> Result<Prop, ApiError> {
        let prop = self.require_owner(user, prop_id).await?;
        Ok(self
            .props
            .update_404(json!({ "_id": prop.id }), json!({ "status": REMOVED }), "Prop")
            .await?)
    }

    pub async fn active_members(&self, prop_id: Uuid) -> Result<Vec<PropMember>, ApiError> {
        Ok(self
            .members
            .select_any(FilterData::where_(json!({ "propId": prop_id, "status": ACTIVE })))
            .await?)
    }

    pub async fn members(&self, user: &User, prop_id: Uuid) -> Result<Vec<PropMember>, ApiError> {
        self.check_access(user, prop_id).await?;
        self.active_members(prop_id).await
    }

    /// Adds and removes members; new members are emailed and, when registered, notified
    pub async fn invite(
        &self,
        user: &User,
        prop_id: Uuid,
        additions: &[MemberInput],
        removals: &[RemoveInput],
    ) -> Result<Vec<PropMember>, ApiError> {
        let prop = self.require_owner(user, prop_id).await?;

        let removed = removal_emails(removals);
        let existing: HashSet<String> = self
            .active_members(prop.id)
            .await?
            .into_iter()
            .map(|m| m.email)
            .filter(|email| !removed.contains(email))
            .collect();
        let additions = validate_additions(&user.email, additions, &existing, "props", "You can't add yourself as a member")?;

        if !removed.is_empty() {
            self.members
                .update_many(
                    json!({ "propId": prop.id, "email": { "$in": removed }, "status": ACTIVE }),
                    json!({ "status": REMOVED }),
                )
                .await?;
        }

        let now = Utc::now();
        let records: Vec<PropMember> = additions
            .into_iter()
            .map(|m| PropMember {
                id: Uuid::new_v4(),
                prop_id: prop.id,
                name: m.name,
                email: m.email,
                created_by: user.id,
                status: ACTIVE,
                created_at: now,
            })
            .collect();
        self.members.insert_many(&records).await?;

        let link = format!("{}/app/props/{}", config::config().server.frontend_url.trim_end_matches('/'), prop.project_id);
        let sender_name = format!("{} {}", user.first_name, user.last_name);
        for member in &records {
            let mail = templates::props_invitation(&member.email, &member.name, sender_name.trim(), &prop.item, &link);
            if let Err(e) = self.mailer.send(mail).await {
                warn!(member = %member.id, error = %e, "Failed to send props invitation");
            }
        }

        let emails: Vec<String> = records.iter().map(|m| m.email.clone()).collect();
        for registered in self.users.find_by_emails(&emails).await? {
            self.notifications
                .notify_quietly(
                    registered.id,
                    NotificationType::Props,
                    format!("{} shared the prop {} with you", user.first_name, prop.item),
                    Some(format!("/app/props/{}", prop.project_id)),
                )
                .await;
        }

        self.active_members(prop.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sort: Option<&str>, direction: Option<&str>) -> PropsQuery {
        PropsQuery {
            sort: sort.map(str::to_string),
            direction: direction.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn sort_is_allow_listed() {
        assert_eq!(query(None, None).order(), "createdAt desc");
        assert_eq!(query(Some("item"), Some("asc")).order(), "item asc");
        assert_eq!(query(Some("sceneNumber"), Some("DESC")).order(), "sceneNumber desc");
        assert_eq!(query(Some("password"), Some("asc")).order(), "createdAt asc");
        assert_eq!(query(Some("item"), Some("sideways")).order(), "item desc");
    }

    #[test]
    fn patch_only_carries_given_fields() {
        let input = PropInput {
            notes: Some("Hero prop".into()),
            approved: Some(true),
            ..Default::default()
        };
        let patch = prop_patch(&input).unwrap();
        assert_eq!(patch, json!({ "notes": "Hero prop", "approved": true }));

        let blank = PropInput { item: Some("  ".into()), ..Default::default() };
        assert!(prop_patch(&blank).is_err());
    }
}
