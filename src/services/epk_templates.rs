use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{EpkTemplate, User, UserSummary};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{optional_id, required_id};
use crate::services::epk::EpkService;
use crate::services::users::UserService;
use crate::state::AppState;
use crate::storage::{decode_data_url, extension_for, MediaStorage};
use crate::types::ACTIVE;

pub const DEFAULT_TEMPLATE_NAME: &str = "Untitled template";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplate {
    pub epk_id: Option<String>,
    pub template_id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub objects: Value,
    #[serde(default)]
    pub background: Value,
    #[serde(default)]
    pub frame: Value,
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpkSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub epk_name: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    #[serde(flatten)]
    pub template: EpkTemplate,
    pub preview_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<EpkSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserSummary>,
}

pub struct EpkTemplateService {
    templates: Repository<EpkTemplate>,
    epks: EpkService,
    users: UserService,
    storage: MediaStorage,
}

impl EpkTemplateService {
    pub fn new(state: &AppState) -> Self {
        Self {
            templates: Repository::new(state.store.clone()),
            epks: EpkService::new(state),
            users: UserService::new(state),
            storage: state.storage.clone(),
        }
    }

    /// Creates a template, or replaces the one named by `templateId`.
    ///
    /// Returns the saved template and whether it was newly created.
    pub async fn save(&self, user: &User, request: SaveTemplate) -> Result<(TemplateView, bool), ApiError> {
        let epk_id = required_id(&request.epk_id, "epkId", "Please provide epkId")?;
        let template_id = optional_id(&request.template_id, "templateId")?;
        let preview = request
            .preview
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::field("preview", "Please provide preview"))?;
        let epk = self.epks.require_owner(user, epk_id).await?;
        let decoded = decode_data_url(preview)?;

        let existing = match template_id {
            Some(id) => self
                .templates
                .select_one(json!({ "_id": id, "epkId": epk.id, "userId": user.id, "status": ACTIVE }))
                .await?,
            None => None,
        };

        let key = MediaStorage::object_key("epk-previews", user.id, &format!("preview.{}", extension_for(&decoded.mime_type)));
        self.storage.put(&key, decoded.bytes).await?;
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_TEMPLATE_NAME)
            .to_string();

        let (template, created) = match existing {
            Some(existing) => {
                self.storage.delete_quietly(&existing.preview).await;
                let template = self
                    .templates
                    .update_404(
                        json!({ "_id": existing.id }),
                        json!({
                            "name": name,
                            "objects": request.objects,
                            "background": request.background,
                            "frame": request.frame,
                            "preview": key,
                        }),
                        "Template",
                    )
                    .await?;
                (template, false)
            }
            None => {
                let template = EpkTemplate {
                    id: Uuid::new_v4(),
                    epk_id: epk.id,
                    user_id: user.id,
                    name,
                    objects: request.objects,
                    background: request.background,
                    frame: request.frame,
                    preview: key,
                    status: ACTIVE,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                if let Err(e) = self.templates.insert(&template).await {
                    self.storage.delete_quietly(&template.preview).await;
                    return Err(e.into());
                }
                (template, true)
            }
        };

        let preview_url = self.storage.url(&template.preview).await;
        Ok((TemplateView { template, preview_url, epk: None, owner: None }, created))
    }

    /// Templates of an EPK the caller owns or belongs to
    pub async fn list(&self, user: &User, epk_id: Uuid) -> Result<Vec<TemplateView>, ApiError> {
        let (epk, _) = self.epks.check_access(user, epk_id).await?;
        let templates = self
            .templates
            .select_any(FilterData::where_(json!({ "epkId": epk.id, "status": ACTIVE })).order("createdAt asc"))
            .await?;

        let owner_ids: Vec<Uuid> = templates.iter().map(|t| t.user_id).collect();
        let owners = self.users.find_by_ids(&owner_ids).await?;
        let summary = EpkSummary {
            id: epk.id,
            epk_name: epk.epk_name.clone(),
            width: epk.width,
            height: epk.height,
        };

        let mut views = Vec::with_capacity(templates.len());
        for template in templates {
            let owner = owners.iter().find(|u| u.id == template.user_id).map(UserSummary::from);
            let preview_url = self.storage.url(&template.preview).await;
            views.push(TemplateView {
                template,
                preview_url,
                epk: Some(summary.clone()),
                owner,
            });
        }
        Ok(views)
    }

    pub async fn delete(&self, user: &User, template_id: Uuid) -> Result<(), ApiError> {
        let template = self
            .templates
            .select_404(json!({ "_id": template_id, "userId": user.id, "status": ACTIVE }), "Template")
            .await?;
        self.storage.delete_quietly(&template.preview).await;
        self.templates.delete(json!({ "_id": template.id })).await?;
        Ok(())
    }
}
