use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::database::models::Project;
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::state::AppState;
use crate::types::{ACTIVE, REMOVED};

pub struct ProjectService {
    projects: Repository<Project>,
}

impl ProjectService {
    pub fn new(state: &AppState) -> Self {
        Self {
            projects: Repository::new(state.store.clone()),
        }
    }

    pub async fn create_project(&self, user_id: Uuid, name: &str) -> Result<Project, ApiError> {
        let name = name.trim();
        if self.find_project_by_name(user_id, name).await?.is_some() {
            return Err(ApiError::field("projName", "Project with this name already exists"));
        }

        let project = Project {
            id: Uuid::new_v4(),
            proj_name: name.to_string(),
            created_by: user_id,
            status: ACTIVE,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.projects.insert(&project).await?;
        Ok(project)
    }

    /// Active projects of a user, newest first
    pub async fn find_all_by_owner(&self, user_id: Uuid) -> Result<Vec<Project>, ApiError> {
        Ok(self
            .projects
            .select_any(FilterData::where_(json!({ "createdBy": user_id, "status": ACTIVE })).order("createdAt desc"))
            .await?)
    }

    pub async fn find_project_by_name(&self, user_id: Uuid, name: &str) -> Result<Option<Project>, ApiError> {
        Ok(self
            .projects
            .select_one(json!({ "createdBy": user_id, "projName": name.trim(), "status": ACTIVE }))
            .await?)
    }

    /// Owned, active project or `None`
    pub async fn get_project(&self, user_id: Uuid, id: Uuid) -> Result<Option<Project>, ApiError> {
        Ok(self
            .projects
            .select_one(json!({ "_id": id, "createdBy": user_id, "status": ACTIVE }))
            .await?)
    }

    pub async fn get_project_404(&self, user_id: Uuid, id: Uuid) -> Result<Project, ApiError> {
        self.get_project(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    /// Owned project referenced from another record's body; a miss is a 400
    pub async fn require_project(&self, user_id: Uuid, id: Uuid) -> Result<Project, ApiError> {
        self.get_project(user_id, id)
            .await?
            .ok_or_else(|| ApiError::field("projectId", "Project does not exist"))
    }

    pub async fn rename_project(&self, user_id: Uuid, id: Uuid, name: &str) -> Result<Project, ApiError> {
        let project = self.get_project_404(user_id, id).await?;
        if let Some(existing) = self.find_project_by_name(user_id, name).await? {
            if existing.id != project.id {
                return Err(ApiError::field("projName", "Project with this name already exists"));
            }
        }
        Ok(self
            .projects
            .update_404(json!({ "_id": project.id }), json!({ "projName": name.trim() }), "Project")
            .await?)
    }

    pub async fn remove_project(&self, user_id: Uuid, id: Uuid) -> Result<Project, ApiError> {
        Ok(self
            .projects
            .update_404(
                json!({ "_id": id, "createdBy": user_id, "status": ACTIVE }),
                json!({ "status": REMOVED }),
                "Project",
            )
            .await?)
    }
}
