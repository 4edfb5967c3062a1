use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::database::models::{Notification, NotificationType};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::state::AppState;
use crate::types::{PageQuery, Paged};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    #[serde(flatten)]
    pub page: Paged<Notification>,
    pub unseen: i64,
}

pub struct NotificationService {
    notifications: Repository<Notification>,
}

impl NotificationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            notifications: Repository::new(state.store.clone()),
        }
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        message: impl Into<String>,
        link: Option<String>,
    ) -> Result<Notification, ApiError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            notification_type,
            message: message.into(),
            link,
            is_seen: false,
            is_deleted: false,
            created_at: Utc::now(),
        };
        self.notifications.insert(&notification).await?;
        Ok(notification)
    }

    /// `notify` for side effects of another action; failures are logged, not returned
    pub async fn notify_quietly(&self, user_id: Uuid, notification_type: NotificationType, message: impl Into<String>, link: Option<String>) {
        if let Err(e) = self.notify(user_id, notification_type, message, link).await {
            warn!(%user_id, error = %e, "Failed to record notification");
        }
    }

    /// Newest first, deleted ones hidden
    pub async fn list(&self, user_id: Uuid, query: &PageQuery) -> Result<NotificationPage, ApiError> {
        let (page, limit) = query.resolve();
        let (_, offset) = query.offset();
        let visible = json!({ "userId": user_id, "isDeleted": false });

        let items = self
            .notifications
            .select_any(FilterData::where_(visible.clone()).order("createdAt desc").limit(limit, offset))
            .await?;
        let total = self.notifications.count(visible).await?;
        let unseen = self.unseen_count(user_id).await?;

        Ok(NotificationPage {
            page: Paged { items, total, page, limit },
            unseen,
        })
    }

    pub async fn mark_all_seen(&self, user_id: Uuid) -> Result<u64, ApiError> {
        Ok(self
            .notifications
            .update_many(json!({ "userId": user_id, "isSeen": false }), json!({ "isSeen": true }))
            .await?)
    }

    pub async fn unseen_count(&self, user_id: Uuid) -> Result<i64, ApiError> {
        Ok(self
            .notifications
            .count(json!({ "userId": user_id, "isSeen": false, "isDeleted": false }))
            .await?)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Notification, ApiError> {
        Ok(self
            .notifications
            .update_404(
                json!({ "_id": id, "userId": user_id, "isDeleted": false }),
                json!({ "isDeleted": true }),
                "Notification",
            )
            .await?)
    }
}
