use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{Comment, CommentType, User, UserSummary};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{optional_id, required};
use crate::services::users::UserService;
use crate::state::AppState;
use crate::types::ACTIVE;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub app_id: Option<String>,
    pub screen_id: Option<String>,
    pub comment: Option<String>,
    #[serde(rename = "type")]
    pub comment_type: Option<String>,
    pub parent_id: Option<String>,
}

/// Comment with its author and nested replies
#[derive(Debug, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Option<UserSummary>,
    pub replies: Vec<CommentNode>,
}

pub fn parse_comment_type(raw: Option<&str>) -> Result<CommentType, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::field("type", "Please provide type"))?;
    raw.parse().map_err(|_| ApiError::field("type", "Invalid comment type"))
}

/// Nests replies under their parents, keeping the input order at every level.
///
/// Replies whose parent is not in the list are shown at the top level.
pub fn thread(comments: Vec<Comment>, authors: &HashMap<Uuid, UserSummary>) -> Vec<CommentNode> {
    let ids: std::collections::HashSet<Uuid> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();

    for comment in comments {
        match comment.parent_id {
            Some(parent) if ids.contains(&parent) && parent != comment.id => {
                children.entry(parent).or_default().push(comment)
            }
            _ => roots.push(comment),
        }
    }

    fn build(comment: Comment, children: &mut HashMap<Uuid, Vec<Comment>>, authors: &HashMap<Uuid, UserSummary>) -> CommentNode {
        let replies = children
            .remove(&comment.id)
            .unwrap_or_default()
            .into_iter()
            .map(|reply| build(reply, children, authors))
            .collect();
        CommentNode {
            author: authors.get(&comment.created_by).cloned(),
            comment,
            replies,
        }
    }

    roots
        .into_iter()
        .map(|root| build(root, &mut children, authors))
        .collect()
}

pub struct CommentService {
    comments: Repository<Comment>,
    users: UserService,
}

impl CommentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            comments: Repository::new(state.store.clone()),
            users: UserService::new(state),
        }
    }

    pub async fn create(&self, user: &User, request: CreateComment) -> Result<Comment, ApiError> {
        let app_id = required(&request.app_id, "appId", "Please provide appId")?.to_string();
        let screen_id = required(&request.screen_id, "screenId", "Please provide screenId")?.to_string();
        let text = required(&request.comment, "comment", "Please provide comment")?.to_string();
        let comment_type = parse_comment_type(request.comment_type.as_deref())?;
        let parent_id = optional_id(&request.parent_id, "parentId")?;

        if let Some(parent_id) = parent_id {
            let parent = self
                .comments
                .count(json!({
                    "_id": parent_id,
                    "appId": app_id,
                    "screenId": screen_id,
                    "type": comment_type.as_str(),
                    "status": ACTIVE,
                }))
                .await?;
            if parent == 0 {
                return Err(ApiError::not_found("Parent comment not found"));
            }
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            app_id,
            screen_id,
            comment: text,
            comment_type,
            parent_id,
            created_by: user.id,
            status: ACTIVE,
            created_at: Utc::now(),
        };
        self.comments.insert(&comment).await?;
        Ok(comment)
    }

    /// Threaded comments of one screen, oldest first
    pub async fn list(&self, screen_id: &str, comment_type: CommentType, app_id: &str) -> Result<Vec<CommentNode>, ApiError> {
        let comments = self
            .comments
            .select_any(
                FilterData::where_(json!({
                    "screenId": screen_id,
                    "appId": app_id,
                    "type": comment_type.as_str(),
                    "status": ACTIVE,
                }))
                .order("createdAt asc"),
            )
            .await?;

        let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.created_by).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors: HashMap<Uuid, UserSummary> = self
            .users
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect();

        Ok(thread(comments, &authors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: Uuid, parent: Option<Uuid>, author: Uuid) -> Comment {
        Comment {
            id,
            app_id: "app".into(),
            screen_id: "screen".into(),
            comment: "note".into(),
            comment_type: CommentType::Props,
            parent_id: parent,
            created_by: author,
            status: ACTIVE,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replies_nest_under_parents() {
        let author = Uuid::new_v4();
        let (root, reply, nested, orphan) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let comments = vec![
            comment(root, None, author),
            comment(reply, Some(root), author),
            comment(nested, Some(reply), author),
            comment(orphan, Some(Uuid::new_v4()), author),
        ];
        let mut authors = HashMap::new();
        authors.insert(author, UserSummary { id: author, first_name: "Ada".into(), last_name: "L".into(), email: "a@x.io".into() });

        let tree = thread(comments, &authors);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].comment.id, root);
        assert_eq!(tree[0].replies[0].comment.id, reply);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, nested);
        assert_eq!(tree[1].comment.id, orphan);
        assert_eq!(tree[0].author.as_ref().map(|a| a.first_name.as_str()), Some("Ada"));
    }

    #[test]
    fn comment_types_are_checked() {
        assert_eq!(parse_comment_type(Some("epk")).unwrap(), CommentType::Epk);
        assert_eq!(parse_comment_type(Some("poster")).unwrap_err().message(), "Invalid comment type");
        assert_eq!(parse_comment_type(None).unwrap_err().message(), "Please provide type");
    }
}
