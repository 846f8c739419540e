use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Comment, Tag, Upload, User};
use crate::api::{ApiRequest, FormValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    #[serde(other)]
    Unknown,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Unknown => "unknown",
        }
    }
}

/// A post as it appears in lists, feeds and search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub author: User,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub status: PostStatus,
    #[serde(default)]
    pub views_count: u64,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// First `max_chars` characters of the content, with an ellipsis when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let trimmed = self.content.trim();
        if trimmed.chars().count() <= max_chars {
            trimmed.to_string()
        } else {
            let cut: String = trimmed.chars().take(max_chars).collect();
            format!("{}...", cut.trim_end())
        }
    }
}

/// A single post with its top-level comment threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Fields for creating or replacing a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image: Option<Upload>,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub status: Option<PostStatus>,
}

impl PostDraft {
    pub(crate) fn to_form(&self) -> Vec<(String, FormValue)> {
        let mut fields = vec![
            ("title".to_string(), FormValue::Text(self.title.clone())),
            ("content".to_string(), FormValue::Text(self.content.clone())),
        ];
        if let Some(category_id) = self.category_id {
            fields.push(("category_id".to_string(), FormValue::Text(category_id.to_string())));
        }
        // Repeated field, one entry per tag
        for tag_id in &self.tag_ids {
            fields.push(("tag_ids".to_string(), FormValue::Text(tag_id.to_string())));
        }
        if let Some(status) = self.status {
            fields.push(("status".to_string(), FormValue::Text(status.as_str().to_string())));
        }
        if let Some(ref image) = self.image {
            fields.push(("image".to_string(), image.to_form_value()));
        }
        fields
    }
}

/// Echo of a created or updated post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPost {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub status: Option<PostStatus>,
}

/// Filters accepted by the post list endpoint.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    /// Field name, prefixed with '-' for descending (e.g. "-created_at")
    pub ordering: Option<String>,
    pub author: Option<i64>,
    pub category: Option<i64>,
    pub status: Option<PostStatus>,
    /// Tag slug
    pub tag: Option<String>,
}

impl PostQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("page", self.page)
            .query_opt("page_size", self.page_size)
            .query_opt("search", self.search.as_deref())
            .query_opt("ordering", self.ordering.as_deref())
            .query_opt("author", self.author)
            .query_opt("category", self.category)
            .query_opt("status", self.status.map(|s| s.as_str()))
            .query_opt("tag", self.tag.as_deref())
    }
}
