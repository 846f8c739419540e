//! Post endpoints: listing, detail, authoring and search.

use tracing::debug;

use super::{ApiError, ApiRequest, SessionClient};
use crate::models::{Page, Post, PostDetail, PostDraft, PostQuery, SavedPost};

impl SessionClient {
    /// Published posts, newest first unless `query.ordering` says otherwise
    pub async fn list_posts(&self, query: &PostQuery) -> Result<Page<Post>, ApiError> {
        self.send_json(query.apply(ApiRequest::get("posts/"))).await
    }

    pub async fn get_post(&self, id: i64) -> Result<PostDetail, ApiError> {
        self.send_json(ApiRequest::get(format!("posts/{}/", id))).await
    }

    /// The signed-in user's posts, drafts included
    pub async fn my_posts(&self, page: Option<u32>) -> Result<Page<Post>, ApiError> {
        self.send_json(ApiRequest::get("posts/my/").query_opt("page", page))
            .await
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<SavedPost, ApiError> {
        debug!(title = %draft.title, tags = draft.tag_ids.len(), "Creating post");
        self.send_json(ApiRequest::post("posts/").multipart(draft.to_form()))
            .await
    }

    pub async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<SavedPost, ApiError> {
        debug!(post_id = id, "Updating post");
        self.send_json(ApiRequest::put(format!("posts/{}/", id)).multipart(draft.to_form()))
            .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(ApiRequest::delete(format!("posts/{}/", id)))
            .await
    }

    /// Search titles, content, author names and tags
    pub async fn search(&self, query: &str, page: Option<u32>) -> Result<Page<Post>, ApiError> {
        self.send_json(
            ApiRequest::get("search/")
                .query("q", query)
                .query_opt("page", page),
        )
        .await
    }

    /// Posts from the users the caller follows
    pub async fn timeline(&self, page: Option<u32>) -> Result<Page<Post>, ApiError> {
        self.send_json(ApiRequest::get("timeline/").query_opt("page", page))
            .await
    }
}
