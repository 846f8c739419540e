//! Comments, likes, bookmarks and follows.

use serde::Serialize;

use super::{ApiError, ApiRequest, SessionClient};
use crate::models::{Bookmark, BookmarkToggle, Comment, Follow, FollowToggle, Like, LikeToggle, Page};

#[derive(Serialize)]
struct CommentBody<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<i64>,
}

impl SessionClient {
    // ===== Comments =====

    pub async fn list_comments(&self, post_id: i64, page: Option<u32>) -> Result<Page<Comment>, ApiError> {
        self.send_json(ApiRequest::get(format!("posts/{}/comments/", post_id)).query_opt("page", page))
            .await
    }

    /// Comment on a post, or reply to `parent` when given
    pub async fn create_comment(
        &self,
        post_id: i64,
        content: &str,
        parent: Option<i64>,
    ) -> Result<Comment, ApiError> {
        let request = ApiRequest::post(format!("posts/{}/comments/", post_id))
            .json(&CommentBody { content, parent })?;
        self.send_json(request).await
    }

    pub async fn update_comment(&self, id: i64, content: &str) -> Result<Comment, ApiError> {
        let request = ApiRequest::put(format!("comments/{}/", id))
            .json(&CommentBody { content, parent: None })?;
        self.send_json(request).await
    }

    pub async fn delete_comment(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(ApiRequest::delete(format!("comments/{}/", id)))
            .await
    }

    // ===== Likes =====

    pub async fn toggle_like(&self, post_id: i64) -> Result<LikeToggle, ApiError> {
        self.send_json(ApiRequest::post(format!("posts/{}/like/", post_id)))
            .await
    }

    pub async fn post_likes(&self, post_id: i64, page: Option<u32>) -> Result<Page<Like>, ApiError> {
        self.send_json(ApiRequest::get(format!("posts/{}/likes/", post_id)).query_opt("page", page))
            .await
    }

    // ===== Bookmarks =====

    pub async fn toggle_bookmark(&self, post_id: i64) -> Result<BookmarkToggle, ApiError> {
        self.send_json(ApiRequest::post(format!("posts/{}/bookmark/", post_id)))
            .await
    }

    pub async fn my_bookmarks(&self, page: Option<u32>) -> Result<Page<Bookmark>, ApiError> {
        self.send_json(ApiRequest::get("bookmarks/").query_opt("page", page))
            .await
    }

    // ===== Follows =====

    pub async fn toggle_follow(&self, user_id: i64) -> Result<FollowToggle, ApiError> {
        self.send_json(ApiRequest::post(format!("users/{}/follow/", user_id)))
            .await
    }

    pub async fn following(&self, page: Option<u32>) -> Result<Page<Follow>, ApiError> {
        self.send_json(ApiRequest::get("following/").query_opt("page", page))
            .await
    }

    pub async fn followers(&self, page: Option<u32>) -> Result<Page<Follow>, ApiError> {
        self.send_json(ApiRequest::get("followers/").query_opt("page", page))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::api::fake::{FakeTransport, Reply};
    use crate::auth::MemoryTokenStore;

    fn client(transport: Arc<FakeTransport>) -> SessionClient {
        SessionClient::new(transport, Arc::new(MemoryTokenStore::with_tokens(Some("A"), Some("R"))))
    }

    #[tokio::test]
    async fn test_toggle_like_reads_new_state() {
        let transport = FakeTransport::new(|call| match call.path.as_str() {
            "posts/5/like/" => Reply::json(201, json!({"message": "Post liked", "liked": true})),
            _ => Reply::status(404),
        });
        let client = client(transport.clone());

        let toggle = client.toggle_like(5).await.expect("toggle");

        assert!(toggle.liked);
        assert_eq!(transport.calls()[0].bearer.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_toggle_bookmark_and_follow() {
        let transport = FakeTransport::new(|call| match call.path.as_str() {
            "posts/5/bookmark/" => Reply::json(200, json!({"message": "Bookmark removed", "bookmarked": false})),
            "users/2/follow/" => Reply::json(201, json!({"message": "Followed", "following": true})),
            _ => Reply::status(404),
        });
        let client = client(transport);

        assert!(!client.toggle_bookmark(5).await.expect("bookmark").bookmarked);
        assert!(client.toggle_follow(2).await.expect("follow").following);
    }

    #[tokio::test]
    async fn test_follow_self_is_validation_error() {
        let transport = FakeTransport::new(|_| Reply::json(400, json!({"error": "You cannot follow yourself"})));
        let client = client(transport);

        match client.toggle_follow(1).await {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.to_string(), "You cannot follow yourself")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reply_carries_parent() {
        let transport = FakeTransport::new(|_| {
            Reply::json(201, json!({
                "id": 12, "post": 5, "author": {"id": 1, "username": "u"}, "content": "Agreed",
                "parent": 10, "replies": [], "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"
            }))
        });
        let client = client(transport.clone());

        let comment = client.create_comment(5, "Agreed", Some(10)).await.expect("comment");

        assert_eq!(comment.parent, Some(10));
        let call = &transport.calls()[0];
        assert_eq!(call.path, "posts/5/comments/");
        assert_eq!(call.json_body(), Some(&json!({"content": "Agreed", "parent": 10})));
    }

    #[tokio::test]
    async fn test_top_level_comment_omits_parent() {
        let transport = FakeTransport::new(|_| Reply::status(500));
        let client = client(transport.clone());

        assert!(client.create_comment(5, "First", None).await.is_err());
        assert_eq!(transport.calls()[0].json_body(), Some(&json!({"content": "First"})));
    }
}
