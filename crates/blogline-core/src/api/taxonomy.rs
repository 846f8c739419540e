//! Categories and tags.

use super::{ApiError, ApiRequest, SessionClient};
use crate::models::{Category, NewCategory, NewTag, Page, Tag};

impl SessionClient {
    pub async fn categories(&self, page: Option<u32>) -> Result<Page<Category>, ApiError> {
        self.send_json(ApiRequest::get("categories/").query_opt("page", page))
            .await
    }

    pub async fn category(&self, slug: &str) -> Result<Category, ApiError> {
        self.send_json(ApiRequest::get(format!("categories/{}/", slug)))
            .await
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category, ApiError> {
        self.send_json(ApiRequest::post("categories/").json(category)?)
            .await
    }

    pub async fn tags(&self, page: Option<u32>) -> Result<Page<Tag>, ApiError> {
        self.send_json(ApiRequest::get("tags/").query_opt("page", page))
            .await
    }

    pub async fn tag(&self, slug: &str) -> Result<Tag, ApiError> {
        self.send_json(ApiRequest::get(format!("tags/{}/", slug)))
            .await
    }

    pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ApiError> {
        self.send_json(ApiRequest::post("tags/").json(tag)?)
            .await
    }
}
