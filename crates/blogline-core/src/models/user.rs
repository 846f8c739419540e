use serde::{Deserialize, Serialize};

use super::Upload;
use crate::api::FormValue;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub bio: Option<String>,
    /// Absolute or media-relative URL of the avatar image
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub posts_count: u64,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
}

impl User {
    /// "First Last" when a name is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// Account creation payload. `password2` must repeat `password`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Partial profile update; unset fields are left untouched by the server.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<Upload>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.location.is_none() && self.website.is_none() && self.avatar.is_none()
    }

    pub(crate) fn to_form(&self) -> Vec<(String, FormValue)> {
        let mut fields = Vec::new();
        let texts = [
            ("bio", &self.bio),
            ("location", &self.location),
            ("website", &self.website),
        ];
        for (name, value) in texts {
            if let Some(value) = value {
                fields.push((name.to_string(), FormValue::Text(value.clone())));
            }
        }
        if let Some(ref avatar) = self.avatar {
            fields.push(("avatar".to_string(), avatar.to_form_value()));
        }
        fields
    }
}
