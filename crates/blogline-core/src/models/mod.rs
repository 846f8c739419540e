//! Data models for blog entities.
//!
//! This module contains the data structures exchanged with the blog API:
//!
//! - `User`, `UserProfile`: Accounts and their editable profile
//! - `Post`, `PostDetail`, `PostDraft`: Posts as listed, viewed and written
//! - `Comment`: Threaded comments with nested replies
//! - `Category`, `Tag`: Post classification
//! - Social types: `Like`, `Bookmark`, `Follow` and their toggle results
//! - `Page`: Page-number pagination envelope

pub mod comment;
pub mod page;
pub mod post;
pub mod social;
pub mod taxonomy;
pub mod upload;
pub mod user;

pub use comment::Comment;
pub use page::Page;
pub use post::{Post, PostDetail, PostDraft, PostQuery, PostStatus, SavedPost};
pub use social::{Bookmark, BookmarkToggle, Follow, FollowToggle, Like, LikeToggle};
pub use taxonomy::{Category, NewCategory, NewTag, Tag};
pub use upload::Upload;
pub use user::{ProfileUpdate, Registration, User, UserProfile};
