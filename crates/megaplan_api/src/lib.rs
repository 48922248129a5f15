//! Typed Megaplan v3 API client used by the report service.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::MegaplanClient;
pub use config::{MegaplanConfig, Pacing};
pub use error::{MegaplanError, Result};
pub use models::{
    Comment, CommentRef, ContentType, Employee, EntityRef, Issue, ProjectDetail, ResponsibleParty,
    TaskDetail,
};
