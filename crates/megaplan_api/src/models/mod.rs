mod comment;
mod entity;
mod party;
mod task;

pub use comment::{Comment, CommentCreateRequest};
pub use entity::{ContentType, EntityRef};
pub use party::{Employee, ResponsibleParty};
pub use task::{CommentRef, DateTimeValue, Issue, ProjectDetail, TaskDetail};
