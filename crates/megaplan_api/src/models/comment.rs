use serde::{Deserialize, Serialize};

use super::entity::{deserialize_id, EntityRef};

#[derive(Debug, Deserialize, Clone)]
pub struct Comment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
}

/// Body of `POST /api/v3/{project|task}/{id}/comments`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateRequest<'a> {
    content_type: &'static str,
    comment: CommentBody<'a>,
    transports: [Transport; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentBody<'a> {
    content_type: &'static str,
    content: &'a str,
    attaches: &'a [EntityRef],
    subject: &'a EntityRef,
}

#[derive(Debug, Serialize, Default)]
struct Transport {}

impl<'a> CommentCreateRequest<'a> {
    pub fn new(subject: &'a EntityRef, content: &'a str, attaches: &'a [EntityRef]) -> Self {
        Self {
            content_type: "CommentCreateActionRequest",
            comment: CommentBody {
                content_type: "Comment",
                content,
                attaches,
                subject,
            },
            transports: [Transport::default()],
        }
    }
}
