//! Failures that abort a report job.

use std::io;

use megaplan_api::MegaplanError;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("megaplan request failed: {0}")]
    Upstream(#[from] MegaplanError),
    #[error("{entity} has no {field}")]
    MissingField { entity: String, field: &'static str },
    #[error("unparseable date '{value}' on {entity}")]
    InvalidDate { entity: String, value: String },
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] XlsxError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("report task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ReportError {
    pub fn missing(entity: impl Into<String>, field: &'static str) -> Self {
        ReportError::MissingField {
            entity: entity.into(),
            field,
        }
    }
}
