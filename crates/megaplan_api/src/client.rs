use std::path::Path;

use crate::config::MegaplanConfig;
use crate::error::{MegaplanError, Result};
use crate::models::{
    Comment, CommentCreateRequest, Employee, EntityRef, Issue, ProjectDetail, ResponsibleParty,
    TaskDetail,
};
use crate::rate_limiter::RateLimiter;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Every Megaplan v3 response wraps its payload in `{"data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Clone)]
pub struct MegaplanClient {
    http: HttpClient,
    config: MegaplanConfig,
    limiter: RateLimiter,
}

impl MegaplanClient {
    pub fn new(config: MegaplanConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.pacing);
        Self::new_with_limiter(config, limiter)
    }

    pub fn new_with_limiter(config: MegaplanConfig, limiter: RateLimiter) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    pub fn config(&self) -> &MegaplanConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Paced GET returning the unwrapped `data` payload.
    async fn read<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.limiter.before_call().await;
        let response = self.http.get(self.url_for(path)).send().await?;
        let envelope: Envelope<T> = Self::parse_json(response).await?;
        self.limiter.after_read().await;
        Ok(envelope.data)
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = Self::check_status(response).await?;
        response.json::<T>().await.map_err(MegaplanError::from)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            Err(MegaplanError::Authentication(format!(
                "Access denied ({}) - {}",
                status, body
            )))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(MegaplanError::http(status, body))
        }
    }

    pub async fn get_project(&self, project_id: &str) -> Result<ProjectDetail> {
        let project = self.read(&format!("project/{}", project_id)).await?;
        info!(project_id, "fetched project");
        Ok(project)
    }

    pub async fn get_project_issues(&self, project_id: &str) -> Result<Vec<Issue>> {
        let issues: Vec<Issue> = self.read(&format!("project/{}/issues", project_id)).await?;
        info!(project_id, count = issues.len(), "fetched project issues");
        Ok(issues)
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskDetail> {
        let task = self.read(&format!("task/{}", task_id)).await?;
        info!(task_id, "fetched task");
        Ok(task)
    }

    pub async fn get_task_subtasks(&self, task_id: &str) -> Result<Vec<Issue>> {
        let subtasks: Vec<Issue> = self.read(&format!("task/{}/subTasks", task_id)).await?;
        info!(task_id, count = subtasks.len(), "fetched subtasks");
        Ok(subtasks)
    }

    /// Raw comment content. A failed fetch is logged and yields an empty string.
    pub async fn get_comment(&self, comment_id: &str) -> String {
        match self.read::<Comment>(&format!("comment/{}", comment_id)).await {
            Ok(comment) => {
                info!(comment_id, "fetched comment");
                comment.content
            }
            Err(err) => {
                warn!(comment_id, error = %err, "comment fetch failed, using empty text");
                String::new()
            }
        }
    }

    pub async fn get_employee(&self, employee_id: &str) -> Result<Employee> {
        let employee = self.read(&format!("employee/{}", employee_id)).await?;
        info!(employee_id, "fetched employee");
        Ok(employee)
    }

    /// Display name of a responsible party, looking the employee up when only an id is embedded.
    pub async fn responsible_name(&self, party: &ResponsibleParty) -> Result<String> {
        match party {
            ResponsibleParty::Named { name } => Ok(name.clone()),
            ResponsibleParty::Reference { id } => Ok(self.get_employee(id).await?.name),
        }
    }

    /// Uploads the artifact as `<display_name>.<extension>`. The local file is
    /// deleted when `artifact` is dropped, whatever the outcome.
    pub async fn upload_file(&self, artifact: NamedTempFile, display_name: &str) -> Result<EntityRef> {
        let file_name = remote_file_name(artifact.path(), display_name);
        let mime = mime_guess::from_path(artifact.path()).first_or_octet_stream();
        let bytes = tokio::fs::read(artifact.path()).await?;

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime.as_ref())?;
        let form = Form::new().percent_encode_noop().part("files[]", part);

        let response = self
            .http
            .post(self.config.file_endpoint())
            .multipart(form)
            .send()
            .await?;
        let envelope: Envelope<Vec<EntityRef>> = Self::parse_json(response).await?;
        let file = envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| MegaplanError::Other("upload response contained no files".to_string()))?;
        info!(file_id = %file.id, file_name, "uploaded file");
        Ok(file)
    }

    /// Posts a comment to the thread of `subject`, optionally attaching files.
    pub async fn post_comment(&self, subject: &EntityRef, content: &str, attaches: &[EntityRef]) -> Result<()> {
        let path = format!("{}/{}/comments", subject.content_type.path_segment(), subject.id);
        let payload = CommentCreateRequest::new(subject, content, attaches);
        let response = self.http.post(self.url_for(&path)).json(&payload).send().await?;
        Self::check_status(response).await?;
        info!(subject_id = %subject.id, kind = %subject.content_type, "posted comment");
        Ok(())
    }
}

fn remote_file_name(path: &Path, display_name: &str) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{}.{}", display_name, ext),
        None => display_name.to_string(),
    }
}

fn build_http_client(config: &MegaplanConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(format!("Bearer {}", config.token))?);
    headers.insert(USER_AGENT, header_value(config.user_agent.clone())?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| MegaplanError::Other(err.to_string()))
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|err| MegaplanError::Other(err.to_string()))
}
