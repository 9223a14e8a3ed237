use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::card::ModelCard;
use crate::error::{HubError, Result};
use crate::repo::RepoId;
use crate::upload::{
    classify, collect_files, commit_payload, CommitInfo, CommitOperation, LfsBatchRequest,
    LfsBatchResponse, LocalFile, PreuploadRequest, PreuploadResponse,
};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Environment variables consulted, in order, when no token is given.
pub const TOKEN_ENV_VARS: [&str; 2] = ["HF_TOKEN", "HUGGING_FACE_HUB_TOKEN"];

const PREUPLOAD_BATCH: usize = 256;
const LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Picks the first non-empty token from the flag, the config, then the
/// environment.
pub fn resolve_token(explicit: Option<&str>, configured: Option<&str>) -> Result<String> {
    pick_token(explicit, configured, |name| std::env::var(name).ok())
}

fn pick_token(
    explicit: Option<&str>,
    configured: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(configured.map(str::to_string))
        .chain(TOKEN_ENV_VARS.into_iter().filter_map(|name| env(name)))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or(HubError::MissingToken)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoStatus {
    Created,
    AlreadyExists,
}

impl RepoStatus {
    /// `None` means the create call failed.
    fn from_create_status(status: reqwest::StatusCode) -> Option<Self> {
        if status == reqwest::StatusCode::CONFLICT {
            Some(Self::AlreadyExists)
        } else if status.is_success() {
            Some(Self::Created)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    pub files: usize,
    pub lfs_files: usize,
    pub ignored: usize,
    pub commit: CommitInfo,
}

pub struct HubClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HubClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// Creates a model repository. A 409 from the hub means it already exists
    /// and is not an error.
    pub async fn create_repo(&self, repo: &RepoId, private: bool) -> Result<RepoStatus> {
        let response = self
            .http
            .post(self.url("/api/repos/create"))
            .bearer_auth(&self.token)
            .json(&json!({
                "type": "model",
                "name": repo.name,
                "organization": repo.owner,
                "private": private,
            }))
            .send()
            .await?;

        let status = response.status();
        match RepoStatus::from_create_status(status) {
            Some(RepoStatus::AlreadyExists) => {
                tracing::info!(repo = %repo, "repository already exists");
                Ok(RepoStatus::AlreadyExists)
            }
            Some(RepoStatus::Created) => {
                tracing::info!(repo = %repo, private, "created repository");
                Ok(RepoStatus::Created)
            }
            None => Err(HubError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Uploads every file below `folder` to the root of `repo` in one commit
    /// on `main`.
    pub async fn upload_folder(
        &self,
        repo: &RepoId,
        folder: &Path,
        message: &str,
    ) -> Result<UploadSummary> {
        let files = collect_files(folder)?;
        tracing::info!(folder = %folder.display(), files = files.len(), "collected files");

        let mut summary = UploadSummary::default();
        let mut regular = Vec::new();
        let mut lfs = Vec::new();
        for chunk in files.chunks(PREUPLOAD_BATCH) {
            let response: PreuploadResponse = parse_json(
                self.http
                    .post(self.url(&format!("/api/models/{}/preupload/main", repo)))
                    .bearer_auth(&self.token)
                    .json(&PreuploadRequest::for_files(chunk))
                    .send()
                    .await?,
            )
            .await?;

            let plan = classify(chunk, &response);
            for file in &plan.ignored {
                tracing::debug!(path = %file.path_in_repo, "ignored by hub");
            }
            summary.ignored += plan.ignored.len();
            regular.extend(plan.regular);
            lfs.extend(plan.lfs);
        }

        if !lfs.is_empty() {
            self.upload_lfs(repo, &lfs).await?;
        }

        let mut operations = Vec::with_capacity(regular.len() + lfs.len());
        for file in &regular {
            let content = tokio::fs::read(&file.local_path)
                .await
                .map_err(|e| HubError::io(&file.local_path, e))?;
            operations.push(CommitOperation::Inline {
                path_in_repo: file.path_in_repo.clone(),
                content,
            });
        }
        operations.extend(lfs.iter().map(|file| CommitOperation::Lfs {
            path_in_repo: file.path_in_repo.clone(),
            oid: file.sha256.clone(),
            size: file.size,
        }));

        summary.files = operations.len();
        summary.lfs_files = lfs.len();
        summary.commit = self.commit(repo, &operations, message).await?;
        Ok(summary)
    }

    async fn upload_lfs(&self, repo: &RepoId, files: &[&LocalFile]) -> Result<()> {
        let batch: LfsBatchResponse = parse_json(
            self.http
                .post(format!(
                    "{}/{}.git/info/lfs/objects/batch",
                    self.endpoint, repo
                ))
                .basic_auth("access_token", Some(&self.token))
                .header(reqwest::header::ACCEPT, LFS_MEDIA_TYPE)
                .header(reqwest::header::CONTENT_TYPE, LFS_MEDIA_TYPE)
                .json(&LfsBatchRequest::upload(files.iter().copied()))
                .send()
                .await?,
        )
        .await?;

        for object in batch.objects {
            if let Some(error) = object.error {
                return Err(HubError::Lfs(format!(
                    "{} ({}): {}",
                    object.oid, error.code, error.message
                )));
            }
            let Some(actions) = object.actions else {
                tracing::debug!(oid = %object.oid, "object already stored");
                continue;
            };
            let file = files
                .iter()
                .find(|f| f.sha256 == object.oid)
                .ok_or_else(|| HubError::Lfs(format!("unexpected object {}", object.oid)))?;

            if let Some(upload) = actions.upload {
                let data = tokio::fs::read(&file.local_path)
                    .await
                    .map_err(|e| HubError::io(&file.local_path, e))?;
                let mut request = self.http.put(&upload.href).body(data);
                for (name, value) in &upload.header {
                    request = request.header(name.as_str(), value.as_str());
                }
                ensure_success(request.send().await?).await?;
                tracing::info!(path = %file.path_in_repo, size = file.size, "uploaded lfs object");
            }

            if let Some(verify) = actions.verify {
                let mut request = self
                    .http
                    .post(&verify.href)
                    .basic_auth("access_token", Some(&self.token))
                    .json(&json!({"oid": object.oid, "size": object.size}));
                for (name, value) in &verify.header {
                    request = request.header(name.as_str(), value.as_str());
                }
                ensure_success(request.send().await?).await?;
            }
        }
        Ok(())
    }

    async fn commit(
        &self,
        repo: &RepoId,
        operations: &[CommitOperation],
        message: &str,
    ) -> Result<CommitInfo> {
        for op in operations {
            tracing::debug!(path = op.path_in_repo(), "adding to commit");
        }
        let body = commit_payload(message, operations)?;
        let info: CommitInfo = parse_json(
            self.http
                .post(self.url(&format!("/api/models/{}/commit/main", repo)))
                .bearer_auth(&self.token)
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(body)
                .send()
                .await?,
        )
        .await?;
        tracing::info!(
            repo = %repo,
            files = operations.len(),
            commit = info.commit_oid.as_deref().unwrap_or("-"),
            "committed files"
        );
        Ok(info)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(HubError::Api {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    })
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = ensure_success(response).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub adapter_dir: PathBuf,
    pub repo: RepoId,
    pub private: bool,
    /// Written to `README.md` in the adapter folder before upload.
    pub card: Option<ModelCard>,
    pub commit_message: String,
}

#[derive(Debug, Clone)]
pub struct PushReport {
    pub repo_url: String,
    pub status: RepoStatus,
    pub upload: UploadSummary,
}

/// Writes the model card, creates the repository if needed, then uploads the
/// adapter folder.
pub async fn push_adapter(client: &HubClient, options: &PushOptions) -> Result<PushReport> {
    if !options.adapter_dir.is_dir() {
        return Err(HubError::MissingFolder(options.adapter_dir.clone()));
    }

    if let Some(card) = &options.card {
        let readme = options.adapter_dir.join("README.md");
        tokio::fs::write(&readme, card.render())
            .await
            .map_err(|e| HubError::io(&readme, e))?;
        tracing::info!(path = %readme.display(), "wrote model card");
    }

    let status = client.create_repo(&options.repo, options.private).await?;
    let upload = client
        .upload_folder(&options.repo, &options.adapter_dir, &options.commit_message)
        .await?;

    Ok(PushReport {
        repo_url: format!("{}/{}", client.endpoint(), options.repo),
        status,
        upload,
    })
}
