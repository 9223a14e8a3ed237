//! Wire types and payload builders for folder uploads.
//!
//! An upload goes through three hub calls: `preupload` tells us which files
//! must travel through LFS, the LFS batch endpoint hands out storage URLs for
//! those, and a single NDJSON `commit` adds every file to `main`.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{HubError, Result};

/// Bytes of each file sent to `preupload` so the hub can sniff its type.
const SAMPLE_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Forward-slash path relative to the uploaded folder.
    pub path_in_repo: String,
    pub local_path: PathBuf,
    pub size: u64,
    /// Lowercase hex sha256 of the whole file.
    pub sha256: String,
    pub sample: Vec<u8>,
}

impl LocalFile {
    pub fn read(folder: &Path, local_path: &Path) -> Result<Self> {
        let relative = local_path
            .strip_prefix(folder)
            .unwrap_or(local_path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let mut file = File::open(local_path).map_err(|e| HubError::io(local_path, e))?;
        let mut hasher = Sha256::new();
        let mut sample = Vec::with_capacity(SAMPLE_LEN);
        let mut buf = [0u8; 64 * 1024];
        let mut size = 0u64;
        loop {
            let n = file.read(&mut buf).map_err(|e| HubError::io(local_path, e))?;
            if n == 0 {
                break;
            }
            if sample.len() < SAMPLE_LEN {
                let take = (SAMPLE_LEN - sample.len()).min(n);
                sample.extend_from_slice(&buf[..take]);
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        Ok(Self {
            path_in_repo: relative,
            local_path: local_path.to_path_buf(),
            size,
            sha256: hex::encode(hasher.finalize()),
            sample,
        })
    }
}

/// Every regular file below `folder`, sorted by repo path. `.git` and
/// `.cache` directories are skipped.
pub fn collect_files(folder: &Path) -> Result<Vec<LocalFile>> {
    if !folder.is_dir() {
        return Err(HubError::MissingFolder(folder.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !matches!(entry.file_name().to_str(), Some(".git" | ".cache"))
        });
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| folder.to_path_buf());
            HubError::io(path, io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_file() {
            files.push(LocalFile::read(folder, entry.path())?);
        }
    }

    files.sort_by(|a, b| a.path_in_repo.cmp(&b.path_in_repo));
    Ok(files)
}

#[derive(Debug, Serialize)]
pub struct PreuploadRequest {
    pub files: Vec<PreuploadEntry>,
}

#[derive(Debug, Serialize)]
pub struct PreuploadEntry {
    pub path: String,
    pub size: u64,
    pub sample: String,
}

impl PreuploadRequest {
    pub fn for_files<'a>(files: impl IntoIterator<Item = &'a LocalFile>) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            files: files
                .into_iter()
                .map(|file| PreuploadEntry {
                    path: file.path_in_repo.clone(),
                    size: file.size,
                    sample: engine.encode(&file.sample),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PreuploadResponse {
    #[serde(default)]
    pub files: Vec<PreuploadResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreuploadResult {
    pub path: String,
    #[serde(default)]
    pub upload_mode: UploadMode,
    #[serde(default)]
    pub should_ignore: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Regular,
    Lfs,
}

/// Where each collected file goes, per the hub's preupload answer.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadPlan<'a> {
    pub regular: Vec<&'a LocalFile>,
    pub lfs: Vec<&'a LocalFile>,
    pub ignored: Vec<&'a LocalFile>,
}

/// Sorts `files` by the preupload verdicts, keeping their order. A file the
/// response does not mention is still uploaded, inline.
pub fn classify<'a>(files: &'a [LocalFile], response: &PreuploadResponse) -> UploadPlan<'a> {
    let mut plan = UploadPlan::default();
    for file in files {
        let verdict = response
            .files
            .iter()
            .find(|result| result.path == file.path_in_repo);
        match verdict {
            Some(result) if result.should_ignore => plan.ignored.push(file),
            Some(result) if result.upload_mode == UploadMode::Lfs => plan.lfs.push(file),
            Some(_) => plan.regular.push(file),
            None => {
                tracing::warn!(
                    path = %file.path_in_repo,
                    "missing from preupload response, uploading inline"
                );
                plan.regular.push(file);
            }
        }
    }
    plan
}

#[derive(Debug, Serialize)]
pub struct LfsBatchRequest {
    pub operation: &'static str,
    pub transfers: Vec<&'static str>,
    pub objects: Vec<LfsObject>,
    pub hash_algo: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LfsObject {
    pub oid: String,
    pub size: u64,
}

impl LfsBatchRequest {
    pub fn upload<'a>(files: impl IntoIterator<Item = &'a LocalFile>) -> Self {
        Self {
            operation: "upload",
            transfers: vec!["basic"],
            objects: files
                .into_iter()
                .map(|file| LfsObject {
                    oid: file.sha256.clone(),
                    size: file.size,
                })
                .collect(),
            hash_algo: "sha256",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LfsBatchResponse {
    #[serde(default)]
    pub objects: Vec<LfsBatchObject>,
}

#[derive(Debug, Deserialize)]
pub struct LfsBatchObject {
    pub oid: String,
    pub size: u64,
    /// Absent when the hub already stores the object.
    #[serde(default)]
    pub actions: Option<LfsActions>,
    #[serde(default)]
    pub error: Option<LfsObjectError>,
}

#[derive(Debug, Deserialize)]
pub struct LfsActions {
    pub upload: Option<LfsAction>,
    pub verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
pub struct LfsAction {
    pub href: String,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct LfsObjectError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOperation {
    /// Small file, inlined as base64 in the commit.
    Inline { path_in_repo: String, content: Vec<u8> },
    /// File already pushed to LFS storage, referenced by its sha256.
    Lfs {
        path_in_repo: String,
        oid: String,
        size: u64,
    },
}

impl CommitOperation {
    pub fn path_in_repo(&self) -> &str {
        match self {
            Self::Inline { path_in_repo, .. } | Self::Lfs { path_in_repo, .. } => path_in_repo,
        }
    }
}

/// Newline-delimited JSON body for `POST /api/models/{repo}/commit/{rev}`:
/// one header line followed by one line per operation.
pub fn commit_payload(summary: &str, operations: &[CommitOperation]) -> Result<String> {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut lines = Vec::with_capacity(operations.len() + 1);
    lines.push(serde_json::to_string(&json!({
        "key": "header",
        "value": {"summary": summary, "description": ""}
    }))?);

    for op in operations {
        let line = match op {
            CommitOperation::Inline {
                path_in_repo,
                content,
            } => json!({
                "key": "file",
                "value": {
                    "content": engine.encode(content),
                    "path": path_in_repo,
                    "encoding": "base64"
                }
            }),
            CommitOperation::Lfs {
                path_in_repo,
                oid,
                size,
            } => json!({
                "key": "lfsFile",
                "value": {"path": path_in_repo, "algo": "sha256", "oid": oid, "size": size}
            }),
        };
        lines.push(serde_json::to_string(&line)?);
    }

    let mut body = lines.join("\n");
    body.push('\n');
    Ok(body)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    #[serde(default)]
    pub commit_url: Option<String>,
    #[serde(default)]
    pub commit_oid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;

    #[test]
    fn collects_files_recursively_and_skips_git() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("adapter_config.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("checkpoint-1")).unwrap();
        fs::write(dir.path().join("checkpoint-1/trainer_state.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path_in_repo.as_str()).collect();
        assert_eq!(paths, vec!["adapter_config.json", "checkpoint-1/trainer_state.json"]);
    }

    #[test]
    fn hashes_and_samples_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        fs::write(&path, vec![7u8; 2000]).unwrap();

        let file = LocalFile::read(dir.path(), &path).unwrap();
        assert_eq!(file.size, 2000);
        assert_eq!(file.sample.len(), SAMPLE_LEN);
        assert_eq!(file.sha256, hex::encode(Sha256::digest(vec![7u8; 2000])));
    }

    #[test]
    fn missing_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, HubError::MissingFolder(_)));
    }

    #[test]
    fn commit_payload_is_ndjson() {
        let ops = vec![
            CommitOperation::Inline {
                path_in_repo: "README.md".to_string(),
                content: b"hi".to_vec(),
            },
            CommitOperation::Lfs {
                path_in_repo: "adapter_model.safetensors".to_string(),
                oid: "abc".to_string(),
                size: 42,
            },
        ];
        let body = commit_payload("Upload adapter", &ops).unwrap();
        let lines: Vec<Value> = body
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["key"], "header");
        assert_eq!(lines[0]["value"]["summary"], "Upload adapter");
        assert_eq!(lines[1]["key"], "file");
        assert_eq!(lines[1]["value"]["content"], "aGk=");
        assert_eq!(lines[2]["key"], "lfsFile");
        assert_eq!(lines[2]["value"]["oid"], "abc");
        for (op, line) in ops.iter().zip(&lines[1..]) {
            assert_eq!(line["value"]["path"], op.path_in_repo());
        }
        assert!(body.ends_with('\n'));
    }

    fn local(path: &str) -> LocalFile {
        LocalFile {
            path_in_repo: path.to_string(),
            local_path: PathBuf::from(path),
            size: 1,
            sha256: String::new(),
            sample: Vec::new(),
        }
    }

    #[test]
    fn classify_keeps_files_the_response_omits() {
        let files = vec![local("a.json"), local("b.bin"), local("c.safetensors"), local("d.log")];
        let response: PreuploadResponse = serde_json::from_str(
            r#"{"files":[
                {"path":"a.json","uploadMode":"regular"},
                {"path":"c.safetensors","uploadMode":"lfs"},
                {"path":"d.log","uploadMode":"regular","shouldIgnore":true}
            ]}"#,
        )
        .unwrap();

        let plan = classify(&files, &response);
        fn paths(list: &[&LocalFile]) -> Vec<String> {
            list.iter().map(|f| f.path_in_repo.clone()).collect()
        }
        assert_eq!(paths(&plan.regular), vec!["a.json", "b.bin"]);
        assert_eq!(paths(&plan.lfs), vec!["c.safetensors"]);
        assert_eq!(paths(&plan.ignored), vec!["d.log"]);
    }

    #[test]
    fn classify_with_empty_response_uploads_everything_inline() {
        let files = vec![local("adapter_config.json"), local("README.md")];
        let plan = classify(&files, &PreuploadResponse { files: Vec::new() });
        assert_eq!(plan.regular.len(), 2);
        assert!(plan.lfs.is_empty());
    }

    #[test]
    fn parses_preupload_and_batch_responses() {
        let pre: PreuploadResponse = serde_json::from_str(
            r#"{"files":[{"path":"a.bin","uploadMode":"lfs","shouldIgnore":false},{"path":"b.json"}]}"#,
        )
        .unwrap();
        assert_eq!(pre.files[0].upload_mode, UploadMode::Lfs);
        assert_eq!(pre.files[1].upload_mode, UploadMode::Regular);

        let batch: LfsBatchResponse = serde_json::from_str(
            r#"{"objects":[
                {"oid":"x","size":1,"actions":{"upload":{"href":"https://s3/x","header":{"k":"v"}}}},
                {"oid":"y","size":2}
            ]}"#,
        )
        .unwrap();
        let upload = batch.objects[0].actions.as_ref().unwrap().upload.as_ref().unwrap();
        assert_eq!(upload.href, "https://s3/x");
        assert_eq!(upload.header["k"], "v");
        assert!(batch.objects[1].actions.is_none());
    }
}
