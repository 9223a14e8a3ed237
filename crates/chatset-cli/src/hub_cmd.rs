use anyhow::Context;
use std::path::PathBuf;

use chatset_config::HubConfig;
use chatset_hub::{
    push_adapter, resolve_token, usage_snippet, HubClient, ModelCard, PushOptions, RepoId,
    RepoStatus, DEFAULT_BASE_MODEL, DEFAULT_ENDPOINT,
};

pub(crate) const DEFAULT_ADAPTER_DIR: &str = "lora_model";
pub(crate) const DEFAULT_COMMIT_MESSAGE: &str = "Upload LoRA adapter";

/// Flags of `push` that are not plain config overrides.
#[derive(Debug, Default)]
pub(crate) struct PushFlags {
    pub(crate) token: Option<String>,
    pub(crate) no_readme: bool,
}

fn repo_id(config: &HubConfig) -> anyhow::Result<RepoId> {
    let raw = config
        .repo_id
        .as_deref()
        .context("No repository given: pass --repo-id or set hub.repoId")?;
    Ok(raw.parse::<RepoId>()?)
}

pub(crate) fn model_card(config: &HubConfig, repo: &RepoId) -> ModelCard {
    let mut card = ModelCard::new(
        config
            .base_model
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_MODEL.to_string()),
        repo.to_string(),
    );
    if let Some(rank) = config.lora_rank {
        card.lora_rank = rank;
    }
    if let Some(modules) = &config.target_modules {
        card.target_modules = modules.clone();
    }
    if let Some(data) = &config.training_data {
        card.training_data = data.clone();
    }
    card
}

pub(crate) fn push_options(
    config: &HubConfig,
    flags: &PushFlags,
) -> anyhow::Result<PushOptions> {
    let repo = repo_id(config)?;
    let card = (!flags.no_readme).then(|| model_card(config, &repo));
    Ok(PushOptions {
        adapter_dir: config
            .adapter_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ADAPTER_DIR)),
        repo,
        private: config.private.unwrap_or(false),
        card,
        commit_message: config
            .commit_message
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
    })
}

pub(crate) async fn run_push(config: &HubConfig, flags: &PushFlags) -> anyhow::Result<()> {
    let options = push_options(config, flags)?;
    let token = resolve_token(flags.token.as_deref(), config.token.as_deref())?;
    let endpoint = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
    let client = HubClient::new(endpoint, token);

    println!(
        "Uploading {} to {}...",
        options.adapter_dir.display(),
        options.repo
    );
    let report = push_adapter(&client, &options)
        .await
        .with_context(|| format!("Failed to push adapter to {}", options.repo))?;

    if report.status == RepoStatus::Created {
        println!("Created repository {}", options.repo);
    }
    println!(
        "Uploaded {} file(s) ({} via LFS)",
        report.upload.files, report.upload.lfs_files
    );
    if let Some(url) = &report.upload.commit.commit_url {
        println!("Commit: {}", url);
    }
    println!("Model available at {}", report.repo_url);
    Ok(())
}

pub(crate) fn run_usage(config: &HubConfig) -> anyhow::Result<()> {
    let base_model = config.base_model.as_deref().unwrap_or(DEFAULT_BASE_MODEL);
    let repo = repo_id(config)?;
    print!("{}", usage_snippet(base_model, &repo.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_options_fill_defaults() {
        let config = HubConfig {
            repo_id: Some("me/tool-lora".to_string()),
            lora_rank: Some(32),
            ..Default::default()
        };
        let options = push_options(&config, &PushFlags::default()).unwrap();

        assert_eq!(options.adapter_dir, PathBuf::from("lora_model"));
        assert_eq!(options.commit_message, DEFAULT_COMMIT_MESSAGE);
        assert!(!options.private);
        let card = options.card.unwrap();
        assert_eq!(card.base_model, DEFAULT_BASE_MODEL);
        assert_eq!(card.adapter_repo, "me/tool-lora");
        assert_eq!(card.lora_rank, 32);
    }

    #[test]
    fn no_readme_skips_card() {
        let config = HubConfig {
            repo_id: Some("me/tool-lora".to_string()),
            ..Default::default()
        };
        let flags = PushFlags {
            token: None,
            no_readme: true,
        };
        assert!(push_options(&config, &flags).unwrap().card.is_none());
    }

    #[test]
    fn repo_id_is_required() {
        let err = push_options(&HubConfig::default(), &PushFlags::default()).unwrap_err();
        assert!(err.to_string().contains("--repo-id"));
    }
}
