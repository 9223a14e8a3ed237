use crate::Config;
use anyhow::{Context, Result};
use jsonc_parser::{parse_to_serde_value, ParseOptions};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_TARGETS: [&str; 4] = [
    "chatset.jsonc",
    "chatset.json",
    ".chatset/chatset.jsonc",
    ".chatset/chatset.json",
];

pub struct ConfigLoader {
    config: Config,
    config_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            config_paths: Vec::new(),
        }
    }

    pub fn load_from_str(&mut self, content: &str) -> Result<()> {
        let content = substitute_env_vars(content);
        let config: Config =
            parse_jsonc(&content).with_context(|| "Failed to parse config content")?;
        self.config.merge(config);
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // Apply {env:VAR} substitution
        let content = substitute_env_vars(&content);

        let config: Config = parse_jsonc(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        tracing::debug!(path = %path.display(), "loaded config file");
        self.config.merge(config);
        self.config_paths.push(path.to_path_buf());
        Ok(())
    }

    pub fn load_global(&mut self) -> Result<()> {
        let global_config_path = get_global_config_path();

        for ext in &["jsonc", "json"] {
            let path = global_config_path.with_extension(ext);
            if path.exists() {
                self.load_from_file(&path)?;
                break;
            }
        }

        Ok(())
    }

    /// Finds config files from `project_dir` upwards (stopping at the git
    /// root) and applies them ancestor first, so the nearest file wins.
    pub fn load_project<P: AsRef<Path>>(&mut self, project_dir: P) -> Result<()> {
        let input = project_dir.as_ref();
        let start_dir = if input.is_dir() {
            input.to_path_buf()
        } else {
            input
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| input.to_path_buf())
        };
        let start_dir = normalize_existing_path(&start_dir);
        let stop_dir = detect_worktree_stop(&start_dir);

        for target in CONFIG_TARGETS {
            let found = find_up(target, &start_dir, &stop_dir);
            for path in found.into_iter().rev() {
                self.load_from_file(path)?;
            }
        }

        Ok(())
    }

    pub fn load_from_env(&mut self) -> Result<()> {
        if let Ok(config_path) = env::var("CHATSET_CONFIG") {
            self.load_from_file(&config_path)?;
        }

        Ok(())
    }

    /// Inline config from `CHATSET_CONFIG_CONTENT`.
    pub fn load_from_env_content(&mut self) -> Result<()> {
        if let Ok(config_content) = env::var("CHATSET_CONFIG_CONTENT") {
            self.load_from_str(&config_content)?;
        }

        Ok(())
    }

    /// Loads every config source.
    /// Merge order (low -> high precedence):
    /// 1. Global config (~/.config/chatset/chatset.json{,c})
    /// 2. Project config (chatset.json{,c}, .chatset/chatset.json{,c})
    /// 3. Custom config (CHATSET_CONFIG)
    /// 4. Inline config (CHATSET_CONFIG_CONTENT)
    /// 5. Explicit `--config` path, which must exist
    pub fn load_all<P: AsRef<Path>>(
        &mut self,
        project_dir: P,
        explicit: Option<&Path>,
    ) -> Result<Config> {
        self.load_global()?;
        self.load_project(project_dir)?;
        self.load_from_env()?;
        self.load_from_env_content()?;

        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            self.load_from_file(path)?;
        }

        Ok(self.config.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn get_global_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("chatset/chatset")
}

/// Substitute `{env:VAR}` patterns with environment variable values.
/// Works on the raw JSONC text before parsing; unset variables become "".
fn substitute_env_vars(text: &str) -> String {
    let re = regex::Regex::new(r"\{env:([^}]+)\}").expect("static regex is valid");
    re.replace_all(text, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    })
    .to_string()
}

fn parse_jsonc(content: &str) -> Result<Config> {
    let parse_options = ParseOptions {
        allow_trailing_commas: true,
        ..Default::default()
    };
    let parsed = parse_to_serde_value(content, &parse_options)
        .with_context(|| "Failed to parse JSONC")?
        .context("Config content is empty")?;
    serde_json::from_value(parsed).with_context(|| "Failed to parse config JSON")
}

fn normalize_existing_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn detect_worktree_stop(start: &Path) -> PathBuf {
    let mut current = normalize_existing_path(start);
    let mut topmost = current.clone();
    loop {
        if current.join(".git").exists() {
            return current;
        }
        let Some(parent) = current.parent() else {
            return topmost;
        };
        if parent == current {
            return topmost;
        }
        topmost = parent.to_path_buf();
        current = parent.to_path_buf();
    }
}

fn find_up(target: &str, start: &Path, stop: &Path) -> Vec<PathBuf> {
    let mut current = normalize_existing_path(start);
    let stop = normalize_existing_path(stop);
    let mut result = Vec::new();

    loop {
        let candidate = current.join(target);
        if candidate.exists() {
            result.push(candidate);
        }
        if current == stop {
            break;
        }
        let Some(parent) = current.parent() else {
            break;
        };
        if parent == current {
            break;
        }
        current = parent.to_path_buf();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatset_types::{FallbackPolicy, TargetFormat};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new(prefix: &str) -> Self {
            let unique = format!(
                "{}_{}_{}",
                prefix,
                std::process::id(),
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .expect("clock error")
                    .as_nanos()
            );
            let path = std::env::temp_dir().join(unique);
            fs::create_dir_all(&path).expect("failed to create test temp dir");
            Self { path }
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn test_parse_jsonc_with_comments_and_trailing_commas() {
        let content = r#"{
            // converter defaults
            "convert": {
                "target": "alpaca",
                /* keep the legacy behaviour */
                "fallback": "samples",
            },
        }"#;
        let config = parse_jsonc(content).unwrap();
        let convert = config.convert();
        assert_eq!(convert.target, Some(TargetFormat::Alpaca));
        assert_eq!(convert.fallback, Some(FallbackPolicy::Samples));
    }

    #[test]
    fn test_parse_jsonc_rejects_empty_content() {
        assert!(parse_jsonc("   ").is_err());
    }

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("CHATSET_TEST_SUBST_TOKEN", "hf_secret");
        let out = substitute_env_vars(
            r#"{"hub": {"token": "{env:CHATSET_TEST_SUBST_TOKEN}", "endpoint": "{env:CHATSET_TEST_SUBST_UNSET}"}}"#,
        );
        assert_eq!(
            out,
            r#"{"hub": {"token": "hf_secret", "endpoint": ""}}"#
        );
    }

    #[test]
    fn test_commented_file_with_env_token_layers_over_existing_config() {
        std::env::set_var("CHATSET_TEST_LAYER_TOKEN", "hf_layered");
        let temp = TestDir::new("chatset_config_layer");
        let path = temp.path.join("chatset.jsonc");
        fs::write(
            &path,
            r#"{
                // hub credentials come from the environment
                "hub": {
                    "token": "{env:CHATSET_TEST_LAYER_TOKEN}",
                    /* override only the repo */
                    "repoId": "me/override",
                },
                "convert": { "target": "sharegpt", },
            }"#,
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader
            .load_from_str(
                r#"{
                    "convert": { "target": "alpaca", "strict": true },
                    "hub": { "repoId": "me/base", "private": true }
                }"#,
            )
            .unwrap();
        loader.load_from_file(&path).unwrap();

        let cfg = loader.config();
        let hub = cfg.hub();
        assert_eq!(hub.token.as_deref(), Some("hf_layered"));
        assert_eq!(hub.repo_id.as_deref(), Some("me/override"));
        assert_eq!(hub.private, Some(true));
        let convert = cfg.convert();
        assert_eq!(convert.target, Some(TargetFormat::ShareGpt));
        assert_eq!(convert.strict, Some(true));
        assert_eq!(loader.config_paths(), &[path]);
    }

    #[test]
    fn test_load_from_missing_file_is_noop() {
        let temp = TestDir::new("chatset_config_missing");
        let mut loader = ConfigLoader::new();
        loader.load_from_file(temp.path.join("nope.jsonc")).unwrap();
        assert_eq!(loader.config(), &Config::default());
        assert!(loader.config_paths().is_empty());
    }

    #[test]
    fn test_load_project_nearest_file_wins() {
        let temp = TestDir::new("chatset_config_findup");
        let root = temp.path.join("repo");
        let child = root.join("data/qa");
        fs::create_dir_all(&child).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();

        fs::write(
            root.join("chatset.jsonc"),
            r#"{ "convert": { "target": "alpaca", "strict": true } }"#,
        )
        .unwrap();
        fs::write(
            child.join("chatset.jsonc"),
            r#"{ "convert": { "target": "sharegpt" } }"#,
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_project(&child).unwrap();
        let convert = loader.config().convert();

        assert_eq!(convert.target, Some(TargetFormat::ShareGpt));
        assert_eq!(convert.strict, Some(true));
        assert_eq!(loader.config_paths().len(), 2);
    }

    #[test]
    fn test_load_project_stops_at_git_root() {
        let temp = TestDir::new("chatset_config_gitroot");
        let outer = temp.path.join("outer");
        let repo = outer.join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        fs::write(
            outer.join("chatset.jsonc"),
            r#"{ "logLevel": "debug" }"#,
        )
        .unwrap();
        fs::write(repo.join("chatset.json"), r#"{ "hub": { "private": true } }"#).unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_project(&repo).unwrap();
        let cfg = loader.config();

        assert_eq!(cfg.log_level, None);
        assert_eq!(cfg.hub().private, Some(true));
    }

    #[test]
    fn test_load_all_requires_explicit_file_to_exist() {
        let temp = TestDir::new("chatset_config_explicit");
        fs::create_dir_all(temp.path.join(".git")).unwrap();
        let mut loader = ConfigLoader::new();
        let err = loader
            .load_all(&temp.path, Some(&temp.path.join("custom.jsonc")))
            .unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
