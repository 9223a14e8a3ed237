use chatset_types::{AlpacaPick, DetectOrder, FallbackPolicy, TargetFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(
        rename = "logLevel",
        alias = "log_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub log_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub convert: Option<ConvertConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub: Option<HubConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConvertConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detect: Option<DetectOrder>,
    /// OpenAI role -> ShareGPT `from` overrides, e.g. `{"system": "gpt"}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<HashMap<String, String>>,
    #[serde(alias = "alpaca_pick", skip_serializing_if = "Option::is_none")]
    pub alpaca_pick: Option<AlpacaPick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(alias = "in_place", skip_serializing_if = "Option::is_none")]
    pub in_place: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(alias = "repo_id", skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    #[serde(alias = "adapter_dir", skip_serializing_if = "Option::is_none")]
    pub adapter_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(alias = "base_model", skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    #[serde(alias = "lora_rank", skip_serializing_if = "Option::is_none")]
    pub lora_rank: Option<u32>,
    #[serde(alias = "target_modules", skip_serializing_if = "Option::is_none")]
    pub target_modules: Option<String>,
    #[serde(alias = "training_data", skip_serializing_if = "Option::is_none")]
    pub training_data: Option<String>,
    #[serde(alias = "commit_message", skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

trait DeepMerge {
    fn deep_merge(&mut self, other: Self);
}

impl DeepMerge for ConvertConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.target, other.target);
        merge_option_replace(&mut self.input, other.input);
        merge_option_replace(&mut self.output, other.output);
        merge_option_replace(&mut self.detect, other.detect);
        merge_option_map_overwrite_values(&mut self.roles, other.roles);
        merge_option_replace(&mut self.alpaca_pick, other.alpaca_pick);
        merge_option_replace(&mut self.fallback, other.fallback);
        merge_option_replace(&mut self.strict, other.strict);
        merge_option_replace(&mut self.in_place, other.in_place);
    }
}

impl DeepMerge for HubConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.endpoint, other.endpoint);
        merge_option_replace(&mut self.repo_id, other.repo_id);
        merge_option_replace(&mut self.adapter_dir, other.adapter_dir);
        merge_option_replace(&mut self.token, other.token);
        merge_option_replace(&mut self.private, other.private);
        merge_option_replace(&mut self.base_model, other.base_model);
        merge_option_replace(&mut self.lora_rank, other.lora_rank);
        merge_option_replace(&mut self.target_modules, other.target_modules);
        merge_option_replace(&mut self.training_data, other.training_data);
        merge_option_replace(&mut self.commit_message, other.commit_message);
    }
}

fn merge_option_replace<T>(target: &mut Option<T>, source: Option<T>) {
    if let Some(value) = source {
        *target = Some(value);
    }
}

fn merge_option_deep<T: DeepMerge>(target: &mut Option<T>, source: Option<T>) {
    if let Some(source_value) = source {
        if let Some(target_value) = target {
            target_value.deep_merge(source_value);
        } else {
            *target = Some(source_value);
        }
    }
}

fn merge_option_map_overwrite_values<T>(
    target: &mut Option<HashMap<String, T>>,
    source: Option<HashMap<String, T>>,
) {
    if let Some(source_map) = source {
        if let Some(target_map) = target {
            for (key, value) in source_map {
                target_map.insert(key, value);
            }
        } else {
            *target = Some(source_map);
        }
    }
}

impl Config {
    /// Field-wise merge; values present in `other` win.
    pub fn merge(&mut self, other: Config) {
        merge_option_replace(&mut self.schema, other.schema);
        merge_option_replace(&mut self.log_level, other.log_level);
        merge_option_deep(&mut self.convert, other.convert);
        merge_option_deep(&mut self.hub, other.hub);
    }

    pub fn convert(&self) -> ConvertConfig {
        self.convert.clone().unwrap_or_default()
    }

    pub fn hub(&self) -> HubConfig {
        self.hub.clone().unwrap_or_default()
    }
}
