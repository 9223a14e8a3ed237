use std::fmt;
use std::str::FromStr;

use crate::error::HubError;

/// `owner/name` identifier of a model repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoId {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some((owner, name)) = trimmed.split_once('/') else {
            return Err(HubError::InvalidRepoId(s.to_string()));
        };
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid(owner) || !valid(name) {
            return Err(HubError::InvalidRepoId(s.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let repo: RepoId = "srai86825/qwen-vl-tool-assistant-lora".parse().unwrap();
        assert_eq!(repo.owner, "srai86825");
        assert_eq!(repo.name, "qwen-vl-tool-assistant-lora");
        assert_eq!(repo.to_string(), "srai86825/qwen-vl-tool-assistant-lora");
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["adapter", "/adapter", "me/", "me/a/b", "me/has space"] {
            assert!(bad.parse::<RepoId>().is_err(), "{} should be rejected", bad);
        }
    }
}
