use chatset_types::{GPT, HUMAN, SYSTEM};
use std::collections::HashMap;

/// OpenAI role -> ShareGPT `from` lookup. Roles without an entry pass
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMap {
    entries: HashMap<String, String>,
}

impl Default for RoleMap {
    fn default() -> Self {
        let entries = [("system", SYSTEM), ("user", HUMAN), ("assistant", GPT)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }
}

impl RoleMap {
    /// Default table with `overrides` layered on top.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::default();
        for (role, from) in overrides {
            map.entries.insert(role.into(), from.into());
        }
        map
    }

    /// Collapses `system` turns into the assistant side.
    pub fn fold_system_into_gpt() -> Self {
        Self::with_overrides([("system", GPT)])
    }

    pub fn to_sharegpt(&self, role: &str) -> String {
        self.entries
            .get(role)
            .cloned()
            .unwrap_or_else(|| role.to_string())
    }

    /// Reverse direction used for the OpenAI target. Fixed table: a folded
    /// `system -> gpt` mapping cannot be undone.
    pub fn to_openai(&self, from: &str) -> String {
        match from {
            HUMAN => "user".to_string(),
            GPT => "assistant".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let map = RoleMap::default();
        assert_eq!(map.to_sharegpt("system"), "system");
        assert_eq!(map.to_sharegpt("user"), "human");
        assert_eq!(map.to_sharegpt("assistant"), "gpt");
    }

    #[test]
    fn unknown_roles_pass_through() {
        let map = RoleMap::default();
        assert_eq!(map.to_sharegpt("tool"), "tool");
        assert_eq!(map.to_openai("observation"), "observation");
    }

    #[test]
    fn fold_system() {
        let map = RoleMap::fold_system_into_gpt();
        assert_eq!(map.to_sharegpt("system"), "gpt");
        assert_eq!(map.to_sharegpt("user"), "human");
    }

    #[test]
    fn reverse_mapping() {
        let map = RoleMap::default();
        assert_eq!(map.to_openai("human"), "user");
        assert_eq!(map.to_openai("gpt"), "assistant");
        assert_eq!(map.to_openai("system"), "system");
    }
}
