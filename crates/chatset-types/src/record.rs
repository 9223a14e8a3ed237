use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of the ShareGPT conversation array.
pub const CONVERSATIONS_KEY: &str = "conversations";
/// Key of the OpenAI message array.
pub const MESSAGES_KEY: &str = "messages";

pub const HUMAN: &str = "human";
pub const GPT: &str = "gpt";
pub const SYSTEM: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareGptTurn {
    pub from: String,
    pub value: String,
}

impl ShareGptTurn {
    pub fn new(from: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareGptRecord {
    pub conversations: Vec<ShareGptTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlpacaRecord {
    pub instruction: String,
    pub input: String,
    pub output: String,
}

impl AlpacaRecord {
    pub fn new(instruction: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            input: String::new(),
            output: output.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    ShareGpt,
    Alpaca,
    OpenAi,
}

impl TargetFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShareGpt => "sharegpt",
            Self::Alpaca => "alpaca",
            Self::OpenAi => "openai",
        }
    }

    /// File name written when no output path is configured.
    pub fn default_output_file(self) -> &'static str {
        match self {
            Self::ShareGpt => "dataset_sharegpt.json",
            Self::Alpaca => "alpaca_data_cleaned.json",
            Self::OpenAi => "dataset_openai.json",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which array key wins when a record carries both.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DetectOrder {
    #[default]
    ConversationsFirst,
    MessagesFirst,
}

impl DetectOrder {
    pub fn keys(self) -> [&'static str; 2] {
        match self {
            Self::ConversationsFirst => [CONVERSATIONS_KEY, MESSAGES_KEY],
            Self::MessagesFirst => [MESSAGES_KEY, CONVERSATIONS_KEY],
        }
    }
}

/// Which human/gpt turn feeds an Alpaca record when a conversation has
/// several.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlpacaPick {
    #[default]
    First,
    Last,
}

/// What to write when no record survives conversion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    Error,
    Samples,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Conversations,
    Messages,
    Alpaca,
    Unknown,
}

impl RecordShape {
    /// Classifies a raw dataset entry. Only key presence is checked.
    pub fn detect(value: &serde_json::Value, order: DetectOrder) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::Unknown;
        };
        for key in order.keys() {
            if obj.contains_key(key) {
                return if key == CONVERSATIONS_KEY {
                    Self::Conversations
                } else {
                    Self::Messages
                };
            }
        }
        if obj.contains_key("instruction") && obj.contains_key("output") {
            return Self::Alpaca;
        }
        Self::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversations => "conversations",
            Self::Messages => "messages",
            Self::Alpaca => "alpaca",
            Self::Unknown => "unknown",
        }
    }
}
