use chatset_types::{
    AlpacaPick, Content, DetectOrder, FallbackPolicy, OpenAiMessage, RecordShape, ShareGptTurn,
    TargetFormat, CONVERSATIONS_KEY, GPT, HUMAN, MESSAGES_KEY,
};
use serde_json::{json, Map, Value};

use crate::content::flatten_content;
use crate::roles::RoleMap;

const USER_ROLE: &str = "user";
const ASSISTANT_ROLE: &str = "assistant";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvertOptions {
    pub target: TargetFormat,
    pub detect: DetectOrder,
    pub roles: RoleMap,
    pub alpaca_pick: AlpacaPick,
    pub fallback: FallbackPolicy,
    pub strict: bool,
}

impl ConvertOptions {
    pub fn for_target(target: TargetFormat) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Emit(Value),
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("no conversations, messages or instruction/output fields")]
    UnknownShape,

    #[error("`{key}` is not an array")]
    NotAnArray { key: &'static str },

    #[error("invalid message at position {position}: {message}")]
    InvalidMessage { position: usize, message: String },

    #[error("unsupported content type at position {position}")]
    UnsupportedContent { position: usize },

    #[error("invalid conversation turn at position {position}: needs `from` and `value`")]
    InvalidTurn { position: usize },

    #[error("no non-empty human turn")]
    MissingHuman,

    #[error("no non-empty gpt turn")]
    MissingGpt,
}

/// Converts one dataset entry into the configured target shape.
///
/// Records already in the target shape are emitted verbatim, everything else
/// is rebuilt from the flattened turns. A record is only emitted when it has
/// at least one non-empty human turn and one non-empty gpt turn.
pub fn normalize_record(record: &Value, options: &ConvertOptions) -> Outcome {
    match try_normalize(record, options) {
        Ok(value) => Outcome::Emit(value),
        Err(reason) => Outcome::Skip(reason),
    }
}

fn try_normalize(record: &Value, options: &ConvertOptions) -> Result<Value, SkipReason> {
    let obj = record.as_object().ok_or(SkipReason::NotAnObject)?;
    let shape = RecordShape::detect(record, options.detect);

    // OpenAI roles of the turns, kept only for `messages` input.
    let mut source_roles: Option<Vec<String>> = None;
    let turns = match shape {
        RecordShape::Conversations => sharegpt_turns(obj)?,
        RecordShape::Messages => {
            let (roles, turns): (Vec<String>, Vec<ShareGptTurn>) =
                openai_turns(obj, &options.roles)?.into_iter().unzip();
            source_roles = Some(roles);
            turns
        }
        RecordShape::Alpaca => alpaca_turns(obj),
        RecordShape::Unknown => return Err(SkipReason::UnknownShape),
    };
    require_pair(&turns)?;

    let value = match options.target {
        TargetFormat::ShareGpt if shape == RecordShape::Conversations => record.clone(),
        TargetFormat::ShareGpt => json!({ CONVERSATIONS_KEY: turns }),
        TargetFormat::Alpaca if shape == RecordShape::Alpaca => record.clone(),
        TargetFormat::Alpaca => {
            let (instruction, output) = pick_pair(&turns, source_roles.as_deref(), options.alpaca_pick)?;
            json!({
                "instruction": instruction,
                "input": "",
                "output": output,
            })
        }
        TargetFormat::OpenAi if shape == RecordShape::Messages => record.clone(),
        TargetFormat::OpenAi => {
            let messages: Vec<OpenAiMessage> = turns
                .into_iter()
                .map(|turn| OpenAiMessage {
                    role: options.roles.to_openai(&turn.from),
                    content: Content::Text(turn.value),
                })
                .collect();
            json!({ MESSAGES_KEY: messages })
        }
    };

    Ok(value)
}

fn sharegpt_turns(obj: &Map<String, Value>) -> Result<Vec<ShareGptTurn>, SkipReason> {
    let items = obj
        .get(CONVERSATIONS_KEY)
        .and_then(Value::as_array)
        .ok_or(SkipReason::NotAnArray {
            key: CONVERSATIONS_KEY,
        })?;

    items
        .iter()
        .enumerate()
        .map(|(position, item)| -> Result<ShareGptTurn, SkipReason> {
            let turn = item.as_object().ok_or(SkipReason::InvalidTurn { position })?;
            let (Some(from), Some(value)) = (turn.get("from"), turn.get("value")) else {
                return Err(SkipReason::InvalidTurn { position });
            };
            Ok(ShareGptTurn::new(value_text(from), value_text(value)))
        })
        .collect()
}

/// Turns paired with the OpenAI role each message carried.
fn openai_turns(
    obj: &Map<String, Value>,
    roles: &RoleMap,
) -> Result<Vec<(String, ShareGptTurn)>, SkipReason> {
    let items = obj
        .get(MESSAGES_KEY)
        .and_then(Value::as_array)
        .ok_or(SkipReason::NotAnArray { key: MESSAGES_KEY })?;

    items
        .iter()
        .enumerate()
        .map(|(position, item)| -> Result<(String, ShareGptTurn), SkipReason> {
            if let Some(content) = item.get("content") {
                if !matches!(content, Value::Null | Value::String(_) | Value::Array(_)) {
                    return Err(SkipReason::UnsupportedContent { position });
                }
            }
            let message: OpenAiMessage =
                serde_json::from_value(item.clone()).map_err(|e| SkipReason::InvalidMessage {
                    position,
                    message: e.to_string(),
                })?;
            let turn = ShareGptTurn::new(
                roles.to_sharegpt(&message.role),
                flatten_content(&message.content),
            );
            Ok((message.role, turn))
        })
        .collect()
}

fn alpaca_turns(obj: &Map<String, Value>) -> Vec<ShareGptTurn> {
    let field = |key: &str| obj.get(key).map(value_text).unwrap_or_default();
    let instruction = field("instruction");
    let input = field("input");
    let human = if input.is_empty() {
        instruction
    } else {
        format!("{}\n{}", instruction, input)
    };
    vec![
        ShareGptTurn::new(HUMAN, human),
        ShareGptTurn::new(GPT, field("output")),
    ]
}

/// Strings as-is, `null` as empty, anything else in its JSON spelling.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn non_empty<'a>(turns: &'a [ShareGptTurn], from: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    turns
        .iter()
        .filter(move |t| t.from == from && !t.value.is_empty())
        .map(|t| t.value.as_str())
}

fn require_pair(turns: &[ShareGptTurn]) -> Result<(), SkipReason> {
    if non_empty(turns, HUMAN).next().is_none() {
        return Err(SkipReason::MissingHuman);
    }
    if non_empty(turns, GPT).next().is_none() {
        return Err(SkipReason::MissingGpt);
    }
    Ok(())
}

/// Whether a turn can fill the Alpaca side named by `side` (`HUMAN` for
/// `instruction`, `GPT` for `output`). Turns built from OpenAI messages are
/// judged by their original role, so a `system` prompt remapped to `gpt`
/// never becomes the output.
fn feeds_alpaca_side(turn: &ShareGptTurn, source_role: Option<&str>, side: &str) -> bool {
    match source_role {
        Some(role) if side == HUMAN => role == USER_ROLE,
        Some(role) => role == ASSISTANT_ROLE,
        None => turn.from == side,
    }
}

fn pick_pair<'a>(
    turns: &'a [ShareGptTurn],
    source_roles: Option<&[String]>,
    pick: AlpacaPick,
) -> Result<(&'a str, &'a str), SkipReason> {
    let choose = |side: &'static str| -> Option<&'a str> {
        let mut candidates = turns
            .iter()
            .enumerate()
            .filter(|(index, turn)| {
                let source_role = source_roles.and_then(|roles| roles.get(*index));
                !turn.value.is_empty()
                    && feeds_alpaca_side(turn, source_role.map(String::as_str), side)
            })
            .map(|(_, turn)| turn.value.as_str());
        match pick {
            AlpacaPick::First => candidates.next(),
            AlpacaPick::Last => candidates.last(),
        }
    };
    let instruction = choose(HUMAN).ok_or(SkipReason::MissingHuman)?;
    let output = choose(GPT).ok_or(SkipReason::MissingGpt)?;
    Ok((instruction, output))
}
