//! Built-in example records written when nothing converts and the fallback
//! policy asks for samples.

use chatset_types::{AlpacaRecord, ShareGptRecord, ShareGptTurn, TargetFormat, GPT, HUMAN, SYSTEM};
use serde_json::{json, Value};

use crate::roles::RoleMap;

const SYSTEM_PROMPT: &str = "You are a helpful visual assistant.";

const EXAMPLES: [(&str, &str); 3] = [
    (
        "What is shown in this image?<img>https://example.com/sample.jpg</img>",
        "The image shows a mountain landscape with a lake and trees in the foreground.",
    ),
    (
        "Describe what you see in this chart.<img>https://example.com/chart.jpg</img>",
        "This is a bar chart showing sales data for different product categories. The 'Electronics' category has the highest sales.",
    ),
    (
        "Look at this image and tell me what tools you can identify.<img>https://example.com/tools.jpg</img>",
        "I can see three tools: a hammer, a screwdriver, and a wrench. The hammer is red, the screwdriver is yellow, and the wrench is silver.",
    ),
];

pub fn sharegpt_samples() -> Vec<ShareGptRecord> {
    EXAMPLES
        .iter()
        .take(2)
        .map(|(question, answer)| ShareGptRecord {
            conversations: vec![
                ShareGptTurn::new(SYSTEM, SYSTEM_PROMPT),
                ShareGptTurn::new(HUMAN, *question),
                ShareGptTurn::new(GPT, *answer),
            ],
        })
        .collect()
}

pub fn alpaca_samples() -> Vec<AlpacaRecord> {
    EXAMPLES
        .iter()
        .map(|(question, answer)| AlpacaRecord::new(*question, *answer))
        .collect()
}

/// Sample records for `target`, already in output form.
pub fn fallback_records(target: TargetFormat) -> Vec<Value> {
    match target {
        TargetFormat::ShareGpt => sharegpt_samples().iter().map(|r| json!(r)).collect(),
        TargetFormat::Alpaca => alpaca_samples().iter().map(|r| json!(r)).collect(),
        TargetFormat::OpenAi => {
            let roles = RoleMap::default();
            sharegpt_samples()
                .iter()
                .map(|record| {
                    let messages: Vec<Value> = record
                        .conversations
                        .iter()
                        .map(|turn| {
                            json!({ "role": roles.to_openai(&turn.from), "content": turn.value })
                        })
                        .collect();
                    json!({ "messages": messages })
                })
                .collect()
        }
    }
}
