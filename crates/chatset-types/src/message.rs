use serde::{Deserialize, Serialize};

/// One entry of an OpenAI-style `messages` array.
///
/// Roles stay plain strings: anything outside `system`/`user`/`assistant`
/// has to survive conversion untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAiMessage {
    pub role: String,
    #[serde(default = "default_content", deserialize_with = "deserialize_content")]
    pub content: Content,
}

fn default_content() -> Content {
    Content::Text(String::new())
}

/// Deserialize content that may be `null`; it is treated the same as an
/// empty string.
fn deserialize_content<'de, D>(deserializer: D) -> Result<Content, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Content> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_else(default_content))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
            image_url: None,
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            content_type: "image_url".to_string(),
            text: None,
            image_url: Some(ImageUrl::Url(url.into())),
        }
    }
}

/// Datasets in the wild carry either the bare URL string or the
/// chat-completions object form `{"url": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ImageUrl {
    Url(String),
    Object { url: String },
}

impl ImageUrl {
    pub fn url(&self) -> &str {
        match self {
            ImageUrl::Url(url) => url,
            ImageUrl::Object { url } => url,
        }
    }
}
