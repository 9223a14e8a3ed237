use chatset_types::{Content, ContentPart};

/// Wraps an image URL in the inline marker understood by the VL trainers.
pub fn image_tag(url: &str) -> String {
    format!("<img>{}</img>", url)
}

/// Flattens message content into a single string.
///
/// Text parts contribute their text, image parts contribute an
/// `<img>URL</img>` tag, other part types are dropped. Parts are joined with
/// `\n` in their original order.
pub fn flatten_content(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Parts(parts) => parts
            .iter()
            .filter_map(flatten_part)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn flatten_part(part: &ContentPart) -> Option<String> {
    match part.content_type.as_str() {
        "text" => Some(part.text.clone().unwrap_or_default()),
        "image_url" => Some(image_tag(
            part.image_url.as_ref().map(|u| u.url()).unwrap_or_default(),
        )),
        _ => None,
    }
}
