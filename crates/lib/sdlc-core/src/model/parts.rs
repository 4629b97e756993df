//! Response fragment extraction.
//!
//! A generation response carries an ordered list of content parts. Text parts
//! are what the caller wants; anything else is kept as a structured fragment
//! so it can still be surfaced when no text came back.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    Structured(Value),
}

impl Fragment {
    /// Classifies one content part.
    #[must_use]
    pub fn from_part(part: &Value) -> Self {
        match part.get("text").and_then(Value::as_str) {
            Some(text) => Self::Text(text.to_string()),
            None => Self::Structured(part.clone()),
        }
    }
}

/// Fragments from the first candidate of a `generateContent` response, with
/// the candidate's finish reason.
#[must_use]
pub fn candidate_fragments(response: &Value) -> (Vec<Fragment>, Option<String>) {
    let Some(candidate) = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
    else {
        return (Vec::new(), None);
    };

    let finish_reason = candidate
        .get("finishReason")
        .and_then(Value::as_str)
        .map(str::to_string);

    let fragments = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().map(Fragment::from_part).collect())
        .unwrap_or_default();

    (fragments, finish_reason)
}

/// Concatenates text fragments in order.
///
/// Falls back to the serialized structured fragments when there is no text,
/// and returns `None` when there are no fragments at all.
#[must_use]
pub fn concat_fragments(fragments: &[Fragment]) -> Option<String> {
    if fragments.is_empty() {
        return None;
    }

    let texts: Vec<&str> = fragments
        .iter()
        .filter_map(|fragment| match fragment {
            Fragment::Text(text) => Some(text.as_str()),
            Fragment::Structured(_) => None,
        })
        .collect();
    if !texts.is_empty() {
        return Some(texts.concat());
    }

    Some(
        fragments
            .iter()
            .filter_map(|fragment| match fragment {
                Fragment::Structured(value) => Some(value.to_string()),
                Fragment::Text(_) => None,
            })
            .collect(),
    )
}
