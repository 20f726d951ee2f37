//! ContentMap: the opaque payload carried by a node.

use std::collections::HashMap;

use super::Value;
use crate::{Error, Result};

/// A map of content keys to values. Never interpreted by the engine.
pub type ContentMap = HashMap<String, Value>;

/// Shallow merge: every key in `patch` overwrites the same key in `target`.
pub fn merge_content(target: &mut ContentMap, patch: ContentMap) {
    target.extend(patch);
}

/// Reject content that could not survive a round trip through JSON.
pub fn check_content(content: &ContentMap) -> Result<()> {
    match content.iter().find(|(_, v)| !v.is_finite()) {
        Some((key, _)) => Err(Error::InvalidContent(format!("`{key}` holds a non-finite number"))),
        None => Ok(()),
    }
}

/// Build a content map from an untyped JSON object.
pub fn content_from_json(object: serde_json::Map<String, serde_json::Value>) -> ContentMap {
    object.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let mut content = ContentMap::new();
        content.insert("text".into(), Value::from("draft"));
        content.insert("votes".into(), Value::from(1));

        let mut patch = ContentMap::new();
        patch.insert("text".into(), Value::from("final"));
        merge_content(&mut content, patch);

        assert_eq!(content.get("text"), Some(&Value::from("final")));
        assert_eq!(content.get("votes"), Some(&Value::from(1)));
    }

    #[test]
    fn test_check_content_names_the_offending_key() {
        let mut content = ContentMap::new();
        content.insert("text".into(), Value::from("fine"));
        assert!(check_content(&content).is_ok());

        content.insert("score".into(), Value::Float(f64::INFINITY));
        let err = check_content(&content).unwrap_err();
        assert!(matches!(err, Error::InvalidContent(ref msg) if msg.contains("score")));
    }
}
