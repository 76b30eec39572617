use std::collections::HashMap;

/// Structured data attached to a log entry by the caller.
///
/// Keys and values are written as given; nothing stops a payload from using a key the logger
/// itself writes.
pub type Payload = HashMap<String, serde_json::Value>;

/// The field set of a single record.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Copies every pair of `payload` into a [`Fields`] map.
pub fn to_fields(payload: &Payload) -> Fields {
    payload
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{to_fields, Payload};

    #[test]
    fn keeps_every_pair_unchanged() {
        let payload = Payload::from([
            ("count".to_owned(), json!(3)),
            ("nested".to_owned(), json!({"a": [1, 2, null]})),
            ("message".to_owned(), json!("not special here")),
        ]);

        let fields = to_fields(&payload);

        assert_eq!(fields.len(), payload.len());
        for (key, value) in &payload {
            assert_eq!(fields.get(key), Some(value));
        }
    }

    #[test]
    fn empty_payload() {
        assert!(to_fields(&Payload::new()).is_empty());
    }
}
