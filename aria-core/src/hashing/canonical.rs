use serde_json::Value;
use sha2::{Digest, Sha256};

/// Top level key that carries an event's content hash
pub const HASH_FIELD_NAME: &str = "uniqueId";

/// Errors raised while normalizing or rewriting JSON text
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The input is not valid JSON
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON is valid but not shaped as required
    #[error("unexpected JSON structure: {0}")]
    Structural(String),
}

/// Re-serialize JSON onto one line with no insignificant whitespace
///
/// Object keys keep their input order.
pub fn canonicalize(json: &str) -> Result<String, HashError> {
    let value: Value = serde_json::from_str(json)?;
    Ok(value.to_string())
}

/// Content hash of a JSON document, independent of its formatting
pub fn hash_json(json: &str) -> Result<String, HashError> {
    Ok(digest(canonicalize(json)?.as_bytes()))
}

/// Content hash of an already parsed JSON value
pub fn hash_value(value: &Value) -> String {
    digest(value.to_string().as_bytes())
}

/// Content hash of an ordered sequence of optional strings
///
/// Each entry is tagged and length prefixed, so `[None, "a"]`, `["a", None]`,
/// `["ab"]` and `["a", "b"]` all hash differently.
pub fn hash_of<I, S>(items: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for item in items {
        match item {
            None => hasher.update([0u8]),
            Some(s) => {
                let bytes = s.as_ref().as_bytes();
                hasher.update([1u8]);
                hasher.update((bytes.len() as u64).to_le_bytes());
                hasher.update(bytes);
            }
        }
    }
    hex::encode(hasher.finalize())
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Insert `"name": value` as the first entry of a top level JSON object
///
/// The text is edited in place rather than re-serialized, so the rest of the
/// document keeps its formatting. Single line input stays on one line;
/// multi-line input gets a new line indented like the first existing key.
pub fn with_injected_field(json: &str, name: &str, value: &Value) -> Result<String, HashError> {
    let parsed: Value = serde_json::from_str(json)?;
    let object = parsed
        .as_object()
        .ok_or_else(|| HashError::Structural("top level JSON is not an object".into()))?;

    if object.contains_key(name) {
        return Err(HashError::Structural(format!(
            "object already has a '{}' field",
            name
        )));
    }

    // valid JSON whose top level is an object starts with '{' after whitespace
    let brace = json
        .find('{')
        .ok_or_else(|| HashError::Structural("missing opening brace".into()))?;
    let after_brace = brace + 1;

    let entry = format!("{}: {}", Value::String(name.to_string()), value);
    let separator = if object.is_empty() { "" } else { "," };

    let mut output = String::with_capacity(json.len() + entry.len() + 8);
    output.push_str(&json[..after_brace]);

    if json.contains('\n') {
        // copy the whitespace in front of the first key (tabs, spaces, ...)
        let rest = &json[after_brace..];
        let indent_len = rest.len() - rest.trim_start().len();
        output.push_str(&rest[..indent_len]);
    }

    output.push_str(&entry);
    output.push_str(separator);
    output.push_str(&json[after_brace..]);
    Ok(output)
}

/// Hash the JSON then insert the hash as its first field, `uniqueId`
pub fn add_hash(json: &str) -> Result<String, HashError> {
    let hash = hash_json(json)?;
    with_injected_field(json, HASH_FIELD_NAME, &Value::String(hash))
}

/// Pull pretty printed arrays of scalars back onto a single line
///
/// `"histogram": [\n    0,\n    1\n  ]` becomes `"histogram": [0, 1]`.
/// Only arrays of numbers (or other comma free scalars) are supported.
pub fn collapse_vertical_arrays(json: &str) -> String {
    const VERTICAL_ARRAY: &str = ": [\n";

    let mut output = String::with_capacity(json.len());
    let mut rest = json;

    while let Some(start) = rest.find(VERTICAL_ARRAY) {
        let open = start + 2;
        let Some(close) = rest[open..].find(']').map(|i| open + i) else {
            break;
        };

        output.push_str(&rest[..=open]);
        let items: Vec<&str> = rest[open + 1..close].split(',').map(str::trim).collect();
        output.push_str(&items.join(", "));
        rest = &rest[close..];
    }

    output.push_str(rest);
    output
}
