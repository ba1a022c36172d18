pub mod check;
pub mod list;
pub mod remove;
pub mod show;
pub mod tree;

use std::path::Path;

use matters_core::{Matcher, Matter, MatterId, MattersStore, StoreConfig, Value};
use serde::Deserialize;
use tracing::debug;

/// Accepted snapshot layouts: a bare array, or an object with a `matters` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Bare(Vec<Matter>),
    Wrapped { matters: Vec<Matter> },
}

/// Read the matters in a snapshot file without validating them.
fn read_matters(path: &Path) -> Result<Vec<Matter>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not a matters snapshot: {e}", path.display()))?;
    let matters = match snapshot {
        Snapshot::Bare(matters) | Snapshot::Wrapped { matters } => matters,
    };
    debug!(path = %path.display(), matters = matters.len(), "read snapshot");
    Ok(matters)
}

/// Read and bulk-load a snapshot file.
fn load_store(path: &Path, config: StoreConfig) -> Result<MattersStore, String> {
    let matters = read_matters(path)?;
    MattersStore::load_with_config(config, matters).map_err(|e| e.to_string())
}

/// Write the store back as a bare array, ordered by id.
fn save_store(path: &Path, store: &MattersStore) -> Result<(), String> {
    let json = serde_json::to_string_pretty(&store.snapshot()).map_err(|e| e.to_string())?;
    std::fs::write(path, json + "\n").map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    debug!(path = %path.display(), matters = store.len(), "wrote snapshot");
    Ok(())
}

/// Accept a full id or an unambiguous prefix.
fn resolve_id(store: &MattersStore, input: &str) -> Result<MatterId, String> {
    let exact = MatterId::from(input);
    if store.contains(&exact) {
        return Ok(exact);
    }

    let candidates: Vec<&MatterId> = store
        .ids()
        .into_iter()
        .filter(|id| id.as_str().starts_with(input))
        .collect();
    match candidates.as_slice() {
        [] => Err(format!("matter not found: \"{input}\"")),
        [id] => Ok((*id).clone()),
        many => Err(format!(
            "\"{input}\" is ambiguous: matches {}",
            many.iter().map(|id| id.short()).collect::<Vec<_>>().join(", ")
        )),
    }
}

/// Interpret a command-line literal as a property value.
fn parse_value(input: &str) -> Value {
    match input {
        "null" => Value::Null,
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => match input.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::from_wire(input),
        },
    }
}

/// Split `key=value` or `key~regex` into a key and matcher.
fn parse_condition(input: &str) -> Result<(String, Matcher), String> {
    let split = input
        .char_indices()
        .find(|(_, c)| *c == '=' || *c == '~')
        .ok_or_else(|| format!("expected key=value or key~regex, got \"{input}\""))?;
    let (key, rest) = input.split_at(split.0);
    if key.is_empty() {
        return Err(format!("missing key in \"{input}\""));
    }
    let operand = &rest[1..];

    let matcher = if split.1 == '~' {
        Matcher::pattern(operand).map_err(|e| format!("invalid pattern \"{operand}\": {e}"))?
    } else {
        Matcher::from(parse_value(operand))
    };
    Ok((key.to_string(), matcher))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_literals() {
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("true"), Value::Boolean(true));
        assert_eq!(parse_value("2.5"), Value::Number(2.5));
        assert_eq!(parse_value("@@tex"), Value::link("tex"));
        assert_eq!(parse_value("mesh"), Value::from("mesh"));
        assert_eq!(parse_value("NaN"), Value::from("NaN"));
    }

    #[test]
    fn parse_condition_forms() {
        let (key, matcher) = parse_condition("kind=mesh").unwrap();
        assert_eq!(key, "kind");
        assert!(matcher.matches(&Value::from("mesh")));

        let (key, matcher) = parse_condition("name~^cr").unwrap();
        assert_eq!(key, "name");
        assert!(matcher.matches(&Value::from("crate")));
        assert!(!matcher.matches(&Value::from("barrel")));

        assert!(parse_condition("novalue").is_err());
        assert!(parse_condition("=x").is_err());
        assert!(parse_condition("k~(").is_err());
    }
}
