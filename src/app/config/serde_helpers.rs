/// `Vec<(String, String)>` stored as a TOML table.
pub mod pairs_as_map {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

/// Parses `key=value` for repeatable `--tag` arguments.
pub fn parse_tag(input: &str) -> Result<(String, String), String> {
    split_pair(input, '=')
}

/// Parses `name:value` for repeatable `--header` arguments.
pub fn parse_header(input: &str) -> Result<(String, String), String> {
    split_pair(input, ':')
}

fn split_pair(input: &str, separator: char) -> Result<(String, String), String> {
    let Some((key, value)) = input.split_once(separator) else {
        return Err(format!("expected KEY{separator}VALUE, got '{input}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{input}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Helper function to load and parse an environment variable.
/// Returns Ok(()) if the variable doesn't exist (keeps default).
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), super::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load an optional string environment variable.
pub fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

/// Helper function to load a string environment variable.
pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

/// Helper function to load an optional PathBuf environment variable.
pub fn load_env_path_opt(name: &str, target: &mut Option<std::path::PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(std::path::PathBuf::from(value));
    }
}
