use super::WallspaceConfig;

/// Generates a JSON Schema for the wallspace configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(WallspaceConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert(
            "$id".to_string(),
            serde_json::json!(
                "https://raw.githubusercontent.com/wallspace/wallspace/main/wallspace.schema.json"
            ),
        );
    }

    schema
}

/// Generates a pretty-printed JSON Schema string for the wallspace configuration.
#[must_use]
pub fn generate_schema_json() -> String {
    let schema = generate_schema();
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_schema_produces_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema_json()).unwrap();

        assert!(parsed["$id"].as_str().unwrap().ends_with("wallspace.schema.json"));
        assert_eq!(parsed["title"], "WallspaceConfig");
        assert!(parsed["properties"]["settleDelayMs"].is_object());
        assert!(parsed["properties"]["shellProcesses"].is_object());
        assert!(parsed["properties"]["screenSaverDirectories"].is_object());
    }
}
