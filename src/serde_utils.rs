use serde::{Deserialize, Deserializer};

/// Treats `null`, a missing value and `""` alike; the upload endpoint uses all three for
/// "no back side".
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct TestStruct {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        url: Option<String>,
    }

    #[test]
    fn test_empty_string_as_none() {
        let empty: TestStruct = serde_json::from_str(r#"{"url": ""}"#).unwrap();
        assert_eq!(empty.url, None);

        let null: TestStruct = serde_json::from_str(r#"{"url": null}"#).unwrap();
        assert_eq!(null.url, None);

        let missing: TestStruct = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.url, None);

        let present: TestStruct = serde_json::from_str(r#"{"url": "/uploads/b.png"}"#).unwrap();
        assert_eq!(present.url.as_deref(), Some("/uploads/b.png"));
    }
}
