use serde::{Deserialize, Deserializer, Serialize};

/// Identity token claims this service relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    #[serde(default)]
    pub sub: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Some providers encode this as the string `"true"`
    #[serde(default, deserialize_with = "bool_or_string")]
    pub email_verified: bool,
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_verified_variants() {
        let claims: IdTokenClaims =
            serde_json::from_value(json!({"email": "a@example.com", "email_verified": true}))
                .unwrap();
        assert!(claims.email_verified);

        let claims: IdTokenClaims =
            serde_json::from_value(json!({"email_verified": "true"})).unwrap();
        assert!(claims.email_verified);

        let claims: IdTokenClaims = serde_json::from_value(json!({"sub": "123"})).unwrap();
        assert!(!claims.email_verified);
        assert!(claims.email.is_none());
    }
}
