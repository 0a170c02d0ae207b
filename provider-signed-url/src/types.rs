//! Signing API request and response types

use serde::{Deserialize, Serialize};

/// Body of a sign request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Requested link lifetime in seconds
    pub expires_in: u64,
}

/// Sign response.
///
/// The URL may be absolute or relative to the storage API base.
#[derive(Debug, Clone, Deserialize)]
pub struct SignResponse {
    #[serde(alias = "signedURL", alias = "signed_url", rename = "signedUrl")]
    pub signed_url: String,
}

/// Error body returned by the storage API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_response_accepts_field_spellings() {
        let a: SignResponse = serde_json::from_str(r#"{"signedUrl":"https://x"}"#).unwrap();
        let b: SignResponse = serde_json::from_str(r#"{"signedURL":"/object/x"}"#).unwrap();
        assert_eq!(a.signed_url, "https://x");
        assert_eq!(b.signed_url, "/object/x");
    }

    #[test]
    fn sign_request_is_camel_case() {
        let json = serde_json::to_string(&SignRequest { expires_in: 3600 }).unwrap();
        assert_eq!(json, r#"{"expiresIn":3600}"#);
    }
}
