//! Authentication-format probe table.
//!
//! The upstream service does not document which header it expects the API
//! key in, so each call walks this table in order and stops at the first
//! response that is not a 401.

use reqwest::RequestBuilder;
use serde_json::{json, Value};

/// Where the credential goes on the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlacement {
    /// `name: [scheme ]<credential>`
    Header {
        name: &'static str,
        scheme: Option<&'static str>,
    },
    /// `?param=<credential>`, no auth header.
    Query { param: &'static str },
}

/// Shape of the JSON request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    /// `{type: "file_upload", images: [{type: "base64", value}]}`
    FileUpload,
    /// `{file, filename, filetype}`
    FlatFile,
}

/// One attempt in the probe sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeStep {
    pub name: &'static str,
    pub auth: AuthPlacement,
    pub body: BodyShape,
}

pub const PROBE_SEQUENCE: [ProbeStep; 5] = [
    ProbeStep {
        name: "apikey-header",
        auth: AuthPlacement::Header {
            name: "apikey",
            scheme: None,
        },
        body: BodyShape::FileUpload,
    },
    ProbeStep {
        name: "bearer",
        auth: AuthPlacement::Header {
            name: "Authorization",
            scheme: Some("Bearer"),
        },
        body: BodyShape::FileUpload,
    },
    ProbeStep {
        name: "api-key-header",
        auth: AuthPlacement::Header {
            name: "API-Key",
            scheme: None,
        },
        body: BodyShape::FileUpload,
    },
    ProbeStep {
        name: "apikey-header-flat-body",
        auth: AuthPlacement::Header {
            name: "apikey",
            scheme: None,
        },
        body: BodyShape::FlatFile,
    },
    ProbeStep {
        name: "apikey-query",
        auth: AuthPlacement::Query { param: "apikey" },
        body: BodyShape::FileUpload,
    },
];

impl ProbeStep {
    /// Header name and value this step sends, if it authenticates via header.
    pub fn auth_header(&self, credential: &str) -> Option<(&'static str, String)> {
        match self.auth {
            AuthPlacement::Header { name, scheme: None } => Some((name, credential.to_string())),
            AuthPlacement::Header {
                name,
                scheme: Some(scheme),
            } => Some((name, format!("{} {}", scheme, credential))),
            AuthPlacement::Query { .. } => None,
        }
    }

    /// Query pair this step sends, if it authenticates via query string.
    pub fn auth_query<'a>(&self, credential: &'a str) -> Option<(&'static str, &'a str)> {
        match self.auth {
            AuthPlacement::Query { param } => Some((param, credential)),
            AuthPlacement::Header { .. } => None,
        }
    }

    pub fn body(&self, encoded: &str, file_name: &str, file_type: &str) -> Value {
        match self.body {
            BodyShape::FileUpload => json!({
                "type": "file_upload",
                "images": [{ "type": "base64", "value": encoded }],
            }),
            BodyShape::FlatFile => json!({
                "file": encoded,
                "filename": file_name,
                "filetype": file_type,
            }),
        }
    }

    /// Attach this step's credential encoding and body to a request.
    pub fn apply(
        &self,
        builder: RequestBuilder,
        credential: &str,
        encoded: &str,
        file_name: &str,
        file_type: &str,
    ) -> RequestBuilder {
        let mut builder = builder.json(&self.body(encoded, file_name, file_type));
        if let Some((name, value)) = self.auth_header(credential) {
            builder = builder.header(name, value);
        }
        if let Some(pair) = self.auth_query(credential) {
            builder = builder.query(&[pair]);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_order() {
        let headers: Vec<_> = PROBE_SEQUENCE
            .iter()
            .map(|step| step.auth_header("k"))
            .collect();
        assert_eq!(headers[0], Some(("apikey", "k".to_string())));
        assert_eq!(headers[1], Some(("Authorization", "Bearer k".to_string())));
        assert_eq!(headers[2], Some(("API-Key", "k".to_string())));
        assert_eq!(headers[3], Some(("apikey", "k".to_string())));
        assert_eq!(headers[4], None);
        assert_eq!(PROBE_SEQUENCE[4].auth_query("k"), Some(("apikey", "k")));
    }

    #[test]
    fn test_only_fourth_step_uses_flat_body() {
        for (i, step) in PROBE_SEQUENCE.iter().enumerate() {
            let expected = if i == 3 {
                BodyShape::FlatFile
            } else {
                BodyShape::FileUpload
            };
            assert_eq!(step.body, expected, "step {}", i + 1);
        }
    }

    #[test]
    fn test_file_upload_body() {
        let body = PROBE_SEQUENCE[0].body("QUJD", "a.png", "image/png");
        assert_eq!(body["type"], "file_upload");
        assert_eq!(body["images"][0]["type"], "base64");
        assert_eq!(body["images"][0]["value"], "QUJD");
        assert!(body.get("filename").is_none());
    }

    #[test]
    fn test_flat_body() {
        let body = PROBE_SEQUENCE[3].body("QUJD", "a.png", "image/png");
        assert_eq!(
            body,
            json!({"file": "QUJD", "filename": "a.png", "filetype": "image/png"})
        );
    }
}
