//! AWS Signature Version 4 for JSON-protocol POST requests.

use crate::error::{HitmanError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read credentials from the standard AWS environment variables.
    pub fn from_env() -> Result<Self> {
        let read = |var: &'static str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(HitmanError::MissingCredential(var))
        };
        Ok(Self {
            access_key_id: read(ACCESS_KEY_VAR)?,
            secret_access_key: read(SECRET_KEY_VAR)?,
            session_token: std::env::var(SESSION_TOKEN_VAR)
                .ok()
                .filter(|v| !v.is_empty()),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything that goes into one signature.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub host: &'a str,
    pub region: &'a str,
    pub service: &'a str,
    pub content_type: &'a str,
    pub target: &'a str,
    pub body: &'a [u8],
    pub time: DateTime<Utc>,
}

/// Header values to attach to the signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub amz_date: String,
    pub authorization: String,
}

pub fn sign(credentials: &Credentials, req: &SigningRequest<'_>) -> Signature {
    let amz_date = req.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = req.time.format("%Y%m%d").to_string();
    let scope = format!("{date_stamp}/{}/{}/aws4_request", req.region, req.service);

    let mut headers: Vec<(&str, &str)> = vec![
        ("content-type", req.content_type),
        ("host", req.host),
        ("x-amz-date", &amz_date),
        ("x-amz-target", req.target),
    ];
    if let Some(token) = credentials.session_token.as_deref() {
        headers.push(("x-amz-security-token", token));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{}\n", v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "POST\n/\n\n{canonical_headers}\n{signed_headers}\n{}",
        hex(&Sha256::digest(req.body))
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex(&Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(
        &credentials.secret_access_key,
        &date_stamp,
        req.region,
        req.service,
    );
    let signature = hex(&hmac(&key, string_to_sign.as_bytes()));

    Signature {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
        amz_date,
    }
}

/// Derive the per-day, per-service signing key.
pub fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC is defined for keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(body: &[u8]) -> SigningRequest<'_> {
        SigningRequest {
            host: "mturk-requester.us-east-1.amazonaws.com",
            region: "us-east-1",
            service: "mturk-requester",
            content_type: "application/x-amz-json-1.1",
            target: "MTurkRequesterServiceV20170117.GetAccountBalance",
            body,
            time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
        }
    }

    #[test]
    fn signing_key_matches_aws_reference() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex(&key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn authorization_header_shape() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret");
        let sig = sign(&creds, &request(b"{}"));
        assert_eq!(sig.amz_date, "20240301T123005Z");
        assert!(sig.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240301/us-east-1/mturk-requester/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature="
        ));
        let signature = sig.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn signature_depends_on_body_and_is_deterministic() {
        let creds = Credentials::new("AKIDEXAMPLE", "secret");
        let a = sign(&creds, &request(b"{}"));
        let b = sign(&creds, &request(b"{}"));
        let c = sign(&creds, &request(b"{\"MaxResults\":100}"));
        assert_eq!(a, b);
        assert_ne!(a.authorization, c.authorization);
    }

    #[test]
    fn session_token_is_signed() {
        let mut creds = Credentials::new("AKIDEXAMPLE", "secret");
        creds.session_token = Some("token".into());
        let sig = sign(&creds, &request(b"{}"));
        assert!(sig
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("AKIDEXAMPLE", "very-secret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("AKIDEXAMPLE"));
        assert!(!shown.contains("very-secret"));
    }
}
