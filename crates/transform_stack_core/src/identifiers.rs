//! Fixed external identifiers: parsing, validation, and name construction.
//!
//! Synthesis fails fast on a malformed identifier. Whether the referenced
//! resource actually exists is only observable at deploy time and is
//! deliberately not checked here.

use serde::{Deserialize, Serialize};

use crate::environment::{validate_account_id, validate_region};
use crate::error::ValidationError;

/// Structurally parsed secret reference
/// (`arn:aws:secretsmanager:<region>:<account>:secret:<name>`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretArn {
    raw: String,
    pub region: String,
    pub account_id: String,
    pub secret_name: String,
}

impl SecretArn {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let parts: Vec<&str> = raw.splitn(7, ':').collect();
        let &[arn, partition, service, region, account_id, kind, secret_name] = parts.as_slice()
        else {
            return Err(ValidationError::new(format!(
                "secret ARN must have 7 colon-separated parts, got '{raw}'"
            )));
        };

        if arn != "arn" || partition != "aws" || service != "secretsmanager" || kind != "secret" {
            return Err(ValidationError::new(format!(
                "'{raw}' is not a secretsmanager secret ARN"
            )));
        }
        validate_region(region)
            .map_err(|error| ValidationError::new(format!("secret ARN: {}", error.message())))?;
        validate_account_id(account_id)
            .map_err(|error| ValidationError::new(format!("secret ARN: {}", error.message())))?;
        if secret_name.is_empty() {
            return Err(ValidationError::new("secret ARN has an empty secret name"));
        }

        Ok(Self {
            raw: raw.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            secret_name: secret_name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Pinned image digest (`sha256:` followed by 64 hex characters).
/// Pinning to a digest rather than a tag makes redeploys idempotent until
/// the constant itself changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDigest(String);

impl ImageDigest {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let hex = raw.strip_prefix("sha256:").ok_or_else(|| {
            ValidationError::new(format!("image digest must start with 'sha256:', got '{raw}'"))
        })?;
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(ValidationError::new(format!(
                "image digest must be 64 lowercase hex characters, got '{raw}'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Repository names: lowercase alphanumeric path segments, with `-`, `_`
/// and `.` allowed inside a segment.
pub fn validate_repository_name(name: &str) -> Result<(), ValidationError> {
    let segments_ok = !name.is_empty()
        && name.len() <= 256
        && name.split('/').all(|segment| {
            segment
                .as_bytes()
                .first()
                .is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b"-_.".contains(&b))
        });

    if !segments_ok {
        return Err(ValidationError::new(format!(
            "'{name}' is not a valid image repository name"
        )));
    }
    Ok(())
}

pub fn validate_email(address: &str) -> Result<(), ValidationError> {
    let well_formed = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !address.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if !well_formed {
        return Err(ValidationError::new(format!(
            "'{address}' is not a valid notification email address"
        )));
    }
    Ok(())
}

/// Cron schedule expressions: `cron(<6 space-separated fields>)`.
pub fn validate_schedule_expression(expression: &str) -> Result<(), ValidationError> {
    let fields = expression
        .strip_prefix("cron(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(|body| body.split_whitespace().count());

    if fields != Some(6) {
        return Err(ValidationError::new(format!(
            "schedule must be 'cron(...)' with 6 fields, got '{expression}'"
        )));
    }
    Ok(())
}

pub fn image_uri(account_id: &str, region: &str, repository: &str, digest: &ImageDigest) -> String {
    format!(
        "{account_id}.dkr.ecr.{region}.amazonaws.com/{repository}@{}",
        digest.as_str()
    )
}

pub fn repository_arn(account_id: &str, region: &str, repository: &str) -> String {
    format!("arn:aws:ecr:{region}:{account_id}:repository/{repository}")
}

pub fn function_log_group_name(function_name: &str) -> String {
    format!("/aws/lambda/{function_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:c5b7a9e1f2d4083b6a5c9e7d1f0b3a8c2e4d6f8091a3b5c7d9e1f20436587a9b";

    #[test]
    fn parses_well_formed_secret_arn() {
        let arn = SecretArn::parse(
            "arn:aws:secretsmanager:eu-central-1:210987654321:secret:transform/warehouse-XyZ123",
        )
        .expect("should parse");

        assert_eq!(arn.region, "eu-central-1");
        assert_eq!(arn.account_id, "210987654321");
        assert_eq!(arn.secret_name, "transform/warehouse-XyZ123");
    }

    #[test]
    fn rejects_non_secret_arn() {
        let error = SecretArn::parse("arn:aws:s3:::some-bucket").expect_err("should fail");
        assert!(error.message().contains("7 colon-separated parts"));
    }

    #[test]
    fn rejects_secret_arn_for_other_service() {
        let error = SecretArn::parse("arn:aws:kms:eu-central-1:210987654321:key:abc")
            .expect_err("should fail");
        assert!(error.message().contains("not a secretsmanager secret ARN"));
    }

    #[test]
    fn rejects_secret_arn_with_bad_account() {
        let error = SecretArn::parse("arn:aws:secretsmanager:eu-central-1:12:secret:name")
            .expect_err("should fail");
        assert!(error.message().contains("secret ARN"));
    }

    #[test]
    fn parses_pinned_digest() {
        let digest = ImageDigest::parse(DIGEST).expect("should parse");
        assert_eq!(digest.as_str(), DIGEST);
    }

    #[test]
    fn rejects_digest_without_algorithm_prefix() {
        let error = ImageDigest::parse(&DIGEST["sha256:".len()..]).expect_err("should fail");
        assert!(error.message().contains("sha256:"));
    }

    #[test]
    fn rejects_digest_with_wrong_length() {
        let error = ImageDigest::parse("sha256:abc123").expect_err("should fail");
        assert!(error.message().contains("64 lowercase hex"));
    }

    #[test]
    fn rejects_uppercase_digest() {
        let uppercased = DIGEST.to_uppercase().replace("SHA256", "sha256");
        let error = ImageDigest::parse(&uppercased).expect_err("should fail");
        assert!(error.message().contains("64 lowercase hex"));
    }

    #[test]
    fn accepts_namespaced_repository_name() {
        assert!(validate_repository_name("data-platform/nightly-transform").is_ok());
    }

    #[test]
    fn rejects_repository_name_with_uppercase() {
        assert!(validate_repository_name("Nightly-Transform").is_err());
    }

    #[test]
    fn rejects_repository_name_with_empty_segment() {
        assert!(validate_repository_name("data//transform").is_err());
    }

    #[test]
    fn rejects_email_without_domain_dot() {
        assert!(validate_email("alerts@example").is_err());
        assert!(validate_email("alerts.example.com").is_err());
        assert!(validate_email("data-alerts@example.com").is_ok());
    }

    #[test]
    fn validates_six_field_cron() {
        assert!(validate_schedule_expression("cron(15 5 * * ? *)").is_ok());
        assert!(validate_schedule_expression("cron(15 5 * * ?)").is_err());
        assert!(validate_schedule_expression("rate(1 day)").is_err());
    }

    #[test]
    fn builds_image_uri_with_digest() {
        let digest = ImageDigest::parse(DIGEST).expect("should parse");
        let uri = image_uri("123456789012", "eu-central-1", "nightly-transform-job", &digest);
        assert_eq!(
            uri,
            format!(
                "123456789012.dkr.ecr.eu-central-1.amazonaws.com/nightly-transform-job@{DIGEST}"
            )
        );
    }

    #[test]
    fn builds_repository_arn() {
        assert_eq!(
            repository_arn("123456789012", "eu-central-1", "nightly-transform-job"),
            "arn:aws:ecr:eu-central-1:123456789012:repository/nightly-transform-job"
        );
    }

    #[test]
    fn builds_function_log_group_name() {
        assert_eq!(
            function_log_group_name("nightly-transform"),
            "/aws/lambda/nightly-transform"
        );
    }
}
