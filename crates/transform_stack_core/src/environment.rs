use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Target account and region for a synthesis run.
///
/// Synthesis only validates the shape of both values; whether the account
/// exists or the caller may deploy into it is the provisioning tool's
/// problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Environment {
    pub account_id: String,
    pub region: String,
}

impl Environment {
    pub fn new(
        account_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let account_id: String = account_id.into();
        let region: String = region.into();
        let account_id = account_id.trim().to_string();
        let region = region.trim().to_string();
        validate_account_id(&account_id)?;
        validate_region(&region)?;
        Ok(Self { account_id, region })
    }
}

pub fn validate_account_id(account_id: &str) -> Result<(), ValidationError> {
    if account_id.len() != 12 || !account_id.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ValidationError::new(format!(
            "account id must be exactly 12 digits, got '{account_id}'"
        )));
    }
    Ok(())
}

/// Regions look like `eu-central-1`: two or more lowercase words followed by
/// a numeric suffix, separated by dashes.
pub fn validate_region(region: &str) -> Result<(), ValidationError> {
    let segments: Vec<&str> = region.split('-').collect();
    let shape_ok = segments.len() >= 3
        && segments[..segments.len() - 1]
            .iter()
            .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_lowercase()))
        && segments
            .last()
            .is_some_and(|last| !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()));

    if !shape_ok {
        return Err(ValidationError::new(format!(
            "region must look like 'eu-central-1', got '{region}'"
        )));
    }
    Ok(())
}
