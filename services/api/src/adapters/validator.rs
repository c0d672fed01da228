//! services/api/src/adapters/validator.rs
//!
//! An in-process `CompanyValidator` that checks company names against a
//! configured allow-list of food and beverage companies.

use async_trait::async_trait;
use onboarding_core::domain::ValidationResult;
use onboarding_core::ports::{CompanyValidator, PortError, PortResult};
use std::collections::HashSet;

const KNOWN_OVERVIEW: &str = "This is the company overview.";
const UNKNOWN_OVERVIEW: &str = "This company is not recognised in our food and beverage group.";

#[derive(Clone, Debug)]
pub struct AllowListValidator {
    known: HashSet<String>,
}

impl AllowListValidator {
    pub fn new<I, S>(companies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = companies
            .into_iter()
            .map(|name| normalise(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { known }
    }
}

fn normalise(name: &str) -> String {
    name.trim().to_lowercase()
}

#[async_trait]
impl CompanyValidator for AllowListValidator {
    async fn validate_company(&self, company_name: &str) -> PortResult<ValidationResult> {
        let name = normalise(company_name);
        if name.is_empty() {
            return Err(PortError::InvalidInput(
                "Please pass a companyName url parameter to this endpoint".to_string(),
            ));
        }

        let industry_match = self.known.contains(&name);
        let overview = if industry_match {
            KNOWN_OVERVIEW
        } else {
            UNKNOWN_OVERVIEW
        };

        Ok(ValidationResult {
            industry_match,
            company_overview: overview.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> AllowListValidator {
        AllowListValidator::new(["heineken", "Musgrave", "glanbia", "ballymoyle"])
    }

    #[tokio::test]
    async fn known_company_matches_regardless_of_case() {
        let result = validator().validate_company("  HEINEKEN ").await.unwrap();
        assert!(result.industry_match);
        assert_eq!(result.company_overview, KNOWN_OVERVIEW);

        assert!(validator().validate_company("musgrave").await.unwrap().industry_match);
    }

    #[tokio::test]
    async fn unknown_company_does_not_match() {
        let result = validator().validate_company("Unknown Co").await.unwrap();
        assert!(!result.industry_match);
        assert_eq!(result.company_overview, UNKNOWN_OVERVIEW);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let err = validator().validate_company("   ").await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }
}
