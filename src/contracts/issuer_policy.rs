// src/contracts/issuer_policy.rs
//! Issuer allow-lists.
//!
//! Static table mapping an issuer DID to what it may issue. The table is
//! data: the local registry consults it when it checks a receipt, and the
//! verifier never sees it.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Broad class of issuing organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerCategory {
    Corporation,
    GovernmentEntity,
    Institution,
}

/// What one issuer is trusted to attest.
#[derive(Debug, Clone)]
pub struct IssuerPolicy {
    pub did: &'static str,
    pub category: IssuerCategory,
    pub active: bool,
    pub allowed_types: &'static [&'static str],
    pub forbidden_types: &'static [&'static str],
}

/// Why an issuer/credential-type pair was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerPolicyError {
    #[error("issuer '{0}' is not registered")]
    UnknownIssuer(String),

    #[error("issuer '{0}' is inactive")]
    Inactive(String),

    #[error("issuer '{issuer}' may not issue {credential_type}")]
    Forbidden {
        issuer: String,
        credential_type: String,
    },

    #[error("{credential_type} is not in the allow-list of '{issuer}'")]
    NotAllowed {
        issuer: String,
        credential_type: String,
    },
}

pub const TRUSTED_ISSUER_0: &str = "did:agentic:trusted_issuer_0";
pub const BANK_OF_AMERICA: &str = "did:agentic:issuer:boa:main";
pub const BANK_ISSUER: &str = "did:agentic:bank_issuer";

static ISSUERS: Lazy<HashMap<&'static str, IssuerPolicy>> = Lazy::new(|| {
    let table = [
        IssuerPolicy {
            did: TRUSTED_ISSUER_0,
            category: IssuerCategory::Corporation,
            active: true,
            allowed_types: &["KYC_LEVEL_1", "AGE_OVER_18"],
            forbidden_types: &[],
        },
        IssuerPolicy {
            did: BANK_OF_AMERICA,
            category: IssuerCategory::Corporation,
            active: true,
            allowed_types: &[
                "FINANCIAL_ACCOUNT",
                "KYC_LEVEL_1",
                "KYC_LEVEL_2",
                "IDENTITY_VERIFIED",
                "ACCREDITED_INVESTOR",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "CITIZENSHIP",
                "DRIVERS_LICENSE",
                "VISA",
                "MEDICAL_RECORD",
                "PRESCRIPTION",
                "MEDICAL_LICENSE",
                "CRYPTO_EXCHANGE_KYC",
            ],
        },
        IssuerPolicy {
            did: BANK_ISSUER,
            category: IssuerCategory::Corporation,
            active: false,
            allowed_types: &[
                "FINANCIAL_ACCOUNT",
                "KYC_TIER_1",
                "KYC_TIER_2",
                "KYC_TIER_3",
                "BANK_ACCOUNT_VERIFIED",
                "CREDIT_SCORE",
                "INCOME_VERIFICATION",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "MEDICAL_RECORD",
                "PRESCRIPTION",
                "EDUCATIONAL_DEGREE",
            ],
        },
        IssuerPolicy {
            did: "did:agentic:airline_issuer",
            category: IssuerCategory::Corporation,
            active: false,
            allowed_types: &[
                "FLIGHT_BOOKING",
                "FREQUENT_FLYER_STATUS",
                "BOARDING_PASS",
                "TRAVEL_HISTORY",
                "MILEAGE_BALANCE",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "MEDICAL_RECORD",
                "PRESCRIPTION",
                "FINANCIAL_ACCOUNT",
            ],
        },
        IssuerPolicy {
            did: "did:agentic:amazon_issuer",
            category: IssuerCategory::Corporation,
            active: false,
            allowed_types: &[
                "PURCHASE_HISTORY",
                "SHIPPING_ADDRESS_VERIFIED",
                "PRIME_MEMBERSHIP",
                "SELLER_REPUTATION",
                "DELIVERY_CONFIRMATION",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "MEDICAL_RECORD",
                "PRESCRIPTION",
                "FINANCIAL_ACCOUNT",
            ],
        },
        IssuerPolicy {
            did: "did:agentic:ecuadorian_voting_issuer",
            category: IssuerCategory::GovernmentEntity,
            active: false,
            allowed_types: &[
                "VOTER_ELIGIBILITY",
                "VOTER_REGISTRATION",
                "BALLOT_CAST",
                "CITIZENSHIP_VERIFIED",
                "NATIONAL_ID",
            ],
            forbidden_types: &[
                "MEDICAL_RECORD",
                "PRESCRIPTION",
                "FINANCIAL_ACCOUNT",
                "PURCHASE_HISTORY",
            ],
        },
        IssuerPolicy {
            did: "did:agentic:doctors_office_issuer",
            category: IssuerCategory::Institution,
            active: false,
            allowed_types: &[
                "MEDICAL_RECORD",
                "PRESCRIPTION",
                "VACCINATION_RECORD",
                "PHYSICAL_EXAM",
                "REFERRAL",
                "ALLERGY_INFO",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "FINANCIAL_ACCOUNT",
                "PURCHASE_HISTORY",
                "EDUCATIONAL_DEGREE",
                "SURGERY_RECORD",
            ],
        },
        IssuerPolicy {
            did: "did:agentic:hospital_issuer",
            category: IssuerCategory::Institution,
            active: false,
            allowed_types: &[
                "MEDICAL_RECORD",
                "VACCINATION_RECORD",
                "LAB_RESULT",
                "SURGERY_RECORD",
                "ADMISSION_DISCHARGE",
                "ALLERGY_INFO",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "FINANCIAL_ACCOUNT",
                "PURCHASE_HISTORY",
                "EDUCATIONAL_DEGREE",
            ],
        },
        IssuerPolicy {
            did: "did:agentic:ivf_center_issuer",
            category: IssuerCategory::Institution,
            active: false,
            allowed_types: &[
                "MEDICAL_RECORD",
                "FERTILITY_TREATMENT",
                "IVF_CYCLE",
                "EMBRYO_STORAGE",
                "PREGNANCY_TEST",
                "LAB_RESULT",
            ],
            forbidden_types: &[
                "VOTER_ELIGIBILITY",
                "FINANCIAL_ACCOUNT",
                "PURCHASE_HISTORY",
                "EDUCATIONAL_DEGREE",
                "PRESCRIPTION",
            ],
        },
    ];
    table.into_iter().map(|p| (p.did, p)).collect()
});

/// Looks up the policy record for `issuer`.
pub fn lookup(issuer: &str) -> Option<&'static IssuerPolicy> {
    ISSUERS.get(issuer)
}

impl IssuerPolicy {
    /// Checks that this issuer may attest `credential_type`.
    ///
    /// Inactive issuers are refused outright. The forbidden list wins over
    /// the allowed list.
    pub fn permits(&self, credential_type: &str) -> Result<(), IssuerPolicyError> {
        if !self.active {
            return Err(IssuerPolicyError::Inactive(self.did.to_string()));
        }
        if self.forbidden_types.contains(&credential_type) {
            return Err(IssuerPolicyError::Forbidden {
                issuer: self.did.to_string(),
                credential_type: credential_type.to_string(),
            });
        }
        if !self.allowed_types.contains(&credential_type) {
            return Err(IssuerPolicyError::NotAllowed {
                issuer: self.did.to_string(),
                credential_type: credential_type.to_string(),
            });
        }
        Ok(())
    }
}

/// Validates an issuer/credential-type pair against the static table.
pub fn validate(issuer: &str, credential_type: &str) -> Result<(), IssuerPolicyError> {
    lookup(issuer)
        .ok_or_else(|| IssuerPolicyError::UnknownIssuer(issuer.to_string()))?
        .permits(credential_type)
}
