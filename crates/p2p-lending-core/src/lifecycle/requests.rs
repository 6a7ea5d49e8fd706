use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LoanId, Money, Rate, UserId};

// ---------------------------------------------------------------------------
// Action inputs
// ---------------------------------------------------------------------------

/// Zero IDs and zero amounts mean "not supplied" and are rejected by the
/// engine. Omitted dates fall back to the engine's clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitLoanInput {
    pub borrower_id: UserId,
    pub principal_amount: Money,
    pub interest_rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveLoanInput {
    pub picture_proof: String,
    pub field_validator_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestLoanInput {
    pub lender_id: UserId,
    pub invested_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignAgreementInput {
    pub loan_id: LoanId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisburseLoanInput {
    pub field_officer_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disbursement_date: Option<DateTime<Utc>>,
}
