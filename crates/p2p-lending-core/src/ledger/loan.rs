//! Loan records and the derived money computations over them.
//!
//! Amounts are `Decimal`, so `is_fulfilled` can compare collected and
//! principal exactly: investments that add up to the principal on paper
//! also add up in the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;
use crate::types::{LoanId, Money, Rate, UserId};
use crate::LendingResult;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status. Variants are declared in lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Proposed,
    Approved,
    Invested,
    Signed,
    Disbursed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Proposed => "proposed",
            LoanStatus::Approved => "approved",
            LoanStatus::Invested => "invested",
            LoanStatus::Signed => "signed",
            LoanStatus::Disbursed => "disbursed",
        }
    }

    /// The only status this one may move to, if any.
    pub fn successor(&self) -> Option<LoanStatus> {
        match self {
            LoanStatus::Proposed => Some(LoanStatus::Approved),
            LoanStatus::Approved => Some(LoanStatus::Invested),
            LoanStatus::Invested => Some(LoanStatus::Signed),
            LoanStatus::Signed => Some(LoanStatus::Disbursed),
            LoanStatus::Disbursed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.successor().is_none()
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(LoanStatus::Proposed),
            "approved" => Ok(LoanStatus::Approved),
            "invested" => Ok(LoanStatus::Invested),
            "signed" => Ok(LoanStatus::Signed),
            "disbursed" => Ok(LoanStatus::Disbursed),
            other => Err(LendingError::invalid(
                "status",
                format!("unknown loan status '{}'", other),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalInfo {
    /// Reference to the field visit picture (URL or encoded image).
    pub picture_proof: String,
    pub field_validator_id: UserId,
    pub approval_date: DateTime<Utc>,
}

/// One lender's cumulative position in a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lending {
    pub lender_id: UserId,
    pub invested_amount: Money,
    pub return_amount: Money,
    /// Organizer-lender agreement, set once the loan is fully invested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agreement_url: Option<String>,
}

impl Lending {
    fn new(lender_id: UserId, invested_amount: Money, interest_rate: Rate) -> Self {
        Self {
            lender_id,
            invested_amount,
            return_amount: lender_return(invested_amount, interest_rate),
            agreement_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementInfo {
    /// Signed copies of every agreement, in signing order.
    #[serde(default)]
    pub signed_agreement_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_officer_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disbursement_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub borrower_id: UserId,
    pub principal_amount: Money,
    pub collected_amount: Money,
    pub interest_rate: Rate,
    pub status: LoanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_info: Option<ApprovalInfo>,
    #[serde(default)]
    pub lendings: Vec<Lending>,
    /// Organizer-borrower agreement, set once every lender has signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrower_agreement_url: Option<String>,
    #[serde(default)]
    pub disbursement_info: DisbursementInfo,
}

impl Loan {
    /// A freshly submitted loan in `Proposed` status.
    pub fn new(id: LoanId, borrower_id: UserId, principal_amount: Money, interest_rate: Rate) -> Self {
        Self {
            id,
            borrower_id,
            principal_amount,
            collected_amount: Decimal::ZERO,
            interest_rate,
            status: LoanStatus::Proposed,
            approval_info: None,
            lendings: Vec::new(),
            borrower_agreement_url: None,
            disbursement_info: DisbursementInfo::default(),
        }
    }

    /// Principal still open for investment. Negative only if the ledger
    /// was over-collected, which `record_investment` refuses to do.
    pub fn remaining_required(&self) -> Money {
        self.principal_amount - self.collected_amount
    }

    pub fn is_fulfilled(&self) -> bool {
        self.collected_amount == self.principal_amount
    }

    pub fn is_lender_invested(&self, lender_id: UserId) -> bool {
        self.lendings.iter().any(|l| l.lender_id == lender_id)
    }

    pub fn lending_for(&self, lender_id: UserId) -> Option<&Lending> {
        self.lendings.iter().find(|l| l.lender_id == lender_id)
    }

    /// Total the borrower owes: principal plus interest.
    pub fn loan_return(&self) -> Money {
        self.principal_amount * (Decimal::ONE + self.interest_rate)
    }

    /// Apply an investment: accumulate into the lender's existing entry or
    /// append a new one, then raise the collected amount.
    ///
    /// Refuses amounts above `remaining_required`, so collected never passes
    /// principal.
    pub fn record_investment(&mut self, lender_id: UserId, amount: Money) -> LendingResult<()> {
        let remaining = self.remaining_required();
        if amount > remaining {
            return Err(LendingError::invalid(
                "invested_amount",
                format!(
                    "{} exceeds remaining required amount {} on loan {}",
                    amount, remaining, self.id
                ),
            ));
        }

        let rate = self.interest_rate;
        match self.lendings.iter_mut().find(|l| l.lender_id == lender_id) {
            Some(existing) => {
                existing.invested_amount += amount;
                existing.return_amount = lender_return(existing.invested_amount, rate);
            }
            None => self.lendings.push(Lending::new(lender_id, amount, rate)),
        }
        self.collected_amount += amount;
        Ok(())
    }

    /// Move to `to`, which must be the direct successor of the current status.
    pub fn advance(&mut self, to: LoanStatus) -> LendingResult<()> {
        if self.status.successor() != Some(to) {
            return Err(LendingError::InvalidState {
                loan_id: self.id,
                action: "advance",
                status: self.status.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

/// What a lender gets back: `invested × (1 + rate)`.
pub fn lender_return(invested_amount: Money, interest_rate: Rate) -> Money {
    invested_amount + invested_amount * interest_rate
}
