//! Agreement documents: the structured fields handed to a generator, and a
//! plain-text generator used when no richer renderer is plugged in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::ledger::{Lending, Loan};
use crate::types::{LoanId, Money, Rate, UserId};
use crate::users::User;

/// Renders agreement fields into an opaque document blob.
///
/// Implementations are synchronous and side-effect free; any error they
/// return is reported by the engine as an internal failure.
pub trait DocumentGenerator: Send + Sync {
    fn generate(
        &self,
        document: &AgreementDocument,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

// ---------------------------------------------------------------------------
// Template fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementKind {
    /// Between the platform and the borrower.
    OrganizerBorrower,
    /// Between the platform and one lender.
    OrganizerLender,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for Party {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LenderTerms {
    pub lender: Party,
    pub invested_amount: Money,
    pub return_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementDocument {
    pub kind: AgreementKind,
    pub loan_id: LoanId,
    pub borrower: Party,
    pub principal_amount: Money,
    pub interest_rate: Rate,
    /// Principal plus interest; borrower documents only.
    pub amount_of_debt: Option<Money>,
    /// Lender documents only.
    pub lender: Option<LenderTerms>,
    pub signed: bool,
    pub currency_symbol: String,
}

impl AgreementDocument {
    pub fn organizer_borrower(loan: &Loan, borrower: &User, signed: bool, currency_symbol: &str) -> Self {
        Self {
            kind: AgreementKind::OrganizerBorrower,
            loan_id: loan.id,
            borrower: Party::from(borrower),
            principal_amount: loan.principal_amount,
            interest_rate: loan.interest_rate,
            amount_of_debt: Some(loan.loan_return()),
            lender: None,
            signed,
            currency_symbol: currency_symbol.to_string(),
        }
    }

    pub fn organizer_lender(
        loan: &Loan,
        borrower: &User,
        lender: &User,
        lending: &Lending,
        signed: bool,
        currency_symbol: &str,
    ) -> Self {
        Self {
            kind: AgreementKind::OrganizerLender,
            loan_id: loan.id,
            borrower: Party::from(borrower),
            principal_amount: loan.principal_amount,
            interest_rate: loan.interest_rate,
            amount_of_debt: None,
            lender: Some(LenderTerms {
                lender: Party::from(lender),
                invested_amount: lending.invested_amount,
                return_amount: lending.return_amount,
            }),
            signed,
            currency_symbol: currency_symbol.to_string(),
        }
    }

    pub fn title(&self) -> String {
        let heading = match self.kind {
            AgreementKind::OrganizerBorrower => "ORGANIZER-BORROWER AGREEMENT",
            AgreementKind::OrganizerLender => "ORGANIZER-LENDER AGREEMENT",
        };
        format!("{} [Loan ID: {}]", heading, self.loan_id)
    }

    pub fn sign_marker(&self) -> &'static str {
        if self.signed {
            "SIGNED"
        } else {
            "UNSIGNED"
        }
    }
}

// ---------------------------------------------------------------------------
// Plain-text generator
// ---------------------------------------------------------------------------

/// Renders one `Label: value` line per field, UTF-8 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDocumentGenerator;

impl DocumentGenerator for TextDocumentGenerator {
    fn generate(
        &self,
        doc: &AgreementDocument,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let cur = &doc.currency_symbol;
        let mut out = String::new();

        writeln!(out, "{}", doc.title())?;
        writeln!(out)?;
        writeln!(out, "Borrower ID: {}", doc.borrower.id)?;
        writeln!(out, "Borrower Name: {}", doc.borrower.name)?;
        writeln!(out, "Principal Amount: {} {:.2}", cur, doc.principal_amount)?;
        writeln!(
            out,
            "Interest Rate: {:.2}%",
            doc.interest_rate * Decimal::ONE_HUNDRED
        )?;
        if let Some(debt) = doc.amount_of_debt {
            writeln!(out, "Amount of debt: {} {:.2}", cur, debt)?;
        }
        if let Some(terms) = &doc.lender {
            writeln!(out)?;
            writeln!(out, "Lender ID: {}", terms.lender.id)?;
            writeln!(out, "Lender Name: {}", terms.lender.name)?;
            writeln!(out, "Invested Amount: {} {:.2}", cur, terms.invested_amount)?;
            writeln!(out, "Return Amount: {} {:.2}", cur, terms.return_amount)?;
        }
        writeln!(out)?;
        writeln!(out, "Sign: {}", doc.sign_marker())?;

        Ok(out.into_bytes())
    }
}
