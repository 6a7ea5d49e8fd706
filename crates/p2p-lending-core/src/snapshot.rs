//! Serializable image of every store plus the ID sequences behind them.

use serde::{Deserialize, Serialize};

use crate::agreements::Agreement;
use crate::ledger::Loan;
use crate::types::{AgreementId, LoanId, UserId};
use crate::users::{User, UserDirectory};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSnapshot {
    pub users: Vec<User>,
    pub loans: Vec<Loan>,
    pub agreements: Vec<Agreement>,
    pub last_user_id: UserId,
    pub last_loan_id: LoanId,
    pub last_agreement_id: AgreementId,
}

impl PlatformSnapshot {
    /// A fresh platform holding only the demo users.
    pub fn seeded() -> Self {
        let users = UserDirectory::seeded();
        Self {
            last_user_id: users.last_issued_id(),
            users: users.get_all(),
            ..Self::default()
        }
    }
}
