use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::loan::Loan;
use crate::types::{IdSequence, LoanId};

/// In-memory loan ledger keyed by loan ID. Values are full snapshots;
/// `upsert` is last-write-wins.
#[derive(Debug, Default)]
pub struct LoanLedger {
    loans: RwLock<BTreeMap<LoanId, Loan>>,
    ids: IdSequence,
}

impl LoanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(loans: Vec<Loan>, last_issued: LoanId) -> Self {
        let ids = IdSequence::starting_after(last_issued);
        let map = loans
            .into_iter()
            .map(|l| {
                ids.observe(l.id);
                (l.id, l)
            })
            .collect();
        Self {
            loans: RwLock::new(map),
            ids,
        }
    }

    pub fn next_loan_id(&self) -> LoanId {
        self.ids.next_id()
    }

    pub fn last_issued_id(&self) -> LoanId {
        self.ids.last_issued()
    }

    pub fn upsert(&self, loan: Loan) {
        self.loans.write().insert(loan.id, loan);
    }

    pub fn get_all(&self) -> Vec<Loan> {
        self.loans.read().values().cloned().collect()
    }

    pub fn get_by_id(&self, id: LoanId) -> Option<Loan> {
        self.loans.read().get(&id).cloned()
    }
}
