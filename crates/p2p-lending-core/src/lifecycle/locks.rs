use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::types::{AgreementId, LoanId};

/// Per-entity mutexes so actions on the same loan (or agreement) run one at
/// a time while unrelated loans proceed in parallel.
///
/// Callers that need both take the loan lock first, then the agreement lock.
#[derive(Debug, Default)]
pub struct EntityLocks {
    loans: DashMap<LoanId, Arc<Mutex<()>>>,
    agreements: DashMap<AgreementId, Arc<Mutex<()>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loan(&self, id: LoanId) -> Arc<Mutex<()>> {
        slot(&self.loans, id)
    }

    pub fn agreement(&self, id: AgreementId) -> Arc<Mutex<()>> {
        slot(&self.agreements, id)
    }
}

fn slot(table: &DashMap<u64, Arc<Mutex<()>>>, id: u64) -> Arc<Mutex<()>> {
    // The shard guard is dropped before the caller blocks on the mutex.
    let entry = table.entry(id).or_insert_with(|| Arc::new(Mutex::new(())));
    Arc::clone(entry.value())
}
