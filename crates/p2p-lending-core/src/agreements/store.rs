//! Storage for generated agreement documents.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::reference;
use crate::types::{AgreementId, IdSequence, LoanId, UserId};
use crate::LendingResult;

/// A generated agreement document owned by exactly one user, for exactly one
/// loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub loan_id: LoanId,
    pub owner_id: UserId,
    /// Rendered document bytes; hex-encoded when serialized.
    #[serde(with = "hex_bytes")]
    pub document: Vec<u8>,
    pub signed: bool,
}

#[derive(Debug, Default)]
pub struct AgreementStore {
    agreements: RwLock<BTreeMap<AgreementId, Agreement>>,
    ids: IdSequence,
}

impl AgreementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(agreements: Vec<Agreement>, last_issued: AgreementId) -> Self {
        let ids = IdSequence::starting_after(last_issued);
        let map = agreements
            .into_iter()
            .map(|a| {
                ids.observe(a.id);
                (a.id, a)
            })
            .collect();
        Self {
            agreements: RwLock::new(map),
            ids,
        }
    }

    pub fn next_agreement_id(&self) -> AgreementId {
        self.ids.next_id()
    }

    pub fn last_issued_id(&self) -> AgreementId {
        self.ids.last_issued()
    }

    /// Insert or overwrite by ID.
    pub fn upsert(&self, agreement: Agreement) {
        self.agreements.write().insert(agreement.id, agreement);
    }

    pub fn get_all(&self) -> Vec<Agreement> {
        self.agreements.read().values().cloned().collect()
    }

    pub fn get_by_id(&self, id: AgreementId) -> Option<Agreement> {
        self.agreements.read().get(&id).cloned()
    }

    pub fn find_id_from_url(url: &str) -> LendingResult<AgreementId> {
        reference::find_id_from_url(url)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
