use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.1 = 10%). Never as percentages.
pub type Rate = Decimal;

pub type UserId = u64;
pub type LoanId = u64;
pub type AgreementId = u64;

/// Standard envelope returned by every lifecycle action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutput<T: Serialize> {
    pub result: T,
    pub action: String,
    pub warnings: Vec<String>,
    pub metadata: ActionMetadata,
}

/// Metadata for every action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMetadata {
    pub version: String,
    pub elapsed_us: u64,
    pub precision: String,
}

/// Helper to wrap action results with metadata
pub fn with_metadata<T: Serialize>(
    action: &str,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ActionOutput<T> {
    ActionOutput {
        result,
        action: action.to_string(),
        warnings,
        metadata: ActionMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Monotonic ID source shared by every caller of a store.
///
/// The first issued ID is 1. IDs are never reused, and a sequence restored
/// from a snapshot resumes after the last ID it had issued.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: AtomicU64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_after(last_issued: u64) -> Self {
        Self {
            last: AtomicU64::new(last_issued),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }

    /// Move the sequence forward so it never issues `id` or anything below it.
    pub fn observe(&self, id: u64) {
        self.last.fetch_max(id, Ordering::SeqCst);
    }
}
