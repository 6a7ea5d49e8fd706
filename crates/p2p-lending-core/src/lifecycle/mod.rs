//! The loan lifecycle state machine.
//!
//! ```text
//! Proposed --approve--> Approved --invest (fills principal)--> Invested
//!     --sign (borrower)--> Signed --disburse--> Disbursed
//! ```
//!
//! Every action is all-or-nothing: preconditions are checked and documents
//! rendered before the first write, so a rejected or failed action leaves
//! the stores untouched.

pub mod engine;
pub mod locks;
pub mod requests;
mod signing;

pub use engine::LifecycleEngine;
pub use locks::EntityLocks;
pub use requests::{
    ApproveLoanInput, DisburseLoanInput, InvestLoanInput, SignAgreementInput, SubmitLoanInput,
};
