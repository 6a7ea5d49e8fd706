pub mod loan;
pub mod store;

pub use loan::{lender_return, ApprovalInfo, DisbursementInfo, Lending, Loan, LoanStatus};
pub use store::LoanLedger;
