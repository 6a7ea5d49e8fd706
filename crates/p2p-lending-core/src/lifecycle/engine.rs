use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::locks::EntityLocks;
use super::requests::{ApproveLoanInput, DisburseLoanInput, InvestLoanInput, SubmitLoanInput};
use crate::agreements::{reference, Agreement, AgreementDocument, AgreementStore, DocumentGenerator, TextDocumentGenerator};
use crate::clock::{date_or_now, Clock, SystemClock};
use crate::config::PlatformConfig;
use crate::error::LendingError;
use crate::ledger::{ApprovalInfo, Loan, LoanLedger, LoanStatus};
use crate::snapshot::PlatformSnapshot;
use crate::types::{with_metadata, ActionOutput, AgreementId, LoanId, UserId};
use crate::users::{Role, User, UserDirectory};
use crate::LendingResult;

/// Orchestrates the loan lifecycle over the user directory, loan ledger and
/// agreement store.
pub struct LifecycleEngine {
    pub(super) users: Arc<UserDirectory>,
    pub(super) loans: Arc<LoanLedger>,
    pub(super) agreements: Arc<AgreementStore>,
    pub(super) documents: Arc<dyn DocumentGenerator>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: PlatformConfig,
    pub(super) locks: EntityLocks,
}

impl LifecycleEngine {
    /// Create an engine over the given stores with the plain-text document
    /// generator, the system clock and default config.
    pub fn new(
        users: Arc<UserDirectory>,
        loans: Arc<LoanLedger>,
        agreements: Arc<AgreementStore>,
    ) -> Self {
        Self {
            users,
            loans,
            agreements,
            documents: Arc::new(TextDocumentGenerator),
            clock: Arc::new(SystemClock),
            config: PlatformConfig::default(),
            locks: EntityLocks::new(),
        }
    }

    /// Engine with empty loan and agreement stores.
    pub fn with_users(users: UserDirectory) -> Self {
        Self::new(
            Arc::new(users),
            Arc::new(LoanLedger::new()),
            Arc::new(AgreementStore::new()),
        )
    }

    pub fn from_snapshot(snapshot: PlatformSnapshot) -> Self {
        Self::new(
            Arc::new(UserDirectory::restore(snapshot.users, snapshot.last_user_id)),
            Arc::new(LoanLedger::restore(snapshot.loans, snapshot.last_loan_id)),
            Arc::new(AgreementStore::restore(
                snapshot.agreements,
                snapshot.last_agreement_id,
            )),
        )
    }

    pub fn with_document_generator(mut self, documents: Arc<dyn DocumentGenerator>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: PlatformConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn loans(&self) -> &LoanLedger {
        &self.loans
    }

    pub fn agreements(&self) -> &AgreementStore {
        &self.agreements
    }

    pub fn snapshot(&self) -> PlatformSnapshot {
        PlatformSnapshot {
            users: self.users.get_all(),
            loans: self.loans.get_all(),
            agreements: self.agreements.get_all(),
            last_user_id: self.users.last_issued_id(),
            last_loan_id: self.loans.last_issued_id(),
            last_agreement_id: self.agreements.last_issued_id(),
        }
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    pub fn list_users(&self) -> Vec<User> {
        self.users.get_all()
    }

    pub fn get_user(&self, id: UserId) -> LendingResult<User> {
        require_id("user_id", id)?;
        self.load_user(id)
    }

    pub fn list_loans(&self) -> Vec<Loan> {
        self.loans.get_all()
    }

    pub fn get_loan(&self, id: LoanId) -> LendingResult<Loan> {
        require_id("loan_id", id)?;
        self.load_loan(id)
    }

    pub fn list_agreements(&self) -> Vec<Agreement> {
        self.agreements.get_all()
    }

    pub fn get_agreement(&self, id: AgreementId) -> LendingResult<Agreement> {
        require_id("agreement_id", id)?;
        self.load_agreement(id)
    }

    /// Rendered document bytes of an agreement.
    pub fn view_agreement(&self, id: AgreementId) -> LendingResult<Vec<u8>> {
        self.get_agreement(id).map(|a| a.document)
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    /// Create a loan in `Proposed` status for a borrower.
    pub fn submit_loan(&self, input: &SubmitLoanInput) -> LendingResult<ActionOutput<Loan>> {
        let start = Instant::now();
        self.submit_inner(input)
            .map(|loan| with_metadata("submit", Vec::new(), elapsed_us(start), loan))
            .inspect_err(|e| warn!(action = "submit", borrower_id = input.borrower_id, error = %e, "lifecycle action rejected"))
    }

    fn submit_inner(&self, input: &SubmitLoanInput) -> LendingResult<Loan> {
        require_id("borrower_id", input.borrower_id)?;
        if input.principal_amount.is_zero() {
            return Err(LendingError::invalid("principal_amount", "must be set"));
        }
        if input.principal_amount.is_sign_negative() {
            return Err(LendingError::invalid("principal_amount", "must be positive"));
        }
        if input.interest_rate.is_sign_negative() || input.interest_rate > rust_decimal::Decimal::ONE {
            return Err(LendingError::invalid(
                "interest_rate",
                format!("{} is outside [0, 1]", input.interest_rate),
            ));
        }

        let borrower = self.require_role(input.borrower_id, Role::Borrower)?;

        let loan = Loan::new(
            self.loans.next_loan_id(),
            borrower.id,
            input.principal_amount,
            input.interest_rate,
        );
        self.loans.upsert(loan.clone());

        info!(
            loan_id = loan.id,
            borrower_id = borrower.id,
            principal = %loan.principal_amount,
            rate = %loan.interest_rate,
            "loan submitted"
        );
        Ok(loan)
    }

    // -----------------------------------------------------------------------
    // Approve
    // -----------------------------------------------------------------------

    /// Proposed -> Approved, recording who validated the borrower and when.
    pub fn approve_loan(
        &self,
        loan_id: LoanId,
        input: &ApproveLoanInput,
    ) -> LendingResult<ActionOutput<Loan>> {
        let start = Instant::now();
        self.approve_inner(loan_id, input)
            .map(|loan| with_metadata("approve", Vec::new(), elapsed_us(start), loan))
            .inspect_err(|e| warn!(action = "approve", loan_id, error = %e, "lifecycle action rejected"))
    }

    fn approve_inner(&self, loan_id: LoanId, input: &ApproveLoanInput) -> LendingResult<Loan> {
        require_id("loan_id", loan_id)?;
        if input.picture_proof.trim().is_empty() {
            return Err(LendingError::invalid("picture_proof", "must be set"));
        }
        require_id("field_validator_id", input.field_validator_id)?;

        let lock = self.locks.loan(loan_id);
        let _guard = lock.lock();

        let mut loan = self.load_loan(loan_id)?;
        ensure_status(&loan, LoanStatus::Proposed, "approve")?;
        let validator = self.require_role(input.field_validator_id, Role::FieldValidator)?;

        loan.approval_info = Some(ApprovalInfo {
            picture_proof: input.picture_proof.clone(),
            field_validator_id: validator.id,
            approval_date: date_or_now(input.approval_date, self.clock.as_ref()),
        });
        loan.advance(LoanStatus::Approved)?;
        self.loans.upsert(loan.clone());

        info!(loan_id, validator_id = validator.id, "loan approved");
        Ok(loan)
    }

    // -----------------------------------------------------------------------
    // Invest
    // -----------------------------------------------------------------------

    /// Add a lender's investment. When the principal is exactly met the loan
    /// moves to `Invested` and one organizer-lender agreement is generated
    /// per lending entry.
    pub fn invest_loan(
        &self,
        loan_id: LoanId,
        input: &InvestLoanInput,
    ) -> LendingResult<ActionOutput<Loan>> {
        let start = Instant::now();
        self.invest_inner(loan_id, input)
            .map(|loan| with_metadata("invest", Vec::new(), elapsed_us(start), loan))
            .inspect_err(|e| {
                warn!(
                    action = "invest",
                    loan_id,
                    lender_id = input.lender_id,
                    amount = %input.invested_amount,
                    error = %e,
                    "lifecycle action rejected"
                )
            })
    }

    fn invest_inner(&self, loan_id: LoanId, input: &InvestLoanInput) -> LendingResult<Loan> {
        require_id("loan_id", loan_id)?;
        require_id("lender_id", input.lender_id)?;
        if input.invested_amount.is_zero() {
            return Err(LendingError::invalid("invested_amount", "must be set"));
        }
        if input.invested_amount.is_sign_negative() {
            return Err(LendingError::invalid("invested_amount", "must be positive"));
        }

        let lock = self.locks.loan(loan_id);
        let _guard = lock.lock();

        let mut loan = self.load_loan(loan_id)?;
        ensure_status(&loan, LoanStatus::Approved, "invest")?;
        let lender = self.require_role(input.lender_id, Role::Lender)?;

        loan.record_investment(lender.id, input.invested_amount)?;

        if loan.is_fulfilled() {
            loan.advance(LoanStatus::Invested)?;

            let rendered = self.render_lender_agreements(&loan)?;
            for (lending, (owner_id, document)) in loan.lendings.iter_mut().zip(rendered) {
                let agreement = self.store_agreement(loan_id, owner_id, document, false);
                lending.agreement_url = Some(self.agreement_url(agreement.id));
            }
            info!(
                loan_id,
                lenders = loan.lendings.len(),
                "loan fully invested; lender agreements generated"
            );
        }

        self.loans.upsert(loan.clone());
        info!(
            loan_id,
            lender_id = lender.id,
            amount = %input.invested_amount,
            collected = %loan.collected_amount,
            "investment recorded"
        );
        Ok(loan)
    }

    /// Render every organizer-lender document before anything is written,
    /// so a generator failure leaves the loan as it was.
    fn render_lender_agreements(&self, loan: &Loan) -> LendingResult<Vec<(UserId, Vec<u8>)>> {
        let borrower = self.load_user(loan.borrower_id)?;
        loan.lendings
            .iter()
            .map(|lending| -> LendingResult<(UserId, Vec<u8>)> {
                let lender = self.load_user(lending.lender_id)?;
                let doc = AgreementDocument::organizer_lender(
                    loan,
                    &borrower,
                    &lender,
                    lending,
                    false,
                    &self.config.currency_symbol,
                );
                Ok((lender.id, self.render(&doc)?))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Disburse
    // -----------------------------------------------------------------------

    /// Signed -> Disbursed.
    ///
    /// A field officer ID that does not resolve to a field officer does not
    /// reject the request: the disbursement is recorded without an officer
    /// and the output carries a warning.
    pub fn disburse_loan(
        &self,
        loan_id: LoanId,
        input: &DisburseLoanInput,
    ) -> LendingResult<ActionOutput<Loan>> {
        let start = Instant::now();
        let mut warnings = Vec::new();
        self.disburse_inner(loan_id, input, &mut warnings)
            .map(|loan| with_metadata("disburse", warnings, elapsed_us(start), loan))
            .inspect_err(|e| warn!(action = "disburse", loan_id, error = %e, "lifecycle action rejected"))
    }

    fn disburse_inner(
        &self,
        loan_id: LoanId,
        input: &DisburseLoanInput,
        warnings: &mut Vec<String>,
    ) -> LendingResult<Loan> {
        require_id("loan_id", loan_id)?;
        require_id("field_officer_id", input.field_officer_id)?;

        let lock = self.locks.loan(loan_id);
        let _guard = lock.lock();

        let mut loan = self.load_loan(loan_id)?;
        ensure_status(&loan, LoanStatus::Signed, "disburse")?;

        let officer_id = match self.users.get_by_id(input.field_officer_id) {
            Some(user) if user.role == Role::FieldOfficer => Some(user.id),
            Some(user) => {
                let msg = format!(
                    "user {} is a {}, not a field officer; disbursement recorded without one",
                    user.id,
                    user.role.as_str()
                );
                warn!(loan_id, officer_id = user.id, "{}", msg);
                warnings.push(msg);
                None
            }
            None => {
                let msg = format!(
                    "field officer {} not found; disbursement recorded without one",
                    input.field_officer_id
                );
                warn!(loan_id, officer_id = input.field_officer_id, "{}", msg);
                warnings.push(msg);
                None
            }
        };

        loan.disbursement_info.field_officer_id = officer_id;
        loan.disbursement_info.disbursement_date =
            Some(date_or_now(input.disbursement_date, self.clock.as_ref()));
        loan.advance(LoanStatus::Disbursed)?;
        self.loans.upsert(loan.clone());

        info!(loan_id, officer_id = ?officer_id, "loan disbursed");
        Ok(loan)
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    pub(super) fn load_user(&self, id: UserId) -> LendingResult<User> {
        self.users
            .get_by_id(id)
            .ok_or(LendingError::NotFound { entity: "user", id })
    }

    pub(super) fn load_loan(&self, id: LoanId) -> LendingResult<Loan> {
        self.loans
            .get_by_id(id)
            .ok_or(LendingError::NotFound { entity: "loan", id })
    }

    pub(super) fn load_agreement(&self, id: AgreementId) -> LendingResult<Agreement> {
        self.agreements
            .get_by_id(id)
            .ok_or(LendingError::NotFound { entity: "agreement", id })
    }

    /// Resolve a user and check their role tag.
    fn require_role(&self, id: UserId, role: Role) -> LendingResult<User> {
        let user = self.load_user(id)?;
        if user.role != role {
            return Err(LendingError::Forbidden(format!(
                "user {} is a {}, not a {}",
                user.id,
                user.role.as_str(),
                role.as_str()
            )));
        }
        Ok(user)
    }

    pub(super) fn render(&self, doc: &AgreementDocument) -> LendingResult<Vec<u8>> {
        debug!(loan_id = doc.loan_id, kind = ?doc.kind, signed = doc.signed, "rendering agreement");
        self.documents
            .generate(doc)
            .map_err(|e| LendingError::DocumentGeneration(format!("{}: {}", doc.title(), e)))
    }

    /// Persist a rendered document for `loan_id` under a fresh agreement ID.
    pub(super) fn store_agreement(
        &self,
        loan_id: LoanId,
        owner_id: UserId,
        document: Vec<u8>,
        signed: bool,
    ) -> Agreement {
        let agreement = Agreement {
            id: self.agreements.next_agreement_id(),
            loan_id,
            owner_id,
            document,
            signed,
        };
        self.agreements.upsert(agreement.clone());
        agreement
    }

    pub(super) fn agreement_url(&self, id: AgreementId) -> String {
        reference::agreement_url(&self.config.agreement_base_url, id)
    }
}

pub(super) fn require_id(field: &str, id: u64) -> LendingResult<()> {
    if id == 0 {
        return Err(LendingError::invalid(field, "must be set"));
    }
    Ok(())
}

pub(super) fn ensure_status(loan: &Loan, expected: LoanStatus, action: &'static str) -> LendingResult<()> {
    if loan.status != expected {
        return Err(LendingError::InvalidState {
            loan_id: loan.id,
            action,
            status: loan.status.to_string(),
        });
    }
    Ok(())
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}
