//! The sign step: the only action that touches two entities at once.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::engine::{ensure_status, require_id, LifecycleEngine};
use super::requests::SignAgreementInput;
use crate::agreements::{AgreementDocument, AgreementStore};
use crate::error::LendingError;
use crate::ledger::{Loan, LoanStatus};
use crate::types::{with_metadata, ActionOutput, AgreementId};
use crate::users::{Role, User};
use crate::LendingResult;

/// Documents rendered ahead of the commit.
struct PendingSignature {
    signed_copy: Vec<u8>,
    borrower_agreement: Option<Vec<u8>>,
    finalizes: bool,
}

impl LifecycleEngine {
    /// Sign an agreement on behalf of its owner.
    ///
    /// The original row is flagged signed and a signed copy is appended; its
    /// URL joins the loan's signed-agreement list. The lender signature that
    /// completes the lender set triggers the borrower agreement. The
    /// borrower's signature moves the loan to `Signed`.
    pub fn sign_agreement(
        &self,
        agreement_id: AgreementId,
        input: &SignAgreementInput,
    ) -> LendingResult<ActionOutput<Loan>> {
        let start = Instant::now();
        self.sign_inner(agreement_id, input)
            .map(|loan| {
                with_metadata(
                    "sign",
                    Vec::new(),
                    start.elapsed().as_micros() as u64,
                    loan,
                )
            })
            .inspect_err(|e| {
                warn!(
                    action = "sign",
                    agreement_id,
                    loan_id = input.loan_id,
                    user_id = input.user_id,
                    error = %e,
                    "lifecycle action rejected"
                )
            })
    }

    fn sign_inner(&self, agreement_id: AgreementId, input: &SignAgreementInput) -> LendingResult<Loan> {
        require_id("agreement_id", agreement_id)?;
        require_id("loan_id", input.loan_id)?;
        require_id("user_id", input.user_id)?;

        // Loan before agreement, always.
        let loan_lock = self.locks.loan(input.loan_id);
        let _loan_guard = loan_lock.lock();
        let agreement_lock = self.locks.agreement(agreement_id);
        let _agreement_guard = agreement_lock.lock();

        let mut loan = self.load_loan(input.loan_id)?;
        ensure_status(&loan, LoanStatus::Invested, "sign")?;
        let signer = self.load_user(input.user_id)?;
        let mut agreement = self.load_agreement(agreement_id)?;

        if agreement.loan_id != loan.id {
            return Err(LendingError::Forbidden(format!(
                "agreement {} belongs to loan {}, not {}",
                agreement.id, agreement.loan_id, loan.id
            )));
        }
        if agreement.owner_id != signer.id {
            return Err(LendingError::Forbidden(format!(
                "agreement {} belongs to user {}, not {}",
                agreement.id, agreement.owner_id, signer.id
            )));
        }
        if agreement.signed {
            return Err(LendingError::AlreadySigned {
                agreement_id: agreement.id,
            });
        }
        ensure_party(&loan, &signer)?;

        let pending = self.prepare_signature(&loan, &signer, agreement_id)?;

        // Commit.
        agreement.signed = true;
        self.agreements.upsert(agreement);
        let copy = self.store_agreement(loan.id, signer.id, pending.signed_copy, true);
        loan.disbursement_info
            .signed_agreement_urls
            .push(self.agreement_url(copy.id));

        if let Some(document) = pending.borrower_agreement {
            let borrower_agreement = self.store_agreement(loan.id, loan.borrower_id, document, false);
            loan.borrower_agreement_url = Some(self.agreement_url(borrower_agreement.id));
            info!(
                loan_id = loan.id,
                agreement_id = borrower_agreement.id,
                "all lenders signed; borrower agreement generated"
            );
        }
        if pending.finalizes {
            loan.advance(LoanStatus::Signed)?;
        }
        self.loans.upsert(loan.clone());

        info!(
            loan_id = loan.id,
            agreement_id,
            signed_copy_id = copy.id,
            signer_id = signer.id,
            status = %loan.status,
            "agreement signed"
        );
        Ok(loan)
    }

    /// Render the signed copy and, when this signature completes the lender
    /// set, the borrower agreement. Nothing is written here.
    fn prepare_signature(
        &self,
        loan: &Loan,
        signer: &User,
        agreement_id: AgreementId,
    ) -> LendingResult<PendingSignature> {
        let borrower = self.load_user(loan.borrower_id)?;
        let currency = &self.config.currency_symbol;

        match signer.role {
            Role::Lender => {
                let lending = loan.lending_for(signer.id).ok_or_else(|| {
                    LendingError::Forbidden(format!("user {} has not invested in loan {}", signer.id, loan.id))
                })?;
                let doc = AgreementDocument::organizer_lender(loan, &borrower, signer, lending, true, currency);
                let signed_copy = self.render(&doc)?;

                let borrower_agreement = if loan.borrower_agreement_url.is_none()
                    && self.all_lender_agreements_signed(loan, agreement_id)?
                {
                    let doc = AgreementDocument::organizer_borrower(loan, &borrower, false, currency);
                    Some(self.render(&doc)?)
                } else {
                    None
                };

                Ok(PendingSignature {
                    signed_copy,
                    borrower_agreement,
                    finalizes: false,
                })
            }
            Role::Borrower => {
                let doc = AgreementDocument::organizer_borrower(loan, &borrower, true, currency);
                Ok(PendingSignature {
                    signed_copy: self.render(&doc)?,
                    borrower_agreement: None,
                    finalizes: true,
                })
            }
            other => Err(LendingError::Forbidden(format!(
                "a {} cannot sign loan agreements",
                other.as_str()
            ))),
        }
    }

    /// Whether every lending entry's agreement is signed, counting
    /// `just_signed` as signed. Entries without an agreement count as unsigned.
    fn all_lender_agreements_signed(&self, loan: &Loan, just_signed: AgreementId) -> LendingResult<bool> {
        for lending in &loan.lendings {
            let Some(url) = lending.agreement_url.as_deref() else {
                debug!(loan_id = loan.id, lender_id = lending.lender_id, "lending has no agreement yet");
                return Ok(false);
            };
            let id = AgreementStore::find_id_from_url(url)?;
            if id == just_signed {
                continue;
            }
            let signed = self.agreements.get_by_id(id).is_some_and(|a| a.signed);
            if !signed {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn ensure_party(loan: &Loan, signer: &User) -> LendingResult<()> {
    let is_party = match signer.role {
        Role::Borrower => loan.borrower_id == signer.id,
        Role::Lender => loan.is_lender_invested(signer.id),
        _ => false,
    };
    if !is_party {
        return Err(LendingError::Forbidden(format!(
            "user {} is not a party to loan {}",
            signer.id, loan.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreements::{Agreement, DocumentGenerator};
    use crate::lifecycle::requests::{ApproveLoanInput, InvestLoanInput, SubmitLoanInput};
    use crate::types::{LoanId, UserId};
    use crate::users::UserDirectory;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const BORROWER: UserId = 1;
    const LENDER_A: UserId = 2;
    const LENDER_B: UserId = 3;
    const VALIDATOR: UserId = 4;

    /// Loan 1 funded 600k by lender A and 400k by lender B. Agreements 1 and 2
    /// are the lenders' unsigned copies.
    fn invested_engine() -> LifecycleEngine {
        let engine = LifecycleEngine::with_users(UserDirectory::seeded());
        engine
            .submit_loan(&SubmitLoanInput {
                borrower_id: BORROWER,
                principal_amount: dec!(1_000_000),
                interest_rate: dec!(0.1),
            })
            .unwrap();
        engine
            .approve_loan(
                1,
                &ApproveLoanInput {
                    picture_proof: "visit.jpg".into(),
                    field_validator_id: VALIDATOR,
                    approval_date: None,
                },
            )
            .unwrap();
        for (lender_id, amount) in [(LENDER_A, dec!(600_000)), (LENDER_B, dec!(400_000))] {
            engine
                .invest_loan(
                    1,
                    &InvestLoanInput {
                        lender_id,
                        invested_amount: amount,
                    },
                )
                .unwrap();
        }
        engine
    }

    fn sign(engine: &LifecycleEngine, agreement_id: AgreementId, loan_id: LoanId, user_id: UserId) -> LendingResult<Loan> {
        engine
            .sign_agreement(agreement_id, &SignAgreementInput { loan_id, user_id })
            .map(|o| o.result)
    }

    fn agreement_text(engine: &LifecycleEngine, id: AgreementId) -> String {
        String::from_utf8(engine.view_agreement(id).unwrap()).unwrap()
    }

    #[test]
    fn test_lender_sign_appends_signed_copy() {
        let engine = invested_engine();
        let loan = sign(&engine, 1, 1, LENDER_A).unwrap();

        assert_eq!(loan.status, LoanStatus::Invested);
        assert_eq!(loan.disbursement_info.signed_agreement_urls, vec!["http://localhost:8080/agreement/3/view".to_string()]);
        assert!(loan.borrower_agreement_url.is_none());

        assert!(engine.get_agreement(1).unwrap().signed);
        let copy = engine.get_agreement(3).unwrap();
        assert!(copy.signed);
        assert_eq!(copy.owner_id, LENDER_A);
        assert!(agreement_text(&engine, 3).contains("Sign: SIGNED"));
        assert!(agreement_text(&engine, 1).contains("Sign: UNSIGNED"));
    }

    #[test]
    fn test_last_lender_signature_generates_borrower_agreement() {
        let engine = invested_engine();
        sign(&engine, 1, 1, LENDER_A).unwrap();
        let loan = sign(&engine, 2, 1, LENDER_B).unwrap();

        // Copies 3 and 4, then the borrower agreement as 5.
        assert_eq!(loan.status, LoanStatus::Invested);
        assert_eq!(loan.borrower_agreement_url.as_deref(), Some("http://localhost:8080/agreement/5/view"));
        let borrower_agreement = engine.get_agreement(5).unwrap();
        assert_eq!(borrower_agreement.owner_id, BORROWER);
        assert!(!borrower_agreement.signed);
        assert!(agreement_text(&engine, 5).contains("Amount of debt: Rp 1100000.00"));
    }

    #[test]
    fn test_borrower_signature_finalizes() {
        let engine = invested_engine();
        sign(&engine, 1, 1, LENDER_A).unwrap();
        sign(&engine, 2, 1, LENDER_B).unwrap();
        let loan = sign(&engine, 5, 1, BORROWER).unwrap();

        assert_eq!(loan.status, LoanStatus::Signed);
        assert_eq!(loan.disbursement_info.signed_agreement_urls.len(), 3);
        assert!(engine.get_agreement(6).unwrap().signed);
    }

    #[test]
    fn test_borrower_can_sign_before_lenders_finish() {
        let engine = invested_engine();
        let doc = AgreementDocument::organizer_borrower(
            &engine.get_loan(1).unwrap(),
            &engine.get_user(BORROWER).unwrap(),
            false,
            "Rp",
        );
        let id = engine.agreements().next_agreement_id();
        engine.agreements().upsert(Agreement {
            id,
            loan_id: 1,
            owner_id: BORROWER,
            document: crate::agreements::TextDocumentGenerator.generate(&doc).unwrap(),
            signed: false,
        });

        let loan = sign(&engine, id, 1, BORROWER).unwrap();
        assert_eq!(loan.status, LoanStatus::Signed);
        assert!(!engine.get_agreement(1).unwrap().signed);
    }

    #[test]
    fn test_non_owner_is_forbidden_without_side_effects() {
        let engine = invested_engine();
        let before_loan = engine.get_loan(1).unwrap();
        let before_agreements = engine.list_agreements();

        let err = sign(&engine, 1, 1, LENDER_B).unwrap_err();
        assert!(matches!(err, LendingError::Forbidden(_)));
        assert_eq!(engine.get_loan(1).unwrap(), before_loan);
        assert_eq!(engine.list_agreements(), before_agreements);
    }

    /// Loans 1 and 2, each fully funded by lender A alone. Agreement 1 is
    /// loan 1's lender agreement, agreement 2 is loan 2's.
    fn two_loans_one_lender() -> LifecycleEngine {
        let engine = LifecycleEngine::with_users(UserDirectory::seeded());
        for loan_id in [1, 2] {
            engine
                .submit_loan(&SubmitLoanInput {
                    borrower_id: BORROWER,
                    principal_amount: dec!(1000),
                    interest_rate: dec!(0.1),
                })
                .unwrap();
            engine
                .approve_loan(
                    loan_id,
                    &ApproveLoanInput {
                        picture_proof: "visit.jpg".into(),
                        field_validator_id: VALIDATOR,
                        approval_date: None,
                    },
                )
                .unwrap();
            engine
                .invest_loan(
                    loan_id,
                    &InvestLoanInput {
                        lender_id: LENDER_A,
                        invested_amount: dec!(1000),
                    },
                )
                .unwrap();
        }
        engine
    }

    #[test]
    fn test_lender_cannot_sign_another_loans_agreement() {
        let engine = two_loans_one_lender();
        assert_eq!(engine.get_agreement(2).unwrap().loan_id, 2);
        let before = engine.get_loan(1).unwrap();

        let err = sign(&engine, 2, 1, LENDER_A).unwrap_err();
        assert!(matches!(err, LendingError::Forbidden(_)));
        assert_eq!(engine.get_loan(1).unwrap(), before);
        assert!(!engine.get_agreement(2).unwrap().signed);
        assert_eq!(engine.list_agreements().len(), 2);

        // Loan 2 can still be signed under its own ID.
        let loan2 = sign(&engine, 2, 2, LENDER_A).unwrap();
        assert_eq!(loan2.disbursement_info.signed_agreement_urls.len(), 1);
        assert!(loan2.borrower_agreement_url.is_some());
        assert_eq!(engine.get_agreement(3).unwrap().loan_id, 2);
    }

    #[test]
    fn test_borrower_cannot_finalize_with_another_loans_agreement() {
        let engine = two_loans_one_lender();
        // Copy 3 and borrower agreement 4 belong to loan 2.
        sign(&engine, 2, 2, LENDER_A).unwrap();
        // Copy 5 and borrower agreement 6 belong to loan 1.
        sign(&engine, 1, 1, LENDER_A).unwrap();
        assert_eq!(engine.get_agreement(4).unwrap().loan_id, 2);
        let before = engine.get_loan(1).unwrap();

        let err = sign(&engine, 4, 1, BORROWER).unwrap_err();
        assert!(matches!(err, LendingError::Forbidden(_)));
        assert_eq!(engine.get_loan(1).unwrap(), before);
        assert!(!engine.get_agreement(4).unwrap().signed);

        let loan1 = sign(&engine, 6, 1, BORROWER).unwrap();
        assert_eq!(loan1.status, LoanStatus::Signed);
        assert_eq!(engine.get_loan(2).unwrap().status, LoanStatus::Invested);
    }

    #[test]
    fn test_double_sign_is_rejected() {
        let engine = invested_engine();
        sign(&engine, 1, 1, LENDER_A).unwrap();
        let err = sign(&engine, 1, 1, LENDER_A).unwrap_err();
        assert!(matches!(err, LendingError::AlreadySigned { agreement_id: 1 }));
        assert_eq!(engine.get_loan(1).unwrap().disbursement_info.signed_agreement_urls.len(), 1);
    }

    #[test]
    fn test_sign_requires_invested_loan() {
        let engine = LifecycleEngine::with_users(UserDirectory::seeded());
        engine
            .submit_loan(&SubmitLoanInput {
                borrower_id: BORROWER,
                principal_amount: dec!(1000),
                interest_rate: dec!(0.05),
            })
            .unwrap();
        let err = sign(&engine, 1, 1, BORROWER).unwrap_err();
        assert!(matches!(err, LendingError::InvalidState { action: "sign", .. }));
    }

    #[test]
    fn test_sign_missing_entities() {
        let engine = invested_engine();
        assert!(matches!(sign(&engine, 1, 9, LENDER_A), Err(LendingError::NotFound { entity: "loan", .. })));
        assert!(matches!(sign(&engine, 1, 1, 77), Err(LendingError::NotFound { entity: "user", .. })));
        assert!(matches!(sign(&engine, 50, 1, LENDER_A), Err(LendingError::NotFound { entity: "agreement", .. })));
        assert!(matches!(sign(&engine, 1, 0, LENDER_A), Err(LendingError::InvalidInput { .. })));
    }

    struct FailingGenerator;

    impl DocumentGenerator for FailingGenerator {
        fn generate(
            &self,
            _document: &AgreementDocument,
        ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
            Err("renderer offline".into())
        }
    }

    #[test]
    fn test_generator_failure_leaves_agreement_unsigned() {
        let engine = invested_engine().with_document_generator(Arc::new(FailingGenerator));
        let err = sign(&engine, 1, 1, LENDER_A).unwrap_err();

        assert!(matches!(err, LendingError::DocumentGeneration(_)));
        assert!(!engine.get_agreement(1).unwrap().signed);
        assert_eq!(engine.list_agreements().len(), 2);
        assert!(engine.get_loan(1).unwrap().disbursement_info.signed_agreement_urls.is_empty());
    }
}
