use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use p2p_lending_core::agreements::{AgreementDocument, DocumentGenerator};
use p2p_lending_core::clock::FixedClock;
use p2p_lending_core::ledger::{Loan, LoanStatus};
use p2p_lending_core::lifecycle::{
    ApproveLoanInput, DisburseLoanInput, InvestLoanInput, SignAgreementInput, SubmitLoanInput,
};
use p2p_lending_core::users::{Role, UserDirectory};
use p2p_lending_core::{ErrorKind, LendingError, LifecycleEngine, LoanId, Money, UserId};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BORROWER: UserId = 1;
const LENDER_A: UserId = 2;
const LENDER_B: UserId = 3;
const VALIDATOR: UserId = 4;
const OFFICER: UserId = 5;

fn engine() -> LifecycleEngine {
    let noon = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
    LifecycleEngine::with_users(UserDirectory::seeded()).with_clock(Arc::new(FixedClock(noon)))
}

fn submit(engine: &LifecycleEngine, principal: Money, rate: Decimal) -> Loan {
    engine
        .submit_loan(&SubmitLoanInput {
            borrower_id: BORROWER,
            principal_amount: principal,
            interest_rate: rate,
        })
        .unwrap()
        .result
}

fn approve(engine: &LifecycleEngine, loan_id: LoanId) {
    engine
        .approve_loan(
            loan_id,
            &ApproveLoanInput {
                picture_proof: "https://cdn.example/visit-1.jpg".into(),
                field_validator_id: VALIDATOR,
                approval_date: None,
            },
        )
        .unwrap();
}

fn invest(engine: &LifecycleEngine, loan_id: LoanId, lender_id: UserId, amount: Money) -> Result<Loan, LendingError> {
    engine
        .invest_loan(
            loan_id,
            &InvestLoanInput {
                lender_id,
                invested_amount: amount,
            },
        )
        .map(|o| o.result)
}

fn sign(engine: &LifecycleEngine, agreement_id: u64, loan_id: LoanId, user_id: UserId) -> Result<Loan, LendingError> {
    engine
        .sign_agreement(agreement_id, &SignAgreementInput { loan_id, user_id })
        .map(|o| o.result)
}

fn agreement_id(url: &str) -> u64 {
    p2p_lending_core::agreements::reference::find_id_from_url(url).unwrap()
}

// ===========================================================================
// Happy path
// ===========================================================================

#[test]
fn test_full_lifecycle_two_lenders() {
    let engine = engine();
    let loan = submit(&engine, dec!(1_000_000), dec!(0.1));
    assert_eq!(loan.id, 1);
    assert_eq!(loan.status, LoanStatus::Proposed);

    approve(&engine, loan.id);

    let partial = invest(&engine, loan.id, LENDER_A, dec!(600_000)).unwrap();
    assert_eq!(partial.status, LoanStatus::Approved);
    assert_eq!(partial.remaining_required(), dec!(400_000));

    let funded = invest(&engine, loan.id, LENDER_B, dec!(400_000)).unwrap();
    assert_eq!(funded.status, LoanStatus::Invested);
    assert_eq!(funded.collected_amount, dec!(1_000_000));
    assert_eq!(funded.lendings.len(), 2);
    assert_eq!(funded.lendings[0].return_amount, dec!(660_000));
    assert_eq!(funded.lendings[1].return_amount, dec!(440_000));
    assert_eq!(funded.loan_return(), dec!(1_100_000));

    let first = agreement_id(funded.lendings[0].agreement_url.as_deref().unwrap());
    let second = agreement_id(funded.lendings[1].agreement_url.as_deref().unwrap());
    assert_eq!(engine.get_agreement(first).unwrap().owner_id, LENDER_A);
    assert_eq!(engine.get_agreement(second).unwrap().owner_id, LENDER_B);

    sign(&engine, first, loan.id, LENDER_A).unwrap();
    let all_lenders = sign(&engine, second, loan.id, LENDER_B).unwrap();
    let borrower_agreement = agreement_id(all_lenders.borrower_agreement_url.as_deref().unwrap());

    let signed = sign(&engine, borrower_agreement, loan.id, BORROWER).unwrap();
    assert_eq!(signed.status, LoanStatus::Signed);
    assert_eq!(signed.disbursement_info.signed_agreement_urls.len(), 3);

    let out = engine
        .disburse_loan(
            loan.id,
            &DisburseLoanInput {
                field_officer_id: OFFICER,
                disbursement_date: None,
            },
        )
        .unwrap();
    assert_eq!(out.action, "disburse");
    assert_eq!(out.result.status, LoanStatus::Disbursed);
    assert_eq!(out.result.disbursement_info.field_officer_id, Some(OFFICER));
    assert_eq!(
        out.result.disbursement_info.disbursement_date,
        Some(Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap())
    );

    // Disbursed is terminal: every action is refused and nothing changes.
    let disbursed = engine.get_loan(loan.id).unwrap();
    let agreements = engine.list_agreements();
    let rejections = [
        engine
            .approve_loan(
                loan.id,
                &ApproveLoanInput {
                    picture_proof: "https://cdn.example/visit-2.jpg".into(),
                    field_validator_id: VALIDATOR,
                    approval_date: None,
                },
            )
            .map(|o| o.result),
        invest(&engine, loan.id, LENDER_A, dec!(1)),
        sign(&engine, first, loan.id, LENDER_A),
        sign(&engine, borrower_agreement, loan.id, BORROWER),
        engine
            .disburse_loan(
                loan.id,
                &DisburseLoanInput {
                    field_officer_id: OFFICER,
                    disbursement_date: None,
                },
            )
            .map(|o| o.result),
    ];
    for rejected in rejections {
        let err = rejected.unwrap_err();
        assert!(matches!(err, LendingError::InvalidState { .. }), "unexpected {:?}", err);
    }
    assert_eq!(engine.get_loan(loan.id).unwrap(), disbursed);
    assert_eq!(engine.list_agreements(), agreements);
}

#[test]
fn test_fulfilling_investment_generates_one_agreement() {
    let engine = engine();
    let loan = submit(&engine, dec!(1_000_000), dec!(0.1));
    approve(&engine, loan.id);

    invest(&engine, loan.id, LENDER_A, dec!(600_000)).unwrap();
    let funded = invest(&engine, loan.id, LENDER_A, dec!(400_000)).unwrap();

    assert_eq!(funded.status, LoanStatus::Invested);
    assert_eq!(funded.lendings.len(), 1);
    assert_eq!(funded.lendings[0].invested_amount, dec!(1_000_000));
    assert_eq!(funded.lendings[0].return_amount, dec!(1_100_000));
    assert_eq!(engine.list_agreements().len(), 1);

    let text = String::from_utf8(engine.view_agreement(1).unwrap()).unwrap();
    assert!(text.contains("ORGANIZER-LENDER AGREEMENT [Loan ID: 1]"));
    assert!(text.contains("Invested Amount: Rp 1000000.00"));
}

// ===========================================================================
// Money accounting
// ===========================================================================

#[test]
fn test_many_small_investments_sum_exactly() {
    let engine = engine();
    let loan = submit(&engine, dec!(1), dec!(0.07));
    approve(&engine, loan.id);

    for i in 0..10 {
        let lender = if i % 2 == 0 { LENDER_A } else { LENDER_B };
        invest(&engine, loan.id, lender, dec!(0.1)).unwrap();
    }

    let loan = engine.get_loan(loan.id).unwrap();
    assert_eq!(loan.collected_amount, dec!(1));
    assert!(loan.is_fulfilled());
    assert_eq!(loan.status, LoanStatus::Invested);
    assert_eq!(loan.lendings[0].return_amount, dec!(0.535));
}

#[test]
fn test_over_investment_rejected_without_mutation() {
    let engine = engine();
    let loan = submit(&engine, dec!(1_000_000), dec!(0.1));
    approve(&engine, loan.id);
    invest(&engine, loan.id, LENDER_A, dec!(999_999.99)).unwrap();

    let err = invest(&engine, loan.id, LENDER_B, dec!(0.02)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let loan = engine.get_loan(loan.id).unwrap();
    assert_eq!(loan.collected_amount, dec!(999_999.99));
    assert_eq!(loan.lendings.len(), 1);
}

#[test]
fn test_concurrent_investments_never_exceed_principal() {
    let engine = Arc::new(engine());
    let loan = submit(&engine, dec!(1000), dec!(0.1));
    approve(&engine, loan.id);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let lender = if i % 2 == 0 { LENDER_A } else { LENDER_B };
            thread::spawn(move || invest(&engine, 1, lender, dec!(100)).is_ok())
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    let loan = engine.get_loan(1).unwrap();
    assert_eq!(accepted, 10);
    assert_eq!(loan.collected_amount, dec!(1000));
    assert_eq!(loan.status, LoanStatus::Invested);
    let invested: Money = loan.lendings.iter().map(|l| l.invested_amount).sum();
    assert_eq!(invested, loan.collected_amount);
}

// ===========================================================================
// Failure atomicity
// ===========================================================================

struct OfflineRenderer;

impl DocumentGenerator for OfflineRenderer {
    fn generate(
        &self,
        _document: &AgreementDocument,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        Err("renderer offline".into())
    }
}

#[test]
fn test_generator_failure_rolls_back_fulfilling_investment() {
    let engine = engine().with_document_generator(Arc::new(OfflineRenderer));
    let loan = submit(&engine, dec!(500), dec!(0.2));
    approve(&engine, loan.id);
    invest(&engine, loan.id, LENDER_A, dec!(200)).unwrap();
    let before = engine.get_loan(loan.id).unwrap();

    let err = invest(&engine, loan.id, LENDER_B, dec!(300)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(engine.get_loan(loan.id).unwrap(), before);
    assert!(engine.list_agreements().is_empty());
}

#[test]
fn test_wrong_state_actions_change_nothing() {
    let engine = engine();
    let loan = submit(&engine, dec!(1000), dec!(0.1));

    let err = engine
        .disburse_loan(
            loan.id,
            &DisburseLoanInput {
                field_officer_id: OFFICER,
                disbursement_date: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, LendingError::InvalidState { action: "disburse", .. }));
    assert_eq!(err.kind().http_status(), 400);
    assert_eq!(engine.get_loan(loan.id).unwrap(), loan);
}

// ===========================================================================
// Disbursement fail-open
// ===========================================================================

#[test]
fn test_disburse_with_non_officer_clears_officer() {
    let engine = engine();
    let loan = submit(&engine, dec!(100), dec!(0.1));
    approve(&engine, loan.id);
    let funded = invest(&engine, loan.id, LENDER_A, dec!(100)).unwrap();

    let lender_agreement = agreement_id(funded.lendings[0].agreement_url.as_deref().unwrap());
    let after_lender = sign(&engine, lender_agreement, loan.id, LENDER_A).unwrap();
    let borrower_agreement = agreement_id(after_lender.borrower_agreement_url.as_deref().unwrap());
    sign(&engine, borrower_agreement, loan.id, BORROWER).unwrap();

    assert_eq!(engine.get_user(BORROWER).unwrap().role, Role::Borrower);
    let out = engine
        .disburse_loan(
            loan.id,
            &DisburseLoanInput {
                field_officer_id: BORROWER,
                disbursement_date: None,
            },
        )
        .unwrap();
    assert_eq!(out.result.status, LoanStatus::Disbursed);
    assert_eq!(out.result.disbursement_info.field_officer_id, None);
    assert_eq!(out.warnings.len(), 1);
}
