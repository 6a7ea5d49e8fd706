use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use p2p_lending_core::lifecycle::{
    ApproveLoanInput, DisburseLoanInput, InvestLoanInput, SignAgreementInput, SubmitLoanInput,
};
use p2p_lending_core::{AgreementId, LoanId, UserId};

use super::state::Context;
use crate::input;

/// Arguments for loan submission
#[derive(Args)]
pub struct SubmitArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Borrower user ID
    #[arg(long)]
    pub borrower_id: Option<UserId>,

    /// Requested principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Interest rate as a decimal (0.1 = 10%)
    #[arg(long)]
    pub rate: Option<Decimal>,
}

pub fn run_submit(args: SubmitArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let submit_input: SubmitLoanInput = match read_input(&args.input)? {
        Some(parsed) => parsed,
        None => SubmitLoanInput {
            borrower_id: args
                .borrower_id
                .ok_or("--borrower-id is required (or provide --input)")?,
            principal_amount: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            interest_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
        },
    };

    let engine = ctx.engine()?;
    let result = engine.submit_loan(&submit_input)?;
    ctx.save(&engine)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for loan approval
#[derive(Args)]
pub struct ApproveArgs {
    /// Loan ID
    pub loan_id: LoanId,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Reference to the field-visit photo
    #[arg(long)]
    pub picture_proof: Option<String>,

    /// Field validator user ID
    #[arg(long)]
    pub field_validator_id: Option<UserId>,

    /// RFC 3339 approval timestamp (defaults to now)
    #[arg(long)]
    pub approval_date: Option<DateTime<Utc>>,
}

pub fn run_approve(args: ApproveArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let approve_input: ApproveLoanInput = match read_input(&args.input)? {
        Some(parsed) => parsed,
        None => ApproveLoanInput {
            picture_proof: args
                .picture_proof
                .ok_or("--picture-proof is required (or provide --input)")?,
            field_validator_id: args
                .field_validator_id
                .ok_or("--field-validator-id is required (or provide --input)")?,
            approval_date: args.approval_date,
        },
    };

    let engine = ctx.engine()?;
    let result = engine.approve_loan(args.loan_id, &approve_input)?;
    ctx.save(&engine)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for an investment
#[derive(Args)]
pub struct InvestArgs {
    /// Loan ID
    pub loan_id: LoanId,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Lender user ID
    #[arg(long)]
    pub lender_id: Option<UserId>,

    /// Amount to invest
    #[arg(long)]
    pub amount: Option<Decimal>,
}

pub fn run_invest(args: InvestArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let invest_input: InvestLoanInput = match read_input(&args.input)? {
        Some(parsed) => parsed,
        None => InvestLoanInput {
            lender_id: args
                .lender_id
                .ok_or("--lender-id is required (or provide --input)")?,
            invested_amount: args
                .amount
                .ok_or("--amount is required (or provide --input)")?,
        },
    };

    let engine = ctx.engine()?;
    let result = engine.invest_loan(args.loan_id, &invest_input)?;
    ctx.save(&engine)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for signing an agreement
#[derive(Args)]
pub struct SignArgs {
    /// Agreement ID
    pub agreement_id: AgreementId,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan the agreement belongs to
    #[arg(long)]
    pub loan_id: Option<LoanId>,

    /// Signing user ID
    #[arg(long)]
    pub user_id: Option<UserId>,
}

pub fn run_sign(args: SignArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let sign_input: SignAgreementInput = match read_input(&args.input)? {
        Some(parsed) => parsed,
        None => SignAgreementInput {
            loan_id: args
                .loan_id
                .ok_or("--loan-id is required (or provide --input)")?,
            user_id: args
                .user_id
                .ok_or("--user-id is required (or provide --input)")?,
        },
    };

    let engine = ctx.engine()?;
    let result = engine.sign_agreement(args.agreement_id, &sign_input)?;
    ctx.save(&engine)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for disbursement
#[derive(Args)]
pub struct DisburseArgs {
    /// Loan ID
    pub loan_id: LoanId,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Field officer user ID
    #[arg(long)]
    pub field_officer_id: Option<UserId>,

    /// RFC 3339 disbursement timestamp (defaults to now)
    #[arg(long)]
    pub disbursement_date: Option<DateTime<Utc>>,
}

pub fn run_disburse(args: DisburseArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let disburse_input: DisburseLoanInput = match read_input(&args.input)? {
        Some(parsed) => parsed,
        None => DisburseLoanInput {
            field_officer_id: args
                .field_officer_id
                .ok_or("--field-officer-id is required (or provide --input)")?,
            disbursement_date: args.disbursement_date,
        },
    };

    let engine = ctx.engine()?;
    let result = engine.disburse_loan(args.loan_id, &disburse_input)?;
    ctx.save(&engine)?;
    Ok(serde_json::to_value(result)?)
}

/// `--input` file first, then piped stdin.
fn read_input<T: DeserializeOwned>(path: &Option<String>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(input::file::read_json(path)?));
    }
    input::stdin::read_stdin()
}
