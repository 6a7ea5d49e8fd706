use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use p2p_lending_core::lifecycle::{
    ApproveLoanInput, DisburseLoanInput, InvestLoanInput, SignAgreementInput, SubmitLoanInput,
};
use p2p_lending_core::{LendingError, LifecycleEngine, PlatformSnapshot};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Lending errors carry their HTTP-style status so JS callers can map them.
fn lending_error(e: LendingError) -> napi::Error {
    napi::Error::from_reason(format!("[{}] {}", e.kind().http_status(), e))
}

fn to_json<T: Serialize>(value: &T) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

/// In-process lending platform. Inputs and outputs are JSON strings.
#[napi]
pub struct LendingPlatform {
    engine: LifecycleEngine,
}

#[napi]
impl LendingPlatform {
    /// A platform seeded with the demo users.
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            engine: LifecycleEngine::from_snapshot(PlatformSnapshot::seeded()),
        }
    }

    #[napi(factory)]
    pub fn from_snapshot(snapshot_json: String) -> napi::Result<Self> {
        let snapshot: PlatformSnapshot =
            serde_json::from_str(&snapshot_json).map_err(to_napi_error)?;
        Ok(Self {
            engine: LifecycleEngine::from_snapshot(snapshot),
        })
    }

    #[napi]
    pub fn snapshot(&self) -> NapiResult<String> {
        to_json(&self.engine.snapshot())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[napi]
    pub fn list_users(&self) -> NapiResult<String> {
        to_json(&self.engine.list_users())
    }

    #[napi]
    pub fn get_user(&self, id: u32) -> NapiResult<String> {
        let user = self.engine.get_user(id.into()).map_err(lending_error)?;
        to_json(&user)
    }

    #[napi]
    pub fn list_loans(&self) -> NapiResult<String> {
        to_json(&self.engine.list_loans())
    }

    #[napi]
    pub fn get_loan(&self, id: u32) -> NapiResult<String> {
        let loan = self.engine.get_loan(id.into()).map_err(lending_error)?;
        to_json(&loan)
    }

    #[napi]
    pub fn list_agreements(&self) -> NapiResult<String> {
        to_json(&self.engine.list_agreements())
    }

    #[napi]
    pub fn get_agreement(&self, id: u32) -> NapiResult<String> {
        let agreement = self.engine.get_agreement(id.into()).map_err(lending_error)?;
        to_json(&agreement)
    }

    /// The rendered document, decoded as UTF-8.
    #[napi]
    pub fn view_agreement(&self, id: u32) -> NapiResult<String> {
        let document = self.engine.view_agreement(id.into()).map_err(lending_error)?;
        Ok(String::from_utf8_lossy(&document).into_owned())
    }

    // -----------------------------------------------------------------------
    // Lifecycle actions
    // -----------------------------------------------------------------------

    #[napi]
    pub fn submit_loan(&self, input_json: String) -> NapiResult<String> {
        let input: SubmitLoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
        let output = self.engine.submit_loan(&input).map_err(lending_error)?;
        to_json(&output)
    }

    #[napi]
    pub fn approve_loan(&self, loan_id: u32, input_json: String) -> NapiResult<String> {
        let input: ApproveLoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
        let output = self
            .engine
            .approve_loan(loan_id.into(), &input)
            .map_err(lending_error)?;
        to_json(&output)
    }

    #[napi]
    pub fn invest_loan(&self, loan_id: u32, input_json: String) -> NapiResult<String> {
        let input: InvestLoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
        let output = self
            .engine
            .invest_loan(loan_id.into(), &input)
            .map_err(lending_error)?;
        to_json(&output)
    }

    #[napi]
    pub fn sign_agreement(&self, agreement_id: u32, input_json: String) -> NapiResult<String> {
        let input: SignAgreementInput =
            serde_json::from_str(&input_json).map_err(to_napi_error)?;
        let output = self
            .engine
            .sign_agreement(agreement_id.into(), &input)
            .map_err(lending_error)?;
        to_json(&output)
    }

    #[napi]
    pub fn disburse_loan(&self, loan_id: u32, input_json: String) -> NapiResult<String> {
        let input: DisburseLoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
        let output = self
            .engine
            .disburse_loan(loan_id.into(), &input)
            .map_err(lending_error)?;
        to_json(&output)
    }
}

impl Default for LendingPlatform {
    fn default() -> Self {
        Self::new()
    }
}
