use crate::errors::SyzygyError;
use crate::storage::{self, UserCodeStatus};
use sea_orm::DatabaseConnection;

/// Outcome of a successful verification: the flow's client and its
/// originally requested scope (None when the device asked for none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedDevice {
    pub client_id: String,
    pub scope: Option<String>,
}

/// Validate a submitted user code and consume it.
///
/// `Ok(None)` is the single uniform rejection: blank input, unknown code,
/// and a code that is already used, expired, or denied are deliberately
/// indistinguishable to the caller, so responses cannot be used as a
/// user-code oracle. `Err` is reserved for operational failures.
///
/// The pending -> used transition is one conditional UPDATE against the
/// store; of any number of concurrent submissions of the same code, exactly
/// one gets `Ok(Some(_))`. A consumed code can never pass verification
/// again.
pub async fn verify_user_code(
    db: &DatabaseConnection,
    user_code: &str,
) -> Result<Option<VerifiedDevice>, SyzygyError> {
    // Blank input never touches the store
    if user_code.trim().is_empty() {
        return Ok(None);
    }

    let Some(client_id) = storage::get_client_id_by_user_code(db, user_code).await? else {
        return Ok(None);
    };

    let consumed = storage::compare_and_set_user_code_status(
        db,
        user_code,
        UserCodeStatus::Pending,
        UserCodeStatus::Used,
    )
    .await?;
    if !consumed {
        return Ok(None);
    }

    let scope = storage::get_scope_for_user_code(db, user_code)
        .await?
        .filter(|s| !s.trim().is_empty());

    Ok(Some(VerifiedDevice { client_id, scope }))
}
