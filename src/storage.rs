use crate::entities;
use crate::errors::SyzygyError;
use crate::settings::Database as DbCfg;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};

/// Lifecycle of a user code. `Pending` is the only state this crate writes
/// from; the other three are terminal. `Expired` and `Denied` are written by
/// external collaborators (reaper, consent denial) and only ever read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserCodeStatus {
    Pending,
    Used,
    Expired,
    Denied,
}

impl UserCodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserCodeStatus::Pending => "pending",
            UserCodeStatus::Used => "used",
            UserCodeStatus::Expired => "expired",
            UserCodeStatus::Denied => "denied",
        }
    }

    /// Parse a persisted status column. An unrecognized value means the row
    /// was corrupted by something outside this crate; that is an operational
    /// condition, not a user-input one.
    pub fn from_db(s: &str) -> Result<Self, SyzygyError> {
        match s {
            "pending" => Ok(UserCodeStatus::Pending),
            "used" => Ok(UserCodeStatus::Used),
            "expired" => Ok(UserCodeStatus::Expired),
            "denied" => Ok(UserCodeStatus::Denied),
            other => Err(SyzygyError::Other(format!(
                "unknown user code status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientApp {
    pub client_id: String,
    pub application_name: String,
    pub callback_uri: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClientApp {
    pub client_id: String,
    pub application_name: String,
    pub callback_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFlow {
    pub user_code: String,
    pub client_id: String,
    pub scope: String,
    pub status: UserCodeStatus,
    pub callback_uri: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeviceFlow {
    pub user_code: String,
    pub client_id: String,
    pub scope: String,
    pub ttl_secs: i64,
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, SyzygyError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

// Client app functions

pub async fn create_client_app(
    db: &DatabaseConnection,
    input: NewClientApp,
) -> Result<ClientApp, SyzygyError> {
    let created_at = Utc::now().timestamp();

    let app = entities::client_app::ActiveModel {
        client_id: Set(input.client_id.clone()),
        application_name: Set(input.application_name.clone()),
        callback_uri: Set(input.callback_uri.clone()),
        created_at: Set(created_at),
    };

    app.insert(db).await?;

    Ok(ClientApp {
        client_id: input.client_id,
        application_name: input.application_name,
        callback_uri: input.callback_uri,
        created_at,
    })
}

pub async fn get_client_app(
    db: &DatabaseConnection,
    client_id: &str,
) -> Result<Option<ClientApp>, SyzygyError> {
    use entities::client_app::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::ClientId.eq(client_id))
        .one(db)
        .await?
    {
        Ok(Some(ClientApp {
            client_id: model.client_id,
            application_name: model.application_name,
            callback_uri: model.callback_uri,
            created_at: model.created_at,
        }))
    } else {
        Ok(None)
    }
}

/// Persist a resolved callback URI for a client. The authoritative copy lives
/// on the client app record; outstanding pending flows for the client get the
/// same value stamped so their records carry the resolved target.
pub async fn set_callback_uri(
    db: &DatabaseConnection,
    client_id: &str,
    uri: &str,
) -> Result<(), SyzygyError> {
    {
        use entities::client_app::{Column, Entity};
        Entity::update_many()
            .col_expr(Column::CallbackUri, Expr::value(uri))
            .filter(Column::ClientId.eq(client_id))
            .exec(db)
            .await?;
    }
    {
        use entities::device_flow::{Column, Entity};
        Entity::update_many()
            .col_expr(Column::CallbackUri, Expr::value(uri))
            .filter(Column::ClientId.eq(client_id))
            .filter(Column::Status.eq(UserCodeStatus::Pending.as_str()))
            .exec(db)
            .await?;
    }
    Ok(())
}

// Device flow functions

/// Record a device-authorization attempt. Issuance of the codes themselves
/// happens upstream; this is the persistence hook it (and the tests) use.
pub async fn create_device_flow(
    db: &DatabaseConnection,
    input: NewDeviceFlow,
) -> Result<DeviceFlow, SyzygyError> {
    let now = Utc::now().timestamp();
    let expires_at = now + input.ttl_secs;

    let flow = entities::device_flow::ActiveModel {
        user_code: Set(input.user_code.clone()),
        client_id: Set(input.client_id.clone()),
        scope: Set(input.scope.clone()),
        status: Set(UserCodeStatus::Pending.as_str().to_string()),
        callback_uri: Set(None),
        created_at: Set(now),
        expires_at: Set(expires_at),
    };

    flow.insert(db).await?;

    Ok(DeviceFlow {
        user_code: input.user_code,
        client_id: input.client_id,
        scope: input.scope,
        status: UserCodeStatus::Pending,
        callback_uri: None,
        created_at: now,
        expires_at,
    })
}

pub async fn get_device_flow_by_user_code(
    db: &DatabaseConnection,
    user_code: &str,
) -> Result<Option<DeviceFlow>, SyzygyError> {
    use entities::device_flow::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::UserCode.eq(user_code))
        .one(db)
        .await?
    {
        Ok(Some(DeviceFlow {
            user_code: model.user_code,
            client_id: model.client_id,
            scope: model.scope,
            status: UserCodeStatus::from_db(&model.status)?,
            callback_uri: model.callback_uri,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }))
    } else {
        Ok(None)
    }
}

pub async fn get_client_id_by_user_code(
    db: &DatabaseConnection,
    user_code: &str,
) -> Result<Option<String>, SyzygyError> {
    use entities::device_flow::{Column, Entity};

    let model = Entity::find()
        .filter(Column::UserCode.eq(user_code))
        .one(db)
        .await?;
    Ok(model.map(|m| m.client_id))
}

pub async fn get_user_code_status(
    db: &DatabaseConnection,
    user_code: &str,
) -> Result<Option<UserCodeStatus>, SyzygyError> {
    use entities::device_flow::{Column, Entity};

    let model = Entity::find()
        .filter(Column::UserCode.eq(user_code))
        .one(db)
        .await?;
    match model {
        Some(m) => Ok(Some(UserCodeStatus::from_db(&m.status)?)),
        None => Ok(None),
    }
}

pub async fn get_scope_for_user_code(
    db: &DatabaseConnection,
    user_code: &str,
) -> Result<Option<String>, SyzygyError> {
    use entities::device_flow::{Column, Entity};

    let model = Entity::find()
        .filter(Column::UserCode.eq(user_code))
        .one(db)
        .await?;
    Ok(model.map(|m| m.scope))
}

/// Atomically transition a user code from `expected` to `new`. The whole
/// check-and-set is one conditional UPDATE; the rows-affected count decides
/// the winner, so of any two concurrent calls for the same code at most one
/// returns true.
pub async fn compare_and_set_user_code_status(
    db: &DatabaseConnection,
    user_code: &str,
    expected: UserCodeStatus,
    new: UserCodeStatus,
) -> Result<bool, SyzygyError> {
    use entities::device_flow::{Column, Entity};

    let result = Entity::update_many()
        .col_expr(Column::Status, Expr::value(new.as_str()))
        .filter(Column::UserCode.eq(user_code))
        .filter(Column::Status.eq(expected.as_str()))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}
