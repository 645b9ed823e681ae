use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_flows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_code: String,
    pub client_id: String,
    pub scope: String,
    pub status: String, // "pending" | "used" | "expired" | "denied"
    pub callback_uri: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
