use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    pub password: String,

    /// Ordered ids of the workout logs this user owns, as a JSON array of
    /// UUID strings. Doubles as the ownership check for every log route.
    #[sea_orm(column_type = "JsonBinary")]
    pub workout_log_ids: serde_json::Value,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
