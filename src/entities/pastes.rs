use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum PasteKind {
    #[sea_orm(string_value = "text")]
    Text,
    #[sea_orm(string_value = "file")]
    File,
}

impl PasteKind {
    pub fn label(&self) -> &'static str {
        match self {
            PasteKind::Text => "Text",
            PasteKind::File => "File",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pastes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[sea_orm(column_name = "type")]
    pub kind: PasteKind,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub file_path: Option<String>, // storage key, never a client-supplied name
    pub original_filename: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTimeUtc>,
    pub size: i64,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Live means `now` is strictly before the expiry; a paste expiring at
    /// exactly `now` is already gone.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
