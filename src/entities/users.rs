use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::pastes::Entity")]
    Pastes,
    #[sea_orm(has_many = "super::invite_codes::Entity")]
    InviteCodes,
    #[sea_orm(has_many = "super::invite_code_uses::Entity")]
    InviteCodeUses,
}

impl Related<super::pastes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pastes.def()
    }
}

impl Related<super::invite_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InviteCodes.def()
    }
}

impl Related<super::invite_code_uses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InviteCodeUses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
