use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per registration completed with an invite code.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invite_code_uses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub invite_code_id: String,
    pub user_id: String,
    pub used_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invite_codes::Entity",
        from = "Column::InviteCodeId",
        to = "super::invite_codes::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    InviteCodes,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::invite_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InviteCodes.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
