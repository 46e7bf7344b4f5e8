pub use super::invite_code_uses::Entity as InviteCodeUses;
pub use super::invite_codes::Entity as InviteCodes;
pub use super::pastes::Entity as Pastes;
pub use super::settings::Entity as Settings;
pub use super::users::Entity as Users;
