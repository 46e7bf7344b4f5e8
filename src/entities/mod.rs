pub mod prelude;

pub mod invite_code_uses;
pub mod invite_codes;
pub mod pastes;
pub mod settings;
pub mod users;
