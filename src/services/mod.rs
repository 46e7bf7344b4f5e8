pub mod account_service;
pub mod admin_service;
pub mod disclosure;
pub mod paste_service;
pub mod rate_limit;
pub mod settings_service;
pub mod storage;
pub mod sweeper;
pub mod user_service;
