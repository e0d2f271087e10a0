pub mod admin;
pub mod auth;
pub mod i18n;
