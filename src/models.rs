pub mod auth;
pub mod catalog;
pub mod customer;
pub mod loyalty;
pub mod notification;
pub mod order;
pub mod promotion;
pub mod shipping;
