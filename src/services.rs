pub mod address_service;
pub mod auth;
pub mod loyalty_service;
pub mod notification_service;
pub mod order_service;
pub mod pricing;
pub mod shipping_service;
