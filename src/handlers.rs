pub mod addresses;
pub mod cart;
pub mod health;
pub mod loyalty;
pub mod orders;
pub mod shipping;
