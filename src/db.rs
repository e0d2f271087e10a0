pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod promotion_repo;
pub use promotion_repo::PromotionRepository;
pub mod loyalty_repo;
pub use loyalty_repo::LoyaltyRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod outbox_repo;
pub use outbox_repo::OutboxRepository;
pub mod cart_repo;
pub use cart_repo::CartRepository;
pub mod address_repo;
pub use address_repo::AddressRepository;
