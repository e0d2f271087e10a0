// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,

        // --- Admin ---
        handlers::orders::update_order_status,

        // --- Shipping ---
        handlers::shipping::geocode,
        handlers::shipping::calculate,
        handlers::shipping::estimate,

        // --- Loyalty ---
        handlers::loyalty::list_rewards,
        handlers::loyalty::get_config,
        handlers::loyalty::get_profile,
        handlers::loyalty::redeem,

        // --- Cart ---
        handlers::cart::get_cart,
        handlers::cart::save_cart,

        // --- Addresses ---
        handlers::addresses::list_addresses,
        handlers::addresses::create_address,
        handlers::addresses::set_default_address,
        handlers::addresses::delete_address,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::StockStatus,
            models::catalog::Product,
            models::catalog::ProductVariant,

            // --- Pedidos ---
            models::order::OrderStatus,
            models::order::OrderSource,
            models::order::Order,
            models::order::OrderItem,
            models::order::OrderDetail,
            models::order::OrderSummary,
            models::order::CartLine,

            // --- Promoções ---
            models::promotion::VoucherType,
            models::promotion::Voucher,
            models::promotion::CouponType,
            models::promotion::Coupon,

            // --- Fidelidade ---
            models::loyalty::Tier,
            models::loyalty::TransactionType,
            models::loyalty::LoyaltyConfig,
            models::loyalty::LoyaltyTransaction,
            models::loyalty::Reward,
            models::loyalty::LoyaltyProfile,
            models::loyalty::RedeemResult,

            // --- Clientes ---
            models::customer::Customer,
            models::customer::AddressType,
            models::customer::Address,
            models::customer::CreateAddressPayload,
            models::customer::Cart,

            // --- Frete ---
            models::shipping::GeoPoint,
            models::shipping::FeeBand,
            models::shipping::ShippingConfig,
            models::shipping::ShippingQuoteResponse,

            // --- Payloads ---
            handlers::orders::CreateOrderPayload,
            handlers::orders::CreateOrderResponse,
            handlers::orders::CreatedOrderRef,
            handlers::orders::UpdateOrderStatusPayload,
            handlers::shipping::GeocodePayload,
            handlers::shipping::CalculateShippingPayload,
            handlers::shipping::EstimateShippingPayload,
            handlers::loyalty::RedeemPayload,
            handlers::cart::SaveCartPayload,
            handlers::health::HealthStatus,
        )
    ),
    tags(
        (name = "Health", description = "Estado do serviço"),
        (name = "Orders", description = "Checkout e pedidos do cliente"),
        (name = "Admin", description = "Operações administrativas de pedidos"),
        (name = "Shipping", description = "Geocoding e cálculo de frete"),
        (name = "Loyalty", description = "Pontos, níveis e recompensas"),
        (name = "Cart", description = "Carrinho persistido"),
        (name = "Addresses", description = "Endereços de entrega")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_checkout_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/orders"));
        assert!(doc.paths.paths.contains_key("/api/shipping/estimate"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
