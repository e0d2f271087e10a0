// src/services/pricing.rs
//
// Regras de preço do checkout, sem I/O. O OrderService carrega os dados dentro
// da transação e delega o cálculo para cá.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{Product, ProductVariant},
        order::{CartLine, OrderLimits},
        promotion::{Coupon, CouponType, Voucher},
    },
};

/// Produto com suas variantes, como carregado do banco.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub variant: String,
    pub unit_price: Decimal,
    pub original_price: Decimal,
    pub cost_price: Decimal,
    pub is_promo: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub variant: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub original_price: Decimal,
    pub cost_price: Decimal,
    pub line_total: Decimal,
    pub is_promo: bool,
    pub tracks_stock: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub service_fee: Decimal,
    pub voucher_discount: Decimal,
    pub coupon_discount: Decimal,
    pub discount: Decimal,
    pub grand_total: Decimal,
}

/// Pré-checagem barata, antes de tocar no banco.
pub fn validate_order_limits(lines: &[CartLine], limits: &OrderLimits) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }
    if lines.len() > limits.max_lines {
        return Err(AppError::TooManyLines { max: limits.max_lines });
    }
    if lines
        .iter()
        .any(|l| l.quantity < 1 || l.quantity > limits.max_quantity_per_line)
    {
        return Err(AppError::InvalidQuantity { max: limits.max_quantity_per_line });
    }
    Ok(())
}

fn same_unit(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Preço autoritativo de uma linha. O preço enviado pelo cliente nunca entra aqui.
///
/// 1. Variante cadastrada com a mesma unidade -> preço/custo da variante.
/// 2. Unidade base com promoção ativa -> preço promocional (`is_promo`).
/// 3. Caso contrário, preço base do produto.
pub fn resolve_unit_price(
    product: &Product,
    variants: &[ProductVariant],
    requested_variant: Option<&str>,
    now: DateTime<Utc>,
) -> ResolvedPrice {
    if let Some(requested) = requested_variant {
        if let Some(variant) = variants.iter().find(|v| same_unit(&v.unit, requested)) {
            return ResolvedPrice {
                variant: variant.unit.clone(),
                unit_price: variant.price,
                original_price: variant.price,
                cost_price: variant.cost_price,
                is_promo: false,
            };
        }
    }

    let is_base_unit = requested_variant.is_none_or(|requested| same_unit(requested, &product.unit));

    if is_base_unit {
        if let Some(promo) = product.active_promo_price(now) {
            let original = product.original_price.unwrap_or(product.price);
            return ResolvedPrice {
                variant: product.unit.clone(),
                unit_price: promo.min(original),
                original_price: original,
                cost_price: product.cost_price,
                is_promo: true,
            };
        }
    }

    ResolvedPrice {
        variant: product.unit.clone(),
        unit_price: product.price,
        original_price: product.price,
        cost_price: product.cost_price,
        is_promo: false,
    }
}

fn display_name(line: &CartLine) -> String {
    line.name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| line.product_id.to_string())
}

/// Confere existência e saldo. Linhas repetidas do mesmo produto somam a quantidade.
pub fn check_availability(
    lines: &[CartLine],
    catalog: &HashMap<Uuid, CatalogEntry>,
) -> Result<(), AppError> {
    let mut requested: HashMap<Uuid, i32> = HashMap::new();

    for line in lines {
        if !catalog.contains_key(&line.product_id) {
            return Err(AppError::ProductNotFound(display_name(line)));
        }
        *requested.entry(line.product_id).or_default() += line.quantity;
    }

    for line in lines {
        let entry = &catalog[&line.product_id];
        let wanted = requested[&line.product_id];
        if entry.product.tracks_stock() && entry.product.stock < wanted {
            return Err(AppError::InsufficientStock(entry.product.name.clone()));
        }
    }

    Ok(())
}

pub fn price_lines(
    lines: &[CartLine],
    catalog: &HashMap<Uuid, CatalogEntry>,
    now: DateTime<Utc>,
) -> Result<Vec<PricedLine>, AppError> {
    lines
        .iter()
        .map(|line| {
            let entry = catalog
                .get(&line.product_id)
                .ok_or_else(|| AppError::ProductNotFound(display_name(line)))?;
            let price = resolve_unit_price(&entry.product, &entry.variants, line.variant.as_deref(), now);
            let quantity = Decimal::from(line.quantity);

            Ok(PricedLine {
                product_id: entry.product.id,
                product_name: entry.product.name.clone(),
                variant: price.variant,
                image_url: entry.product.image_url.clone(),
                quantity: line.quantity,
                unit_price: price.unit_price,
                original_price: price.original_price,
                cost_price: price.cost_price,
                line_total: price.unit_price * quantity,
                is_promo: price.is_promo,
                tracks_stock: entry.product.tracks_stock(),
            })
        })
        .collect()
}

pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(|l| l.line_total).sum()
}

/// Voucher: precisa existir, ser do cliente, não estar usado nem expirado. Desconto fixo.
pub fn voucher_discount(
    voucher: Option<&Voucher>,
    customer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Decimal, AppError> {
    let voucher = voucher
        .filter(|v| v.customer_id == customer_id)
        .ok_or(AppError::InvalidVoucher)?;

    if voucher.is_used {
        return Err(AppError::VoucherAlreadyUsed);
    }
    if voucher.expires_at.is_some_and(|exp| exp < now) {
        return Err(AppError::VoucherExpired);
    }

    Ok(voucher.value.max(Decimal::ZERO))
}

/// Cupom: a base de cálculo exclui itens já em promoção (sem empilhar promo + cupom).
pub fn coupon_discount(
    coupon: Option<&Coupon>,
    lines: &[PricedLine],
    now: DateTime<Utc>,
) -> Result<Decimal, AppError> {
    let coupon = coupon
        .filter(|c| c.is_active && c.is_within_window(now))
        .ok_or(AppError::InvalidCoupon)?;

    if !coupon.has_uses_left() {
        return Err(AppError::CouponExhausted);
    }

    let order_subtotal = subtotal(lines);
    if order_subtotal < coupon.min_purchase {
        return Err(AppError::CouponMinPurchase { min: coupon.min_purchase });
    }

    let eligible: Decimal = lines
        .iter()
        .filter(|l| !l.is_promo)
        .map(|l| l.line_total)
        .sum();

    let discount = match coupon.coupon_type {
        CouponType::Percentage => {
            let raw = (eligible * coupon.value / Decimal::ONE_HUNDRED).floor();
            match coupon.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        CouponType::Fixed => coupon.value.min(eligible),
    };

    Ok(discount.max(Decimal::ZERO))
}

/// `grand_total = max(0, subtotal + frete + taxa - (voucher + cupom))`.
pub fn compute_totals(
    lines: &[PricedLine],
    shipping_fee: Decimal,
    service_fee: Decimal,
    voucher_discount: Decimal,
    coupon_discount: Decimal,
) -> OrderTotals {
    let subtotal = subtotal(lines);
    let shipping_fee = shipping_fee.max(Decimal::ZERO);
    let service_fee = service_fee.max(Decimal::ZERO);
    let voucher_discount = voucher_discount.max(Decimal::ZERO);
    let coupon_discount = coupon_discount.max(Decimal::ZERO);
    let discount = voucher_discount + coupon_discount;
    let grand_total = (subtotal + shipping_fee + service_fee - discount).max(Decimal::ZERO);

    OrderTotals {
        subtotal,
        shipping_fee,
        service_fee,
        voucher_discount,
        coupon_discount,
        discount,
        grand_total,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{catalog::StockStatus, promotion::VoucherType};
    use chrono::Duration;

    pub(crate) fn product(price: i64, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            name: "Dada Ayam Fillet".into(),
            unit: "500g".into(),
            price: Decimal::from(price),
            cost_price: Decimal::from(price * 7 / 10),
            stock,
            stock_status: StockStatus::Finite,
            image_url: Some("https://cdn.example.com/dada.jpg".into()),
            original_price: None,
            promo_price: None,
            promo_starts_at: None,
            promo_ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog_of(products: Vec<Product>) -> HashMap<Uuid, CatalogEntry> {
        products
            .into_iter()
            .map(|p| (p.id, CatalogEntry { product: p, variants: vec![] }))
            .collect()
    }

    fn line(product_id: Uuid, qty: i32, client_price: Option<i64>) -> CartLine {
        CartLine {
            product_id,
            name: None,
            price: client_price.map(Decimal::from),
            variant: None,
            quantity: qty,
        }
    }

    fn fixed_coupon(value: i64, min_purchase: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "HEMAT20".into(),
            coupon_type: CouponType::Fixed,
            value: Decimal::from(value),
            max_discount: None,
            min_purchase: Decimal::from(min_purchase),
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn voucher_for(customer_id: Uuid, value: i64) -> Voucher {
        Voucher {
            id: Uuid::new_v4(),
            code: "RWD-TEST0001".into(),
            voucher_type: VoucherType::Discount,
            value: Decimal::from(value),
            is_used: false,
            customer_id,
            reward_id: None,
            expires_at: None,
            used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn scenario_a_plain_checkout() {
        let p = product(50_000, 10);
        let lines = vec![line(p.id, 2, None)];
        let catalog = catalog_of(vec![p]);

        let priced = price_lines(&lines, &catalog, Utc::now()).unwrap();
        let totals = compute_totals(
            &priced,
            Decimal::from(15_000),
            Decimal::from(1_000),
            Decimal::ZERO,
            Decimal::ZERO,
        );

        assert_eq!(totals.subtotal, Decimal::from(100_000));
        assert_eq!(totals.grand_total, Decimal::from(116_000));
        assert_eq!(totals.discount, Decimal::ZERO);
    }

    #[test]
    fn scenario_b_fixed_coupon() {
        let p = product(50_000, 10);
        let lines = vec![line(p.id, 2, None)];
        let catalog = catalog_of(vec![p]);
        let now = Utc::now();

        let priced = price_lines(&lines, &catalog, now).unwrap();
        let coupon = fixed_coupon(20_000, 50_000);
        let discount = coupon_discount(Some(&coupon), &priced, now).unwrap();
        let totals = compute_totals(
            &priced,
            Decimal::from(15_000),
            Decimal::from(1_000),
            Decimal::ZERO,
            discount,
        );

        assert_eq!(totals.discount, Decimal::from(20_000));
        assert_eq!(totals.grand_total, Decimal::from(96_000));
    }

    #[test]
    fn scenario_c_client_price_is_ignored() {
        let p = product(50_000, 10);
        let lines = vec![line(p.id, 1, Some(30_000))];
        let catalog = catalog_of(vec![p]);

        let priced = price_lines(&lines, &catalog, Utc::now()).unwrap();
        assert_eq!(priced[0].unit_price, Decimal::from(50_000));
    }

    #[test]
    fn scenario_d_insufficient_stock_is_rejected() {
        let p = product(50_000, 1);
        let lines = vec![line(p.id, 2, None)];
        let catalog = catalog_of(vec![p]);

        let err = check_availability(&lines, &catalog).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock(name) if name == "Dada Ayam Fillet"));
    }

    #[test]
    fn repeated_lines_are_summed_for_stock() {
        let p = product(50_000, 3);
        let lines = vec![line(p.id, 2, None), line(p.id, 2, None)];
        let catalog = catalog_of(vec![p]);

        assert!(matches!(
            check_availability(&lines, &catalog),
            Err(AppError::InsufficientStock(_))
        ));
    }

    #[test]
    fn always_ready_products_skip_stock_check() {
        let mut p = product(25_000, 0);
        p.stock_status = StockStatus::AlwaysReady;
        let lines = vec![line(p.id, 5, None)];
        let catalog = catalog_of(vec![p]);

        assert!(check_availability(&lines, &catalog).is_ok());
    }

    #[test]
    fn missing_product_uses_client_name_in_error() {
        let mut l = line(Uuid::new_v4(), 1, None);
        l.name = Some("Salmon Fillet".into());

        let err = check_availability(&[l], &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(name) if name == "Salmon Fillet"));
    }

    #[test]
    fn variant_price_wins_over_base_price() {
        let p = product(50_000, 10);
        let variant = ProductVariant {
            id: Uuid::new_v4(),
            product_id: p.id,
            unit: "1kg".into(),
            price: Decimal::from(95_000),
            cost_price: Decimal::from(70_000),
            is_default: false,
        };

        let resolved = resolve_unit_price(&p, &[variant], Some("1KG"), Utc::now());
        assert_eq!(resolved.unit_price, Decimal::from(95_000));
        assert_eq!(resolved.cost_price, Decimal::from(70_000));
        assert_eq!(resolved.variant, "1kg");
        assert!(!resolved.is_promo);
    }

    #[test]
    fn active_promo_is_resolved_server_side() {
        let now = Utc::now();
        let mut p = product(50_000, 10);
        p.original_price = Some(Decimal::from(60_000));
        p.promo_price = Some(Decimal::from(42_000));
        p.promo_starts_at = Some(now - Duration::days(1));
        p.promo_ends_at = Some(now + Duration::days(1));

        let resolved = resolve_unit_price(&p, &[], Some("500g"), now);
        assert!(resolved.is_promo);
        assert_eq!(resolved.unit_price, Decimal::from(42_000));
        assert_eq!(resolved.original_price, Decimal::from(60_000));
    }

    #[test]
    fn expired_promo_falls_back_to_base_price() {
        let now = Utc::now();
        let mut p = product(50_000, 10);
        p.promo_price = Some(Decimal::from(42_000));
        p.promo_ends_at = Some(now - Duration::hours(1));

        let resolved = resolve_unit_price(&p, &[], None, now);
        assert!(!resolved.is_promo);
        assert_eq!(resolved.unit_price, Decimal::from(50_000));
    }

    #[test]
    fn coupon_ignores_promo_lines() {
        let now = Utc::now();
        let regular = product(50_000, 10);
        let mut promo = product(40_000, 10);
        promo.promo_price = Some(Decimal::from(30_000));
        let lines = vec![line(regular.id, 1, None), line(promo.id, 2, None)];
        let catalog = catalog_of(vec![regular, promo]);
        let priced = price_lines(&lines, &catalog, now).unwrap();

        let mut coupon = fixed_coupon(0, 0);
        coupon.coupon_type = CouponType::Percentage;
        coupon.value = Decimal::from(10);

        // 10% de 50.000 (só a linha sem promoção)
        assert_eq!(coupon_discount(Some(&coupon), &priced, now).unwrap(), Decimal::from(5_000));
    }

    #[test]
    fn percentage_coupon_respects_cap() {
        let now = Utc::now();
        let p = product(500_000, 10);
        let lines = vec![line(p.id, 2, None)];
        let priced = price_lines(&lines, &catalog_of(vec![p]), now).unwrap();

        let mut coupon = fixed_coupon(0, 0);
        coupon.coupon_type = CouponType::Percentage;
        coupon.value = Decimal::from(50);
        coupon.max_discount = Some(Decimal::from(25_000));

        assert_eq!(coupon_discount(Some(&coupon), &priced, now).unwrap(), Decimal::from(25_000));
    }

    #[test]
    fn fixed_coupon_never_exceeds_eligible_subtotal() {
        let now = Utc::now();
        let p = product(10_000, 10);
        let priced = price_lines(&[line(p.id, 1, None)], &catalog_of(vec![p]), now).unwrap();

        assert_eq!(
            coupon_discount(Some(&fixed_coupon(20_000, 0)), &priced, now).unwrap(),
            Decimal::from(10_000)
        );
    }

    #[test]
    fn coupon_below_min_purchase_is_rejected() {
        let now = Utc::now();
        let p = product(20_000, 10);
        let priced = price_lines(&[line(p.id, 1, None)], &catalog_of(vec![p]), now).unwrap();

        assert!(matches!(
            coupon_discount(Some(&fixed_coupon(5_000, 50_000)), &priced, now),
            Err(AppError::CouponMinPurchase { .. })
        ));
    }

    #[test]
    fn exhausted_or_expired_coupon_is_rejected() {
        let now = Utc::now();
        let p = product(80_000, 10);
        let priced = price_lines(&[line(p.id, 1, None)], &catalog_of(vec![p]), now).unwrap();

        let mut exhausted = fixed_coupon(5_000, 0);
        exhausted.usage_limit = Some(3);
        exhausted.usage_count = 3;
        assert!(matches!(
            coupon_discount(Some(&exhausted), &priced, now),
            Err(AppError::CouponExhausted)
        ));

        let mut expired = fixed_coupon(5_000, 0);
        expired.ends_at = Some(now - Duration::days(1));
        assert!(matches!(
            coupon_discount(Some(&expired), &priced, now),
            Err(AppError::InvalidCoupon)
        ));
    }

    #[test]
    fn voucher_must_belong_to_customer_and_be_unused() {
        let now = Utc::now();
        let owner = Uuid::new_v4();
        let voucher = voucher_for(owner, 15_000);

        assert_eq!(voucher_discount(Some(&voucher), owner, now).unwrap(), Decimal::from(15_000));
        assert!(matches!(
            voucher_discount(Some(&voucher), Uuid::new_v4(), now),
            Err(AppError::InvalidVoucher)
        ));

        let mut used = voucher.clone();
        used.is_used = true;
        assert!(matches!(
            voucher_discount(Some(&used), owner, now),
            Err(AppError::VoucherAlreadyUsed)
        ));
    }

    #[test]
    fn grand_total_never_goes_negative() {
        let p = product(10_000, 10);
        let priced = price_lines(&[line(p.id, 1, None)], &catalog_of(vec![p]), Utc::now()).unwrap();

        let totals = compute_totals(
            &priced,
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::from(50_000),
            Decimal::from(10_000),
        );

        assert_eq!(totals.grand_total, Decimal::ZERO);
        assert_eq!(totals.discount, totals.voucher_discount + totals.coupon_discount);
    }

    #[test]
    fn order_limits_precheck() {
        let limits = OrderLimits { max_lines: 2, max_quantity_per_line: 5, min_subtotal: Decimal::ZERO };
        let id = Uuid::new_v4();

        assert!(matches!(validate_order_limits(&[], &limits), Err(AppError::EmptyCart)));
        assert!(matches!(
            validate_order_limits(&[line(id, 1, None), line(id, 1, None), line(id, 1, None)], &limits),
            Err(AppError::TooManyLines { max: 2 })
        ));
        assert!(matches!(
            validate_order_limits(&[line(id, 6, None)], &limits),
            Err(AppError::InvalidQuantity { max: 5 })
        ));
        assert!(validate_order_limits(&[line(id, 5, None)], &limits).is_ok());
    }
}
