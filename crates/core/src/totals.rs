//! Cart and order total computation.
//!
//! One pure function computes totals everywhere they are shown or stored:
//! the cart preview endpoint and the server-side order creation path both
//! call [`compute_totals`], so the number the customer saw is the number
//! the order persists. The server never reads a client-submitted total.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::ProductId;

/// Maximum quantity a single cart line may carry.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Pricing configuration applied by [`compute_totals`].
///
/// Explicit values, not ambient environment reads, so the computation is
/// testable and identical across the API and CLI. Defaults match the shop's
/// standing policy: free shipping from ₹999, ₹60 flat fee below it, 5% tax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRules {
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Flat shipping fee charged below the threshold.
    pub flat_shipping_fee: Decimal,
    /// Tax rate applied to the subtotal (e.g. `0.05` for 5%).
    pub tax_rate: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::new(999, 0),
            flat_shipping_fee: Decimal::new(60, 0),
            tax_rate: Decimal::new(5, 2),
        }
    }
}

/// One product entry in a cart or order payload.
///
/// Carts live entirely in client-held state, so this type deserializes
/// leniently: a missing or malformed price or quantity becomes zero instead
/// of rejecting the whole payload, and quantity is capped at
/// [`MAX_LINE_QUANTITY`]. Snapshot fields (title, color, size, image) ride
/// along for order persistence and display.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LineItem {
    /// Catalog reference, when the client still knows it.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Title snapshot at add-to-cart time.
    #[serde(default)]
    pub title: String,
    /// Unit price snapshot.
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Decimal,
    /// Unit count, capped at [`MAX_LINE_QUANTITY`].
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    /// Selected color, when the product has variants.
    #[serde(default)]
    pub color: Option<String>,
    /// Selected size, when the product has variants.
    #[serde(default)]
    pub size: Option<String>,
    /// Image URL snapshot.
    #[serde(default)]
    pub image: Option<String>,
}

impl LineItem {
    /// The line's contribution to the subtotal.
    ///
    /// Defensive against hand-constructed values: negative prices count as
    /// zero and quantity is capped, matching the deserializer's clamping.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.max(Decimal::ZERO) * Decimal::from(self.quantity.min(MAX_LINE_QUANTITY))
    }
}

/// Computed totals for a list of line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of `price × quantity` over all lines.
    pub subtotal: Decimal,
    /// Zero at or above the free-shipping threshold, flat fee below it.
    pub shipping: Decimal,
    /// `round(subtotal × tax_rate)` to whole currency units.
    pub tax: Decimal,
    /// Reserved; always zero until a discount engine exists.
    pub discount: Decimal,
    /// `subtotal + shipping + tax − discount`.
    pub total: Decimal,
}

/// Compute order totals from line items and pricing rules.
///
/// Pure function of its inputs. Tax rounds half-away-from-zero to whole
/// currency units; there is no sub-unit currency in this domain.
///
/// ```
/// use marigold_core::{LineItem, PricingRules, compute_totals};
/// use rust_decimal::Decimal;
///
/// let items = [LineItem {
///     price: Decimal::from(500),
///     quantity: 2,
///     ..LineItem::default()
/// }];
/// let totals = compute_totals(&items, &PricingRules::default());
/// assert_eq!(totals.subtotal, Decimal::from(1000));
/// assert_eq!(totals.shipping, Decimal::ZERO);
/// assert_eq!(totals.tax, Decimal::from(50));
/// assert_eq!(totals.total, Decimal::from(1050));
/// ```
#[must_use]
pub fn compute_totals(items: &[LineItem], rules: &PricingRules) -> Totals {
    let subtotal: Decimal = items.iter().map(LineItem::line_total).sum();

    let shipping = if subtotal >= rules.free_shipping_threshold {
        Decimal::ZERO
    } else {
        rules.flat_shipping_fee
    };

    let tax = (subtotal * rules.tax_rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let discount = Decimal::ZERO;

    Totals {
        subtotal,
        shipping,
        tax,
        discount,
        total: subtotal + shipping + tax - discount,
    }
}

// =============================================================================
// Lenient deserialization
// =============================================================================

/// Accept a number, a numeric string, or garbage; garbage becomes zero.
fn lenient_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value).max(Decimal::ZERO))
}

/// Accept a number or numeric string; garbage becomes zero, values are
/// clamped to `[0, MAX_LINE_QUANTITY]`.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let quantity = decimal_from_value(&value)
        .max(Decimal::ZERO)
        .trunc()
        .to_u32()
        .unwrap_or(0);
    Ok(quantity.min(MAX_LINE_QUANTITY))
}

fn decimal_from_value(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::Number(n) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price: i64, quantity: u32) -> LineItem {
        LineItem {
            price: Decimal::from(price),
            quantity,
            ..LineItem::default()
        }
    }

    #[test]
    fn test_above_threshold_free_shipping() {
        // 2 × 500 = 1000 >= 999: no shipping, 5% tax
        let totals = compute_totals(&[item(500, 2)], &PricingRules::default());
        assert_eq!(totals.subtotal, Decimal::from(1000));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::from(50));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::from(1050));
    }

    #[test]
    fn test_below_threshold_flat_fee() {
        let totals = compute_totals(&[item(300, 1)], &PricingRules::default());
        assert_eq!(totals.subtotal, Decimal::from(300));
        assert_eq!(totals.shipping, Decimal::from(60));
        assert_eq!(totals.tax, Decimal::from(15));
        assert_eq!(totals.total, Decimal::from(375));
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let totals = compute_totals(&[item(999, 1)], &PricingRules::default());
        assert_eq!(totals.shipping, Decimal::ZERO);

        let totals = compute_totals(&[item(998, 1)], &PricingRules::default());
        assert_eq!(totals.shipping, Decimal::from(60));
    }

    #[test]
    fn test_tax_rounds_to_whole_units() {
        // 249 × 5% = 12.45 → 12
        let totals = compute_totals(&[item(249, 1)], &PricingRules::default());
        assert_eq!(totals.tax, Decimal::from(12));

        // 250 × 5% = 12.50 → 13 (half away from zero)
        let totals = compute_totals(&[item(250, 1)], &PricingRules::default());
        assert_eq!(totals.tax, Decimal::from(13));
    }

    #[test]
    fn test_additivity_invariant() {
        let carts: &[Vec<LineItem>] = &[
            vec![],
            vec![item(300, 1)],
            vec![item(500, 2), item(120, 3)],
            vec![item(999, 1), item(1, 99)],
        ];
        for items in carts {
            let t = compute_totals(items, &PricingRules::default());
            assert_eq!(t.total, t.subtotal + t.shipping + t.tax - t.discount);
            assert_eq!(
                t.shipping.is_zero(),
                t.subtotal >= PricingRules::default().free_shipping_threshold
            );
        }
    }

    #[test]
    fn test_monotonic_in_quantity() {
        let rules = PricingRules::default();
        let mut previous = compute_totals(&[item(120, 1)], &rules);
        for quantity in 2..=20 {
            let current = compute_totals(&[item(120, quantity)], &rules);
            assert!(current.subtotal >= previous.subtotal);
            assert!(current.total >= previous.total);
            previous = current;
        }
    }

    #[test]
    fn test_quantity_capped() {
        let totals = compute_totals(&[item(10, 500)], &PricingRules::default());
        assert_eq!(totals.subtotal, Decimal::from(990));
    }

    #[test]
    fn test_negative_price_counts_as_zero() {
        let totals = compute_totals(&[item(-100, 2), item(300, 1)], &PricingRules::default());
        assert_eq!(totals.subtotal, Decimal::from(300));
    }

    #[test]
    fn test_lenient_deserialization() {
        // Malformed price, string price, missing quantity, oversized quantity
        let items: Vec<LineItem> = serde_json::from_str(
            r#"[
                {"title": "bad price", "price": "abc", "quantity": 2},
                {"title": "string price", "price": "199.50", "quantity": "3"},
                {"title": "no quantity", "price": 100},
                {"title": "too many", "price": 10, "quantity": 500},
                {"title": "null price", "price": null, "quantity": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(items[0].price, Decimal::ZERO);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].price, "199.50".parse::<Decimal>().unwrap());
        assert_eq!(items[1].quantity, 3);
        assert_eq!(items[2].quantity, 0);
        assert_eq!(items[3].quantity, MAX_LINE_QUANTITY);
        assert_eq!(items[4].price, Decimal::ZERO);

        // A malformed entry contributes price 0 / quantity 0, never an error
        let totals = compute_totals(&items, &PricingRules::default());
        assert_eq!(
            totals.subtotal,
            "199.50".parse::<Decimal>().unwrap() * Decimal::from(3)
                + Decimal::from(10) * Decimal::from(MAX_LINE_QUANTITY)
        );
    }
}
