//! Shopping cart.

use bazaar_core::{Product, ProductId, ShopId, Variant, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::OrderLineInput;

/// One product (and variant) in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: ProductId,
    #[serde(default)]
    pub variant: Option<VariantId>,
    pub name: String,
    #[serde(default)]
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub shop: Option<ShopId>,
    /// Stock when the line was added; quantities are capped to it.
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

impl CartLine {
    /// A line for `product`, priced from the variant when one is chosen.
    #[must_use]
    pub fn from_product(product: &Product, variant: Option<&Variant>, quantity: u32) -> Self {
        let unit_price = variant
            .and_then(|v| product.variant_price(&v.id))
            .unwrap_or_else(|| product.effective_price());
        let stock = variant.map_or(product.stock, |v| v.stock);

        Self {
            product: product.id.clone(),
            variant: variant.map(|v| v.id.clone()),
            name: product.name.clone(),
            variant_label: variant.map(Variant::label),
            unit_price,
            quantity,
            image: product.thumbnail().map(ToOwned::to_owned),
            shop: product.shop.as_ref().map(|s| ShopId::new(s.id())),
            max_quantity: Some(stock),
        }
    }

    fn key_matches(&self, product: &ProductId, variant: Option<&VariantId>) -> bool {
        &self.product == product && self.variant.as_ref() == variant
    }

    fn cap(&self, quantity: u32) -> u32 {
        self.max_quantity.map_or(quantity, |max| quantity.min(max))
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Cart lines keyed by `(product, variant)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a line, merging quantities with an existing line for the same
    /// product and variant.
    pub fn add(&mut self, line: CartLine) {
        if line.quantity == 0 {
            return;
        }
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.key_matches(&line.product, line.variant.as_ref()))
        {
            existing.quantity = existing.cap(existing.quantity.saturating_add(line.quantity));
        } else {
            let quantity = line.cap(line.quantity);
            if quantity > 0 {
                self.lines.push(CartLine { quantity, ..line });
            }
        }
    }

    /// Set a line's quantity; zero removes it.
    pub fn set_quantity(&mut self, product: &ProductId, variant: Option<&VariantId>, quantity: u32) {
        if quantity == 0 {
            self.remove(product, variant);
            return;
        }
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.key_matches(product, variant))
        {
            line.quantity = line.cap(quantity);
        }
    }

    pub fn remove(&mut self, product: &ProductId, variant: Option<&VariantId>) {
        self.lines.retain(|l| !l.key_matches(product, variant));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |count, l| count.saturating_add(l.quantity))
    }

    /// The cart as checkout line items.
    #[must_use]
    pub fn to_order_items(&self) -> Vec<OrderLineInput> {
        self.lines
            .iter()
            .map(|l| OrderLineInput {
                product: l.product.clone(),
                variant: l.variant.clone(),
                quantity: l.quantity,
            })
            .collect()
    }

    /// The shop every line belongs to, if they share one.
    #[must_use]
    pub fn single_shop(&self) -> Option<&ShopId> {
        let first = self.lines.first()?.shop.as_ref()?;
        self.lines
            .iter()
            .all(|l| l.shop.as_ref() == Some(first))
            .then_some(first)
    }
}
