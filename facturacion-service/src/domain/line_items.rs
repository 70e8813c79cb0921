//! Editable line items of an invoice being composed or edited.
//!
//! [`LineItemList`] keeps two invariants after every accepted mutation:
//!
//! * each item's `subtotal` equals `cantidad * precio`
//! * the list `total` equals the sum of the item subtotals
//!
//! A rejected mutation returns a [`LineItemError`] and leaves the list exactly
//! as it was.
//!
//! Amounts are bounded by the storage columns: unit prices carry at most two
//! decimals, quantities at most three, and neither a subtotal nor the total
//! may exceed [`max_amount`]. Every product and sum is computed with checked
//! arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use thiserror::Error;

use crate::models::Product;

/// Decimals kept for unit prices (`NUMERIC(14, 2)`).
pub const PRECIO_SCALE: u32 = 2;

/// Decimals kept for quantities (`NUMERIC(14, 3)`).
pub const CANTIDAD_SCALE: u32 = 3;

/// Largest unit price a line or a product accepts.
pub fn max_precio() -> Decimal {
    Decimal::new(99_999_999_999_999, PRECIO_SCALE)
}

/// Largest quantity a line accepts.
pub fn max_cantidad() -> Decimal {
    Decimal::new(99_999_999_999_999, CANTIDAD_SCALE)
}

/// Largest subtotal, total or quantity sum an invoice holds (`NUMERIC(20, 5)`).
pub fn max_amount() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_999, 5)
}

/// Whether the stored form of `value` needs more than `scale` decimals.
fn exceeds_scale(value: Decimal, scale: u32) -> bool {
    value.normalize().scale() > scale
}

/// Unit price accepted on a line or a product.
pub fn check_precio(precio: Decimal) -> Result<Decimal, LineItemError> {
    if precio < Decimal::ZERO {
        return Err(LineItemError::NegativePrice);
    }
    if exceeds_scale(precio, PRECIO_SCALE) {
        return Err(LineItemError::PriceTooPrecise);
    }
    if precio > max_precio() {
        return Err(LineItemError::AmountTooLarge);
    }
    Ok(precio)
}

/// Quantity accepted on a line.
pub fn check_cantidad(cantidad: Decimal) -> Result<Decimal, LineItemError> {
    if cantidad <= Decimal::ZERO {
        return Err(LineItemError::NonPositiveQuantity);
    }
    if exceeds_scale(cantidad, CANTIDAD_SCALE) {
        return Err(LineItemError::QuantityTooPrecise);
    }
    if cantidad > max_cantidad() {
        return Err(LineItemError::AmountTooLarge);
    }
    Ok(cantidad)
}

fn line_subtotal(cantidad: Decimal, precio: Decimal) -> Result<Decimal, LineItemError> {
    cantidad
        .checked_mul(precio)
        .filter(|subtotal| *subtotal <= max_amount())
        .ok_or(LineItemError::AmountTooLarge)
}

/// Sum bounded by [`max_amount`].
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Result<Decimal, LineItemError> {
    values.into_iter().try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(value)
            .filter(|sum| *sum <= max_amount())
            .ok_or(LineItemError::AmountTooLarge)
    })
}

/// Whether the list belongs to a new invoice or to one being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    Create,
    Edit,
}

/// One product on the invoice with its quantity and chosen unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub producto_id: i64,
    pub descripcion: String,
    /// Unit price currently applied.
    pub precio: Decimal,
    pub precio_venta1: Decimal,
    pub precio_venta2: Option<Decimal>,
    pub cantidad: Decimal,
    pub subtotal: Decimal,
}

impl LineItem {
    /// New line for a product: one unit at its primary price.
    pub fn from_product(product: &Product) -> Result<Self, LineItemError> {
        let precio = check_precio(product.precio_venta)?;
        Ok(Self {
            producto_id: product.id,
            descripcion: product.descripcion.clone(),
            precio,
            precio_venta1: precio,
            precio_venta2: product.precio_venta2,
            cantidad: Decimal::ONE,
            subtotal: line_subtotal(Decimal::ONE, precio)?,
        })
    }

    /// Line rebuilt from a persisted invoice row.
    pub fn restored(
        producto_id: i64,
        descripcion: String,
        precio_unitario: Decimal,
        cantidad: Decimal,
        precio_venta1: Decimal,
        precio_venta2: Option<Decimal>,
    ) -> Result<Self, LineItemError> {
        Ok(Self {
            producto_id,
            descripcion,
            precio: precio_unitario,
            precio_venta1,
            precio_venta2,
            cantidad,
            subtotal: line_subtotal(cantidad, precio_unitario)?,
        })
    }
}

/// How to set an item's unit price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo", content = "valor", rename_all = "snake_case")]
pub enum PriceSelection {
    /// The product's primary price.
    Tier1,
    /// The product's secondary price, when it has one.
    Tier2,
    /// A price typed by the user.
    Manual(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineItemError {
    #[error("Product {0} is already on the invoice")]
    DuplicateProduct(i64),

    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Quantity allows at most 3 decimals")]
    QuantityTooPrecise,

    #[error("Price cannot be negative")]
    NegativePrice,

    #[error("Price allows at most 2 decimals")]
    PriceTooPrecise,

    #[error("Amount is larger than an invoice can hold")]
    AmountTooLarge,

    #[error("Product {0} has no secondary price")]
    MissingPriceTier(i64),

    #[error("No line item at position {0}")]
    IndexOutOfRange(usize),

    #[error("An invoice being edited must keep at least one item")]
    LastItem,
}

impl LineItemError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            LineItemError::DuplicateProduct(_) => "duplicate_product",
            LineItemError::NonPositiveQuantity => "non_positive_quantity",
            LineItemError::QuantityTooPrecise => "quantity_too_precise",
            LineItemError::NegativePrice => "negative_price",
            LineItemError::PriceTooPrecise => "price_too_precise",
            LineItemError::AmountTooLarge => "amount_too_large",
            LineItemError::MissingPriceTier(_) => "missing_price_tier",
            LineItemError::IndexOutOfRange(_) => "index_out_of_range",
            LineItemError::LastItem => "last_item",
        }
    }
}

impl From<LineItemError> for AppError {
    fn from(err: LineItemError) -> Self {
        match err {
            LineItemError::DuplicateProduct(_) => AppError::Conflict(err.into()),
            LineItemError::IndexOutOfRange(_) => AppError::NotFound(err.into()),
            _ => AppError::UnprocessableEntity(err.into()),
        }
    }
}

/// Ordered line items with a derived total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItemList {
    mode: ListMode,
    items: Vec<LineItem>,
    total: Decimal,
    cantidad: Decimal,
}

impl LineItemList {
    pub fn new(mode: ListMode) -> Self {
        Self {
            mode,
            items: Vec::new(),
            total: Decimal::ZERO,
            cantidad: Decimal::ZERO,
        }
    }

    /// List seeded with existing items; subtotals and total are recomputed.
    pub fn from_items(mode: ListMode, items: Vec<LineItem>) -> Result<Self, LineItemError> {
        let mut list = Self::new(mode);
        list.items = items;
        list.recompute()?;
        Ok(list)
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Sum of quantities, stored on the invoice header.
    pub fn quantity_sum(&self) -> Decimal {
        self.cantidad
    }

    pub fn contains(&self, producto_id: i64) -> bool {
        self.items.iter().any(|item| item.producto_id == producto_id)
    }

    /// Append one unit of `product` at its primary price.
    pub fn add_product(&mut self, product: &Product) -> Result<&LineItem, LineItemError> {
        if self.contains(product.id) {
            return Err(LineItemError::DuplicateProduct(product.id));
        }

        let mut items = self.items.clone();
        items.push(LineItem::from_product(product)?);
        self.commit(items)?;

        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    pub fn update_quantity(&mut self, index: usize, cantidad: Decimal) -> Result<(), LineItemError> {
        let cantidad = check_cantidad(cantidad)?;
        let precio = self.item(index)?.precio;
        let subtotal = line_subtotal(cantidad, precio)?;

        let mut items = self.items.clone();
        items[index].cantidad = cantidad;
        items[index].subtotal = subtotal;
        self.commit(items)
    }

    pub fn update_price(
        &mut self,
        index: usize,
        selection: PriceSelection,
    ) -> Result<(), LineItemError> {
        let item = self.item(index)?;
        let precio = match selection {
            PriceSelection::Tier1 => item.precio_venta1,
            PriceSelection::Tier2 => item
                .precio_venta2
                .ok_or(LineItemError::MissingPriceTier(item.producto_id))?,
            PriceSelection::Manual(value) => value,
        };
        let precio = check_precio(precio)?;
        let subtotal = line_subtotal(item.cantidad, precio)?;

        let mut items = self.items.clone();
        items[index].precio = precio;
        items[index].subtotal = subtotal;
        self.commit(items)
    }

    /// Remove the item at `index`. An edited invoice cannot lose its last item.
    pub fn remove(&mut self, index: usize) -> Result<LineItem, LineItemError> {
        self.item(index)?;
        if self.mode == ListMode::Edit && self.items.len() == 1 {
            return Err(LineItemError::LastItem);
        }

        let mut items = self.items.clone();
        let removed = items.remove(index);
        self.commit(items)?;
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Decimal::ZERO;
        self.cantidad = Decimal::ZERO;
    }

    /// Recompute every subtotal and the total. Idempotent.
    pub fn recompute(&mut self) -> Result<(), LineItemError> {
        let items = self
            .items
            .iter()
            .map(|item| {
                Ok(LineItem {
                    subtotal: line_subtotal(item.cantidad, item.precio)?,
                    ..item.clone()
                })
            })
            .collect::<Result<Vec<_>, LineItemError>>()?;
        self.commit(items)
    }

    fn item(&self, index: usize) -> Result<&LineItem, LineItemError> {
        self.items
            .get(index)
            .ok_or(LineItemError::IndexOutOfRange(index))
    }

    /// Replace the items once both sums fit; otherwise nothing changes.
    fn commit(&mut self, items: Vec<LineItem>) -> Result<(), LineItemError> {
        let total = checked_sum(items.iter().map(|item| item.subtotal))?;
        let cantidad = checked_sum(items.iter().map(|item| item.cantidad))?;

        self.items = items;
        self.total = total;
        self.cantidad = cantidad;
        Ok(())
    }
}
