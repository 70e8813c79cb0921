//! Product model for facturacion-service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::clearable;
use crate::utils::validation::{not_blank, valid_price};

/// Sellable catalog item with a primary and an optional secondary price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub descripcion: String,
    pub precio_venta: Decimal,
    pub precio_venta2: Option<Decimal>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(custom(function = "not_blank", message = "Description is required"))]
    pub descripcion: String,
    #[validate(custom(function = "valid_price"))]
    pub precio_venta: Decimal,
    #[validate(custom(function = "valid_price"))]
    pub precio_venta2: Option<Decimal>,
}

/// Partial update for a product. `precio_venta2: null` removes the secondary
/// price.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(custom(function = "not_blank", message = "Description cannot be blank"))]
    pub descripcion: Option<String>,
    #[validate(custom(function = "valid_price"))]
    pub precio_venta: Option<Decimal>,
    #[serde(default, deserialize_with = "clearable")]
    #[validate(custom(function = "valid_price"))]
    pub precio_venta2: Option<Option<Decimal>>,
}

impl CreateProduct {
    pub fn normalized(&self) -> Self {
        Self {
            descripcion: self.descripcion.trim().to_string(),
            precio_venta: self.precio_venta,
            precio_venta2: self.precio_venta2,
        }
    }
}

impl UpdateProduct {
    pub fn normalized(&self) -> Self {
        Self {
            descripcion: self.descripcion.as_ref().map(|s| s.trim().to_string()),
            precio_venta: self.precio_venta,
            precio_venta2: self.precio_venta2,
        }
    }

    pub fn apply_to(&self, product: &mut Product) {
        if let Some(descripcion) = &self.descripcion {
            product.descripcion = descripcion.clone();
        }
        if let Some(precio) = self.precio_venta {
            product.precio_venta = precio;
        }
        if let Some(precio) = self.precio_venta2 {
            product.precio_venta2 = precio;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Product {
        Product {
            id: 4,
            descripcion: "Aceite 1L".to_string(),
            precio_venta: Decimal::from(9000),
            precio_venta2: Some(Decimal::from(8500)),
        }
    }

    #[test]
    fn null_secondary_price_is_removed() {
        let update: UpdateProduct = serde_json::from_str(r#"{"precio_venta2": null}"#).unwrap();
        let mut product = stored();

        update.apply_to(&mut product);

        assert_eq!(product.precio_venta2, None);
        assert_eq!(product.precio_venta, Decimal::from(9000));
    }

    #[test]
    fn absent_secondary_price_is_kept() {
        let update: UpdateProduct = serde_json::from_str(r#"{"precio_venta": "9500"}"#).unwrap();
        let mut product = stored();

        update.apply_to(&mut product);

        assert_eq!(product.precio_venta2, Some(Decimal::from(8500)));
        assert_eq!(product.precio_venta, Decimal::from(9500));
    }

    #[test]
    fn prices_beyond_two_decimals_fail_validation() {
        let create = CreateProduct {
            descripcion: "Queso".to_string(),
            precio_venta: Decimal::new(12_345, 3),
            precio_venta2: None,
        };
        let errors = create.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("precio_venta"));

        let update: UpdateProduct =
            serde_json::from_str(r#"{"precio_venta2": "-1"}"#).unwrap();
        assert!(update.validate().is_err());
    }
}
