use axum::{
    extract::{FromRequest, Request},
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::{Validate, ValidationError};

use crate::domain::line_items::{check_precio, LineItemError};

/// JSON body that has passed `validator` checks.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e)))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Catalog price: same bounds as a unit price on an invoice line.
pub fn valid_price(value: &Decimal) -> Result<(), ValidationError> {
    check_precio(*value).map(|_| ()).map_err(|e| {
        let code = match e {
            LineItemError::NegativePrice => "negative",
            LineItemError::PriceTooPrecise => "scale",
            _ => "range",
        };
        ValidationError::new(code).with_message(e.to_string().into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
        assert!(not_blank(" Tienda ").is_ok());
    }

    #[test]
    fn prices_must_fit_the_price_columns() {
        assert_eq!(valid_price(&Decimal::new(-1, 2)).unwrap_err().code, "negative");
        assert_eq!(valid_price(&Decimal::new(333, 3)).unwrap_err().code, "scale");
        assert_eq!(
            valid_price(&Decimal::from(1_000_000_000_000_i64)).unwrap_err().code,
            "range"
        );
        assert!(valid_price(&Decimal::ZERO).is_ok());
        assert!(valid_price(&Decimal::new(150_050, 2)).is_ok());
        assert!(valid_price(&Decimal::new(3_300, 3)).is_ok());
    }
}
