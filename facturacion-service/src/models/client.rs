//! Client model for facturacion-service.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::clearable;
use crate::utils::validation::not_blank;

/// Customer the business invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    /// Business name.
    pub negocio: Option<String>,
    /// Contact person name.
    pub cliente: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    /// Tax or national id.
    pub identificacion: Option<String>,
}

/// Input for creating a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClient {
    pub negocio: Option<String>,
    #[validate(custom(function = "not_blank", message = "Client name is required"))]
    pub cliente: String,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub identificacion: Option<String>,
}

/// Partial update for a client. Absent fields keep their stored value;
/// optional fields sent as `null` or blank are cleared.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateClient {
    #[serde(default, deserialize_with = "clearable")]
    pub negocio: Option<Option<String>>,
    #[validate(custom(function = "not_blank", message = "Client name cannot be blank"))]
    pub cliente: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub direccion: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub telefono: Option<Option<String>>,
    #[serde(default, deserialize_with = "clearable")]
    pub identificacion: Option<Option<String>>,
}

impl CreateClient {
    /// Trim the text fields, turning empty optionals into `None`.
    pub fn normalized(&self) -> Self {
        Self {
            negocio: trimmed(&self.negocio),
            cliente: self.cliente.trim().to_string(),
            direccion: trimmed(&self.direccion),
            telefono: trimmed(&self.telefono),
            identificacion: trimmed(&self.identificacion),
        }
    }
}

impl UpdateClient {
    /// Trim the text fields the same way as [`CreateClient::normalized`]: a
    /// blank optional becomes an explicit clear.
    pub fn normalized(&self) -> Self {
        Self {
            negocio: self.negocio.as_ref().map(trimmed),
            cliente: self.cliente.as_ref().map(|s| s.trim().to_string()),
            direccion: self.direccion.as_ref().map(trimmed),
            telefono: self.telefono.as_ref().map(trimmed),
            identificacion: self.identificacion.as_ref().map(trimmed),
        }
    }

    /// Apply the present fields onto a stored client.
    pub fn apply_to(&self, client: &mut Client) {
        if let Some(negocio) = &self.negocio {
            client.negocio = negocio.clone();
        }
        if let Some(cliente) = &self.cliente {
            client.cliente = cliente.clone();
        }
        if let Some(direccion) = &self.direccion {
            client.direccion = direccion.clone();
        }
        if let Some(telefono) = &self.telefono {
            client.telefono = telefono.clone();
        }
        if let Some(identificacion) = &self.identificacion {
            client.identificacion = identificacion.clone();
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Client {
        Client {
            id: 1,
            negocio: Some("Tienda Don Pepe".to_string()),
            cliente: "José Pérez".to_string(),
            direccion: Some("Calle 10 # 4-20".to_string()),
            telefono: Some("3001234567".to_string()),
            identificacion: None,
        }
    }

    #[test]
    fn blank_and_null_optionals_clear_the_stored_value() {
        let update: UpdateClient =
            serde_json::from_str(r#"{"negocio": "   ", "telefono": null}"#).unwrap();
        let mut client = stored();

        update.normalized().apply_to(&mut client);

        assert_eq!(client.negocio, None);
        assert_eq!(client.telefono, None);
        assert_eq!(client.direccion.as_deref(), Some("Calle 10 # 4-20"));
        assert_eq!(client.cliente, "José Pérez");
    }

    #[test]
    fn present_values_are_trimmed() {
        let update: UpdateClient =
            serde_json::from_str(r#"{"cliente": " Ana Ríos ", "identificacion": " 900123 "}"#)
                .unwrap();
        let mut client = stored();

        update.normalized().apply_to(&mut client);

        assert_eq!(client.cliente, "Ana Ríos");
        assert_eq!(client.identificacion.as_deref(), Some("900123"));
        assert_eq!(client.negocio.as_deref(), Some("Tienda Don Pepe"));
    }
}
