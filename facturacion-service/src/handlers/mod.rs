//! HTTP handlers for facturacion-service.

pub mod auth;
pub mod clients;
pub mod drafts;
pub mod health;
pub mod home;
pub mod invoices;
pub mod print;
pub mod products;
pub mod summary;
