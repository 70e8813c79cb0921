pub mod auth;
pub mod drafts;
pub mod invoices;
pub mod listing;
