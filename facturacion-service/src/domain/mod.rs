//! Business rules that do not touch storage.

pub mod clock;
pub mod draft;
pub mod format;
pub mod line_items;
pub mod listing;
pub mod search;
pub mod suggestions;

pub use clock::BusinessClock;
pub use draft::{DraftError, DraftView, EditableInvoice, InvoiceDraft, InvoiceSubmission};
pub use line_items::{LineItem, LineItemError, LineItemList, ListMode, PriceSelection};
pub use listing::{DateRange, ListRow, ListView, Page, PageSize};
pub use search::SearchTerm;
pub use suggestions::{SuggestionField, SuggestionGuard};
