//! Filtering and pagination of fully loaded lists.
//!
//! Catalog and history screens load every row once and narrow them down in
//! memory: a free-text filter, an optional inclusive date range (history only)
//! and fixed page sizes.

use serde::Serialize;
use service_core::error::AppError;

use crate::models::{Client, InvoiceSummary, Product};

pub const PAGE_SIZES: [usize; 3] = [10, 25, 50];

/// Timestamp layout of stored invoice dates, compared as text by [`DateRange`].
pub const FECHA_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageSize(usize);

impl PageSize {
    pub fn new(size: usize) -> Result<Self, AppError> {
        if PAGE_SIZES.contains(&size) {
            Ok(Self(size))
        } else {
            Err(AppError::BadRequest(anyhow::anyhow!(
                "Page size must be one of {:?}",
                PAGE_SIZES
            )))
        }
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(PAGE_SIZES[0])
    }
}

/// Inclusive date bounds; either side may be open.
///
/// Bounds are compared against the stored `fecha` text, truncated to the
/// bound's length, so a date-only bound covers the whole day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub desde: Option<String>,
    pub hasta: Option<String>,
}

impl DateRange {
    pub fn new(desde: Option<&str>, hasta: Option<&str>) -> Self {
        let clean = |bound: Option<&str>| {
            bound
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            desde: clean(desde),
            hasta: clean(hasta),
        }
    }

    pub fn is_open(&self) -> bool {
        self.desde.is_none() && self.hasta.is_none()
    }

    pub fn contains(&self, fecha: &str) -> bool {
        let after_start = match &self.desde {
            Some(desde) => prefix(fecha, desde.len()) >= desde.as_str(),
            None => true,
        };
        let before_end = match &self.hasta {
            Some(hasta) => prefix(fecha, hasta.len()) <= hasta.as_str(),
            None => true,
        };
        after_start && before_end
    }
}

fn prefix(value: &str, len: usize) -> &str {
    match value.char_indices().nth(len) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Row that can be narrowed by the list filters.
pub trait ListRow {
    /// `needle` is already trimmed and lowercased, and never empty.
    fn matches(&self, needle: &str) -> bool;

    /// Text timestamp compared against a [`DateRange`]. Rows without one are
    /// never excluded by a range.
    fn fecha_key(&self) -> Option<String> {
        None
    }
}

fn contains_ci(value: Option<&str>, needle: &str) -> bool {
    value
        .map(|v| v.to_lowercase().contains(needle))
        .unwrap_or(false)
}

fn contains_raw(value: Option<&str>, needle: &str) -> bool {
    value.map(|v| v.contains(needle)).unwrap_or(false)
}

impl ListRow for Client {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(self.negocio.as_deref(), needle)
            || contains_ci(Some(&self.cliente), needle)
            || contains_raw(self.identificacion.as_deref(), needle)
            || contains_raw(self.telefono.as_deref(), needle)
            || self.id.to_string().contains(needle)
    }
}

impl ListRow for Product {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(Some(&self.descripcion), needle) || self.id.to_string().contains(needle)
    }
}

impl ListRow for InvoiceSummary {
    fn matches(&self, needle: &str) -> bool {
        self.id.to_string().contains(needle)
            || contains_ci(self.cliente.as_deref(), needle)
            || contains_ci(self.negocio.as_deref(), needle)
    }

    fn fecha_key(&self) -> Option<String> {
        Some(self.fecha.format(FECHA_FORMAT).to_string())
    }
}

/// One page of a filtered list.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: PageSize,
    pub total_items: usize,
    pub total_pages: usize,
    pub prev_page: Option<usize>,
    pub next_page: Option<usize>,
}

/// State of a list screen: search text, date range and current page.
///
/// Changing the search text or the range moves back to the first page.
#[derive(Debug, Clone)]
pub struct ListView {
    search: String,
    range: DateRange,
    page: usize,
    page_size: PageSize,
}

impl ListView {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            search: String::new(),
            range: DateRange::default(),
            page: 1,
            page_size,
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, text: &str) {
        let normalized = text.trim().to_lowercase();
        if normalized != self.search {
            self.search = normalized;
            self.page = 1;
        }
    }

    pub fn set_range(&mut self, range: DateRange) {
        if range != self.range {
            self.range = range;
            self.page = 1;
        }
    }

    /// Requested page; clamped to the available pages when presenting.
    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn filter<T: ListRow>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .filter(|row| self.search.is_empty() || row.matches(&self.search))
            .filter(|row| {
                self.range.is_open()
                    || row
                        .fecha_key()
                        .map(|fecha| self.range.contains(&fecha))
                        .unwrap_or(true)
            })
            .collect()
    }

    /// Filter `rows` and cut out the current page.
    pub fn present<T: ListRow>(&mut self, rows: Vec<T>) -> Page<T> {
        let filtered = self.filter(rows);
        let size = self.page_size.get();
        let total_items = filtered.len();
        let total_pages = total_items.div_ceil(size).max(1);

        self.page = self.page.clamp(1, total_pages);

        let items = filtered
            .into_iter()
            .skip((self.page - 1) * size)
            .take(size)
            .collect();

        Page {
            items,
            page: self.page,
            page_size: self.page_size,
            total_items,
            total_pages,
            prev_page: (self.page > 1).then(|| self.page - 1),
            next_page: (self.page < total_pages).then(|| self.page + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;

    fn summary(id: i64, fecha: &str, cliente: &str, negocio: Option<&str>) -> InvoiceSummary {
        InvoiceSummary {
            id,
            fecha: NaiveDateTime::parse_from_str(fecha, FECHA_FORMAT).unwrap(),
            total: Decimal::from(1000),
            cliente_id: 1,
            cliente: Some(cliente.to_string()),
            negocio: negocio.map(str::to_string),
        }
    }

    fn client(id: i64, cliente: &str, telefono: &str) -> Client {
        Client {
            id,
            negocio: Some("Tienda La Esquina".to_string()),
            cliente: cliente.to_string(),
            direccion: None,
            telefono: Some(telefono.to_string()),
            identificacion: Some("900123".to_string()),
        }
    }

    #[test]
    fn page_size_accepts_fixed_choices_only() {
        assert!(PageSize::new(10).is_ok());
        assert!(PageSize::new(25).is_ok());
        assert!(PageSize::new(50).is_ok());
        assert!(PageSize::new(20).is_err());
        assert_eq!(PageSize::default().get(), 10);
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let range = DateRange::new(Some("2024-01-01"), Some("2024-01-31"));
        let rows = vec![
            summary(1, "2023-12-31T18:00:00", "Ana", None),
            summary(2, "2024-01-15T10:00:00", "Ana", None),
            summary(3, "2024-02-01T08:00:00", "Ana", None),
            summary(4, "2024-01-31T23:59:59", "Ana", None),
            summary(5, "2024-01-01T00:00:00", "Ana", None),
        ];
        let mut view = ListView::new(PageSize::default());
        view.set_range(range);

        let ids: Vec<i64> = view.filter(rows).iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![2, 4, 5]);
    }

    #[test]
    fn open_bounds_do_not_filter() {
        let range = DateRange::new(None, Some(" "));
        assert!(range.is_open());
        assert!(DateRange::new(Some("2024-05-01"), None).contains("2030-01-01T00:00:00"));
        assert!(!DateRange::new(None, Some("2024-05-01")).contains("2024-05-02T00:00:00"));
    }

    #[test]
    fn history_text_filter_matches_id_and_client() {
        let rows = vec![
            summary(12, "2024-01-15T10:00:00", "Ana Pérez", Some("Panadería Sol")),
            summary(7, "2024-01-16T10:00:00", "Luis Gómez", None),
            summary(120, "2024-01-17T10:00:00", "Marta", Some("Ferretería")),
        ];
        let mut view = ListView::new(PageSize::default());

        view.set_search("  PANADERÍA ");
        assert_eq!(view.filter(rows.clone()).len(), 1);

        view.set_search("12");
        let ids: Vec<i64> = view.filter(rows.clone()).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![12, 120]);

        view.set_search("luis");
        assert_eq!(view.filter(rows).len(), 1);
    }

    #[test]
    fn client_filter_matches_phone_and_identification() {
        let rows = vec![client(1, "Ana", "3001234567"), client(2, "Luis", "3109876543")];
        let mut view = ListView::new(PageSize::default());

        view.set_search("310");
        assert_eq!(view.filter(rows.clone())[0].id, 2);

        view.set_search("esquina");
        assert_eq!(view.filter(rows.clone()).len(), 2);

        view.set_search("900123");
        assert_eq!(view.filter(rows).len(), 2);
    }

    #[test]
    fn pages_are_clamped_to_available_range() {
        let rows: Vec<Product> = (1..=23)
            .map(|id| Product {
                id,
                descripcion: format!("Producto {}", id),
                precio_venta: Decimal::from(100),
                precio_venta2: None,
            })
            .collect();
        let mut view = ListView::new(PageSize::default());

        view.go_to_page(9);
        let page = view.present(rows.clone());
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.prev_page, Some(2));
        assert_eq!(page.next_page, None);

        view.go_to_page(0);
        let page = view.present(rows);
        assert_eq!(page.page, 1);
        assert_eq!(page.items[0].id, 1);
        assert_eq!(page.prev_page, None);
        assert_eq!(page.next_page, Some(2));
    }

    #[test]
    fn empty_list_has_one_page() {
        let mut view = ListView::new(PageSize::default());
        let page = view.present(Vec::<Product>::new());
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn changing_filters_resets_to_first_page() {
        let mut view = ListView::new(PageSize::default());
        view.go_to_page(4);

        view.set_search("4");
        assert_eq!(view.page(), 1);

        view.go_to_page(3);
        view.set_search(" 4 ");
        assert_eq!(view.page(), 3, "same normalized text keeps the page");

        view.set_range(DateRange::new(Some("2024-01-01"), None));
        assert_eq!(view.page(), 1);
    }
}
