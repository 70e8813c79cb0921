use serde::Deserialize;
use service_core::error::AppError;

use crate::domain::{DateRange, ListView, PageSize};

/// Query string of the catalog and history list screens.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListQuery {
    /// List state for this request. An unsupported page size is a 400.
    pub fn view(&self) -> Result<ListView, AppError> {
        let page_size = match self.page_size {
            Some(size) => PageSize::new(size)?,
            None => PageSize::default(),
        };

        let mut view = ListView::new(page_size);
        view.set_search(self.q.as_deref().unwrap_or_default());
        view.set_range(DateRange::new(self.desde.as_deref(), self.hasta.as_deref()));
        view.go_to_page(self.page.unwrap_or(1));
        Ok(view)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
