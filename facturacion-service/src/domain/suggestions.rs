//! Ordering guard for autocomplete lookups.
//!
//! Each keystroke issues a ticket before the search runs. When the search
//! returns, its results are applied only if no newer ticket was issued for the
//! same field in the meantime, so a slow early response never overwrites the
//! results of a later one.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionField {
    Client,
    Product,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionGuard {
    client: u64,
    product: u64,
}

impl SuggestionGuard {
    pub fn issue(&mut self, field: SuggestionField) -> u64 {
        let counter = self.counter_mut(field);
        *counter += 1;
        *counter
    }

    pub fn is_current(&self, field: SuggestionField, ticket: u64) -> bool {
        let latest = match field {
            SuggestionField::Client => self.client,
            SuggestionField::Product => self.product,
        };
        latest == ticket
    }

    fn counter_mut(&mut self, field: SuggestionField) -> &mut u64 {
        match field {
            SuggestionField::Client => &mut self.client,
            SuggestionField::Product => &mut self.product,
        }
    }
}
