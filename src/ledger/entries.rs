//! Entry Ledger
//!
//! Read side of the append-only entry log. Writes only happen inside a
//! [`LedgerUnit`](crate::store::LedgerUnit) owned by the transfer coordinator.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::models::Entry;
use crate::error::LedgerError;
use crate::store::{LedgerStore, PageRequest};

pub const DEFAULT_PAGE_SIZE: usize = 100;

async fn fetch_page(
    store: &dyn LedgerStore,
    account_id: Option<&str>,
    page_size: usize,
    offset: usize,
) -> Result<Vec<Entry>, LedgerError> {
    store
        .list_entries_page(account_id, PageRequest::new(page_size, offset))
        .await
}

pub struct EntryLedger {
    store: Arc<dyn LedgerStore>,
}

impl EntryLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// All entries newest-first, optionally for one account
    pub async fn list_entries(&self, account_id: Option<&str>) -> Result<Vec<Entry>, LedgerError> {
        self.store.list_entries(account_id).await
    }

    /// Lazy newest-first stream, fetched one page at a time
    ///
    /// Nothing is queried until the stream is polled. Calling `stream` again
    /// restarts from the newest entry. Ends after the first short page.
    pub fn stream(
        &self,
        account_id: Option<String>,
        page_size: usize,
    ) -> BoxStream<'static, Result<Entry, LedgerError>> {
        let store = self.store.clone();
        let page_size = page_size.max(1);

        stream::try_unfold(Some(0usize), move |cursor| {
            let store = store.clone();
            let account_id = account_id.clone();
            async move {
                let Some(offset) = cursor else {
                    return Ok(None);
                };
                let page = fetch_page(store.as_ref(), account_id.as_deref(), page_size, offset).await?;
                if page.is_empty() {
                    return Ok(None);
                }
                let next = (page.len() == page_size).then_some(offset + page.len());
                let items = stream::iter(page.into_iter().map(Ok::<Entry, LedgerError>));
                Ok::<_, LedgerError>(Some((items, next)))
            }
        })
        .try_flatten()
        .boxed()
    }

    /// Sum of every entry amount for an account
    pub async fn sum_entries(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        self.store.sum_entries(account_id).await
    }
}
