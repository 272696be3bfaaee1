//! Invoice list query pipeline: search → status filter → sort → paginate.
//!
//! The pipeline is a pure function of the fetched collection, the
//! [`QueryView`] and the `now` used for status classification. It runs over
//! the fully fetched collection, which is fine while tenants hold a few
//! hundred invoices.

use core::num::NonZeroUsize;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invoiceflow_core::DomainError;

use crate::invoice::InvoiceSummary;
use crate::status::{Classify, InvoiceStatus};

/// Rows per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(size) => size,
    None => unreachable!(),
};

/// Status filter of the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(InvoiceStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: InvoiceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

/// Sort order of the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortKey {
    /// Issue date, newest first.
    #[default]
    Latest,
    /// Issue date, oldest first.
    Oldest,
    /// Grand total, highest first.
    TotalHigh,
    /// Balance due, highest first.
    BalanceHigh,
    /// Customer name, A to Z.
    CustomerAz,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Latest,
        SortKey::Oldest,
        SortKey::TotalHigh,
        SortKey::BalanceHigh,
        SortKey::CustomerAz,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Latest => "LATEST",
            SortKey::Oldest => "OLDEST",
            SortKey::TotalHigh => "TOTAL_HIGH",
            SortKey::BalanceHigh => "BALANCE_HIGH",
            SortKey::CustomerAz => "CUSTOMER_AZ",
        }
    }
}

impl FromStr for SortKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown sort key: {s}")))
    }
}

/// Search/filter/sort/page selection owned by the list screen.
///
/// Changing the search text, the filter or the sort key sends the view back
/// to page 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryView {
    search: String,
    filter: StatusFilter,
    sort: SortKey,
    page: usize,
}

impl Default for QueryView {
    fn default() -> Self {
        Self {
            search: String::new(),
            filter: StatusFilter::All,
            sort: SortKey::Latest,
            page: 1,
        }
    }
}

impl QueryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// Current page, 1-based.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search != self.search {
            self.search = search;
            self.page = 1;
        }
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if sort != self.sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    /// Jump to a page, clamped to `[1, page_count]`.
    pub fn go_to_page(&mut self, page: usize, page_count: usize) {
        self.page = page.clamp(1, page_count.max(1));
    }

    pub fn next_page(&mut self, page_count: usize) {
        self.go_to_page(self.page.saturating_add(1), page_count);
    }

    pub fn prev_page(&mut self, page_count: usize) {
        self.go_to_page(self.page.saturating_sub(1), page_count);
    }
}

/// One page of the query result.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePage<'a> {
    pub items: Vec<&'a InvoiceSummary>,
    /// Requested page, 1-based.
    pub page: usize,
    pub page_count: usize,
    /// Matches across all pages.
    pub total_matches: usize,
}

impl InvoicePage<'_> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Page numbers to render, `1..=page_count`.
    pub fn page_numbers(&self) -> impl Iterator<Item = usize> {
        1..=self.page_count
    }
}

/// Case-insensitive substring match on invoice number or customer name.
///
/// Whitespace-only text matches everything.
pub fn matches_search(invoice: &InvoiceSummary, search: &str) -> bool {
    if search.trim().is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    invoice.invoice_number.to_lowercase().contains(&needle)
        || invoice.customer_name.to_lowercase().contains(&needle)
}

/// Stable sort in place.
pub fn sort_invoices(invoices: &mut [&InvoiceSummary], key: SortKey) {
    match key {
        SortKey::Latest => invoices.sort_by(|a, b| b.issue_date.cmp(&a.issue_date)),
        SortKey::Oldest => invoices.sort_by(|a, b| a.issue_date.cmp(&b.issue_date)),
        SortKey::TotalHigh => invoices.sort_by(|a, b| b.total.total_cmp(&a.total)),
        SortKey::BalanceHigh => invoices.sort_by(|a, b| b.balance_due.total_cmp(&a.balance_due)),
        SortKey::CustomerAz => invoices.sort_by(|a, b| {
            a.customer_name
                .to_lowercase()
                .cmp(&b.customer_name.to_lowercase())
                .then_with(|| a.customer_name.cmp(&b.customer_name))
        }),
    }
}

/// Search, filter and sort; the unpaginated result.
pub fn filter_and_sort<'a>(
    invoices: &'a [InvoiceSummary],
    search: &str,
    filter: StatusFilter,
    sort: SortKey,
    now: DateTime<Utc>,
) -> Vec<&'a InvoiceSummary> {
    let mut matched: Vec<&InvoiceSummary> = invoices
        .iter()
        .filter(|inv| matches_search(inv, search))
        .filter(|inv| filter.matches(inv.status(now)))
        .collect();
    sort_invoices(&mut matched, sort);
    matched
}

pub fn page_count(matches: usize, page_size: NonZeroUsize) -> usize {
    matches.div_ceil(page_size.get())
}

/// Slice out a 1-based page. Pages outside `[1, page_count]` come back empty.
pub fn paginate<T: Copy>(items: &[T], page: usize, page_size: NonZeroUsize) -> Vec<T> {
    let Some(index) = page.checked_sub(1) else {
        return Vec::new();
    };
    let start = index.saturating_mul(page_size.get());
    items.iter().skip(start).take(page_size.get()).copied().collect()
}

/// Run the whole pipeline for a view.
pub fn query_invoices<'a>(
    invoices: &'a [InvoiceSummary],
    view: &QueryView,
    now: DateTime<Utc>,
    page_size: NonZeroUsize,
) -> InvoicePage<'a> {
    let matched = filter_and_sort(invoices, view.search(), view.filter(), view.sort(), now);
    InvoicePage {
        items: paginate(&matched, view.page(), page_size),
        page: view.page(),
        page_count: page_count(matched.len(), page_size),
        total_matches: matched.len(),
    }
}
