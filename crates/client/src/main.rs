//! `invoiceflow` command-line entry point.
//!
//! Usage: `invoiceflow [SEARCH] [FILTER] [SORT] [PAGE]`
//!
//! Fetches the invoice list from `INVOICEFLOW_API_URL` and prints one page of
//! it. `FILTER` is `ALL`, `DRAFT`, `PAID`, `OVERDUE` or `ARCHIVED`; `SORT` is
//! `LATEST`, `OLDEST`, `TOTAL_HIGH`, `BALANCE_HIGH` or `CUSTOMER_AZ`.

#[cfg(feature = "http")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use chrono::Utc;
    use invoiceflow_client::{ClientConfig, HttpBackend, InvoiceClient};
    use invoiceflow_invoicing::{
        Classify, QueryView, SortKey, StatusFilter, format_display_date, format_money,
        paid_percent,
    };

    invoiceflow_observability::init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let session = config.session();
    if session.is_authenticated() {
        tracing::info!(api_url = %config.api_url, "using bearer token");
    } else {
        tracing::info!(api_url = %config.api_url, "no auth token configured");
    }

    let mut args = std::env::args().skip(1);
    let mut view = QueryView::new();
    if let Some(search) = args.next() {
        view.set_search(search);
    }
    if let Some(filter) = args.next() {
        let filter: StatusFilter = filter.parse().context("invalid FILTER argument")?;
        view.set_filter(filter);
    }
    if let Some(sort) = args.next() {
        let sort: SortKey = sort.parse().context("invalid SORT argument")?;
        view.set_sort(sort);
    }
    let requested_page = match args.next() {
        Some(page) => page.parse::<usize>().context("PAGE must be a positive integer")?,
        None => 1,
    };

    let backend = HttpBackend::new(config.api_url.clone(), session);
    let client = InvoiceClient::with_config(backend, &config);
    client
        .fetch_invoice_list()
        .await
        .context("fetching invoices")?;

    let now = Utc::now();
    let first = client.visible_page(&view, now);
    view.go_to_page(requested_page, first.page_count);
    let page = client.visible_page(&view, now);

    if page.items.is_empty() {
        println!("No invoices found");
        return Ok(());
    }

    for invoice in &page.items {
        println!(
            "{:<12} {:<24} {:>12} {:>12} {:>4.0}% {:<9} due {}",
            invoice.invoice_number,
            invoice.customer_name,
            format_money(invoice.currency, invoice.total),
            format_money(invoice.currency, invoice.balance_due),
            paid_percent(invoice.total, invoice.amount_paid),
            invoice.status(now).label(),
            format_display_date(invoice.due_date),
        );
    }
    println!(
        "page {} of {} ({} matching)",
        page.page, page.page_count, page.total_matches
    );

    Ok(())
}

#[cfg(not(feature = "http"))]
fn main() {
    eprintln!("This binary requires the 'http' feature to be enabled.");
    eprintln!("Build with: cargo build -p invoiceflow-client --features http");
    std::process::exit(1);
}
