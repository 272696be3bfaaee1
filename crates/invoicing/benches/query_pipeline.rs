use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{DateTime, Duration, TimeZone, Utc};
use invoiceflow_core::InvoiceId;
use invoiceflow_invoicing::{
    Currency, DEFAULT_PAGE_SIZE, InvoiceStatus, InvoiceSummary, QueryView, SortKey, StatusFilter,
    query_invoices,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

/// Deterministic mix of paid, overdue, draft and archived invoices.
fn collection(size: usize) -> Vec<InvoiceSummary> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..size)
        .map(|n| {
            let total = 50.0 + (n % 97) as f64 * 13.5;
            let paid = if n % 4 == 0 { total } else { (n % 5) as f64 };
            InvoiceSummary {
                id: InvoiceId::from(format!("bench-{n}")),
                invoice_number: format!("INV-{:05}", n),
                customer_name: format!("Customer {}", n % 37),
                issue_date: start + Duration::hours(n as i64 * 7),
                due_date: start + Duration::days((n % 400) as i64),
                currency: Currency::Usd,
                total,
                amount_paid: paid,
                balance_due: total - paid,
                archived: n % 11 == 0,
            }
        })
        .collect()
}

fn bench_query_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_pipeline");

    for size in [100usize, 1_000, 10_000] {
        let invoices = collection(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("latest_all", size), &invoices, |b, invoices| {
            let view = QueryView::new();
            b.iter(|| black_box(query_invoices(invoices, &view, now(), DEFAULT_PAGE_SIZE)));
        });

        group.bench_with_input(
            BenchmarkId::new("search_overdue_customer_az", size),
            &invoices,
            |b, invoices| {
                let mut view = QueryView::new();
                view.set_search("customer 1");
                view.set_filter(StatusFilter::Only(InvoiceStatus::Overdue));
                view.set_sort(SortKey::CustomerAz);
                b.iter(|| black_box(query_invoices(invoices, &view, now(), DEFAULT_PAGE_SIZE)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_query_pipeline);
criterion_main!(benches);
