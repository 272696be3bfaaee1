//! Money model: line totals, subtotal, tax and grand total.
//!
//! Everything here is a pure function over raw line items. The backend stays
//! the authority on money; these values are the preview the client shows
//! before (or alongside) the authoritative figures.

use serde::{Deserialize, Serialize};

use invoiceflow_core::ValueObject;

/// Supported invoice currencies.
///
/// Unknown codes coming off the wire deserialize as `Usd`, matching the `$`
/// display fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Currency {
    #[default]
    Usd,
    Inr,
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Inr, Currency::Eur];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Inr => "INR",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        currency_symbol(self.code())
    }

    /// Parse an ISO code; `None` for anything outside the supported set.
    pub fn from_code(code: &str) -> Option<Self> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for Currency {
    fn from(value: String) -> Self {
        Currency::from_code(&value).unwrap_or_default()
    }
}

impl ValueObject for Currency {}

/// Display symbol for a currency code.
///
/// Unknown codes fall back to `$` instead of failing.
pub fn currency_symbol(code: &str) -> &'static str {
    match code {
        "INR" => "₹",
        "EUR" => "€",
        _ => "$",
    }
}

/// A billable line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> f64 {
        line_total(self)
    }
}

impl ValueObject for LineItem {}

/// Derived money figures for a set of line items and a tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

impl ValueObject for Totals {}

pub fn line_total(item: &LineItem) -> f64 {
    item.quantity * item.unit_price
}

pub fn subtotal(items: &[LineItem]) -> f64 {
    items.iter().map(line_total).sum()
}

pub fn tax_amount(subtotal: f64, tax_percent: f64) -> f64 {
    subtotal * tax_percent / 100.0
}

/// Compute subtotal, tax and total in one pass.
pub fn compute_totals(items: &[LineItem], tax_percent: f64) -> Totals {
    let subtotal = subtotal(items);
    let tax_amount = tax_amount(subtotal, tax_percent);
    Totals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    }
}

/// Round to whole cents.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Slack allowed for float noise when comparing two amounts.
pub const AMOUNT_EPSILON: f64 = 1e-9;

/// True when `amount` is larger than `limit`, ignoring float noise.
///
/// Sub-cent differences count: 27.504 exceeds 27.50.
pub fn exceeds(amount: f64, limit: f64) -> bool {
    amount - limit > AMOUNT_EPSILON
}

/// True when the amount rounds to zero cents.
pub fn is_zero_amount(amount: f64) -> bool {
    to_cents(amount) == 0
}

/// Render an amount with exactly two decimals.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Render an amount with its currency symbol, e.g. `₹27.50`.
pub fn format_money(currency: Currency, amount: f64) -> String {
    format!("{}{}", currency.symbol(), format_amount(amount))
}

/// Share of the total already paid, in percent, capped at 100.
pub fn paid_percent(total: f64, paid: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    (paid / total * 100.0).min(100.0)
}
