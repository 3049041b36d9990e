//! Per-tenant payment account
//!
//! A tenant may bring its own provider account and currency; anything left
//! unset falls back to the server-wide defaults.

use std::sync::Arc;

use super::provider::PaymentProvider;

#[derive(Clone, Default)]
pub struct TenantPayment {
    pub provider: Option<Arc<dyn PaymentProvider>>,
    /// Provider currency code (`eur`, `usd`, ...)
    pub currency: Option<String>,
}

impl std::fmt::Debug for TenantPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantPayment")
            .field("own_account", &self.provider.is_some())
            .field("currency", &self.currency)
            .finish()
    }
}

impl TenantPayment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the currency from a display symbol or code; unknown values are ignored
    pub fn with_currency(mut self, symbol: &str) -> Self {
        self.currency = currency_code(symbol);
        self
    }
}

/// Map a tenant's display currency (`€`, `$`, `GBP`, ...) to a provider code
pub fn currency_code(symbol: &str) -> Option<String> {
    let symbol = symbol.trim();
    let code = match symbol {
        "" => return None,
        "€" => "eur",
        "$" => "usd",
        "£" => "gbp",
        "¥" => "jpy",
        "₹" => "inr",
        "₩" => "krw",
        "₴" => "uah",
        "₫" => "vnd",
        "₪" => "ils",
        "₡" => "crc",
        "₱" => "php",
        "₦" => "ngn",
        // Already a three-letter code; the provider validates it
        other if other.len() == 3 && other.chars().all(|c| c.is_ascii_alphabetic()) => {
            return Some(other.to_ascii_lowercase());
        }
        _ => return None,
    };
    Some(code.to_string())
}
