//! 支付流程
//!
//! Two-step intent protocol around an external provider:
//!
//! ```text
//! create_intent ──► provider intent ──► BeginPayment (pending_payment)
//!       │
//!  (customer confirms with the provider's client library)
//!       │
//! confirm ──► retrieve intent ──► MarkPaid ──► order.payment
//!                                    └─ failure after charge ──► ConfirmationDesync
//! ```
//!
//! A stuck intent is recovered by [`PaymentController::reconcile`], by
//! staff abandoning it ([`PaymentController::abandon_payment`]) or by staff
//! settling the order manually. Both staff paths cancel the intent with the
//! provider first.

mod controller;
mod error;
mod provider;
mod stripe;
mod tenant;

pub use controller::PaymentController;
pub use error::{PaymentError, PaymentResult};
pub use provider::{
    CreateIntent, IntentMetadata, IntentStatus, PaymentProvider, ProviderError, ProviderIntent,
};
pub use stripe::{DEFAULT_API_BASE as DEFAULT_STRIPE_API_BASE, StripeProvider};
pub use tenant::{TenantPayment, currency_code};
