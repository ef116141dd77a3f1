//! Billing domain: plan catalog, Stripe event decoding and subscription sync

pub mod dispatch;
pub mod event;
pub mod plans;
pub mod sync;

pub use dispatch::{DispatchOutcome, handle_event};
pub use event::StripeEvent;
pub use plans::{Plan, PlanCatalog};
pub use sync::Reconciler;
