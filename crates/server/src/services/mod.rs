//! Outbound API clients (Stripe checkout, transactional email).

pub mod email;
pub mod stripe;
