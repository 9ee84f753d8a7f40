//! Domain types for the storefront.

pub mod email;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;
pub mod text;

pub use email::{Email, EmailError};
pub use id::OrderId;
pub use price::parse_price;
pub use slug::{Slug, slugify};
pub use status::OrderStatus;
pub use text::sanitize_text;
