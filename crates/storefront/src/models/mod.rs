//! Domain models for storefront.

pub mod order;
pub mod otp;
pub mod product;
pub mod session;
pub mod user;

pub use order::{Order, OrderItem, OrderStatus, OrderWithItems, ShippingAddress};
pub use otp::OtpChallenge;
pub use product::{ImageRef, NewProduct, Product};
pub use session::{CurrentUser, session_keys};
pub use user::User;
