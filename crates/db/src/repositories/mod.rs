//! Repositories, one per aggregate.
//!
//! Each repository borrows the pool; construct one per request:
//!
//! ```rust,ignore
//! let products = ProductRepository::new(state.pool()).list(&filter, order, page).await?;
//! ```

mod address;
mod analytics;
mod cart;
mod category;
mod coupon;
mod home;
mod lottery;
mod order;
mod product;
mod user;

pub use address::AddressRepository;
pub use analytics::{AnalyticsRepository, LOW_STOCK_THRESHOLD};
pub use cart::CartRepository;
pub use category::CategoryRepository;
pub use coupon::CouponRepository;
pub use home::HomeSectionRepository;
pub use lottery::LotteryRepository;
pub use order::{CheckoutRequest, OrderRepository};
pub use product::{ProductRepository, storefront_filter};
pub use user::UserRepository;
