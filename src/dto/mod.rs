pub mod announcements;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod payment;
pub mod products;
pub mod wishlist;
