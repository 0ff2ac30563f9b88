pub mod cart;
pub mod contact;
pub mod orders;
pub mod performance;
pub mod products;
pub mod reviews;
