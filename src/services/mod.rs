pub mod cart_service;
pub mod contact_service;
pub mod order_service;
pub mod paging;
pub mod performance_service;
pub mod review_service;
pub mod seller_product_service;
