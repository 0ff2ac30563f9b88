use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{
            AddToCartRequest, CartCount, CartLine, CartTotals, CartView, RemoveItemRequest,
            UpdateQuantityRequest,
        },
        contact::{ContactForm, ContactMessageList, ContactSubmitted},
        orders::{
            AdminOrderRow, CancelOrderRequest, CheckoutRequest, CheckoutResult, OrderDetails,
            OrderList, OrderStatusChanged, UpdateOrderStatusRequest,
        },
        performance::{
            CacheKeys, CacheSummary, ChartData, ChartPoint, ClearPatternRequest, ClearedCount,
            ComponentHealth, Dashboard, HealthStatus, PageReport, PerformanceMetrics,
            RouteReportRow, SiteStatistics, SystemHealth,
        },
        products::{FormOptions, ProductSaved, ProductUpload, SellerProductList},
        reviews::{
            AddReviewRequest, DeleteReviewRequest, EditReviewRequest, MyReviewEntry, MyReviewList,
            ProductReviewsPage, RatingBucket, ReviewApprovalRequest, ReviewEntry, ReviewResult,
            ReviewStats,
        },
    },
    error::FieldError,
    models::{
        Brand, CartItem, Category, ContactMessage, Order, OrderItem, OrderStatus, Product, Review,
        UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::{
        cart, contact,
        health::{self, HealthData},
        orders, params, performance, review, seller_products,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::list_orders,
        orders::order_details,
        orders::update_order_status,
        orders::cancel_order,
        cart::cart_index,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_item,
        cart::clear_cart,
        cart::checkout,
        cart::cart_count,
        contact::contact_form,
        contact::submit_contact,
        contact::list_messages,
        review::product_reviews,
        review::add_review,
        review::edit_review,
        review::delete_review,
        review::my_reviews,
        review::set_approval,
        seller_products::list_products,
        seller_products::form_options,
        seller_products::get_product,
        seller_products::create_product,
        seller_products::edit_product,
        seller_products::delete_product,
        performance::dashboard,
        performance::metrics,
        performance::health,
        performance::statistics,
        performance::clear_cache,
        performance::clear_cache_pattern,
        performance::cache_keys,
        performance::chart_data,
        performance::page_report
    ),
    components(
        schemas(
            UserSummary,
            Category,
            Brand,
            Product,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            Review,
            ContactMessage,
            FieldError,
            HealthData,
            AdminOrderRow,
            OrderList,
            OrderDetails,
            UpdateOrderStatusRequest,
            CancelOrderRequest,
            OrderStatusChanged,
            CheckoutRequest,
            CheckoutResult,
            AddToCartRequest,
            UpdateQuantityRequest,
            RemoveItemRequest,
            CartLine,
            CartView,
            CartTotals,
            CartCount,
            ContactForm,
            ContactSubmitted,
            ContactMessageList,
            AddReviewRequest,
            EditReviewRequest,
            DeleteReviewRequest,
            ReviewApprovalRequest,
            ReviewEntry,
            RatingBucket,
            ReviewStats,
            ProductReviewsPage,
            ReviewResult,
            MyReviewEntry,
            MyReviewList,
            ProductUpload,
            SellerProductList,
            FormOptions,
            ProductSaved,
            PerformanceMetrics,
            HealthStatus,
            ComponentHealth,
            SystemHealth,
            CacheSummary,
            SiteStatistics,
            Dashboard,
            ClearPatternRequest,
            ClearedCount,
            CacheKeys,
            ChartPoint,
            ChartData,
            RouteReportRow,
            PageReport,
            params::Pagination,
            params::OrderListQuery,
            params::SellerProductQuery,
            params::ContactListQuery,
            params::PageQuery,
            params::ChartQuery,
            params::DateRangeQuery,
            Meta,
            ApiResponse<OrderList>,
            ApiResponse<OrderDetails>,
            ApiResponse<CartView>,
            ApiResponse<ContactForm>,
            ApiResponse<ContactMessageList>,
            ApiResponse<ProductReviewsPage>,
            ApiResponse<MyReviewList>,
            ApiResponse<SellerProductList>,
            ApiResponse<FormOptions>,
            ApiResponse<Product>,
            ApiResponse<Dashboard>,
            ApiResponse<SystemHealth>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Admin Orders", description = "Order management for administrators"),
        (name = "Cart", description = "Shopping cart and checkout"),
        (name = "Contact", description = "Contact form and inbox"),
        (name = "Reviews", description = "Product reviews and ratings"),
        (name = "Seller Products", description = "Product catalogue management for sellers"),
        (name = "Performance", description = "Metrics, health checks and cache administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
