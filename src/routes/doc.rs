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
        announcements::{AnnouncementList, CreateAnnouncementRequest, UpdateAnnouncementRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItem, CartItemDto, CartList, UpdateCartRequest},
        categories::{CategoryList, CategoryRequest},
        orders::{
            OrderLineRequest, OrderList, OrderStats, OrderWithItems, PlaceOrderRequest,
            PlaceOrderResponse, ShippingDetails, UpdateOrderStatusRequest,
        },
        payment::{VerifyPaymentRequest, VerifyPaymentResponse},
        products::{DeleteOutcome, DeleteProductResponse, ProductList},
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    models::{
        Announcement, Category, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
        Product, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        announcements, auth, cart, categories, health, orders, params, payment, products,
        wishlist,
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
        auth::register,
        auth::login,
        auth::me,
        products::list_products,
        products::list_all_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        orders::place_order,
        orders::my_orders,
        orders::get_order,
        orders::list_all_orders,
        orders::update_order_status,
        orders::stats,
        announcements::list_active,
        announcements::list_all,
        announcements::create_announcement,
        announcements::update_announcement,
        announcements::delete_announcement,
        payment::verify_payment
    ),
    components(
        schemas(
            User,
            Product,
            Category,
            Order,
            OrderItem,
            Announcement,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ProductList,
            DeleteOutcome,
            DeleteProductResponse,
            CategoryRequest,
            CategoryList,
            AddToCartRequest,
            UpdateCartRequest,
            CartItem,
            CartItemDto,
            CartList,
            AddWishlistRequest,
            WishlistProductList,
            OrderLineRequest,
            ShippingDetails,
            PlaceOrderRequest,
            PlaceOrderResponse,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderList,
            OrderStats,
            CreateAnnouncementRequest,
            UpdateAnnouncementRequest,
            AnnouncementList,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            params::ProductSort,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PlaceOrderResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Storefront catalog"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Announcements", description = "Storefront banners"),
        (name = "Payment", description = "Payment verification"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
