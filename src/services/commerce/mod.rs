pub mod cart_service;
pub mod checkout_service;
pub mod pricing_service;

pub use cart_service::CartService;
pub use checkout_service::CheckoutService;
pub use pricing_service::{CartLine, CartSummary, PricingService, ProductView};
