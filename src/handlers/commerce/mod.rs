/// Cart and checkout handlers
pub mod carts;
pub mod checkout;

// Re-export route builders
pub use carts::cart_routes;
pub use checkout::checkout_routes;
