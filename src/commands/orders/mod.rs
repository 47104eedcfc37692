pub mod cancel_item_command;
pub mod place_order_command;
pub mod update_item_status_command;
pub mod verify_payment_command;

pub use cancel_item_command::CancelItemCommand;
pub use place_order_command::{PlaceOrderCommand, PricedLine};
pub use update_item_status_command::UpdateItemStatusCommand;
pub use verify_payment_command::VerifyPaymentCommand;
