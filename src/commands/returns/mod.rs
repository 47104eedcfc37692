pub mod approve_return_command;
pub mod reject_return_command;
pub mod request_return_command;

pub use approve_return_command::ApproveReturnCommand;
pub use reject_return_command::RejectReturnCommand;
pub use request_return_command::RequestReturnCommand;
