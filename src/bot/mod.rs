/// Per-route handlers and the inbound event type
pub mod handlers;
/// Classification of inbound text into routes
pub mod router;
/// Outbound reply transport
pub mod transport;

pub use handlers::{HandlerContext, InboundEvent};
pub use transport::{ReplySender, TelegramReplySender};
