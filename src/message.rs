mod message_envelope;
mod response_dispatcher;

pub use message_envelope::{MessageKind, RequestEnvelope, ResponseEnvelope};
pub use response_dispatcher::ResponseDispatcher;
