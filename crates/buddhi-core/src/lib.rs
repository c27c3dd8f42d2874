pub mod config;
pub mod endpoint;
pub mod reveal;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use endpoint::{Endpoint, EndpointError, HttpEndpoint};
pub use reveal::{Completion, Reveal, RevealStep, StopHandle, DEFAULT_REVEAL_DELAY, MIN_REVEAL_DELAY};
pub use session::{Exchange, Session, SessionError, ERROR_REPLY, FALLBACK_REPLY};
pub use state::{ChatMessage, ChatRole};
