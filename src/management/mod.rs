mod auth;
mod session;

pub use auth::AuthUpdateListener;
pub use session::KEY_CODE_VERIFIER;
pub use session::KEY_STATE;
pub use session::KEY_TARGET_URL;
pub use session::MemorySession;
pub use session::SESSION_COOKIE;
pub use session::DEFAULT_SESSION_TTL;
pub use session::Session;
pub use session::SessionRegistry;
