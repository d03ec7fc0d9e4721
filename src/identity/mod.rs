//! Identity-provider boundary and session resolution.

pub mod principal;
pub mod provider;
pub mod session;

pub use principal::{Principal, TokenSet};
pub use provider::{IdentityProvider, RestIdentityProvider};
pub use session::{SessionResolver, SessionState};
