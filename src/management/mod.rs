mod auth;
mod pending;

pub use auth::TokenManager;
pub use auth::token_record;
pub use pending::AUTHORIZATION_TTL;
pub use pending::PendingAuthorizations;
pub use pending::PendingError;
pub use pending::PkceToken;
