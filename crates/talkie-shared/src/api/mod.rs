mod auth;
mod messages;

pub use auth::*;
pub use messages::*;
