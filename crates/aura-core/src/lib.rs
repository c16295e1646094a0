pub mod actions;
pub mod chat;
pub mod config;
pub mod error;
pub mod payment;
pub mod persistence;
pub mod plan;
pub mod reducer;
pub mod router;
pub mod state;

pub use actions::*;
pub use error::AuraError;
pub use reducer::*;
pub use state::*;

pub use persistence::*;
