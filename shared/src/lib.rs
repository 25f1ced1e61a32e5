pub mod channel;
pub mod config;
pub mod job;
pub mod protocol;
pub mod runner;
pub mod session;
pub mod stage;
pub mod types;

pub use channel::*;
pub use config::*;
pub use job::*;
pub use protocol::*;
pub use runner::*;
pub use session::*;
pub use stage::*;
pub use types::*;
