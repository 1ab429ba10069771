pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod node;
pub mod task;

pub use config::Config;
pub use context::*;
pub use error::*;
pub use filter::*;
pub use node::*;
pub use task::*;
