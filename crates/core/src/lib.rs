pub mod config;
pub mod error;
pub mod task;
pub mod threshold;
pub mod window;

pub use config::Config;
pub use error::*;
pub use task::*;
pub use threshold::*;
pub use window::Window;
