mod build;
mod cache;
mod check;
mod extensions;
mod info;

pub use build::cmd_build;
pub use cache::{CacheCommand, cmd_cache};
pub use check::cmd_check;
pub use extensions::cmd_extensions;
pub use info::cmd_info;
