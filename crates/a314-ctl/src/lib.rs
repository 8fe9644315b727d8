mod cli;
mod status;

pub use cli::{Cli, Command};
pub use status::render_status;
