pub mod command_timeout;
pub mod system;

pub use command_timeout::{run_command_with_timeout, run_for_stdout};
pub use system::find_executable;
