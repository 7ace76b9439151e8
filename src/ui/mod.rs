//! Terminal rendering for the command-line front end
//!
//! Interactive terminals get cliclack/indicatif output; CI and piped output
//! fall back to plain lines. JSON mode prints nothing but the result.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    bridge_error, intro, key_value, outro_success, print_json, remark, step_info, step_ok,
    step_warn, table_header,
};
pub use progress::{OperationProgress, TaskSpinner};
pub use prompts::confirm;
