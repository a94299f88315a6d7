mod prompts;
mod toolbar;
mod tools_panel;

pub use prompts::prompts;
pub use toolbar::{ToolbarAction, toolbar};
pub use tools_panel::tools_panel;
