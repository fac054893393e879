//! Colored terminal output shared by the commands.

mod headers;
mod output;
mod status;
mod tables;

pub use headers::{print_section_header, SectionStyle};
pub use output::{print_differences, print_key_value, print_summary_box};
pub use status::{print_success, print_tone, print_warning};
pub use tables::{print_choice_table, print_node_table};
