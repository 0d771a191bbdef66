//! Subcommand handlers.

mod fetch;
mod index;
mod search;

pub use fetch::{FetchCommand, handle_fetch};
pub use index::{IndexArgs, handle_index};
pub use search::{SearchArgs, handle_search};
