pub mod actions;
pub mod notify;
pub mod state;
pub mod table;

pub use actions::{delete_selected, enrich_selected};
pub use notify::{Notifier, TerminalNotifier};
pub use state::{SessionState, DEFAULT_COLUMNS};
pub use table::{refresh, render, test_table, to_title_case, PAGE_LIMIT};
