//! Terminal output for the CLI: tables, progress bars and colors.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_progress_bar, create_spinner, with_spinner};
pub use tables::{
    TableBuilder, create_categorization_table, create_category_table, create_hits_table,
    create_stats_table,
};
pub use theme::{THEME, Theme};
