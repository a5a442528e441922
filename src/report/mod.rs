pub mod json;
pub mod table;
pub mod timeline;

pub use table::format_statistics_table;
