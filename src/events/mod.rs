pub mod event;
pub mod parser;

pub use event::{Action, LogEvent};
pub use parser::{parse_log, LineFailure, ParseError};
