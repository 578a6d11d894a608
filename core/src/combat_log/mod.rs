mod error;
mod log_event;
mod parser;

pub use error::ParseError;
pub use log_event::*;
pub use parser::{LogParser, MIN_LINE_LEN};
