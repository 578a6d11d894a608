mod log_codes;

pub use log_codes::*;
