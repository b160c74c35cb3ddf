/// Logger
pub mod logger;
