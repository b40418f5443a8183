pub mod retry;
pub mod surf_logging;
