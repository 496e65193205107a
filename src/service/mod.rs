pub mod error;
pub mod trading;
pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

pub use error::ServiceError;
pub use trading::UniswapTradingService;
pub use types::*;

pub(crate) type ServiceResult<T> = std::result::Result<T, ServiceError>;
