pub mod price_service;
pub mod rate_limiter;
