//! Infrastructure layer - External service implementations

pub mod context;
pub mod embedding;
pub mod logging;
pub mod seed;
pub mod services;
pub mod storage;
