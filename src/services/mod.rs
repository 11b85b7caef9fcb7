pub mod error;
pub mod ownership;
pub mod session;
