pub mod error;
pub mod service;
pub mod tenant_change;
