pub mod error;
pub mod ownership;
pub mod registry;
pub mod template;
