pub mod result;
pub mod types;
