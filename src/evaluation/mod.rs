pub mod cost;
pub mod objective;
