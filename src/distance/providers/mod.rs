pub mod google;

pub use google::{new_pair_cache, GoogleMatrixProvider, PairCache};
