pub mod dot;
pub mod error;
pub mod flat;
pub mod hnsw;
pub mod vecstore;

pub use dot::inner_product;
pub use error::VecError;
pub use flat::FlatIndex;
pub use hnsw::{HNSW, HNSWConfig};
pub use vecstore::{IndexConfig, Match, VecIndex, new_index};
