pub mod flat;
pub mod indexes;
pub mod vector;

mod error;

pub use error::{Error, Result};
pub use flat::{SearchHit, VectorIndex};
pub use indexes::{
	IndexStats, Indexes, MessageFilter, MessageMatch, MessageRef, SignatureMatch, SignatureRef,
};
