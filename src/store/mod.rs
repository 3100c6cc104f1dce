//! Buffers between strategy callbacks and the relaxation: the separation
//! store, the pricing store, and the cut pools.
//!
//! All three follow the same contract: accept candidates, dedupe and score
//! them, and on flush apply the accepted set to the relaxation and clear
//! the buffer. Buffers are always drained before control returns to the
//! phase that owns the next relaxation mutation.

mod cutpool;
mod pricestore;
mod sepastore;

pub use cutpool::{CutPool, PooledCut};
pub use pricestore::{PriceStore, PricedColumn};
pub use sepastore::SepaStore;
