//! DEFLATE inflation, strategy-aware deflation, and divination of the
//! parameters that produced a given compressed byte sequence.
//!
//! Divination is an optimization: correctness of the overall patch never
//! depends on recovering an entry's original parameters (an unreproducible
//! entry is simply passed through verbatim), but patch size does.

mod corpus;
pub mod divination;
pub mod engine;
pub mod error;

pub use divination::{divine, Divination, HintCache};
pub use engine::{DeflateEngine, DeflateParams, MinizEngine, Strategy};
pub use error::{DeflateError, DeflateResult};
