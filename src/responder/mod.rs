//! Offline reply synthesis: classify the utterance, evaluate arithmetic if that is what it
//! looks like, and fill the matching template.

pub mod classifier;
pub mod evaluator;
pub mod local;

pub use classifier::{ classify, Category };
pub use evaluator::{ evaluate, EvalError };
pub use local::LocalResponder;
