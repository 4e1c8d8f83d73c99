pub mod signature;

pub use signature::verify_interaction;
