pub mod migrate;
pub mod premium;
pub mod token;
