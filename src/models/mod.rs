pub mod pat;
pub mod token;
