pub mod matching;
pub mod summary;
