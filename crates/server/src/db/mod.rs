pub mod games;
pub mod pool;
pub mod positions;
