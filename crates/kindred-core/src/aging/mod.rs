pub mod decay;
pub mod engine;
pub mod fuzz;
pub mod scheduler;
