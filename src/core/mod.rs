pub mod check;
pub mod executor;
pub mod runtime;
pub mod suite;
pub mod workspace;
