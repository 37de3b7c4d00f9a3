pub mod check;
pub mod join;
pub mod probe;
