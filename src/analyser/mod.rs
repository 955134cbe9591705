pub mod lifecycle;
pub mod logic;
