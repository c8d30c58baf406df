pub mod assembler;
pub mod generator;
pub mod rotation;
pub mod scaling;
