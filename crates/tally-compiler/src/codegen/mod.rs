mod generator;

pub use generator::{compile, CodeGen};
