// tests/integration/main.rs

mod compile_flow;
mod error_handling;
mod evaluation_flow;
