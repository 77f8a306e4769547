// tests/property/main.rs

mod ordering;
