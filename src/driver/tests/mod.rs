// src/driver/tests/mod.rs
