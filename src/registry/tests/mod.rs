// src/registry/tests/mod.rs
