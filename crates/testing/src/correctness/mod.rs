//! Targeted correctness tests for individual subsystems — narrower than
//! the end-to-end scenarios under `tests/`, closer to what a unit test
//! inside the crate itself would check.

mod checksum;
mod fd;
mod memory;
mod registers;
mod threads;
