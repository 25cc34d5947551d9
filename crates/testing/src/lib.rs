//! Scenario and property-based tests for `riscv_core`, plus the small
//! hand-assembler ([`asm`]) and ELF fixture builder ([`elf_builder`])
//! the integration tests under `tests/` share.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod asm;
pub mod correctness;
pub mod elf_builder;
pub mod property_based;

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing_subscriber` once per test binary, honoring
/// `RUST_LOG` and defaulting to `info`. Safe to call from every
/// scenario test; later calls are no-ops.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    });
}
