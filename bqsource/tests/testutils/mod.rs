//! Test utilities for bqsource integration tests
//!
//! BatchFixture wires a scripted MemoryWarehouse to a coordinator so tests can
//! drive whole batches and inspect what reached the warehouse.

pub mod batch_fixture;

/// Route library logging to the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
