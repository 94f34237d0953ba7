#![doc(test(attr(deny(warnings))))]

//! Household Core projects recurring budget entries forward month by month and estimates
//! pantry stock between observations, with the services, storage, and configuration
//! needed to drive both from a household document.

pub mod config;
pub mod core;
pub mod errors;
pub mod household;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Household Core tracing initialized.");
    });
}
