//! Core pipelines and domain logic for Cookido Agent.
//!
//! This crate ties the recipe gateway, the LLM classifier, and the resume
//! state together into the `export`, `import`, and `organize` workflows.

pub mod classifier;
pub mod collections;
pub mod debug;
pub mod exporter;
pub mod importer;
pub mod llm;
pub mod organizer;
pub mod progress;

#[cfg(test)]
mod testing;

use std::time::Duration;

/// Delay between consecutive remote mutations. Zero skips the sleep.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
