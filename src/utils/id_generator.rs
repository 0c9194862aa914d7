//! Identifier generation for components and runs.

use rand::distr::{Alphanumeric, SampleString};
use uuid::Uuid;

const SUFFIX_LEN: usize = 5;

/// Generates component and run identifiers.
///
/// Component ids are a slug of the type name plus a short random suffix
/// (`upper-x3Fb1`); run ids are plain UUIDs. Callers needing fully
/// reproducible graphs supply explicit ids instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// A fresh component id derived from the type name.
    #[must_use]
    pub fn component_id(&self, component_type: &str) -> String {
        let slug: String = component_type
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let suffix = Alphanumeric.sample_string(&mut rand::rng(), SUFFIX_LEN);
        format!("{slug}-{suffix}")
    }

    /// A fresh run id.
    #[must_use]
    pub fn run_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
