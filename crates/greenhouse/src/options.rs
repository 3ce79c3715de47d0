// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::Deserialize;

use crate::{Error, Result};

/// Configuration of a [`PlantRepository`](crate::PlantRepository).
///
/// Deserializes from JSON; missing fields take their default values.
///
/// # Examples
///
/// ```
/// use greenhouse::RepositoryOptions;
///
/// let options = RepositoryOptions::from_json(r#"{ "offload_threshold": 500 }"#)?;
/// assert_eq!(options.offload_threshold(), 500);
/// # Ok::<(), greenhouse::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryOptions {
    offload_threshold: usize,
}

impl RepositoryOptions {
    /// Lists with at least this many plants are sorted on the blocking thread pool.
    pub const DEFAULT_OFFLOAD_THRESHOLD: usize = 64;

    /// Decodes and validates options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for malformed JSON or unknown fields and
    /// [`Error::InvalidConfig`] for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Returns the list length from which sorting is moved to the blocking thread pool.
    #[must_use]
    pub fn offload_threshold(&self) -> usize {
        self.offload_threshold
    }

    /// Sets the list length from which sorting is moved to the blocking thread pool.
    ///
    /// Use `1` to always offload and [`usize::MAX`] to never offload.
    #[must_use]
    pub fn with_offload_threshold(mut self, threshold: usize) -> Self {
        self.offload_threshold = threshold;
        self
    }

    /// Checks that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the offload threshold is zero.
    pub fn validate(&self) -> Result<()> {
        if self.offload_threshold == 0 {
            return Err(Error::InvalidConfig("offload_threshold must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            offload_threshold: Self::DEFAULT_OFFLOAD_THRESHOLD,
        }
    }
}
