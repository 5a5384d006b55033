//! Software parameter processing.

use intake_fields::{FieldError, FieldProcessor, FieldSpec};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::IntakeConfig;
use crate::error::JobProcessingError;

/// Validates the parameters section of a job request.
#[derive(Debug, Clone, Default)]
pub struct ParameterProcessor {
    fields: FieldProcessor,
}

impl ParameterProcessor {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            fields: FieldProcessor::new(config.normalizer()),
        }
    }

    pub fn process(
        &self,
        parameters: &[FieldSpec],
        request: &Map<String, Value>,
    ) -> Result<Map<String, Value>, JobProcessingError> {
        self.fields
            .process(parameters, request, |_, _| Ok::<(), FieldError>(()))
            .map_err(|err| {
                warn!(key = %err.key(), error = %err, "rejected job parameter");
                JobProcessingError::from(err)
            })
    }
}
