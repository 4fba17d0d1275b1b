//! Error types for the rf-rules crate.

/// Errors raised while building actions and conditions from configuration.
///
/// Both variants are configuration problems and are fatal at startup.
///
/// # Examples
///
/// ```
/// use rf_rules::RuleError;
///
/// let err = RuleError::invalid_condition("isInRange", "rangeStart 10 is greater than rangeEnd 5");
/// assert!(err.to_string().contains("isInRange"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A condition's settings are unusable.
    #[error("invalid {condition} condition: {reason}")]
    InvalidCondition {
        /// Configuration name of the condition type.
        condition: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The output for an action could not be created.
    #[error("failed to create output for group '{group}': {source}")]
    Sink {
        /// Group name of the action.
        group: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RuleError {
    /// Creates a new [`RuleError::InvalidCondition`] error.
    #[inline]
    pub fn invalid_condition(condition: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidCondition {
            condition,
            reason: reason.into(),
        }
    }

    /// Creates a new [`RuleError::Sink`] error.
    #[inline]
    pub fn sink(
        group: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Sink {
            group: group.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_condition_display() {
        let err = RuleError::invalid_condition("isAllowed", "field must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid isAllowed condition: field must not be empty"
        );
    }

    #[test]
    fn test_sink_display() {
        let source = std::io::Error::other("read-only file system");
        let err = RuleError::sink("Adults", source);
        let msg = err.to_string();
        assert!(msg.contains("'Adults'"));
        assert!(msg.contains("read-only"));
    }
}
