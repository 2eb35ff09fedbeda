//! Pre-flight checks of a resolved descriptor against policy limits.

use std::time::Duration;

use tracing::debug;

use crate::error::ValidationError;
use crate::resolver::MediaDescriptor;

/// Validates descriptors before any download starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintEvaluator {
    max_duration: Duration,
    size_cap: u64,
}

impl ConstraintEvaluator {
    /// Creates an evaluator with the given duration and size limits.
    #[must_use]
    pub fn new(max_duration: Duration, size_cap: u64) -> Self {
        Self {
            max_duration,
            size_cap,
        }
    }

    /// Checks `descriptor` for a job that is `trimmed` or not.
    ///
    /// A trimmed job only has the live check applied; its window is validated
    /// by the trim planner instead. `owner_bypass` skips every check and must
    /// only be set for the configured operator.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::LiveStream`] for live sources
    /// - [`ValidationError::UnknownDurationAndSize`] when neither is known
    /// - [`ValidationError::TooBig`] for a size of zero or above the cap
    /// - [`ValidationError::TooLong`] for a duration above the maximum
    pub fn evaluate(
        &self,
        descriptor: &MediaDescriptor,
        trimmed: bool,
        owner_bypass: bool,
    ) -> Result<(), ValidationError> {
        if owner_bypass {
            debug!(media_id = %descriptor.id, "constraints bypassed for operator");
            return Ok(());
        }
        if descriptor.is_live {
            return Err(ValidationError::LiveStream);
        }
        if trimmed {
            return Ok(());
        }

        if descriptor.duration.is_none() && descriptor.filesize.is_none() {
            return Err(ValidationError::UnknownDurationAndSize);
        }
        if let Some(size) = descriptor.filesize
            && (size == 0 || size > self.size_cap)
        {
            return Err(ValidationError::TooBig {
                size,
                limit: self.size_cap,
            });
        }
        if let Some(duration) = descriptor.duration
            && duration > self.max_duration
        {
            return Err(ValidationError::TooLong {
                duration,
                limit: self.max_duration,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn evaluator() -> ConstraintEvaluator {
        ConstraintEvaluator::new(Duration::from_secs(3600), GIB)
    }

    fn descriptor(duration: Option<u64>, filesize: Option<u64>, is_live: bool) -> MediaDescriptor {
        MediaDescriptor {
            id: "abc".to_string(),
            ext: "mp4".to_string(),
            title: "Clip".to_string(),
            duration: duration.map(Duration::from_secs),
            filesize,
            is_live,
            stream_urls: Vec::new(),
        }
    }

    #[test]
    fn test_accepts_within_limits() {
        assert!(
            evaluator()
                .evaluate(&descriptor(Some(120), Some(5 * 1024 * 1024), false), false, false)
                .is_ok()
        );
        assert!(evaluator().evaluate(&descriptor(Some(3600), None, false), false, false).is_ok());
        assert!(evaluator().evaluate(&descriptor(None, Some(GIB), false), false, false).is_ok());
    }

    #[test]
    fn test_unknown_duration_and_size_rejected() {
        let err = evaluator()
            .evaluate(&descriptor(None, None, false), false, false)
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownDurationAndSize);
        assert_eq!(err.to_string(), "Failed to extract duration and filesize.");
    }

    #[test]
    fn test_live_rejected_even_when_trimmed() {
        let live = descriptor(Some(10), Some(10), true);
        assert_eq!(
            evaluator().evaluate(&live, false, false).unwrap_err(),
            ValidationError::LiveStream
        );
        assert_eq!(
            evaluator().evaluate(&live, true, false).unwrap_err(),
            ValidationError::LiveStream
        );
    }

    #[test]
    fn test_size_bounds() {
        assert!(matches!(
            evaluator().evaluate(&descriptor(None, Some(0), false), false, false),
            Err(ValidationError::TooBig { size: 0, .. })
        ));
        assert!(matches!(
            evaluator().evaluate(&descriptor(None, Some(GIB + 1), false), false, false),
            Err(ValidationError::TooBig { .. })
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        let err = evaluator()
            .evaluate(&descriptor(Some(7200), Some(100), false), false, false)
            .unwrap_err();
        assert_eq!(err.to_string(), "The video is too long (> 1 hour).");
    }

    #[test]
    fn test_trimmed_skips_duration_and_size() {
        assert!(evaluator().evaluate(&descriptor(None, None, false), true, false).is_ok());
        assert!(
            evaluator()
                .evaluate(&descriptor(Some(7200), Some(GIB * 4), false), true, false)
                .is_ok()
        );
    }

    #[test]
    fn test_owner_bypass_skips_everything() {
        assert!(evaluator().evaluate(&descriptor(Some(99_999), None, true), false, true).is_ok());
    }
}
