//! Cutoff reasons.

use std::fmt;
use std::rc::Rc;

/// Why a supply was cut off.
///
/// `Done` is normal completion. `Failed` carries the error that ended the
/// subscription; it is reference counted so the same reason can be handed to
/// every listener.
#[derive(Clone, Default)]
pub enum OffReason {
    /// Normal completion.
    #[default]
    Done,
    /// Cut off because of a failure.
    Failed(Rc<anyhow::Error>),
}

impl OffReason {
    /// Create a failure reason from any error.
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Failed(Rc::new(error.into()))
    }

    /// Create a failure reason from a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::Failed(Rc::new(anyhow::Error::msg(message)))
    }

    /// Whether this is a normal completion.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// The failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Done => None,
            Self::Failed(error) => Some(error),
        }
    }

    /// Downcast the failure to a concrete error type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error().and_then(|error| error.downcast_ref::<E>())
    }
}

impl PartialEq for OffReason {
    /// Two failures are equal only when they share the same error instance.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Done, Self::Done) => true,
            (Self::Failed(a), Self::Failed(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for OffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("Done"),
            Self::Failed(error) => write!(f, "Failed({error})"),
        }
    }
}

impl fmt::Display for OffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("done"),
            Self::Failed(error) => write!(f, "{error}"),
        }
    }
}

impl From<anyhow::Error> for OffReason {
    fn from(error: anyhow::Error) -> Self {
        Self::Failed(Rc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SupplyError;

    #[test]
    fn test_done_is_default() {
        assert!(OffReason::default().is_done());
        assert_eq!(OffReason::default(), OffReason::Done);
        assert_eq!(OffReason::Done.to_string(), "done");
    }

    #[test]
    fn test_failed_equality_is_identity() {
        let reason = OffReason::msg("boom");
        assert_eq!(reason, reason.clone());
        assert_ne!(reason, OffReason::msg("boom"));
        assert_ne!(reason, OffReason::Done);
    }

    #[test]
    fn test_downcast() {
        let reason = OffReason::failed(SupplyError::Dropped);
        assert!(matches!(
            reason.downcast_ref::<SupplyError>(),
            Some(SupplyError::Dropped)
        ));
        assert!(OffReason::Done.downcast_ref::<SupplyError>().is_none());
    }

    #[test]
    fn test_display_and_debug() {
        let reason = OffReason::msg("timed out");
        assert_eq!(reason.to_string(), "timed out");
        assert_eq!(format!("{reason:?}"), "Failed(timed out)");
    }
}
