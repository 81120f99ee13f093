//! Settlement records and the waterfall carry value

use serde::{Deserialize, Serialize};

/// Outcome of one task, index-aligned with the input sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Settlement<T, E> {
    Fulfilled { value: T },
    Rejected { reason: E },
}

impl<T, E> Settlement<T, E> {
    pub fn fulfilled(value: T) -> Self {
        Self::Fulfilled { value }
    }

    pub fn rejected(reason: E) -> Self {
        Self::Rejected { reason }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled { value } => Some(value),
            Self::Rejected { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&E> {
        match self {
            Self::Fulfilled { .. } => None,
            Self::Rejected { reason } => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }
}

impl<T, E> From<Result<T, E>> for Settlement<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled { value },
            Err(reason) => Self::Rejected { reason },
        }
    }
}

impl<T, E> From<Settlement<T, E>> for Result<T, E> {
    fn from(settlement: Settlement<T, E>) -> Self {
        match settlement {
            Settlement::Fulfilled { value } => Ok(value),
            Settlement::Rejected { reason } => Err(reason),
        }
    }
}

/// Input handed to a batch task.
///
/// Outside waterfall mode every task receives [`Carry::Empty`]. In waterfall
/// mode a task receives the payload of the settlement at the same position in
/// the previous group, or the seed when there is no predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Carry<T, E> {
    Empty,
    Seed(T),
    Value(T),
    Error(E),
}

impl<T, E> Carry<T, E> {
    pub(crate) fn from_settlement(settlement: &Settlement<T, E>) -> Self
    where
        T: Clone,
        E: Clone,
    {
        match settlement {
            Settlement::Fulfilled { value } => Self::Value(value.clone()),
            Settlement::Rejected { reason } => Self::Error(reason.clone()),
        }
    }

    pub(crate) fn from_seed(seed: Option<&T>) -> Self
    where
        T: Clone,
    {
        seed.cloned().map_or(Self::Empty, Self::Seed)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The seed or the previous value, whichever this carry holds.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Seed(value) | Self::Value(value) => Some(value),
            Self::Empty | Self::Error(_) => None,
        }
    }

    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settled_result_shape() {
        let ok: Settlement<String, String> = Settlement::fulfilled("success_1".into());
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "fulfilled", "value": "success_1"})
        );

        let err: Settlement<String, String> = Settlement::rejected("fail_3".into());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"status": "rejected", "reason": "fail_3"})
        );

        let parsed: Settlement<u32, String> =
            serde_json::from_value(json!({"status": "fulfilled", "value": 7})).unwrap();
        assert_eq!(parsed.value(), Some(&7));
    }

    #[test]
    fn test_result_conversions() {
        let s: Settlement<u8, &str> = Err("boom").into();
        assert!(s.is_rejected());
        assert_eq!(s.reason(), Some(&"boom"));
        assert_eq!(s.into_result(), Err("boom"));
    }

    #[test]
    fn test_carry_from_previous_settlement() {
        let prev: Settlement<String, String> = Settlement::rejected("fail".into());
        let carry = Carry::from_settlement(&prev);
        assert_eq!(carry.clone().into_error().as_deref(), Some("fail"));
        assert_eq!(carry.into_value(), None);

        let seeded: Carry<String, String> = Carry::from_seed(Some(&"hey".to_string()));
        assert_eq!(seeded.into_value().as_deref(), Some("hey"));
        assert!(Carry::<String, String>::from_seed(None).is_empty());
    }
}
