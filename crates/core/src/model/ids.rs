use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an id from a string (route params, storage keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

backend_id!(
    /// Backend identifier of an evaluation (quiz definition).
    EvaluationId
);
backend_id!(
    /// Backend identifier of a question inside an evaluation.
    QuestionId
);
backend_id!(
    /// Backend identifier of a single attempt at an evaluation.
    AttemptId
);
backend_id!(UserId);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const FIRST: EvaluationId = EvaluationId::new(1);

    #[test]
    fn ids_can_be_built_in_constants() {
        const VALUE: u64 = FIRST.value();
        assert_eq!(VALUE, 1);
        assert_eq!(FIRST, EvaluationId::new(1));
    }

    #[test]
    fn evaluation_id_display() {
        assert_eq!(EvaluationId::new(42).to_string(), "42");
    }

    #[test]
    fn attempt_id_from_str() {
        let id: AttemptId = " 123 ".parse().unwrap();
        assert_eq!(id, AttemptId::new(123));
    }

    #[test]
    fn question_id_from_str_invalid() {
        let err = "q1".parse::<QuestionId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse QuestionId from string");
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", UserId::new(7)), "UserId(7)");
    }

    #[test]
    fn question_ids_work_as_json_object_keys() {
        let mut map = BTreeMap::new();
        map.insert(QuestionId::new(3), "B");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"3":"B"}"#);

        let back: BTreeMap<QuestionId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&QuestionId::new(3)).map(String::as_str), Some("B"));
    }
}
