//! This module provides custom serde implementations.

/// Serialize a [`std::time::Duration`] as a whole number of milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Implements the serde `serialize` function for a duration.
    /// # Errors
    /// Returns an error if the duration does not fit in a `u64` of milliseconds.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).map_err(serde::ser::Error::custom)?;
        serializer.serialize_u64(millis)
    }

    /// Implements the serde `deserialize` function for a duration.
    /// # Errors
    /// Returns an error if the value is not an unsigned integer.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "super::duration_ms")]
        request: Duration,
    }

    #[test]
    fn duration_as_millis() {
        let parsed: Timeouts = serde_json::from_str(r#"{"request": 1500}"#).unwrap();
        assert_eq!(parsed.request, Duration::from_millis(1500));
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"{"request":1500}"#
        );
    }

    #[test]
    fn rejects_negative_duration() {
        assert!(serde_json::from_str::<Timeouts>(r#"{"request": -1}"#).is_err());
    }
}
