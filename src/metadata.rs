//! Capability token metadata
//!
//! The metadata is baked into the token at mint time and never rewritten.
//! Its wire form is a JSON object:
//!
//! ```json
//! {"check_in": "2024-11-21T14:00:00Z", "check_out": "2024-11-24T10:00:00Z",
//!  "services": {"1": true, "2": false}}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type Timestamp = DateTime<Utc>;

/// Identifier of a service a token can grant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a proof asks for: one service, or any capability from the issuer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceScope {
    Any,
    Specific(ServiceId),
}

impl ServiceScope {
    pub fn specific(id: impl Into<String>) -> Self {
        ServiceScope::Specific(ServiceId::new(id))
    }
}

impl fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceScope::Any => f.write_str("*"),
            ServiceScope::Specific(id) => write!(f, "{id}"),
        }
    }
}

/// Validity window and per-service permissions of a capability token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenMetadata {
    check_in: Timestamp,
    check_out: Timestamp,
    services: BTreeMap<ServiceId, bool>,
}

impl TokenMetadata {
    pub fn new(
        check_in: Timestamp,
        check_out: Timestamp,
        services: BTreeMap<ServiceId, bool>,
    ) -> Result<Self> {
        let metadata = Self {
            check_in,
            check_out,
            services,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    fn validate(&self) -> Result<()> {
        if self.check_in > self.check_out {
            return Err(Error::MalformedInput(format!(
                "check_in {} is after check_out {}",
                self.check_in, self.check_out
            )));
        }
        Ok(())
    }

    pub fn check_in(&self) -> Timestamp {
        self.check_in
    }

    pub fn check_out(&self) -> Timestamp {
        self.check_out
    }

    pub fn services(&self) -> &BTreeMap<ServiceId, bool> {
        &self.services
    }

    /// Encode for storage in the token at mint time
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode metadata read back from a token
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let metadata: Self = serde_json::from_slice(bytes)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Whether this grant covers `scope` at time `now`
    pub fn grants(&self, now: Timestamp, scope: &ServiceScope) -> bool {
        if now < self.check_in || now > self.check_out {
            return false;
        }
        match scope {
            ServiceScope::Any => true,
            ServiceScope::Specific(id) => self.services.get(id).copied().unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn window() -> (Timestamp, Timestamp) {
        (
            Utc.with_ymd_and_hms(2024, 11, 21, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 24, 10, 0, 0).unwrap(),
        )
    }

    fn hotel_grant() -> TokenMetadata {
        let (t0, t1) = window();
        let services = [("1", true), ("2", false), ("3", false)]
            .into_iter()
            .map(|(k, v)| (ServiceId::from(k), v))
            .collect();
        TokenMetadata::new(t0, t1, services).unwrap()
    }

    #[test]
    fn test_wire_format_field_names() {
        let bytes = hotel_grant().encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("check_in"));
        assert!(obj.contains_key("check_out"));
        assert_eq!(obj["services"]["1"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let (t0, t1) = window();
        assert!(matches!(
            TokenMetadata::new(t1, t0, BTreeMap::new()),
            Err(Error::MalformedInput(_))
        ));

        let raw = format!(
            r#"{{"check_in":"{}","check_out":"{}","services":{{}}}}"#,
            t1.to_rfc3339(),
            t0.to_rfc3339()
        );
        assert!(TokenMetadata::decode(raw.as_bytes()).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(TokenMetadata::decode(b"").is_err());
        assert!(TokenMetadata::decode(b"not json").is_err());
        assert!(TokenMetadata::decode(br#"{"check_in":"2024-11-21T14:00:00Z"}"#).is_err());
        assert!(TokenMetadata::decode(
            br#"{"check_in":"yesterday","check_out":"2024-11-21T14:00:00Z","services":{}}"#
        )
        .is_err());
    }

    #[test]
    fn test_decode_rejects_extra_fields() {
        let raw = br#"{"check_in":"2024-11-21T14:00:00Z","check_out":"2024-11-24T10:00:00Z",
            "services":{"1":true},"room":"204"}"#;
        assert!(matches!(TokenMetadata::decode(raw), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_window_boundaries() {
        let (t0, t1) = window();
        let grant = hotel_grant();
        let any = ServiceScope::Any;
        assert!(grant.grants(t0, &any));
        assert!(grant.grants(t1, &any));
        assert!(!grant.grants(t0 - Duration::milliseconds(1), &any));
        assert!(!grant.grants(t1 + Duration::milliseconds(1), &any));
    }

    #[test]
    fn test_service_scoping() {
        let (t0, _) = window();
        let now = t0 + Duration::hours(10);
        let grant = hotel_grant();
        assert!(grant.grants(now, &ServiceScope::specific("1")));
        assert!(grant.grants(now, &ServiceScope::Any));
        assert!(!grant.grants(now, &ServiceScope::specific("2")));
        assert!(!grant.grants(now, &ServiceScope::specific("42")));
    }

    proptest! {
        #[test]
        fn prop_metadata_roundtrip(
            start in 0i64..4_000_000_000_000,
            len in 0i64..1_000_000_000,
            services in proptest::collection::btree_map("[a-z0-9]{1,8}", any::<bool>(), 0..6),
        ) {
            let check_in = Utc.timestamp_millis_opt(start).unwrap();
            let check_out = check_in + Duration::milliseconds(len);
            let services = services.into_iter().map(|(k, v)| (ServiceId::new(k), v)).collect();
            let metadata = TokenMetadata::new(check_in, check_out, services).unwrap();
            let decoded = TokenMetadata::decode(&metadata.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, metadata);
        }
    }
}
