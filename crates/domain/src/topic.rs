//! Topic codec: structured addresses for bus traffic.
//!
//! Wire format: `<domain>/<subtopic>/<device_id>[/<operation>]`, where the
//! subtopic is `REQ` or `RES` and only requests carry an operation
//! (`R`, `W`, `D` or `CRUD`).
//!
//! Decoding is [`Address::from_str`], encoding is [`Address`]'s
//! [`Display`](fmt::Display) impl. For every valid address `a`,
//! `a.to_string().parse() == Ok(a)`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Segment delimiter of the topic wire format.
pub const SEPARATOR: char = '/';

/// Multi-level wildcard used in broker subscription filters.
const WILDCARD: &str = "#";

/// Single-level wildcard used in broker subscription filters.
const SINGLE_LEVEL: &str = "+";

/// Characters a topic segment may not contain.
const RESERVED: [char; 3] = [SEPARATOR, '+', '#'];

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(RESERVED)
}

/// Whether `topic` is covered by the subscription `filter`.
///
/// `+` matches exactly one level and a trailing `#` matches the rest of the
/// topic, including its parent level (`A/#` covers `A`).
#[must_use]
pub fn filter_matches(filter: &str, topic: &str) -> bool {
    let mut levels = topic.split(SEPARATOR);
    for pattern in filter.split(SEPARATOR) {
        if pattern == WILDCARD {
            return true;
        }
        match levels.next() {
            Some(level) if pattern == SINGLE_LEVEL || pattern == level => {}
            _ => return false,
        }
    }
    levels.next().is_none()
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Top-level topic segment: the device attribute category.
///
/// The recognized set is exposed as associated constants, but any non-empty
/// segment is a valid domain. Whether a domain is *routable* is decided by
/// the operation registry, not by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(Cow<'static, str>);

impl Domain {
    pub const PERMISSION_STATE: Self = Self(Cow::Borrowed("PERMISSION_STATE"));
    pub const IR_STATE: Self = Self(Cow::Borrowed("IR_STATE"));
    pub const PASSWORD: Self = Self(Cow::Borrowed("PASSWORD"));
    pub const FREQUENCY: Self = Self(Cow::Borrowed("FREQUENCY"));
    pub const TEMPERATURE: Self = Self(Cow::Borrowed("TEMPERATURE"));
    pub const HUMIDITY: Self = Self(Cow::Borrowed("HUMIDITY"));
    pub const DEVICE: Self = Self(Cow::Borrowed("DEVICE"));
    pub const USER: Self = Self(Cow::Borrowed("USER"));

    /// Every domain the stock deployment understands.
    pub const KNOWN: [Self; 8] = [
        Self::PERMISSION_STATE,
        Self::IR_STATE,
        Self::PASSWORD,
        Self::FREQUENCY,
        Self::TEMPERATURE,
        Self::HUMIDITY,
        Self::DEVICE,
        Self::USER,
    ];

    /// Build a domain from an arbitrary segment.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedTopic`] when the segment is empty or
    /// contains `/`, `+` or `#`.
    pub fn new(name: impl Into<String>) -> Result<Self, DecodeError> {
        let name = name.into();
        if !is_valid_segment(&name) {
            return Err(DecodeError::malformed(name));
        }
        Ok(Self::KNOWN
            .into_iter()
            .find(|known| known.as_str() == name)
            .unwrap_or(Self(Cow::Owned(name))))
    }

    /// The wire token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the [`KNOWN`](Self::KNOWN) domains.
    #[must_use]
    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(self)
    }

    /// Broker filter matching every topic under this domain (`<domain>/#`).
    #[must_use]
    pub fn subscription_filter(&self) -> String {
        format!("{}{SEPARATOR}{WILDCARD}", self.0)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Domain> for String {
    fn from(value: Domain) -> Self {
        value.0.into_owned()
    }
}

// ---------------------------------------------------------------------------
// Subtopic / Operation / Route
// ---------------------------------------------------------------------------

/// Marker distinguishing command traffic from reply/state traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subtopic {
    #[serde(rename = "REQ")]
    Request,
    #[serde(rename = "RES")]
    Response,
}

impl Subtopic {
    /// The wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "REQ",
            Self::Response => "RES",
        }
    }
}

impl fmt::Display for Subtopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subtopic {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQ" => Ok(Self::Request),
            "RES" => Ok(Self::Response),
            other => Err(DecodeError::UnknownSubtopic(other.to_string())),
        }
    }
}

/// Action code carried by request topics.
///
/// `Crud` is routed like any other code; it carries no extra semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "R")]
    Read,
    #[serde(rename = "W")]
    Write,
    #[serde(rename = "D")]
    Delete,
    #[serde(rename = "CRUD")]
    Crud,
}

impl Operation {
    pub const ALL: [Self; 4] = [Self::Read, Self::Write, Self::Delete, Self::Crud];

    /// The wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "R",
            Self::Write => "W",
            Self::Delete => "D",
            Self::Crud => "CRUD",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownOperation(s.to_string()))
    }
}

/// Subtopic plus operation, with the "operation only on requests" rule
/// encoded in the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Request(Operation),
    Response,
}

impl Route {
    #[must_use]
    pub const fn subtopic(self) -> Subtopic {
        match self {
            Self::Request(_) => Subtopic::Request,
            Self::Response => Subtopic::Response,
        }
    }

    #[must_use]
    pub const fn operation(self) -> Option<Operation> {
        match self {
            Self::Request(op) => Some(op),
            Self::Response => None,
        }
    }

    /// Operation token as shown in audit records: the operation code for
    /// requests, `RES` for responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request(op) => op.as_str(),
            Self::Response => Subtopic::Response.as_str(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A decoded topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    domain: Domain,
    device_id: String,
    route: Route,
}

impl Address {
    /// Build an address, validating the device id segment.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedTopic`] when `device_id` is empty or
    /// contains `/`, `+` or `#`.
    pub fn new(
        domain: Domain,
        device_id: impl Into<String>,
        route: Route,
    ) -> Result<Self, DecodeError> {
        let device_id = device_id.into();
        if !is_valid_segment(&device_id) {
            return Err(DecodeError::malformed(format!(
                "{domain}{SEPARATOR}{}{SEPARATOR}{device_id}",
                route.subtopic()
            )));
        }
        Ok(Self {
            domain,
            device_id,
            route,
        })
    }

    /// Shorthand for a request address.
    ///
    /// # Errors
    ///
    /// See [`Address::new`].
    pub fn request(
        domain: Domain,
        device_id: impl Into<String>,
        operation: Operation,
    ) -> Result<Self, DecodeError> {
        Self::new(domain, device_id, Route::Request(operation))
    }

    /// Shorthand for a response address.
    ///
    /// # Errors
    ///
    /// See [`Address::new`].
    pub fn response(domain: Domain, device_id: impl Into<String>) -> Result<Self, DecodeError> {
        Self::new(domain, device_id, Route::Response)
    }

    /// The response address answering this one (same domain and device).
    #[must_use]
    pub fn reply(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            device_id: self.device_id.clone(),
            route: Route::Response,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.route
    }

    #[must_use]
    pub fn subtopic(&self) -> Subtopic {
        self.route.subtopic()
    }

    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        self.route.operation()
    }

    #[must_use]
    pub fn is_request(&self) -> bool {
        matches!(self.route, Route::Request(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.domain,
            self.route.subtopic(),
            self.device_id
        )?;
        if let Route::Request(op) = self.route {
            write!(f, "{SEPARATOR}{op}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = DecodeError;

    /// Decode a topic string.
    ///
    /// Segments past the operation of a request, and past the device id of a
    /// response, are ignored.
    fn from_str(topic: &str) -> Result<Self, Self::Err> {
        let mut segments = topic.split(SEPARATOR);
        let (Some(domain), Some(subtopic), Some(device_id)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(DecodeError::malformed(topic));
        };

        let domain = Domain::new(domain).map_err(|_| DecodeError::malformed(topic))?;
        let subtopic: Subtopic = subtopic.parse()?;
        if !is_valid_segment(device_id) {
            return Err(DecodeError::malformed(topic));
        }

        let route = match subtopic {
            Subtopic::Request => match segments.next() {
                None | Some("") => {
                    return Err(DecodeError::MissingOperation {
                        topic: topic.to_string(),
                    });
                }
                Some(op) => Route::Request(op.parse()?),
            },
            Subtopic::Response => Route::Response,
        };

        Ok(Self {
            domain,
            device_id: device_id.to_string(),
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn decode(topic: &str) -> Result<Address, DecodeError> {
        topic.parse()
    }

    #[test]
    fn should_decode_request_topic() {
        let address = decode("FREQUENCY/REQ/dev42/W").unwrap();
        assert_eq!(address.domain(), &Domain::FREQUENCY);
        assert_eq!(address.subtopic(), Subtopic::Request);
        assert_eq!(address.device_id(), "dev42");
        assert_eq!(address.operation(), Some(Operation::Write));
    }

    #[test]
    fn should_decode_every_operation_token() {
        for (token, op) in [
            ("R", Operation::Read),
            ("W", Operation::Write),
            ("D", Operation::Delete),
            ("CRUD", Operation::Crud),
        ] {
            let address = decode(&format!("USER/REQ/u1/{token}")).unwrap();
            assert_eq!(address.route(), Route::Request(op));
        }
    }

    #[test]
    fn should_fail_with_malformed_topic_when_empty() {
        assert!(matches!(
            decode(""),
            Err(DecodeError::MalformedTopic { .. })
        ));
    }

    #[test]
    fn should_fail_with_malformed_topic_when_single_segment() {
        assert!(matches!(
            decode("onlyonesegment"),
            Err(DecodeError::MalformedTopic { .. })
        ));
    }

    #[test]
    fn should_fail_with_malformed_topic_when_two_segments() {
        assert_eq!(
            decode("FREQUENCY/REQ"),
            Err(DecodeError::MalformedTopic {
                topic: "FREQUENCY/REQ".to_string()
            })
        );
    }

    #[test]
    fn should_fail_with_malformed_topic_when_device_id_is_empty() {
        assert!(matches!(
            decode("FREQUENCY/RES/"),
            Err(DecodeError::MalformedTopic { .. })
        ));
    }

    #[test]
    fn should_fail_with_malformed_topic_when_domain_is_empty() {
        assert!(matches!(
            decode("/RES/dev1"),
            Err(DecodeError::MalformedTopic { .. })
        ));
    }

    #[test]
    fn should_fail_with_unknown_subtopic() {
        assert_eq!(
            decode("TEMPERATURE/GET/dev1/R"),
            Err(DecodeError::UnknownSubtopic("GET".to_string()))
        );
    }

    #[test]
    fn should_fail_with_missing_operation() {
        assert!(matches!(
            decode("TEMPERATURE/REQ/dev1"),
            Err(DecodeError::MissingOperation { .. })
        ));
    }

    #[test]
    fn should_treat_empty_operation_segment_as_missing() {
        assert!(matches!(
            decode("TEMPERATURE/REQ/dev1/"),
            Err(DecodeError::MissingOperation { .. })
        ));
    }

    #[test]
    fn should_fail_with_unknown_operation() {
        assert_eq!(
            decode("TEMPERATURE/REQ/dev1/X"),
            Err(DecodeError::UnknownOperation("X".to_string()))
        );
    }

    #[test]
    fn should_ignore_trailing_segments_on_response() {
        let address = decode("TEMPERATURE/RES/dev1/ignored").unwrap();
        assert_eq!(address.route(), Route::Response);
        assert_eq!(address.operation(), None);
        assert_eq!(address.to_string(), "TEMPERATURE/RES/dev1");
    }

    #[test]
    fn should_accept_unrecognized_domain() {
        let address = decode("LIGHT/REQ/lamp/W").unwrap();
        assert_eq!(address.domain().as_str(), "LIGHT");
        assert!(!address.domain().is_known());
    }

    #[test]
    fn should_be_stable_through_decode_encode_decode() {
        for topic in [
            "FREQUENCY/REQ/dev42/W",
            "TEMPERATURE/RES/dev1/ignored",
            "USER/REQ/admin/CRUD/extra",
            "IR_STATE/RES/ir-7",
            "CUSTOM/REQ/x/D",
        ] {
            let first = decode(topic).unwrap();
            let second = decode(&first.to_string()).unwrap();
            assert_eq!(first, second, "topic {topic}");
        }
    }

    fn segment() -> impl Strategy<Value = String> {
        "[^/+#]{1,12}"
    }

    fn domain_token() -> impl Strategy<Value = String> {
        prop_oneof![
            proptest::sample::select(Domain::KNOWN.to_vec()).prop_map(|d| d.to_string()),
            segment(),
        ]
    }

    fn route() -> impl Strategy<Value = Route> {
        prop_oneof![
            proptest::sample::select(Operation::ALL.to_vec()).prop_map(Route::Request),
            Just(Route::Response),
        ]
    }

    proptest! {
        #[test]
        fn should_be_stable_for_generated_topics(
            domain in domain_token(),
            device_id in segment(),
            route in route(),
            trailing in proptest::option::of(segment()),
        ) {
            let mut topic = format!("{domain}/{}/{device_id}", route.subtopic());
            if let Some(op) = route.operation() {
                topic = format!("{topic}/{op}");
            }
            if let Some(extra) = trailing {
                topic = format!("{topic}/{extra}");
            }

            let first = decode(&topic).unwrap();
            prop_assert_eq!(first.domain().as_str(), domain.as_str());
            prop_assert_eq!(first.device_id(), device_id.as_str());
            prop_assert_eq!(first.route(), route);
            prop_assert_eq!(decode(&first.to_string()), Ok(first));
        }

        #[test]
        fn should_round_trip_constructed_addresses(
            domain in domain_token(),
            device_id in segment(),
            route in route(),
        ) {
            let domain = Domain::new(domain).unwrap();
            let address = Address::new(domain, device_id, route).unwrap();
            prop_assert_eq!(decode(&address.to_string()), Ok(address));
        }
    }

    #[test]
    fn should_reject_device_id_with_separator() {
        let result = Address::response(Domain::DEVICE, "a/b");
        assert!(matches!(result, Err(DecodeError::MalformedTopic { .. })));
    }

    #[test]
    fn should_reject_wildcards_in_domain() {
        assert!(Domain::new("TEMP+").is_err());
        assert!(Domain::new("#").is_err());
    }

    #[test]
    fn should_build_reply_on_same_device() {
        let request = Address::request(Domain::HUMIDITY, "h1", Operation::Read).unwrap();
        let reply = request.reply();
        assert_eq!(reply.to_string(), "HUMIDITY/RES/h1");
    }

    #[test]
    fn should_resolve_known_domain_to_constant() {
        let domain: Domain = "PASSWORD".parse().unwrap();
        assert_eq!(domain, Domain::PASSWORD);
        assert!(domain.is_known());
    }

    #[test]
    fn should_build_subscription_filter() {
        assert_eq!(Domain::TEMPERATURE.subscription_filter(), "TEMPERATURE/#");
    }

    #[test]
    fn should_serialize_tokens_as_wire_strings() {
        assert_eq!(serde_json::to_string(&Operation::Crud).unwrap(), "\"CRUD\"");
        assert_eq!(serde_json::to_string(&Subtopic::Request).unwrap(), "\"REQ\"");
        assert_eq!(serde_json::to_string(&Domain::USER).unwrap(), "\"USER\"");
    }

    #[test]
    fn should_reject_empty_domain_when_deserializing() {
        let result: Result<Domain, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn should_match_subscription_filters() {
        assert!(filter_matches("TEMPERATURE/#", "TEMPERATURE/RES/t1"));
        assert!(filter_matches("TEMPERATURE/#", "TEMPERATURE"));
        assert!(filter_matches("+/REQ/+/W", "FREQUENCY/REQ/dev42/W"));
        assert!(filter_matches("#", "DEVICE/RES/d1"));
        assert!(!filter_matches("TEMPERATURE/#", "HUMIDITY/RES/h1"));
        assert!(!filter_matches("+/RES", "DEVICE/RES/d1"));
        assert!(!filter_matches("DEVICE/RES/d1/x", "DEVICE/RES/d1"));
    }
}
