//! Typed contents of a card
//!
//! [`CardDetails::parse`] turns the identity object read from a card into a
//! role-tagged value. Unprogrammed and malformed cards are a normal operating
//! condition, so parsing returns `None` instead of an error and never panics.

use iso7816_tlv::ber::{Tag, Tlv, Value};
use serde::Serialize;
use tracing::debug;

use crate::constants::tags;
use crate::user::{ElectionManagerUser, PollWorkerUser, SystemAdministratorUser, User, UserRole};
use crate::Result;

/// What is programmed on the card in the reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum CardDetails {
    /// A system administrator card
    SystemAdministrator {
        /// Card holder
        user: SystemAdministratorUser,
        /// Wrong PIN entries recorded by the card
        num_incorrect_pin_attempts: u8,
    },
    /// An election manager card
    ElectionManager {
        /// Card holder
        user: ElectionManagerUser,
        /// Wrong PIN entries recorded by the card
        num_incorrect_pin_attempts: u8,
    },
    /// A poll worker card
    PollWorker {
        /// Card holder
        user: PollWorkerUser,
        /// Whether the card was programmed with a PIN
        has_pin: bool,
        /// Wrong PIN entries recorded by the card
        num_incorrect_pin_attempts: u8,
    },
}

impl CardDetails {
    /// Build details for `user`
    ///
    /// `has_pin` only matters for poll workers; the other roles always have one.
    pub fn new(user: User, has_pin: bool, num_incorrect_pin_attempts: u8) -> Self {
        match user {
            User::SystemAdministrator(user) => Self::SystemAdministrator {
                user,
                num_incorrect_pin_attempts,
            },
            User::ElectionManager(user) => Self::ElectionManager {
                user,
                num_incorrect_pin_attempts,
            },
            User::PollWorker(user) => Self::PollWorker {
                user,
                has_pin,
                num_incorrect_pin_attempts,
            },
        }
    }

    /// The card holder
    pub fn user(&self) -> User {
        match self {
            Self::SystemAdministrator { user, .. } => User::SystemAdministrator(user.clone()),
            Self::ElectionManager { user, .. } => User::ElectionManager(user.clone()),
            Self::PollWorker { user, .. } => User::PollWorker(user.clone()),
        }
    }

    /// Role of the card holder
    pub const fn role(&self) -> UserRole {
        match self {
            Self::SystemAdministrator { .. } => UserRole::SystemAdministrator,
            Self::ElectionManager { .. } => UserRole::ElectionManager,
            Self::PollWorker { .. } => UserRole::PollWorker,
        }
    }

    /// Wrong PIN entries recorded by the card
    pub const fn num_incorrect_pin_attempts(&self) -> u8 {
        match self {
            Self::SystemAdministrator {
                num_incorrect_pin_attempts,
                ..
            }
            | Self::ElectionManager {
                num_incorrect_pin_attempts,
                ..
            }
            | Self::PollWorker {
                num_incorrect_pin_attempts,
                ..
            } => *num_incorrect_pin_attempts,
        }
    }

    /// Whether logging in with this card requires a PIN
    pub const fn requires_pin(&self) -> bool {
        match self {
            Self::SystemAdministrator { .. } | Self::ElectionManager { .. } => true,
            Self::PollWorker { has_pin, .. } => *has_pin,
        }
    }

    /// Whether this is a system administrator card
    pub const fn is_system_administrator(&self) -> bool {
        matches!(self, Self::SystemAdministrator { .. })
    }

    /// Whether this is an election manager card
    pub const fn is_election_manager(&self) -> bool {
        matches!(self, Self::ElectionManager { .. })
    }

    /// Whether this is a poll worker card
    pub const fn is_poll_worker(&self) -> bool {
        matches!(self, Self::PollWorker { .. })
    }

    /// Parse an identity object
    ///
    /// Returns `None` for an empty (unprogrammed) object and for anything
    /// that is not a well-formed identity.
    pub fn parse(identity: &[u8], num_incorrect_pin_attempts: u8) -> Option<Self> {
        if identity.is_empty() {
            return None;
        }
        match RawIdentity::parse(identity) {
            Ok(raw) => raw.into_details(num_incorrect_pin_attempts),
            Err(e) => {
                debug!("Unparsable identity object: {e}");
                None
            }
        }
    }

    /// Encode the identity object for this card
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_identity(&self.user(), self.requires_pin())
    }
}

/// Encode the identity object for `user`
pub fn encode_identity(user: &User, has_pin: bool) -> Result<Vec<u8>> {
    let mut out = primitive(tags::USER_ROLE, user.role().as_str().as_bytes())?;
    out.extend(primitive(tags::USER_ID, user.user_id().as_bytes())?);
    if let Some(election_hash) = user.election_hash() {
        out.extend(primitive(tags::ELECTION_HASH, election_hash.as_bytes())?);
    }
    if let User::PollWorker(_) = user {
        out.extend(primitive(tags::HAS_PIN, &[u8::from(has_pin)])?);
    }
    Ok(out)
}

fn primitive(tag: u8, value: &[u8]) -> Result<Vec<u8>> {
    Ok(Tlv::new(Tag::try_from(tag)?, Value::Primitive(value.to_vec()))?.to_vec())
}

/// Fields of an identity object before role-specific checks
#[derive(Debug, Default)]
struct RawIdentity {
    role: Option<String>,
    user_id: Option<String>,
    election_hash: Option<String>,
    has_pin: Option<bool>,
}

impl RawIdentity {
    fn parse(mut input: &[u8]) -> Result<Self> {
        let mut raw = Self::default();

        while !input.is_empty() {
            let (tlv, rest) = Tlv::parse(input);
            let tlv = tlv?;
            input = rest;

            let Value::Primitive(value) = tlv.value() else {
                return Err(crate::Error::InvalidData("Constructed TLV in identity"));
            };
            let tag = tlv.tag();

            let slot = if tag == &Tag::try_from(tags::USER_ROLE)? {
                &mut raw.role
            } else if tag == &Tag::try_from(tags::USER_ID)? {
                &mut raw.user_id
            } else if tag == &Tag::try_from(tags::ELECTION_HASH)? {
                &mut raw.election_hash
            } else if tag == &Tag::try_from(tags::HAS_PIN)? {
                if raw.has_pin.is_some() {
                    return Err(crate::Error::InvalidData("Duplicate field in identity"));
                }
                raw.has_pin = Some(match value.as_slice() {
                    [0] => false,
                    [1] => true,
                    _ => return Err(crate::Error::InvalidData("Invalid has-PIN flag")),
                });
                continue;
            } else {
                return Err(crate::Error::InvalidData("Unknown tag in identity"));
            };

            if slot.is_some() {
                return Err(crate::Error::InvalidData("Duplicate field in identity"));
            }
            let text = std::str::from_utf8(value)
                .map_err(|_| crate::Error::InvalidData("Identity field is not UTF-8"))?;
            *slot = Some(text.to_string());
        }

        Ok(raw)
    }

    fn into_details(self, num_incorrect_pin_attempts: u8) -> Option<CardDetails> {
        let role = UserRole::from_wire(self.role.as_deref()?)?;
        let user_id = self.user_id.filter(|id| !id.is_empty())?;

        let details = match role {
            UserRole::SystemAdministrator => {
                if self.election_hash.is_some() || self.has_pin.is_some() {
                    return None;
                }
                CardDetails::SystemAdministrator {
                    user: SystemAdministratorUser { user_id },
                    num_incorrect_pin_attempts,
                }
            }
            UserRole::ElectionManager => {
                if self.has_pin.is_some() {
                    return None;
                }
                CardDetails::ElectionManager {
                    user: ElectionManagerUser {
                        user_id,
                        election_hash: valid_election_hash(self.election_hash)?,
                    },
                    num_incorrect_pin_attempts,
                }
            }
            UserRole::PollWorker => CardDetails::PollWorker {
                user: PollWorkerUser {
                    user_id,
                    election_hash: valid_election_hash(self.election_hash)?,
                },
                has_pin: self.has_pin.unwrap_or(false),
                num_incorrect_pin_attempts,
            },
        };
        Some(details)
    }
}

fn valid_election_hash(hash: Option<String>) -> Option<String> {
    hash.filter(|h| !h.is_empty() && h.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn election_manager() -> User {
        User::ElectionManager(ElectionManagerUser {
            user_id: "em-1".into(),
            election_hash: "ABC123".into(),
        })
    }

    fn poll_worker() -> User {
        User::PollWorker(PollWorkerUser {
            user_id: "pw-1".into(),
            election_hash: "ABC123".into(),
        })
    }

    #[test]
    fn test_parse_encoded_identity() {
        let encoded = encode_identity(&election_manager(), true).unwrap();
        let details = CardDetails::parse(&encoded, 2).unwrap();

        assert!(details.is_election_manager());
        assert!(details.requires_pin());
        assert_eq!(details.num_incorrect_pin_attempts(), 2);
        assert_eq!(details.user(), election_manager());
    }

    #[test]
    fn test_poll_worker_pin_flag() {
        let without = CardDetails::parse(&encode_identity(&poll_worker(), false).unwrap(), 0);
        let with = CardDetails::parse(&encode_identity(&poll_worker(), true).unwrap(), 0);

        assert!(!without.unwrap().requires_pin());
        assert!(with.unwrap().requires_pin());
    }

    #[test]
    fn test_system_administrator_always_requires_pin() {
        let user = User::SystemAdministrator(SystemAdministratorUser {
            user_id: "sa-1".into(),
        });
        let details = CardDetails::parse(&encode_identity(&user, false).unwrap(), 0).unwrap();
        assert!(details.is_system_administrator());
        assert!(details.requires_pin());
    }

    #[test]
    fn test_unprogrammed_card() {
        assert_eq!(CardDetails::parse(&[], 0), None);
    }

    #[test]
    fn test_rejects_malformed_identities() {
        // Truncated TLV
        assert_eq!(CardDetails::parse(&[0x80, 0x10, b'a'], 0), None);
        // Unknown role
        let bogus = primitive(tags::USER_ROLE, b"vendor").unwrap();
        assert_eq!(CardDetails::parse(&bogus, 0), None);
        // Election manager without an election
        let mut missing_hash = primitive(tags::USER_ROLE, b"election_manager").unwrap();
        missing_hash.extend(primitive(tags::USER_ID, b"em-1").unwrap());
        assert_eq!(CardDetails::parse(&missing_hash, 0), None);
        // Duplicate role
        let mut duplicate = encode_identity(&election_manager(), true).unwrap();
        duplicate.extend(primitive(tags::USER_ROLE, b"system_administrator").unwrap());
        assert_eq!(CardDetails::parse(&duplicate, 0), None);
        // Invalid has-PIN flag
        let mut bad_flag = primitive(tags::USER_ROLE, b"poll_worker").unwrap();
        bad_flag.extend(primitive(tags::USER_ID, b"pw-1").unwrap());
        bad_flag.extend(primitive(tags::ELECTION_HASH, b"ABC123").unwrap());
        bad_flag.extend(primitive(tags::HAS_PIN, &[7]).unwrap());
        assert_eq!(CardDetails::parse(&bad_flag, 0), None);
    }

    proptest! {
        #[test]
        fn parse_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = CardDetails::parse(&bytes, 0);
        }
    }
}
