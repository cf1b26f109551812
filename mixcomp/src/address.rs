//! Mixin settlement addresses.
//!
//! A [`MixAddress`] names a set of owners and how many of them must sign to
//! spend. It is how a payment is addressed both to a single user (one UUID
//! member, threshold 1) and to the Computer MTG (its node members and
//! threshold, read from the service descriptor).
//!
//! # Format
//!
//! ```text
//! binary  = version(u8) ‖ threshold(u8) ‖ count(u8) ‖ members
//! string  = "MIX" ‖ base58(binary ‖ sha3_256("MIX" ‖ binary)[0..4])
//! ```
//!
//! Members are either all UUIDs (16 bytes each) or all `XIN…` main-network
//! addresses (spend key ‖ view key, 64 bytes each).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AddressError;
use crate::sha3_256;

/// Prefix of a settlement address string.
pub const MIX_ADDRESS_PREFIX: &str = "MIX";

/// The only settlement address format version in use.
pub const MIX_ADDRESS_VERSION: u8 = 2;

/// Prefix of a main-network (`XIN`) address string.
pub const XIN_ADDRESS_PREFIX: &str = "XIN";

const CHECKSUM_LEN: usize = 4;
const UUID_LEN: usize = 16;
const XIN_KEYS_LEN: usize = 64;

/// A main-network address: public spend key and public view key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct XinAddress {
    spend: [u8; 32],
    view: [u8; 32],
}

impl XinAddress {
    /// Creates an address from its two public keys.
    #[must_use]
    pub const fn new(spend: [u8; 32], view: [u8; 32]) -> Self {
        Self { spend, view }
    }

    /// Returns `spend ‖ view`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; XIN_KEYS_LEN] {
        let mut out = [0u8; XIN_KEYS_LEN];
        out[..32].copy_from_slice(&self.spend);
        out[32..].copy_from_slice(&self.view);
        out
    }

    fn from_keys(keys: &[u8]) -> Option<Self> {
        let spend = keys.get(..32)?.try_into().ok()?;
        let view = keys.get(32..XIN_KEYS_LEN)?.try_into().ok()?;
        Some(Self { spend, view })
    }
}

impl fmt::Debug for XinAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "XinAddress({self})")
    }
}

impl Display for XinAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let keys = self.to_bytes();
        let checksum = sha3_256(&[XIN_ADDRESS_PREFIX.as_bytes(), &keys]);
        let mut data = keys.to_vec();
        data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        write!(f, "{XIN_ADDRESS_PREFIX}{}", bs58::encode(data).into_string())
    }
}

impl FromStr for XinAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(XIN_ADDRESS_PREFIX)
            .ok_or(AddressError::InvalidPrefix(XIN_ADDRESS_PREFIX))?;
        let data = bs58::decode(body)
            .into_vec()
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
        if data.len() != XIN_KEYS_LEN + CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(data.len()));
        }
        let (keys, checksum) = data.split_at(XIN_KEYS_LEN);
        let expected = sha3_256(&[XIN_ADDRESS_PREFIX.as_bytes(), keys]);
        if checksum != &expected[..CHECKSUM_LEN] {
            return Err(AddressError::InvalidChecksum);
        }
        Self::from_keys(keys).ok_or(AddressError::InvalidLength(data.len()))
    }
}

/// One owner of a settlement address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    /// A Mixin user or app, by UUID.
    User(Uuid),
    /// A main-network key holder.
    Xin(XinAddress),
}

impl FromStr for Member {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(XIN_ADDRESS_PREFIX) {
            return s
                .parse()
                .map(Self::Xin)
                .map_err(|_| AddressError::InvalidMember(s.to_owned()));
        }
        Uuid::parse_str(s)
            .map(Self::User)
            .map_err(|_| AddressError::InvalidMember(s.to_owned()))
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::Xin(addr) => write!(f, "{addr}"),
        }
    }
}

/// A settlement address: members plus signing threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MixAddress {
    threshold: u8,
    members: Vec<Member>,
}

impl MixAddress {
    /// Creates a settlement address, enforcing `1 ≤ threshold ≤ members`,
    /// unique members and a single member kind.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if any of these invariants does not hold.
    pub fn new(members: Vec<Member>, threshold: i64) -> Result<Self, AddressError> {
        if members.is_empty() {
            return Err(AddressError::NoMembers);
        }
        if members.len() > usize::from(u8::MAX) {
            return Err(AddressError::TooManyMembers(members.len()));
        }
        let threshold_u8 = u8::try_from(threshold)
            .ok()
            .filter(|t| *t >= 1 && usize::from(*t) <= members.len())
            .ok_or(AddressError::InvalidThreshold {
                threshold,
                members: members.len(),
            })?;
        let users = members.iter().filter(|m| matches!(m, Member::User(_))).count();
        if users != 0 && users != members.len() {
            return Err(AddressError::MixedMembers);
        }
        let mut seen = HashSet::with_capacity(members.len());
        for member in &members {
            if !seen.insert(member) {
                return Err(AddressError::DuplicateMember(member.to_string()));
            }
        }
        Ok(Self {
            threshold: threshold_u8,
            members,
        })
    }

    /// The address of a single user, spendable by that user alone.
    #[must_use]
    pub fn single_user(user_id: Uuid) -> Self {
        Self {
            threshold: 1,
            members: vec![Member::User(user_id)],
        }
    }

    /// Derives an address from member strings as the Computer API returns them.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if a member is malformed or the threshold is
    /// out of range.
    pub fn from_member_strings<S: AsRef<str>>(
        members: &[S],
        threshold: i64,
    ) -> Result<Self, AddressError> {
        let members = members
            .iter()
            .map(|m| m.as_ref().parse())
            .collect::<Result<Vec<Member>, _>>()?;
        Self::new(members, threshold)
    }

    /// Returns the format version.
    #[must_use]
    pub const fn version(&self) -> u8 {
        MIX_ADDRESS_VERSION
    }

    /// Returns the signing threshold.
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Returns the members in address order.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Encodes the binary form (no prefix, no checksum).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.members.len() * XIN_KEYS_LEN);
        out.push(MIX_ADDRESS_VERSION);
        out.push(self.threshold);
        #[allow(clippy::cast_possible_truncation)]
        out.push(self.members.len() as u8);
        for member in &self.members {
            match member {
                Member::User(id) => out.extend_from_slice(id.as_bytes()),
                Member::Xin(addr) => out.extend_from_slice(&addr.to_bytes()),
            }
        }
        out
    }

    /// Decodes the binary form produced by [`MixAddress::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if the bytes are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let [version, threshold, count, rest @ ..] = bytes else {
            return Err(AddressError::InvalidLength(bytes.len()));
        };
        if *version != MIX_ADDRESS_VERSION {
            return Err(AddressError::UnsupportedVersion(*version));
        }
        let count = usize::from(*count);
        let members = if rest.len() == count * UUID_LEN {
            rest.chunks_exact(UUID_LEN)
                .map(|c| Uuid::from_slice(c).map(Member::User))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| AddressError::InvalidLength(bytes.len()))?
        } else if rest.len() == count * XIN_KEYS_LEN {
            rest.chunks_exact(XIN_KEYS_LEN)
                .map(|c| XinAddress::from_keys(c).map(Member::Xin))
                .collect::<Option<Vec<_>>>()
                .ok_or(AddressError::InvalidLength(bytes.len()))?
        } else {
            return Err(AddressError::InvalidLength(bytes.len()));
        };
        Self::new(members, i64::from(*threshold))
    }
}

impl Display for MixAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut data = self.to_bytes();
        let checksum = sha3_256(&[MIX_ADDRESS_PREFIX.as_bytes(), &data]);
        data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        write!(f, "{MIX_ADDRESS_PREFIX}{}", bs58::encode(data).into_string())
    }
}

impl FromStr for MixAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(MIX_ADDRESS_PREFIX)
            .ok_or(AddressError::InvalidPrefix(MIX_ADDRESS_PREFIX))?;
        let data = bs58::decode(body)
            .into_vec()
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
        if data.len() <= CHECKSUM_LEN {
            return Err(AddressError::InvalidLength(data.len()));
        }
        let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
        let expected = sha3_256(&[MIX_ADDRESS_PREFIX.as_bytes(), payload]);
        if checksum != &expected[..CHECKSUM_LEN] {
            return Err(AddressError::InvalidChecksum);
        }
        Self::from_bytes(payload)
    }
}

impl Serialize for MixAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MixAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d";

    fn user() -> Uuid {
        Uuid::parse_str(USER).unwrap()
    }

    fn nodes() -> Vec<String> {
        vec![
            "a2a1e1a5-4e22-4c42-b8c3-5a1f2b9e0d01".to_owned(),
            "b3b2f2b6-5f33-4d53-89d4-6b2a3c0f1e12".to_owned(),
            "c4c3a3c7-6a44-4e64-9ae5-7c3b4d1a2f23".to_owned(),
        ]
    }

    #[test]
    fn test_single_user_is_deterministic() {
        let a = MixAddress::single_user(user()).to_string();
        let b = MixAddress::single_user(user()).to_string();
        assert_eq!(a, b);
        assert!(a.starts_with("MIX"));
    }

    #[test]
    fn test_single_user_matches_member_strings() {
        let derived = MixAddress::from_member_strings(&[USER], 1).unwrap();
        assert_eq!(derived, MixAddress::single_user(user()));
    }

    #[test]
    fn test_binary_layout() {
        let bytes = MixAddress::single_user(user()).to_bytes();
        assert_eq!(&bytes[..3], &[2, 1, 1]);
        assert_eq!(&bytes[3..], user().as_bytes());
    }

    #[test]
    fn test_string_roundtrip_with_threshold() {
        let addr = MixAddress::from_member_strings(&nodes(), 2).unwrap();
        let parsed: MixAddress = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(parsed.threshold(), 2);
        assert_eq!(parsed.members().len(), 3);
    }

    #[test]
    fn test_member_order_changes_address() {
        let mut reversed = nodes();
        reversed.reverse();
        let a = MixAddress::from_member_strings(&nodes(), 2).unwrap();
        let b = MixAddress::from_member_strings(&reversed, 2).unwrap();
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_threshold_above_member_count_rejected() {
        let err = MixAddress::from_member_strings(&nodes(), 4).unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidThreshold {
                threshold: 4,
                members: 3
            }
        );
    }

    #[test]
    fn test_zero_and_negative_threshold_rejected() {
        assert!(MixAddress::from_member_strings(&nodes(), 0).is_err());
        assert!(MixAddress::from_member_strings(&nodes(), -1).is_err());
    }

    #[test]
    fn test_duplicate_members_rejected() {
        let members = [USER, USER];
        assert!(matches!(
            MixAddress::from_member_strings(&members, 1),
            Err(AddressError::DuplicateMember(_))
        ));
    }

    #[test]
    fn test_malformed_member_rejected() {
        assert_eq!(
            MixAddress::from_member_strings(&["not-a-uuid"], 1),
            Err(AddressError::InvalidMember("not-a-uuid".to_owned()))
        );
    }

    #[test]
    fn test_empty_members_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(
            MixAddress::from_member_strings(&empty, 1),
            Err(AddressError::NoMembers)
        );
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        let addr = MixAddress::single_user(user()).to_string();
        let mut data = bs58::decode(&addr[3..]).into_vec().unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xff;
        let corrupted = format!("MIX{}", bs58::encode(data).into_string());
        assert_eq!(
            corrupted.parse::<MixAddress>(),
            Err(AddressError::InvalidChecksum)
        );
    }

    #[test]
    fn test_xin_members() {
        let a = XinAddress::new([1; 32], [2; 32]);
        let b = XinAddress::new([3; 32], [4; 32]);
        let text = a.to_string();
        assert!(text.starts_with("XIN"));
        assert_eq!(text.parse::<XinAddress>().unwrap(), a);

        let members = [a.to_string(), b.to_string()];
        let addr = MixAddress::from_member_strings(&members, 1).unwrap();
        let parsed: MixAddress = addr.to_string().parse().unwrap();
        assert_eq!(parsed.members(), &[Member::Xin(a), Member::Xin(b)]);
    }

    #[test]
    fn test_mixed_members_rejected() {
        let xin = XinAddress::new([1; 32], [2; 32]).to_string();
        let members = [USER.to_owned(), xin];
        assert_eq!(
            MixAddress::from_member_strings(&members, 1),
            Err(AddressError::MixedMembers)
        );
    }
}
