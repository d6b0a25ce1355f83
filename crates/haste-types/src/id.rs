use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::TypeError;
use crate::names::{validate_tag, validate_uid, IDENTIFIER_SEPARATOR};

/// Tag of the well-known root object every store carries.
pub const ROOT_TAG: &str = "Object";

/// Sentinel uid of the well-known root object.
pub const ROOT_UID: &str = "1";

/// Canonical identifier for a Proto: `"{tag}-{uid}"`.
///
/// The tag is a category label and is not unique; the uid is generated and
/// unique per store; the combination names exactly one Proto and exactly one
/// persisted record. An identifier is fixed at construction and never
/// recomputed for the lifetime of the object.
///
/// Parsing splits at the *first* separator, so the uid may itself contain
/// hyphens (uuid v7 does) while tags may not — see [`crate::names`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtoId {
    tag: String,
    uid: String,
}

impl ProtoId {
    /// Create an identifier from an explicit tag and uid.
    pub fn new(tag: &str, uid: &str) -> Result<Self, TypeError> {
        validate_tag(tag)?;
        validate_uid(uid)?;
        Ok(Self {
            tag: tag.to_string(),
            uid: uid.to_string(),
        })
    }

    /// Create an identifier for `tag` with a freshly generated uid.
    ///
    /// Uids are uuid v7, so identifiers generated by one process sort
    /// roughly by creation time.
    pub fn generate(tag: &str) -> Result<Self, TypeError> {
        validate_tag(tag)?;
        Ok(Self {
            tag: tag.to_string(),
            uid: Uuid::now_v7().to_string(),
        })
    }

    /// The identifier of the well-known root object, `Object-1`.
    pub fn root() -> Self {
        Self {
            tag: ROOT_TAG.to_string(),
            uid: ROOT_UID.to_string(),
        }
    }

    /// Parse an identifier string of the form `tag-uid`.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let Some((tag, uid)) = input.split_once(IDENTIFIER_SEPARATOR) else {
            return Err(TypeError::InvalidIdentifier {
                input: input.to_string(),
                reason: format!("missing {IDENTIFIER_SEPARATOR:?} separator"),
            });
        };
        Self::new(tag, uid)
    }

    /// The category label component.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The unique component.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns `true` if this is the root identifier.
    pub fn is_root(&self) -> bool {
        self.tag == ROOT_TAG && self.uid == ROOT_UID
    }
}

impl fmt::Display for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.tag, IDENTIFIER_SEPARATOR, self.uid)
    }
}

impl fmt::Debug for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtoId({self})")
    }
}

impl FromStr for ProtoId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ProtoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProtoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
