//! Core type definitions: records, mutations and their identifiers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque identifier of a [`Record`].
///
/// Local records get a random UUID at creation; records learned from the
/// remote authority keep the id the authority assigned. The authority may
/// send ids as JSON numbers, so deserialization accepts numbers as well
/// as strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh, random local id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

/// The fields of a record, without an id. Body of a remote create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password, stored as given.
    pub password: String,
}

impl NewRecord {
    /// Creates a new set of record fields.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Returns the first required field that is empty, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// A user profile, the unit of CRUD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identity, immutable after creation.
    pub id: RecordId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password, stored as given.
    pub password: String,
}

impl Record {
    /// Builds a record from an id and its fields.
    #[must_use]
    pub fn new(id: RecordId, fields: NewRecord) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            password: fields.password,
        }
    }

    /// Returns the record's fields without the id.
    #[must_use]
    pub fn fields(&self) -> NewRecord {
        NewRecord {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Merges the set fields of `patch` into this record.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(email) = &patch.email {
            self.email.clone_from(email);
        }
        if let Some(password) = &patch.password {
            self.password.clone_from(password);
        }
    }
}

/// A partial record: only the fields that are `Some` change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl RecordPatch {
    /// A patch that only renames.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none()
    }

    /// Returns the first field that is set but blank.
    #[must_use]
    pub fn blank_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
        ]
        .into_iter()
        .find(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
        .map(|(field, _)| field)
    }
}

/// Identifier of a [`Mutation`]. A separate namespace from [`RecordId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Creates a fresh, random mutation id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mut:{}", self.0)
    }
}

/// The kind of remote operation a mutation replays as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `POST /users`
    Create,
    /// `PUT /users/{id}`
    Update,
    /// `DELETE /users/{id}`
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        })
    }
}

/// Lifecycle status of a queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationStatus {
    /// Waiting for the remote authority to confirm it.
    Pending,
}

/// What a mutation carries, keyed by its method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "payload", rename_all = "UPPERCASE")]
pub enum Payload {
    /// The full record as created locally.
    Create(Record),
    /// A partial record for an existing id.
    Update {
        /// Local id of the record.
        id: RecordId,
        /// Fields to change.
        patch: RecordPatch,
    },
    /// Only the id of the removed record.
    Delete {
        /// Local id of the record.
        id: RecordId,
    },
}

impl Payload {
    /// Returns the method this payload replays as.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::Create(_) => Method::Create,
            Self::Update { .. } => Method::Update,
            Self::Delete { .. } => Method::Delete,
        }
    }

    /// Returns the local id of the record this payload targets.
    #[must_use]
    pub fn record_id(&self) -> &RecordId {
        match self {
            Self::Create(record) => &record.id,
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// A create, update or delete not yet confirmed by the remote authority.
///
/// Mutations are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    /// Unique id, used to remove the mutation once confirmed.
    pub id: MutationId,
    /// What to replay.
    #[serde(flatten)]
    pub payload: Payload,
    /// Always [`MutationStatus::Pending`] while queued.
    pub status: MutationStatus,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

impl Mutation {
    /// Creates a pending mutation with a fresh id.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            id: MutationId::generate(),
            payload,
            status: MutationStatus::Pending,
            created_at_ms,
        }
    }

    /// A mutation creating `record`.
    #[must_use]
    pub fn create(record: Record) -> Self {
        Self::new(Payload::Create(record))
    }

    /// A mutation applying `patch` to record `id`.
    #[must_use]
    pub fn update(id: RecordId, patch: RecordPatch) -> Self {
        Self::new(Payload::Update { id, patch })
    }

    /// A mutation deleting record `id`.
    #[must_use]
    pub fn delete(id: RecordId) -> Self {
        Self::new(Payload::Delete { id })
    }

    /// Returns the method this mutation replays as.
    #[must_use]
    pub fn method(&self) -> Method {
        self.payload.method()
    }

    /// Returns the local id of the targeted record.
    #[must_use]
    pub fn record_id(&self) -> &RecordId {
        self.payload.record_id()
    }
}
