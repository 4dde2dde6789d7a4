//! The users table.

use crate::error::{AuthorityError, AuthorityResult};
use outbox_core::{
    NewRecord, Record, RecordId, RecordPatch, RemoteAuthority, RemoteError, RemoteResult,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A user as stored and served. Ids are numeric on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Sequential id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password, stored as given.
    pub password: String,
}

impl User {
    fn into_record(self) -> Record {
        Record::new(
            RecordId::from(self.id),
            NewRecord::new(self.name, self.email, self.password),
        )
    }
}

/// On-disk shape: `{ "users": [...], "next_id": n }`.
#[derive(Debug, Serialize, Deserialize)]
struct Table {
    users: Vec<User>,
    /// Id handed to the next created user. Tables written without it
    /// resume after the highest id present.
    #[serde(default)]
    next_id: u64,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            next_id: 1,
        }
    }
}

impl Table {
    /// Keeps `next_id` above every id in use.
    fn settle_next_id(&mut self) {
        let floor = self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        self.next_id = self.next_id.max(floor);
    }
}

/// The canonical users table.
///
/// Ids are assigned from a persisted counter and never reused, even after
/// the user holding the highest id is deleted. With a file,
/// the whole table is rewritten (temp file plus rename) after each change.
#[derive(Debug)]
pub struct Authority {
    table: RwLock<Table>,
    path: Option<PathBuf>,
}

impl Authority {
    /// Creates an empty authority held in memory.
    pub fn in_memory() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            path: None,
        }
    }

    /// Opens the authority backed by the JSON file at `path`.
    ///
    /// A missing file starts an empty table; it is created on first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> AuthorityResult<Self> {
        let mut table = if path.exists() {
            let text = fs::read_to_string(path)?;
            if text.trim().is_empty() {
                Table::default()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            Table::default()
        };
        table.settle_next_id();

        tracing::info!(path = %path.display(), users = table.users.len(), "opened users table");
        Ok(Self {
            table: RwLock::new(table),
            path: Some(path.to_path_buf()),
        })
    }

    /// Returns every user.
    pub fn list_users(&self) -> Vec<User> {
        self.table.read().users.clone()
    }

    /// Returns one user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId` or `UserNotFound`.
    pub fn get_user(&self, id: &str) -> AuthorityResult<User> {
        let id = parse_id(id)?;
        self.table
            .read()
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AuthorityError::UserNotFound)
    }

    /// Creates a user with the next id.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be saved; the user is then not
    /// created.
    pub fn create_user(&self, fields: NewRecord) -> AuthorityResult<User> {
        let mut table = self.table.write();
        let id = table.next_id;
        let user = User {
            id,
            name: fields.name,
            email: fields.email,
            password: fields.password,
        };

        table.users.push(user.clone());
        table.next_id = id + 1;
        if let Err(e) = self.save(&table) {
            table.users.pop();
            table.next_id = id;
            return Err(e);
        }

        tracing::debug!(id, "created user");
        Ok(user)
    }

    /// Merges `patch` into a user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId`, `UserNotFound`, or a save error (the user is
    /// then unchanged).
    pub fn update_user(&self, id: &str, patch: &RecordPatch) -> AuthorityResult<User> {
        let id = parse_id(id)?;
        let mut table = self.table.write();
        let index = table
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(AuthorityError::UserNotFound)?;

        let before = table.users[index].clone();
        let user = &mut table.users[index];
        if let Some(name) = &patch.name {
            user.name.clone_from(name);
        }
        if let Some(email) = &patch.email {
            user.email.clone_from(email);
        }
        if let Some(password) = &patch.password {
            user.password.clone_from(password);
        }
        let updated = user.clone();

        if let Err(e) = self.save(&table) {
            table.users[index] = before;
            return Err(e);
        }

        tracing::debug!(id, "updated user");
        Ok(updated)
    }

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidId`, `UserNotFound`, or a save error (the user is
    /// then kept).
    pub fn delete_user(&self, id: &str) -> AuthorityResult<()> {
        let id = parse_id(id)?;
        let mut table = self.table.write();
        let index = table
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(AuthorityError::UserNotFound)?;

        let removed = table.users.remove(index);
        if let Err(e) = self.save(&table) {
            table.users.insert(index, removed);
            return Err(e);
        }

        tracing::debug!(id, "deleted user");
        Ok(())
    }

    fn save(&self, table: &Table) -> AuthorityResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let json = serde_json::to_vec_pretty(table)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Default for Authority {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn parse_id(id: &str) -> AuthorityResult<u64> {
    id.trim()
        .parse()
        .map_err(|_| AuthorityError::InvalidId(id.to_string()))
}

fn remote_error(err: AuthorityError, id: Option<&RecordId>) -> RemoteError {
    match (id, err.is_not_found()) {
        (Some(id), true) => RemoteError::NotFound { id: id.clone() },
        _ => RemoteError::Rejected {
            status: err.status_code(),
            message: err.to_string(),
        },
    }
}

/// In-process access, used without the HTTP layer.
impl RemoteAuthority for Authority {
    fn list(&self) -> RemoteResult<Vec<Record>> {
        Ok(self.list_users().into_iter().map(User::into_record).collect())
    }

    fn create(&self, fields: &NewRecord) -> RemoteResult<Record> {
        self.create_user(fields.clone())
            .map(User::into_record)
            .map_err(|e| remote_error(e, None))
    }

    fn update(&self, id: &RecordId, patch: &RecordPatch) -> RemoteResult<Record> {
        self.update_user(id.as_str(), patch)
            .map(User::into_record)
            .map_err(|e| remote_error(e, Some(id)))
    }

    fn delete(&self, id: &RecordId) -> RemoteResult<()> {
        self.delete_user(id.as_str())
            .map_err(|e| remote_error(e, Some(id)))
    }
}
