use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::FormFlashError;
use crate::paths::{flash_dir, index_path};
use crate::registry::FlashFileMap;
use crate::schema::{FileRegistry, FlashDocument, Timestamps, UserInfo};

/// Draft state for one in-progress form within one session.
///
/// Construction loads state from storage; mutators touch memory only;
/// [`save`](Self::save) commits, [`delete`](Self::delete) purges. An
/// instance with an empty session id never reads or writes storage.
///
/// One instance per request context; concurrent saves against the same
/// (session, unique id) pair are last-writer-wins.
pub struct FormFlash {
    pub(crate) tmp_root: PathBuf,
    pub(crate) session_id: String,
    pub(crate) unique_id: String,
    pub(crate) form_name: Option<String>,
    pub(crate) url: String,
    pub(crate) user: Option<UserInfo>,
    pub(crate) created: i64,
    pub(crate) updated: i64,
    pub(crate) data: Option<Value>,
    pub(crate) files: FileRegistry,
    pub(crate) handles: HashMap<String, FlashFileMap>,
    pub(crate) exists: bool,
}

impl FormFlash {
    /// Opens the draft for `(session_id, unique_id)`, loading the index
    /// document when one is on disk. A missing or corrupt index degrades to
    /// a fresh draft; it is never an error.
    #[must_use]
    pub fn open(
        tmp_root: impl Into<PathBuf>,
        session_id: impl Into<String>,
        unique_id: impl Into<String>,
        form_name: Option<&str>,
    ) -> Self {
        let tmp_root = tmp_root.into();
        let session_id = session_id.into();
        let unique_id = unique_id.into();

        let index = flash_dir(&tmp_root, &session_id, &unique_id).map(|dir| index_path(&dir));
        let exists = index.as_deref().is_some_and(Path::is_file);
        let document = if exists {
            index.as_deref().and_then(read_document)
        } else {
            None
        };

        let now = unix_now();
        let mut flash = Self {
            tmp_root,
            session_id,
            unique_id,
            form_name: form_name.map(str::to_string),
            url: String::new(),
            user: None,
            created: now,
            updated: now,
            data: None,
            files: FileRegistry::new(),
            handles: HashMap::new(),
            exists,
        };

        if let Some(document) = document {
            if document.form.is_some() {
                flash.form_name = document.form;
            }
            flash.url = document.url;
            flash.user = document.user;
            flash.updated = document.timestamps.map_or(now, |stamps| stamps.updated);
            flash.created = document
                .timestamps
                .map_or(flash.updated, |stamps| stamps.created);
            flash.data = document.data;
            flash.files = document.files;
        }

        flash
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    #[must_use]
    pub fn form_name(&self) -> Option<&str> {
        self.form_name.as_deref()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.username.as_deref())
    }

    #[must_use]
    pub fn user_email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.email.as_deref())
    }

    #[must_use]
    pub fn created_timestamp(&self) -> i64 {
        self.created
    }

    #[must_use]
    pub fn updated_timestamp(&self) -> i64 {
        self.updated
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Option<Value>) {
        self.data = data;
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn set_user_name(&mut self, username: Option<String>) {
        self.user.get_or_insert_with(UserInfo::default).username = username;
    }

    pub fn set_user_email(&mut self, email: Option<String>) {
        self.user.get_or_insert_with(UserInfo::default).email = email;
    }

    /// True iff a committed index document is currently on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Flash directory for this draft, `None` when the session id is empty.
    #[must_use]
    pub fn tmp_dir(&self) -> Option<PathBuf> {
        flash_dir(&self.tmp_root, &self.session_id, &self.unique_id)
    }

    /// Commits the draft. A draft with data or registered files is written;
    /// an empty draft is never persisted, and saving an emptied draft over a
    /// committed one deletes it instead.
    pub fn save(&mut self) -> Result<(), FormFlashError> {
        let Some(dir) = self.tmp_dir() else {
            return Ok(());
        };

        if self.has_data() || !self.files.is_empty() {
            let path = index_path(&dir);
            fs::create_dir_all(&dir)
                .map_err(|source| FormFlashError::io("creating flash directory", &dir, source))?;

            let payload = serde_json::to_vec_pretty(&self.to_document())
                .map_err(|source| FormFlashError::serialize(&path, source))?;
            fs::write(&path, payload)
                .map_err(|source| FormFlashError::io("writing flash index", &path, source))?;

            self.exists = true;
            return Ok(());
        }

        if self.exists {
            return self.delete();
        }

        Ok(())
    }

    /// Purges the draft: removes the flash directory (index plus every moved
    /// upload) and clears the in-memory registry. Idempotent.
    pub fn delete(&mut self) -> Result<(), FormFlashError> {
        if let Some(dir) = self.tmp_dir() {
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(source) if source.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(FormFlashError::io("removing flash directory", &dir, source));
                }
            }

            self.files.clear();
            self.handles.clear();
            self.exists = false;
        }

        Ok(())
    }

    /// Serializes the draft to its persisted document shape. `updated` is
    /// refreshed to the current time on every call, saved or not.
    #[must_use]
    pub fn to_document(&self) -> FlashDocument {
        FlashDocument {
            form: self.form_name.clone(),
            unique_id: self.unique_id.clone(),
            url: self.url.clone(),
            user: self.user.clone(),
            timestamps: Some(Timestamps {
                created: self.created,
                updated: unix_now(),
            }),
            data: self.data.clone(),
            files: self.files.clone(),
        }
    }

    fn has_data(&self) -> bool {
        match &self.data {
            None | Some(Value::Null) => false,
            Some(Value::Object(entries)) => !entries.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }
}

fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn read_document(path: &Path) -> Option<FlashDocument> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(source) => {
            warn!("failed to read flash index at {}: {source}", path.display());
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(document) => Some(document),
        Err(source) => {
            warn!(
                "discarding corrupt flash index at {}: {source}",
                path.display()
            );
            None
        }
    }
}
