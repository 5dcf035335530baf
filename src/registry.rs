//! Upload registry and the crop/original state machine.
//!
//! Every registered upload lives at `(field, name)`. Cropping keeps the
//! pre-crop source alongside the working copy under the `field + "/original"`
//! key: the first crop demotes the current upload into the original slot,
//! later crops update the original's crop descriptor and discard the
//! intermediate variant's temp file. A plain (non-crop) re-register
//! tombstones the original slot and deletes both backing files, so crop
//! history never outlives a replacement.
//!
//! Removal never deletes registry keys; slots are tombstoned to `None` so
//! the deletion marker survives serialization.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::FormFlashError;
use crate::mime::media_type_for_path;
use crate::paths::{random_tmp_name, tmp_file_path};
use crate::schema::{UploadRecord, DEFAULT_FIELD, ORIGINAL_SUFFIX};
use crate::store::FormFlash;
use crate::upload::UploadedFile;

/// Upload name -> lazily materialized handle, `None` for tombstones.
pub type FlashFileMap = IndexMap<String, Option<FlashFile>>;

/// Read-only view of one registered upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashFile {
    field: String,
    record: UploadRecord,
    tmp_dir: Option<PathBuf>,
}

impl FlashFile {
    fn new(field: impl Into<String>, record: UploadRecord, tmp_dir: Option<PathBuf>) -> Self {
        Self {
            field: field.into(),
            record,
            tmp_dir,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.record.media_type
    }

    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.record.size
    }

    #[must_use]
    pub fn crop(&self) -> Option<&Value> {
        self.record.crop.as_ref()
    }

    #[must_use]
    pub fn record(&self) -> &UploadRecord {
        &self.record
    }

    /// Backing temp path, `None` for uploads registered by local path.
    #[must_use]
    pub fn tmp_path(&self) -> Option<PathBuf> {
        let dir = self.tmp_dir.as_deref()?;
        tmp_file_path(dir, self.record.tmp_name.as_deref()?)
    }

    /// Whether the backing temp file currently exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.tmp_path().is_some_and(|path| path.is_file())
    }
}

impl FormFlash {
    /// Moves an upload's bytes into the flash directory under a random temp
    /// name and registers it. Returns the client-supplied filename.
    pub fn add_uploaded_file(
        &mut self,
        upload: &dyn UploadedFile,
        field: Option<&str>,
        crop: Option<Value>,
    ) -> Result<String, FormFlashError> {
        let tmp_dir = self.tmp_dir().ok_or(FormFlashError::NoSession)?;
        let tmp_name = random_tmp_name();
        let name = upload.client_filename().to_string();

        fs::create_dir_all(&tmp_dir)
            .map_err(|source| FormFlashError::io("creating flash directory", &tmp_dir, source))?;

        let dest = tmp_dir.join(&tmp_name);
        upload.move_to(&dest).map_err(|source| {
            FormFlashError::io("moving upload into flash storage", &dest, source)
        })?;

        let record = UploadRecord::moved(
            name.clone(),
            upload.client_media_type(),
            upload.size(),
            tmp_name,
        );
        self.register(field, &name, record, crop)?;

        Ok(name)
    }

    /// Registers a file by local path without moving or taking ownership of
    /// its bytes. Name, media type and size come from the filesystem.
    pub fn add_file(
        &mut self,
        path: &Path,
        field: Option<&str>,
        crop: Option<Value>,
    ) -> Result<(), FormFlashError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                return Err(FormFlashError::file_not_found(path));
            }
            Err(source) => return Err(FormFlashError::io("inspecting local file", path, source)),
        };

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let record = UploadRecord::local(name.clone(), media_type_for_path(path), metadata.len());

        self.register(field, &name, record, crop)
    }

    /// Tombstones `(field, name)` and its `/original` counterpart and
    /// deletes their backing temp files. Removing a name that was never
    /// registered is not an error; only an empty name returns `false`.
    pub fn remove_file(&mut self, name: &str, field: Option<&str>) -> bool {
        if name.is_empty() {
            return false;
        }

        let field = field_or_default(field).to_string();
        let original_field = format!("{field}{ORIGINAL_SUFFIX}");

        for key in [field.as_str(), original_field.as_str()] {
            if let Some(upload) = self
                .files
                .get(key)
                .and_then(|files| files.get(name))
                .and_then(Option::as_ref)
            {
                self.remove_tmp_file(upload.tmp_name.as_deref());
            }
        }

        self.files
            .entry(field.clone())
            .or_default()
            .insert(name.to_string(), None);
        self.files
            .entry(original_field.clone())
            .or_default()
            .insert(name.to_string(), None);

        self.handles.remove(&field);
        self.handles.remove(&original_field);

        true
    }

    /// Deletes every backing temp file referenced anywhere in the registry,
    /// then resets the registry to empty. No tombstones survive.
    pub fn clear_files(&mut self) {
        for upload in self.files.values().flat_map(IndexMap::values).flatten() {
            self.remove_tmp_file(upload.tmp_name.as_deref());
        }

        self.files.clear();
        self.handles.clear();
    }

    /// Uploads registered under one field, in registration order. Handles
    /// are materialized on first query and cached until the field is touched
    /// by [`remove_file`](Self::remove_file) or the registry is reset.
    pub fn files_by_field(&mut self, field: &str) -> &FlashFileMap {
        if !self.handles.contains_key(field) {
            let tmp_dir = self.tmp_dir();
            let handles: FlashFileMap = self
                .files
                .get(field)
                .map(|files| {
                    files
                        .iter()
                        .map(|(name, upload)| {
                            let handle = upload
                                .as_ref()
                                .map(|record| FlashFile::new(field, record.clone(), tmp_dir.clone()));
                            (name.clone(), handle)
                        })
                        .collect()
                })
                .unwrap_or_default();

            self.handles.insert(field.to_string(), handles);
        }

        &self.handles[field]
    }

    /// All fields and their uploads. Keys carrying the `/original` suffix
    /// are skipped unless `include_original` is set.
    pub fn files_by_fields(&mut self, include_original: bool) -> IndexMap<String, FlashFileMap> {
        let fields: Vec<String> = self
            .files
            .keys()
            .filter(|field| include_original || !field.contains(ORIGINAL_SUFFIX))
            .cloned()
            .collect();

        fields
            .into_iter()
            .map(|field| {
                let handles = self.files_by_field(&field).clone();
                (field, handles)
            })
            .collect()
    }

    fn register(
        &mut self,
        field: Option<&str>,
        name: &str,
        data: UploadRecord,
        crop: Option<Value>,
    ) -> Result<(), FormFlashError> {
        if self.session_id.is_empty() {
            return Err(FormFlashError::NoSession);
        }

        let field = field_or_default(field);
        let original_field = format!("{field}{ORIGINAL_SUFFIX}");

        let old = self
            .files
            .get(field)
            .and_then(|files| files.get(name))
            .cloned()
            .flatten();

        match crop {
            Some(crop) => {
                if let Some(mut old) = old {
                    let has_original = self
                        .files
                        .get(&original_field)
                        .and_then(|files| files.get(name))
                        .is_some_and(Option::is_some);

                    if has_original {
                        // Latest crop wins; the previously cropped variant
                        // is discarded, the true original stays.
                        if let Some(Some(original)) = self
                            .files
                            .get_mut(&original_field)
                            .and_then(|files| files.get_mut(name))
                        {
                            original.crop = Some(crop);
                        }
                        self.remove_tmp_file(old.tmp_name.as_deref());
                    } else {
                        // First crop demotes the current upload to original.
                        old.crop = Some(crop);
                        self.files
                            .entry(original_field)
                            .or_default()
                            .insert(name.to_string(), Some(old));
                    }
                } else {
                    // Crop intent recorded before any upload exists.
                    let intent = UploadRecord::crop_intent(name, &data.media_type, crop);
                    self.files
                        .entry(original_field)
                        .or_default()
                        .insert(name.to_string(), Some(intent));
                }
            }
            None => {
                // Plain replace: crop history does not survive, even when
                // the same file is re-registered under the same name.
                let original = self
                    .files
                    .entry(original_field)
                    .or_default()
                    .insert(name.to_string(), None)
                    .flatten();

                self.remove_tmp_file(old.as_ref().and_then(|upload| upload.tmp_name.as_deref()));
                self.remove_tmp_file(
                    original
                        .as_ref()
                        .and_then(|upload| upload.tmp_name.as_deref()),
                );
            }
        }

        self.files
            .entry(field.to_string())
            .or_default()
            .insert(name.to_string(), Some(data));

        Ok(())
    }

    /// Best-effort unlink of a temp file inside the flash directory. Missing
    /// files are success; anything else is logged and swallowed so cleanup
    /// stays idempotent.
    fn remove_tmp_file(&self, tmp_name: Option<&str>) {
        let Some(tmp_name) = tmp_name else {
            return;
        };
        let Some(path) = self
            .tmp_dir()
            .and_then(|dir| tmp_file_path(&dir, tmp_name))
        else {
            return;
        };

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(source) if source.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                debug!(
                    "failed to remove flash temp file {}: {source}",
                    path.display()
                );
            }
        }
    }
}

fn field_or_default(field: Option<&str>) -> &str {
    match field {
        Some(field) if !field.is_empty() => field,
        _ => DEFAULT_FIELD,
    }
}
