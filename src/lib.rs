//! Per-session, per-form draft state store.
//!
//! A [`FormFlash`] persists an in-progress form's field data and
//! uploaded-file metadata under `<tmp_root>/forms/<session_id>/<unique_id>`,
//! so unsaved work and in-flight uploads survive page reloads within the
//! same session. Construction loads state, mutators work in memory, `save`
//! commits (or deletes an emptied draft), `delete` purges.

mod error;
mod mime;
mod paths;
mod registry;
mod schema;
mod store;
mod upload;

pub use error::FormFlashError;
pub use mime::media_type_for_path;
pub use paths::{flash_dir, index_path, random_tmp_name, session_tmp_dir, FORMS_DIR, INDEX_FILE};
pub use registry::{FlashFile, FlashFileMap};
pub use schema::{
    FileMap, FileRegistry, FlashDocument, Timestamps, UploadRecord, UserInfo, DEFAULT_FIELD,
    ORIGINAL_SUFFIX,
};
pub use store::FormFlash;
pub use upload::{TempUpload, UploadedFile};
