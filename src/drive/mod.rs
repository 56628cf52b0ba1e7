pub mod http;
pub mod memory;

use crate::error::DriveError;
use serde::Deserialize;

pub use http::DriveClient;
pub use memory::MemoryDirectory;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A folder that has been looked up and confirmed to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub id: String,
    pub name: String,
}

/// One stored file as seen by the mover.
pub trait RemoteFile {
    fn id(&self) -> &str;
    fn name(&self) -> Result<String, DriveError>;
    fn parents(&self) -> &[String];
}

/// Search, folder lookup and move operations of a file storage service.
///
/// `search` returns a forward-only sequence. It is consumed as it is read and
/// cannot be restarted; callers that need the files again must search again.
pub trait FileDirectory {
    type File: RemoteFile;
    type Files: Iterator<Item = Result<Self::File, DriveError>>;

    fn search(&self, query: &str) -> Result<Self::Files, DriveError>;
    fn resolve_folder(&self, id: &str) -> Result<FolderHandle, DriveError>;
    fn move_file(&self, file: &Self::File, folder: &FolderHandle) -> Result<(), DriveError>;
}

impl<T: FileDirectory + ?Sized> FileDirectory for &T {
    type File = T::File;
    type Files = T::Files;

    fn search(&self, query: &str) -> Result<Self::Files, DriveError> {
        (**self).search(query)
    }

    fn resolve_folder(&self, id: &str) -> Result<FolderHandle, DriveError> {
        (**self).resolve_folder(id)
    }

    fn move_file(&self, file: &Self::File, folder: &FolderHandle) -> Result<(), DriveError> {
        (**self).move_file(file, folder)
    }
}

/// File metadata as returned by the Drive v3 `files` resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            parents: vec![parent.into()],
        }
    }
}

impl RemoteFile for DriveFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Result<String, DriveError> {
        match &self.name {
            Some(name) => Ok(name.clone()),
            None => Err(DriveError::Name(self.id.clone())),
        }
    }

    fn parents(&self) -> &[String] {
        &self.parents
    }
}
