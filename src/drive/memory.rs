use super::{DriveFile, FileDirectory, FolderHandle, RemoteFile};
use crate::error::DriveError;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// In-process directory with the same contract as [`super::DriveClient`].
///
/// Understands the queries this crate renders: `'<parent>' in parents`
/// combined with `name contains '<term>'` alternatives. Term matching is
/// case-sensitive. Files without a name are returned for any term so that
/// name failures can be exercised.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RefCell<State>,
}

#[derive(Debug, Default)]
struct State {
    folders: HashMap<String, String>,
    files: Vec<DriveFile>,
    search_failure: Option<String>,
    enumeration_failure_after: Option<usize>,
    unresolvable: HashSet<String>,
    immovable: HashSet<String>,
    moves: Vec<(String, String)>,
    resolutions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedQuery {
    parent: String,
    terms: Vec<String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(self, id: &str, name: &str) -> Self {
        self.add_folder(id, name);
        self
    }

    pub fn with_file(self, file: DriveFile) -> Self {
        self.add_file(file);
        self
    }

    pub fn add_folder(&self, id: &str, name: &str) {
        self.state.borrow_mut().folders.insert(id.to_string(), name.to_string());
    }

    pub fn add_file(&self, file: DriveFile) {
        self.state.borrow_mut().files.push(file);
    }

    pub fn fail_search(&self, message: &str) {
        self.state.borrow_mut().search_failure = Some(message.to_string());
    }

    /// Break the result sequence after `count` files have been yielded.
    pub fn fail_enumeration_after(&self, count: usize) {
        self.state.borrow_mut().enumeration_failure_after = Some(count);
    }

    pub fn fail_resolution(&self, folder_id: &str) {
        self.state.borrow_mut().unresolvable.insert(folder_id.to_string());
    }

    pub fn fail_move(&self, file_id: &str) {
        self.state.borrow_mut().immovable.insert(file_id.to_string());
    }

    /// Current parent of a file.
    pub fn folder_of(&self, file_id: &str) -> Option<String> {
        let state = self.state.borrow();
        state
            .files
            .iter()
            .find(|f| f.id == file_id)
            .and_then(|f| f.parents.first().cloned())
    }

    /// Ids of the files currently inside `folder_id`, in insertion order.
    pub fn files_in(&self, folder_id: &str) -> Vec<String> {
        let state = self.state.borrow();
        state
            .files
            .iter()
            .filter(|f| f.parents.iter().any(|p| p == folder_id))
            .map(|f| f.id.clone())
            .collect()
    }

    /// Every successful move as `(file id, folder id)`.
    pub fn moves(&self) -> Vec<(String, String)> {
        self.state.borrow().moves.clone()
    }

    pub fn resolution_count(&self) -> usize {
        self.state.borrow().resolutions
    }
}

impl FileDirectory for MemoryDirectory {
    type File = DriveFile;
    type Files = MemoryResults;

    fn search(&self, query: &str) -> Result<MemoryResults, DriveError> {
        let state = self.state.borrow();

        if let Some(message) = &state.search_failure {
            return Err(DriveError::Search(message.clone()));
        }

        let parsed = parse_query(query)
            .ok_or_else(|| DriveError::Search(format!("unsupported query: {}", query)))?;

        let matches = state
            .files
            .iter()
            .filter(|file| file.parents.iter().any(|p| *p == parsed.parent))
            .filter(|file| match &file.name {
                Some(name) => parsed.terms.iter().any(|term| name.contains(term.as_str())),
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();

        Ok(MemoryResults {
            files: matches.into_iter(),
            yielded: 0,
            fail_after: state.enumeration_failure_after,
            finished: false,
        })
    }

    fn resolve_folder(&self, id: &str) -> Result<FolderHandle, DriveError> {
        let mut state = self.state.borrow_mut();
        state.resolutions += 1;

        if state.unresolvable.contains(id) {
            return Err(DriveError::Resolution {
                id: id.to_string(),
                reason: "folder is not accessible".to_string(),
            });
        }

        match state.folders.get(id) {
            Some(name) => Ok(FolderHandle {
                id: id.to_string(),
                name: name.clone(),
            }),
            None => Err(DriveError::Resolution {
                id: id.to_string(),
                reason: "no such folder".to_string(),
            }),
        }
    }

    fn move_file(&self, file: &DriveFile, folder: &FolderHandle) -> Result<(), DriveError> {
        let mut state = self.state.borrow_mut();

        if state.immovable.contains(file.id()) {
            return Err(DriveError::Move {
                id: file.id().to_string(),
                reason: "permission denied".to_string(),
            });
        }

        let stored = state
            .files
            .iter_mut()
            .find(|f| f.id == file.id())
            .ok_or_else(|| DriveError::Move {
                id: file.id().to_string(),
                reason: "file no longer exists".to_string(),
            })?;

        stored.parents = vec![folder.id.clone()];
        state.moves.push((file.id().to_string(), folder.id.clone()));
        Ok(())
    }
}

/// Snapshot of the files that matched a search, handed out one at a time.
#[derive(Debug)]
pub struct MemoryResults {
    files: std::vec::IntoIter<DriveFile>,
    yielded: usize,
    fail_after: Option<usize>,
    finished: bool,
}

impl Iterator for MemoryResults {
    type Item = Result<DriveFile, DriveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.fail_after == Some(self.yielded) {
            self.finished = true;
            return Some(Err(DriveError::Enumeration("result page unavailable".to_string())));
        }

        let file = self.files.next()?;
        self.yielded += 1;
        Some(Ok(file))
    }
}

fn parse_query(query: &str) -> Option<ParsedQuery> {
    let (parent, rest) = read_quoted(query.trim_start())?;
    if !rest.trim_start().starts_with("in parents") {
        return None;
    }

    let mut terms = Vec::new();
    let mut remaining = rest;
    while let Some(index) = remaining.find("name contains ") {
        let (term, after) = read_quoted(&remaining[index + "name contains ".len()..])?;
        terms.push(term);
        remaining = after;
    }

    if terms.is_empty() {
        return None;
    }

    Some(ParsedQuery { parent, terms })
}

/// Read a single-quoted, backslash-escaped literal from the start of `input`.
fn read_quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('\'')?;
    let mut value = String::new();
    let mut chars = body.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => value.push(chars.next()?.1),
            '\'' => return Some((value, &body[index + 1..])),
            _ => value.push(c),
        }
    }

    None
}
