//! JSON-file [`CredentialStore`] for single-user tools and small deployments.

// std
use std::{
	fs::{self, File},
	io::{self, ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreError},
};

type Snapshot = BTreeMap<String, String>;

/// Keeps every entry in memory and rewrites the backing JSON object after each mutation.
///
/// Writes go to a sibling `.tmp` file that is synced and then renamed over the target, so a crash
/// mid-write leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	entries: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens the store at `path`, creating parent directories and loading an existing snapshot.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		create_parent(&path)?;

		let entries = read_snapshot(&path)?;

		Ok(Self { path, entries: Arc::new(RwLock::new(entries)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write_snapshot(&self, entries: &Snapshot) -> Result<(), StoreError> {
		let bytes = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serialization {
			message: format!("Failed to encode credential snapshot: {e}"),
		})?;
		let staging = self.path.with_extension("tmp");

		create_parent(&self.path)?;
		File::create(&staging)
			.and_then(|mut file| {
				file.write_all(&bytes)?;
				file.sync_all()
			})
			.map_err(backend("write", &staging))?;

		fs::rename(&staging, &self.path).map_err(backend("replace", &self.path))
	}
}
impl CredentialStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.entries.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut entries = self.entries.write();

		if entries.get(key).map(String::as_str) == Some(value) {
			return Ok(());
		}

		let mut next = entries.clone();

		next.insert(key.to_owned(), value.to_owned());
		self.write_snapshot(&next)?;
		*entries = next;

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		let mut entries = self.entries.write();

		if !entries.contains_key(key) {
			return Ok(());
		}

		let mut next = entries.clone();

		next.remove(key);
		self.write_snapshot(&next)?;
		*entries = next;

		Ok(())
	}
}

fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::new()),
		Err(e) => return Err(backend("read", path)(e)),
	};

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(Snapshot::new());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to decode {}: {e}", path.display()),
	})
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
	match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		Some(parent) => fs::create_dir_all(parent).map_err(backend("create", parent)),
		None => Ok(()),
	}
}

fn backend<'a>(
	action: &'static str,
	path: &'a Path,
) -> impl FnOnce(io::Error) -> StoreError + 'a {
	move |e| StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}
