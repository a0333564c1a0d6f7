use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::registry::{CatalogEntry, Catalogs, UsageRegister};

/// Reads a YAML file and deserializes it.
pub(crate) fn read_yaml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
	let reader = BufReader::new(File::open(path.as_ref())?);
	let data = serde_yaml::from_reader(reader)?;
	debug!("YAML file {} read", path.as_ref().display());
	Ok(data)
}

/// Serializes `data` as YAML and writes it to `path` atomically.
///
/// - Writes to a temporary file in the same directory
/// - Renames it over `path` once fully written and synced
pub(crate) fn save_yaml<T: Serialize, P: AsRef<Path>>(data: &T, path: P) -> Result<()> {
	let path = path.as_ref();
	let parent = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};

	let yaml = serde_yaml::to_string(data)?;
	let mut tmp = NamedTempFile::new_in(parent)?;
	tmp.write_all(yaml.as_bytes())?;
	tmp.as_file().sync_all()?;
	tmp.persist(path).map_err(|e| e.error)?;

	info!("Data saved to {}", path.display());
	Ok(())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

/// Loads every `.yaml` catalog file of a directory.
///
/// Each file maps catalog kinds to their entries; a kind may only appear
/// in one file.
pub(crate) fn load_catalogs<P: AsRef<Path>>(dir: P) -> Result<Catalogs> {
	let dir = dir.as_ref();
	let mut catalogs = Catalogs::new();

	for file in list_files(dir, "yaml")? {
		let kinds: BTreeMap<String, Vec<CatalogEntry>> = read_yaml(dir.join(&file))?;
		debug!("Catalog file {file}: {} kinds", kinds.len());
		catalogs.merge(kinds)?;
	}

	info!("Catalogs loaded from {}: {}", dir.display(), catalogs.kinds().collect::<Vec<_>>().join(", "));
	Ok(catalogs)
}

/// Loads the usage register, starting empty if the file does not exist yet.
pub(crate) fn load_register<P: AsRef<Path>>(path: P) -> Result<UsageRegister> {
	let path = path.as_ref();
	if !path.exists() {
		info!("No register at {}, starting empty", path.display());
		return Ok(UsageRegister::new());
	}
	let contents = fs::read_to_string(path)?;
	if contents.trim().is_empty() {
		return Ok(UsageRegister::new());
	}
	Ok(serde_yaml::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::GreetError;

	#[test]
	fn test_register_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("register.yaml");

		let catalog = vec![CatalogEntry::media(1, "a.jpg"), CatalogEntry::media(2, "b.jpg")];
		let mut register = load_register(&path).unwrap();
		assert_eq!(register, UsageRegister::new());

		register.mark_used("morning_media", 2, &catalog).unwrap();
		save_yaml(&register, &path).unwrap();
		assert_eq!(load_register(&path).unwrap(), register);
		assert_eq!(fs::read_to_string(&path).unwrap(), "morning_media:\n- 2\n");
	}

	#[test]
	fn test_empty_register_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("register.yaml");
		fs::write(&path, "").unwrap();
		assert_eq!(load_register(&path).unwrap(), UsageRegister::new());
	}

	#[test]
	fn test_load_catalog_dir() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join("media.yaml"),
			"morning_media:\n- uid: 1\n  path: m1.jpg\nafternoon_media:\n- uid: 1\n  path: a1.mp4\n",
		)
		.unwrap();
		fs::write(
			dir.path().join("stickers.yaml"),
			"morning_stickers:\n- uid: 1\n  id: 10\n  access_hash: 20\n  file_reference: abc\n",
		)
		.unwrap();
		fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

		let catalogs = load_catalogs(dir.path()).unwrap();
		assert_eq!(
			catalogs.kinds().collect::<Vec<_>>(),
			["afternoon_media", "morning_media", "morning_stickers"]
		);
		assert_eq!(catalogs.get("morning_stickers").unwrap()[0], CatalogEntry::sticker(1, 10, 20, "abc"));
	}

	#[test]
	fn test_duplicate_kind_across_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.yaml"), "morning_media:\n- uid: 1\n  path: x.jpg\n").unwrap();
		fs::write(dir.path().join("b.yaml"), "morning_media:\n- uid: 2\n  path: y.jpg\n").unwrap();
		assert!(matches!(load_catalogs(dir.path()), Err(GreetError::DuplicateKind(_))));
	}

	#[test]
	fn test_list_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.yaml"), "").unwrap();
		fs::write(dir.path().join("a.yaml"), "").unwrap();
		fs::write(dir.path().join("c.yml"), "").unwrap();
		fs::create_dir(dir.path().join("d.yaml")).unwrap();
		assert_eq!(list_files(dir.path(), "yaml").unwrap(), ["a.yaml", "b.yaml"]);
	}

	#[test]
	fn test_normalize_folder() {
		assert_eq!(normalize_folder("data"), PathBuf::from("data"));
		assert!(normalize_folder(".").is_absolute());
	}
}
