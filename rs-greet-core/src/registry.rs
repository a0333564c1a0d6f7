use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GreetError, Result};

/// Stable identifier of a catalog entry, unique within its catalog.
pub type Uid = u64;

/// Content attached to a catalog entry.
///
/// # Variants
/// - `Sticker`: a remote document reference (`id`, `access_hash` and the
///   Latin-1 encoded `file_reference`).
/// - `Media`: a file path, relative to the media folder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Payload {
	Sticker { id: i64, access_hash: i64, file_reference: String },
	Media { path: PathBuf },
}

/// One item of a catalog (a sticker or a media file).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
	pub uid: Uid,
	#[serde(flatten)]
	pub payload: Payload,
}

impl CatalogEntry {
	pub fn media(uid: Uid, path: impl Into<PathBuf>) -> Self {
		Self { uid, payload: Payload::Media { path: path.into() } }
	}

	pub fn sticker(uid: Uid, id: i64, access_hash: i64, file_reference: impl Into<String>) -> Self {
		Self {
			uid,
			payload: Payload::Sticker { id, access_hash, file_reference: file_reference.into() },
		}
	}

	/// Decodes the sticker file reference back to raw bytes.
	///
	/// File references are stored as Latin-1 text: each character maps to
	/// exactly one byte.
	///
	/// # Errors
	/// - `NotASticker` if the entry is a media file.
	/// - `InvalidFileReference` if a character is above U+00FF.
	pub fn file_reference_bytes(&self) -> Result<Vec<u8>> {
		match &self.payload {
			Payload::Sticker { file_reference, .. } => file_reference
				.chars()
				.map(|c| u8::try_from(c).map_err(|_| GreetError::InvalidFileReference))
				.collect(),
			Payload::Media { .. } => Err(GreetError::NotASticker(self.uid)),
		}
	}
}

/// All catalogs, indexed by kind (`morning_media`, `morning_stickers`, ...).
///
/// # Invariants
/// - Uids are unique within a kind
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct Catalogs {
	kinds: BTreeMap<String, Vec<CatalogEntry>>,
}

impl Catalogs {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a catalog of the given kind.
	///
	/// # Errors
	/// - `DuplicateKind` if the kind already exists.
	/// - `DuplicateUid` if two entries share the same uid.
	pub fn insert(&mut self, kind: &str, entries: Vec<CatalogEntry>) -> Result<()> {
		if self.kinds.contains_key(kind) {
			return Err(GreetError::DuplicateKind(kind.to_owned()));
		}

		let mut uids = BTreeSet::new();
		for entry in &entries {
			if !uids.insert(entry.uid) {
				return Err(GreetError::DuplicateUid { kind: kind.to_owned(), uid: entry.uid });
			}
		}

		debug!("Catalog '{kind}' added with {} entries", entries.len());
		self.kinds.insert(kind.to_owned(), entries);
		Ok(())
	}

	/// Merges every catalog of `other` into this one.
	///
	/// # Errors
	/// Same as [`Catalogs::insert`].
	pub fn merge(&mut self, other: BTreeMap<String, Vec<CatalogEntry>>) -> Result<()> {
		for (kind, entries) in other {
			self.insert(&kind, entries)?;
		}
		Ok(())
	}

	/// Returns the catalog of the given kind.
	///
	/// # Errors
	/// Returns `UnknownKind` if no such catalog was loaded.
	pub fn get(&self, kind: &str) -> Result<&[CatalogEntry]> {
		self.kinds
			.get(kind)
			.map(Vec::as_slice)
			.ok_or_else(|| GreetError::UnknownKind(kind.to_owned()))
	}

	/// Returns the loaded kinds, sorted.
	pub fn kinds(&self) -> impl Iterator<Item = &str> {
		self.kinds.keys().map(String::as_str)
	}
}

/// Result of marking an entry as used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
	/// The uid was recorded.
	Added,
	/// The uid was already recorded, nothing changed.
	AlreadyUsed,
	/// The uid completed the catalog and the register was cleared.
	CycleReset,
}

/// Uids already dispatched, per catalog kind.
///
/// Serialized as `kind -> [uid]`, with uids in ascending order.
///
/// # Invariants
/// - Registered uids belong to the matching catalog
/// - A kind never holds as many uids as its catalog has entries: reaching
///   that size clears it
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct UsageRegister {
	used: BTreeMap<String, BTreeSet<Uid>>,
}

impl UsageRegister {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the uids used for a kind, in ascending order.
	pub fn used(&self, kind: &str) -> impl Iterator<Item = Uid> + '_ {
		self.used.get(kind).into_iter().flatten().copied()
	}

	pub fn is_used(&self, kind: &str, uid: Uid) -> bool {
		self.used.get(kind).is_some_and(|uids| uids.contains(&uid))
	}

	/// Number of uids recorded for a kind.
	pub fn len(&self, kind: &str) -> usize {
		self.used.get(kind).map_or(0, BTreeSet::len)
	}

	/// Number of entries of `catalog` not yet used.
	pub fn remaining(&self, kind: &str, catalog: &[CatalogEntry]) -> usize {
		catalog.iter().filter(|entry| !self.is_used(kind, entry.uid)).count()
	}

	/// Records `uid` as used for `kind`.
	///
	/// Recording is idempotent. When the register then holds as many uids
	/// as the catalog has entries, it is cleared for that kind so the whole
	/// catalog becomes available again.
	///
	/// # Errors
	/// Returns `UnknownEntry` if `uid` is not part of `catalog`.
	pub fn mark_used(&mut self, kind: &str, uid: Uid, catalog: &[CatalogEntry]) -> Result<MarkOutcome> {
		if !catalog.iter().any(|entry| entry.uid == uid) {
			return Err(GreetError::UnknownEntry { kind: kind.to_owned(), uid });
		}

		let used = self.used.entry(kind.to_owned()).or_default();
		if !used.insert(uid) {
			info!("Uid {uid} is already marked as used for '{kind}'");
			return Ok(MarkOutcome::AlreadyUsed);
		}
		info!("Uid {uid} added to register for '{kind}'");

		if used.len() >= catalog.len() {
			used.clear();
			info!("All entries for '{kind}' have been used, register cleared");
			return Ok(MarkOutcome::CycleReset);
		}
		Ok(MarkOutcome::Added)
	}

	/// Brings a loaded register back in line with the catalogs.
	///
	/// - Drops uids that are no longer part of their catalog
	/// - Clears every kind that then covers its whole catalog, as
	///   [`UsageRegister::mark_used`] would have
	///
	/// Kinds without a loaded catalog are left untouched. Returns the number
	/// of dropped uids.
	pub fn reconcile(&mut self, catalogs: &Catalogs) -> usize {
		let mut dropped = 0;
		for (kind, uids) in &mut self.used {
			let Ok(catalog) = catalogs.get(kind) else { continue };
			let before = uids.len();
			uids.retain(|uid| catalog.iter().any(|entry| entry.uid == *uid));
			dropped += before - uids.len();

			if !uids.is_empty() && uids.len() >= catalog.len() {
				uids.clear();
				info!("All entries for '{kind}' were already used, register cleared");
			}
		}
		dropped
	}
}

/// Returns the entries of `catalog` not recorded in `register`, in catalog order.
pub fn unused<'a>(kind: &str, catalog: &'a [CatalogEntry], register: &UsageRegister) -> Vec<&'a CatalogEntry> {
	catalog.iter().filter(|entry| !register.is_used(kind, entry.uid)).collect()
}

/// Picks one unused entry uniformly at random.
///
/// # Errors
/// - `EmptyCatalog` if the catalog has no entries (configuration problem).
/// - `Exhausted` if every entry is already used, which means the register
///   missed a reset. No used entry is ever handed out instead.
pub fn pick_unused<'a>(kind: &str, catalog: &'a [CatalogEntry], register: &UsageRegister) -> Result<&'a CatalogEntry> {
	pick_unused_with(&mut rand::rng(), kind, catalog, register)
}

/// Same as [`pick_unused`], drawing from `rng`.
pub fn pick_unused_with<'a, R: Rng + ?Sized>(
	rng: &mut R,
	kind: &str,
	catalog: &'a [CatalogEntry],
	register: &UsageRegister,
) -> Result<&'a CatalogEntry> {
	if catalog.is_empty() {
		return Err(GreetError::EmptyCatalog(kind.to_owned()));
	}

	let available = unused(kind, catalog, register);
	debug!("'{kind}': {} of {} entries available", available.len(), catalog.len());
	if available.is_empty() {
		return Err(GreetError::Exhausted(kind.to_owned()));
	}

	Ok(available[rng.random_range(0..available.len())])
}

/// Builds the `Remaining:` summary listing unused counts per kind.
pub fn remaining_summary(catalogs: &Catalogs, register: &UsageRegister) -> String {
	let mut summary = String::from("Remaining:");
	for kind in catalogs.kinds() {
		let catalog = catalogs.get(kind).unwrap_or_default();
		summary.push_str(&format!("\n  - {kind}: {}", register.remaining(kind, catalog)));
	}
	summary
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn media(uids: &[Uid]) -> Vec<CatalogEntry> {
		uids.iter().map(|uid| CatalogEntry::media(*uid, format!("{uid}.jpg"))).collect()
	}

	#[test]
	fn test_full_cycle_then_reset() {
		let mut rng = StdRng::seed_from_u64(5);
		let catalog = media(&[10, 20, 30, 40, 50]);
		let mut register = UsageRegister::new();

		for _ in 0..3 {
			let mut seen = BTreeSet::new();
			for i in 0..catalog.len() {
				let entry = pick_unused_with(&mut rng, "morning_media", &catalog, &register).unwrap();
				assert!(seen.insert(entry.uid), "uid {} picked twice", entry.uid);

				let outcome = register.mark_used("morning_media", entry.uid, &catalog).unwrap();
				if i + 1 == catalog.len() {
					assert_eq!(outcome, MarkOutcome::CycleReset);
				} else {
					assert_eq!(outcome, MarkOutcome::Added);
					assert_eq!(register.len("morning_media"), i + 1);
				}
			}
			assert_eq!(seen.len(), catalog.len());
			assert_eq!(register.len("morning_media"), 0);
			assert_eq!(unused("morning_media", &catalog, &register).len(), catalog.len());
		}
	}

	#[test]
	fn test_three_entries_scenario() {
		let catalog = media(&[1, 2, 3]);
		let mut register = UsageRegister::new();
		let mut picked = Vec::new();
		for _ in 0..3 {
			let uid = pick_unused("morning_media", &catalog, &register).unwrap().uid;
			assert!(!picked.contains(&uid));
			picked.push(uid);
			register.mark_used("morning_media", uid, &catalog).unwrap();
		}
		assert_eq!(register.used("morning_media").count(), 0);
	}

	#[test]
	fn test_empty_catalog() {
		let register = UsageRegister::new();
		assert!(matches!(
			pick_unused("morning_stickers", &[], &register),
			Err(GreetError::EmptyCatalog(kind)) if kind == "morning_stickers"
		));
	}

	#[test]
	fn test_exhausted_register() {
		let catalog = media(&[1, 2]);
		// Register state a missing reset would leave behind
		let register: UsageRegister = serde_yaml::from_str("afternoon_media: [1, 2]").unwrap();
		assert!(matches!(
			pick_unused("afternoon_media", &catalog, &register),
			Err(GreetError::Exhausted(_))
		));
	}

	#[test]
	fn test_mark_is_idempotent() {
		let catalog = media(&[1, 2, 3]);
		let mut register = UsageRegister::new();
		assert_eq!(register.mark_used("k", 2, &catalog).unwrap(), MarkOutcome::Added);
		assert_eq!(register.mark_used("k", 2, &catalog).unwrap(), MarkOutcome::AlreadyUsed);
		assert_eq!(register.len("k"), 1);
		assert!(register.is_used("k", 2));
		assert!(!register.is_used("other", 2));
	}

	#[test]
	fn test_mark_unknown_uid() {
		let catalog = media(&[1]);
		let mut register = UsageRegister::new();
		assert!(matches!(
			register.mark_used("k", 9, &catalog),
			Err(GreetError::UnknownEntry { uid: 9, .. })
		));
		assert_eq!(register.len("k"), 0);
	}

	#[test]
	fn test_register_kept_sorted() {
		let catalog = media(&[1, 2, 3, 4, 5]);
		let mut register = UsageRegister::new();
		for uid in [4, 1, 3] {
			register.mark_used("morning_media", uid, &catalog).unwrap();
		}
		assert_eq!(register.used("morning_media").collect::<Vec<_>>(), [1, 3, 4]);
		assert_eq!(serde_yaml::to_string(&register).unwrap(), "morning_media:\n- 1\n- 3\n- 4\n");
	}

	#[test]
	fn test_kinds_are_independent() {
		let morning = media(&[1, 2]);
		let afternoon = media(&[1, 2, 3]);
		let mut register = UsageRegister::new();
		register.mark_used("morning_media", 1, &morning).unwrap();
		register.mark_used("afternoon_media", 1, &afternoon).unwrap();
		assert_eq!(register.mark_used("morning_media", 2, &morning).unwrap(), MarkOutcome::CycleReset);
		assert_eq!(register.len("afternoon_media"), 1);
	}

	#[test]
	fn test_catalog_yaml() {
		let yaml = "\
morning_media:
- uid: 1
  path: morning/sunrise.jpg
morning_stickers:
- uid: 7
  id: 5000
  access_hash: -42
  file_reference: \"\\xe9\\xffA\"
";
		let kinds: BTreeMap<String, Vec<CatalogEntry>> = serde_yaml::from_str(yaml).unwrap();
		let mut catalogs = Catalogs::new();
		catalogs.merge(kinds).unwrap();

		assert_eq!(catalogs.kinds().collect::<Vec<_>>(), ["morning_media", "morning_stickers"]);
		assert_eq!(catalogs.get("morning_media").unwrap()[0], CatalogEntry::media(1, "morning/sunrise.jpg"));

		let sticker = &catalogs.get("morning_stickers").unwrap()[0];
		assert_eq!(*sticker, CatalogEntry::sticker(7, 5000, -42, "\u{e9}\u{ff}A"));
		assert_eq!(sticker.file_reference_bytes().unwrap(), [0xe9, 0xff, 0x41]);
		assert!(matches!(catalogs.get("evening_media"), Err(GreetError::UnknownKind(_))));
	}

	#[test]
	fn test_file_reference_errors() {
		assert!(matches!(
			CatalogEntry::media(3, "a.jpg").file_reference_bytes(),
			Err(GreetError::NotASticker(3))
		));
		assert!(matches!(
			CatalogEntry::sticker(1, 1, 1, "\u{1f600}").file_reference_bytes(),
			Err(GreetError::InvalidFileReference)
		));
	}

	#[test]
	fn test_catalog_duplicates() {
		let mut catalogs = Catalogs::new();
		catalogs.insert("a", media(&[1])).unwrap();
		assert!(matches!(catalogs.insert("a", media(&[2])), Err(GreetError::DuplicateKind(_))));
		assert!(matches!(catalogs.insert("b", media(&[2, 2])), Err(GreetError::DuplicateUid { uid: 2, .. })));
	}

	#[test]
	fn test_reconcile_drops_stale_uids() {
		let mut catalogs = Catalogs::new();
		catalogs.insert("morning_media", media(&[1, 2, 3])).unwrap();
		let mut register: UsageRegister = serde_yaml::from_str("morning_media: [1, 7, 8]\nold_media: [4]").unwrap();
		assert_eq!(register.reconcile(&catalogs), 2);
		assert_eq!(register.used("morning_media").collect::<Vec<_>>(), [1]);
		assert_eq!(register.used("old_media").collect::<Vec<_>>(), [4]);
	}

	#[test]
	fn test_reconcile_resets_full_kinds() {
		let mut catalogs = Catalogs::new();
		catalogs.insert("afternoon_media", media(&[1, 2])).unwrap();
		catalogs.insert("morning_media", media(&[1, 2])).unwrap();
		// Catalog shrank from 3 entries, and a register written by hand
		let mut register: UsageRegister =
			serde_yaml::from_str("afternoon_media: [1, 2, 3]\nmorning_media: [1, 2]").unwrap();
		assert_eq!(register.reconcile(&catalogs), 1);
		assert_eq!(register.len("afternoon_media"), 0);
		assert_eq!(register.len("morning_media"), 0);

		let catalog = catalogs.get("afternoon_media").unwrap();
		assert!(pick_unused("afternoon_media", catalog, &register).is_ok());
	}

	#[test]
	fn test_remaining_summary() {
		let mut catalogs = Catalogs::new();
		catalogs.insert("afternoon_media", media(&[1, 2, 3])).unwrap();
		catalogs.insert("morning_media", media(&[1, 2])).unwrap();
		let mut register = UsageRegister::new();
		register.mark_used("afternoon_media", 3, catalogs.get("afternoon_media").unwrap()).unwrap();
		assert_eq!(
			remaining_summary(&catalogs, &register),
			"Remaining:\n  - afternoon_media: 2\n  - morning_media: 2"
		);
	}
}
