use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::error::{GreetError, Result};
use crate::io;
use crate::registry::{self, CatalogEntry, Catalogs, MarkOutcome, Uid, UsageRegister};

/// An entry handed out by [`Rotation::checkout`], waiting to be committed
/// (delivered) or released (not delivered).
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Lease {
	kind: String,
	entry: CatalogEntry,
}

impl Lease {
	pub fn kind(&self) -> &str {
		&self.kind
	}

	pub fn entry(&self) -> &CatalogEntry {
		&self.entry
	}

	pub fn uid(&self) -> Uid {
		self.entry.uid
	}
}

/// No-repeat rotation over every catalog, with a persisted usage register.
///
/// # Responsibilities
/// - Hand out unused entries, one outstanding checkout per catalog kind
/// - Record delivered entries and save the register
/// - Reset a kind once its whole catalog has been delivered
///
/// The pick and the later mark of an entry form one critical section per
/// kind: while a checkout is outstanding, another checkout of the same kind
/// fails with `Busy`, so two senders never get the same last entry.
/// Callers sharing a `Rotation` between threads wrap it in a `Mutex`.
///
/// A checkout left open longer than the lease timeout is abandoned: the
/// next checkout of the same kind takes over, and the entry it held stays
/// unused.
#[derive(Debug)]
pub struct Rotation {
	catalogs: Catalogs,
	register: UsageRegister,
	register_path: Option<PathBuf>,
	lease_timeout: Duration,
	checkouts: BTreeMap<String, Checkout>,
}

/// Lease timeout when none is configured.
pub const DEFAULT_LEASE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct Checkout {
	uid: Uid,
	since: Instant,
}

impl Default for Rotation {
	fn default() -> Self {
		Self::new(Catalogs::default(), UsageRegister::default())
	}
}

impl Rotation {
	/// Creates an in-memory rotation (the register is never saved).
	pub fn new(catalogs: Catalogs, register: UsageRegister) -> Self {
		Self {
			catalogs,
			register,
			register_path: None,
			lease_timeout: DEFAULT_LEASE_TIMEOUT,
			checkouts: BTreeMap::new(),
		}
	}

	/// Replaces the time after which an open checkout is considered abandoned.
	pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
		self.lease_timeout = timeout;
		self
	}

	/// Loads the catalogs and the register described by `config`.
	///
	/// The register is saved back to the same file on every commit.
	/// Registered uids missing from their catalog are dropped with a warning,
	/// and kinds whose whole catalog is registered start over.
	pub fn open(config: &Config) -> Result<Self> {
		let catalogs = io::load_catalogs(config.catalog_path())?;
		let register_path = config.register_path();
		let mut register = io::load_register(&register_path)?;

		let dropped = register.reconcile(&catalogs);
		if dropped > 0 {
			warn!("{dropped} registered uids are not in any catalog and were dropped");
		}

		Ok(Self {
			register_path: Some(register_path),
			..Self::new(catalogs, register).with_lease_timeout(config.lease_timeout())
		})
	}

	pub fn catalogs(&self) -> &Catalogs {
		&self.catalogs
	}

	pub fn register(&self) -> &UsageRegister {
		&self.register
	}

	/// Whether a checkout of `kind` is outstanding (abandoned ones included).
	pub fn is_checked_out(&self, kind: &str) -> bool {
		self.checkouts.contains_key(kind)
	}

	/// Picks an unused entry of `kind` and holds it until commit or release.
	///
	/// An outstanding checkout older than the lease timeout is dropped first.
	///
	/// # Errors
	/// - `Busy` if a checkout of `kind` is outstanding and not yet timed out.
	/// - `UnknownKind`, `EmptyCatalog` or `Exhausted` (see [`registry::pick_unused`]).
	pub fn checkout(&mut self, kind: &str) -> Result<Lease> {
		if let Some(previous) = self.checkouts.get(kind) {
			if previous.since.elapsed() < self.lease_timeout {
				return Err(GreetError::Busy(kind.to_owned()));
			}
			warn!("Checkout of entry {} in '{kind}' timed out, taking over", previous.uid);
			self.checkouts.remove(kind);
		}

		let catalog = self.catalogs.get(kind)?;
		let entry = registry::pick_unused(kind, catalog, &self.register)?.clone();
		self.checkouts.insert(kind.to_owned(), Checkout { uid: entry.uid, since: Instant::now() });

		info!("Checked out entry {} of '{kind}'", entry.uid);
		Ok(Lease { kind: kind.to_owned(), entry })
	}

	/// Marks a checked out entry as used (it was delivered), saves the
	/// register and ends the checkout.
	///
	/// If saving fails, nothing changes and the checkout stays outstanding.
	///
	/// # Errors
	/// - `LeaseMismatch` if `uid` is not the outstanding checkout of `kind`.
	/// - I/O or serialization errors while saving.
	pub fn commit(&mut self, kind: &str, uid: Uid) -> Result<MarkOutcome> {
		self.ensure_checkout(kind, uid)?;

		let mut register = self.register.clone();
		let outcome = register.mark_used(kind, uid, self.catalogs.get(kind)?)?;
		if let Some(path) = &self.register_path {
			io::save_yaml(&register, path)?;
		}

		self.register = register;
		self.checkouts.remove(kind);
		info!("Committed entry {uid} of '{kind}' ({outcome:?})");
		Ok(outcome)
	}

	/// Ends a checkout without marking the entry (it was not delivered, or
	/// it was a test send).
	///
	/// # Errors
	/// Returns `LeaseMismatch` if `uid` is not the outstanding checkout of `kind`.
	pub fn release(&mut self, kind: &str, uid: Uid) -> Result<()> {
		self.ensure_checkout(kind, uid)?;
		self.checkouts.remove(kind);
		info!("Released entry {uid} of '{kind}'");
		Ok(())
	}

	/// Unused entry count per kind, as a `Remaining:` summary.
	pub fn summary(&self) -> String {
		registry::remaining_summary(&self.catalogs, &self.register)
	}

	fn ensure_checkout(&self, kind: &str, uid: Uid) -> Result<()> {
		match self.checkouts.get(kind) {
			Some(checkout) if checkout.uid == uid => Ok(()),
			_ => Err(GreetError::LeaseMismatch { kind: kind.to_owned(), uid }),
		}
	}
}
