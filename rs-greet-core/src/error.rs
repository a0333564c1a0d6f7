use thiserror::Error;

/// Errors raised by the generation and rotation core.
///
/// None of these are transient: they describe a broken local contract
/// (bad arguments, bad configuration, or a register out of sync with its
/// catalog) and are propagated to the caller untouched.
#[derive(Error, Debug)]
pub enum GreetError {
	#[error("Skew exponent must be a finite number > 0, got {0}")]
	InvalidSkew(f64),

	#[error("Invalid range [{a}, {b}]")]
	InvalidRange { a: i64, b: i64 },

	#[error("Catalog '{0}' has no entries")]
	EmptyCatalog(String),

	#[error("No unused entry left in catalog '{0}' (register was not reset)")]
	Exhausted(String),

	#[error("Unknown catalog kind '{0}'")]
	UnknownKind(String),

	#[error("Entry {uid} is not part of catalog '{kind}'")]
	UnknownEntry { kind: String, uid: u64 },

	#[error("Catalog '{0}' already has an outstanding checkout")]
	Busy(String),

	#[error("No outstanding checkout of entry {uid} in catalog '{kind}'")]
	LeaseMismatch { kind: String, uid: u64 },

	#[error("Duplicate catalog kind '{0}'")]
	DuplicateKind(String),

	#[error("Duplicate uid {uid} in catalog '{kind}'")]
	DuplicateUid { kind: String, uid: u64 },

	#[error("Unknown time window '{0}'")]
	UnknownWindow(String),

	#[error("Time window starts after it ends ({start} > {end})")]
	InvalidWindow { start: String, end: String },

	#[error("Invalid time '{0}', expected HH:MM:SS")]
	InvalidTime(String),

	#[error("Date out of range after {0}")]
	DateOutOfRange(String),

	#[error("File reference is not Latin-1 text")]
	InvalidFileReference,

	#[error("Entry {0} has no sticker payload")]
	NotASticker(u64),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, GreetError>;
