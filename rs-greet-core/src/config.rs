use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{GreetError, Result};
use crate::io;
use crate::rotation::DEFAULT_LEASE_TIMEOUT;
use crate::timing::{TimeOfDay, TimeWindow};

/// Window name of the morning greeting.
pub const MORNING_GREETING: &str = "morning_greeting";
/// Window name of the afternoon media.
pub const AFTERNOON_MEDIA: &str = "afternoon_media";

/// Application configuration, read from a YAML file.
///
/// Every field has a default, so an empty file (or no file at all) is a
/// valid configuration.
///
/// # Example
/// ```yaml
/// data_dir: ./data
/// catalog_dir: catalogs
/// register: register.yaml
/// lease_timeout_secs: 300
/// server:
///   host: 127.0.0.1
///   port: 5000
/// windows:
///   morning_greeting: { start_time: "07:30:00", end_time: "09:00:00" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Root of all data files.
	pub data_dir: PathBuf,
	/// Folder of catalog YAML files, relative to `data_dir`.
	pub catalog_dir: PathBuf,
	/// Usage register file, relative to `data_dir`.
	pub register: PathBuf,
	/// Seconds after which an uncommitted checkout is abandoned.
	pub lease_timeout_secs: u64,
	pub server: ServerConfig,
	/// Daily windows, by name.
	pub windows: BTreeMap<String, TimeWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self { host: String::from("127.0.0.1"), port: 5000 }
	}
}

impl Default for Config {
	fn default() -> Self {
		let window = |start: (u32, u32), end: (u32, u32)| TimeWindow {
			start_time: TimeOfDay::from_hms(start.0, start.1, 0).unwrap_or_default(),
			end_time: TimeOfDay::from_hms(end.0, end.1, 0).unwrap_or_default(),
		};

		Self {
			data_dir: PathBuf::from("./data"),
			catalog_dir: PathBuf::from("catalogs"),
			register: PathBuf::from("register.yaml"),
			lease_timeout_secs: DEFAULT_LEASE_TIMEOUT.as_secs(),
			server: ServerConfig::default(),
			windows: BTreeMap::from([
				(MORNING_GREETING.to_owned(), window((7, 30), (9, 0))),
				(AFTERNOON_MEDIA.to_owned(), window((14, 0), (16, 0))),
			]),
		}
	}
}

impl Config {
	/// Loads the configuration from a YAML file.
	///
	/// # Errors
	/// - I/O or parse errors.
	/// - `InvalidWindow` if a window starts after it ends.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let contents = fs::read_to_string(path.as_ref())?;
		let config: Config = if contents.trim().is_empty() {
			Config::default()
		} else {
			serde_yaml::from_str(&contents)?
		};
		config.validate()?;
		info!("Configuration loaded from {}", path.as_ref().display());
		Ok(config)
	}

	/// Same as [`Config::load`], falling back to the defaults if the file
	/// does not exist.
	pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
		if path.as_ref().exists() {
			Self::load(path)
		} else {
			info!("No configuration at {}, using defaults", path.as_ref().display());
			Ok(Self::default())
		}
	}

	fn validate(&self) -> Result<()> {
		for window in self.windows.values() {
			TimeWindow::new(window.start_time, window.end_time)?;
		}
		Ok(())
	}

	/// Folder holding the catalog files.
	pub fn catalog_path(&self) -> PathBuf {
		io::normalize_folder(&self.data_dir).join(&self.catalog_dir)
	}

	/// Path of the usage register file.
	pub fn register_path(&self) -> PathBuf {
		io::normalize_folder(&self.data_dir).join(&self.register)
	}

	pub fn lease_timeout(&self) -> Duration {
		Duration::from_secs(self.lease_timeout_secs)
	}

	/// Returns the window of the given name.
	///
	/// # Errors
	/// Returns `UnknownWindow` if it is not configured.
	pub fn window(&self, name: &str) -> Result<&TimeWindow> {
		self.windows.get(name).ok_or_else(|| GreetError::UnknownWindow(name.to_owned()))
	}
}
