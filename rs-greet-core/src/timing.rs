use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GreetError, Result};

/// A time of day with second precision, written `HH:MM:SS`.
///
/// Defaults to midnight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
	/// Creates a time of day.
	///
	/// # Errors
	/// Returns `InvalidTime` if a field is out of range.
	pub fn from_hms(hour: u32, minute: u32, second: u32) -> Result<Self> {
		NaiveTime::from_hms_opt(hour, minute, second)
			.map(Self)
			.ok_or_else(|| GreetError::InvalidTime(format!("{hour}:{minute}:{second}")))
	}

	/// Parses `HH:MM:SS`.
	///
	/// # Errors
	/// Returns `InvalidTime` unless the text has exactly three numeric
	/// fields forming a valid time of day.
	pub fn parse(text: &str) -> Result<Self> {
		let invalid = || GreetError::InvalidTime(text.to_owned());

		let fields = text
			.split(':')
			.map(|field| field.trim().parse::<u32>().map_err(|_| invalid()))
			.collect::<Result<Vec<_>>>()?;
		match fields[..] {
			[hour, minute, second] => Self::from_hms(hour, minute, second).map_err(|_| invalid()),
			_ => Err(invalid()),
		}
	}

	pub fn time(&self) -> NaiveTime {
		self.0
	}

	/// Seconds elapsed since midnight.
	pub fn seconds(&self) -> u32 {
		self.0.num_seconds_from_midnight()
	}

	fn from_seconds(seconds: u32) -> Result<Self> {
		NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
			.map(Self)
			.ok_or_else(|| GreetError::InvalidTime(seconds.to_string()))
	}
}

impl fmt::Display for TimeOfDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.format("%H:%M:%S"))
	}
}

impl FromStr for TimeOfDay {
	type Err = GreetError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl TryFrom<String> for TimeOfDay {
	type Error = GreetError;

	fn try_from(value: String) -> Result<Self> {
		Self::parse(&value)
	}
}

impl From<TimeOfDay> for String {
	fn from(value: TimeOfDay) -> Self {
		value.to_string()
	}
}

/// Draws a time uniformly in `[start, end]` (both inclusive, whole seconds).
///
/// # Errors
/// Returns `InvalidWindow` if `start` is after `end`.
pub fn random_time_with<R: Rng + ?Sized>(rng: &mut R, start: TimeOfDay, end: TimeOfDay) -> Result<TimeOfDay> {
	if start > end {
		return Err(GreetError::InvalidWindow { start: start.to_string(), end: end.to_string() });
	}
	TimeOfDay::from_seconds(rng.random_range(start.seconds()..=end.seconds()))
}

/// Same as [`random_time_with`], using the thread-local generator.
pub fn random_time(start: TimeOfDay, end: TimeOfDay) -> Result<TimeOfDay> {
	random_time_with(&mut rand::rng(), start, end)
}

/// Returns the next date and time at which the clock shows `at`.
///
/// - `try_today`: today if `at` is still ahead of `now`, tomorrow otherwise.
/// - Otherwise: tomorrow, never today.
pub fn next_occurrence(now: NaiveDateTime, at: TimeOfDay, try_today: bool) -> Result<NaiveDateTime> {
	let out_of_range = || GreetError::DateOutOfRange(now.to_string());

	let day = if try_today { Some(now.date()) } else { now.date().succ_opt() };
	let candidate = day.ok_or_else(out_of_range)?.and_time(at.time());
	if candidate >= now {
		return Ok(candidate);
	}
	candidate.checked_add_signed(TimeDelta::days(1)).ok_or_else(out_of_range)
}

/// A daily window in which an event is planned at a random time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
	pub start_time: TimeOfDay,
	pub end_time: TimeOfDay,
}

impl TimeWindow {
	/// Creates a window.
	///
	/// # Errors
	/// Returns `InvalidWindow` if `start_time` is after `end_time`.
	pub fn new(start_time: TimeOfDay, end_time: TimeOfDay) -> Result<Self> {
		if start_time > end_time {
			return Err(GreetError::InvalidWindow { start: start_time.to_string(), end: end_time.to_string() });
		}
		Ok(Self { start_time, end_time })
	}

	/// Draws a random time of day inside the window.
	pub fn pick(&self) -> Result<TimeOfDay> {
		random_time(self.start_time, self.end_time)
	}
}

/// Next planned run of every named window.
///
/// Owned by whoever plans the runs; readers only get copies of the planned
/// times.
#[derive(Debug, Default)]
pub struct ScheduleBoard {
	next: BTreeMap<String, NaiveDateTime>,
}

impl ScheduleBoard {
	pub fn new() -> Self {
		Self::default()
	}

	/// Plans the next run of `name` at a random time of `window` and records it.
	///
	/// See [`next_occurrence`] for `try_today`.
	pub fn plan(&mut self, name: &str, window: &TimeWindow, now: NaiveDateTime, try_today: bool) -> Result<NaiveDateTime> {
		let at = next_occurrence(now, window.pick()?, try_today)?;
		info!("Next '{name}' planned for {at}");
		self.next.insert(name.to_owned(), at);
		Ok(at)
	}

	/// Returns the planned run of `name`, if any.
	pub fn next(&self, name: &str) -> Option<NaiveDateTime> {
		self.next.get(name).copied()
	}
}
