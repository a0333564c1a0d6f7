use std::fmt;
use std::sync::Arc;

/// Text produced on demand by a generator function.
///
/// The wrapped function runs every time the text is rendered, never when
/// the node is built, so any randomness it draws is fresh per render.
/// Nothing is cached.
///
/// Cloning is cheap: clones share the same generator function.
#[derive(Clone)]
pub struct DeferredText {
	generator: Arc<dyn Fn() -> String + Send + Sync>,
}

impl DeferredText {
	/// Creates deferred text from a zero-argument generator.
	pub fn new<F>(generator: F) -> Self
	where
		F: Fn() -> String + Send + Sync + 'static,
	{
		Self { generator: Arc::new(generator) }
	}

	/// Runs the generator and returns its output verbatim.
	pub fn render(&self) -> String {
		(self.generator)()
	}
}

impl fmt::Debug for DeferredText {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("DeferredText(..)")
	}
}

/// Value held by a token: either fixed text or deferred text.
#[derive(Clone, Debug)]
pub enum TokenValue {
	Literal(String),
	Deferred(DeferredText),
}

impl TokenValue {
	/// Renders the value to a string.
	pub fn render(&self) -> String {
		match self {
			TokenValue::Literal(s) => s.clone(),
			TokenValue::Deferred(d) => d.render(),
		}
	}

	/// Returns the literal text, or `None` for deferred values.
	pub fn as_literal(&self) -> Option<&str> {
		match self {
			TokenValue::Literal(s) => Some(s),
			TokenValue::Deferred(_) => None,
		}
	}
}

impl From<&str> for TokenValue {
	fn from(value: &str) -> Self {
		TokenValue::Literal(value.to_owned())
	}
}

impl From<String> for TokenValue {
	fn from(value: String) -> Self {
		TokenValue::Literal(value)
	}
}

impl From<DeferredText> for TokenValue {
	fn from(value: DeferredText) -> Self {
		TokenValue::Deferred(value)
	}
}
