use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::sampler::Skew;
use crate::text::TokenValue;

/// Strategy used to pick one item out of a non-empty list.
///
/// Used both for choosing the successor of a token and for choosing the
/// root of a sentence.
///
/// # Variants
/// - `Uniform`: every item has the same probability (default).
/// - `Skewed(Skew)`: index drawn with a power-law skew, favouring the
///   beginning of the list for exponents > 1.
/// - `Custom(..)`: user function mapping the number of items to an index.
///   Out-of-range indices are clamped to the last item.
#[derive(Clone, Default)]
pub enum Selector {
	#[default]
	Uniform,
	Skewed(Skew),
	Custom(Arc<dyn Fn(usize) -> usize + Send + Sync>),
}

impl Selector {
	/// Creates a custom selector from an index function.
	pub fn custom<F>(pick: F) -> Self
	where
		F: Fn(usize) -> usize + Send + Sync + 'static,
	{
		Selector::Custom(Arc::new(pick))
	}

	/// Picks one item using the thread-local generator.
	///
	/// Returns `None` if `items` is empty.
	pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
		self.choose_with(&mut rand::rng(), items)
	}

	/// Picks one item using `rng` for the random strategies.
	///
	/// Returns `None` if `items` is empty.
	pub fn choose_with<'a, T, R: Rng + ?Sized>(&self, rng: &mut R, items: &'a [T]) -> Option<&'a T> {
		let len = items.len();
		if len == 0 {
			return None;
		}
		let index = match self {
			Selector::Uniform => rng.random_range(0..len),
			Selector::Skewed(skew) => skew.index(rng, len)?,
			Selector::Custom(pick) => pick(len).min(len - 1),
		};
		items.get(index)
	}
}

impl fmt::Debug for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Selector::Uniform => f.write_str("Uniform"),
			Selector::Skewed(skew) => f.debug_tuple("Skewed").field(skew).finish(),
			Selector::Custom(_) => f.write_str("Custom(..)"),
		}
	}
}

/// Joins two rendered fragments with a single space, only when both are
/// non-empty.
pub(crate) fn join_fragments(left: &str, right: &str) -> String {
	match (left.is_empty(), right.is_empty()) {
		(true, _) => right.to_owned(),
		(_, true) => left.to_owned(),
		_ => format!("{left} {right}"),
	}
}

/// A node of a sentence graph.
///
/// A token holds a value (fixed or deferred text), the tokens that may
/// follow it and the strategy used to pick one of them. Rendering a token
/// walks the graph from this node until a leaf is reached.
///
/// Tokens are built bottom-up with the builder methods, then shared as
/// `Arc<Token>` between as many parents as needed. Once shared, a token is
/// immutable, so a graph built this way never contains a cycle.
///
/// # Invariants
/// - A token without successors is a leaf; rendering stops there
/// - An empty value renders as nothing, without adding whitespace
#[derive(Clone, Debug)]
pub struct Token {
	value: TokenValue,
	successors: Vec<Arc<Token>>,
	selector: Selector,
}

impl Token {
	/// Creates a leaf token with the default (uniform) successor selection.
	pub fn new(value: impl Into<TokenValue>) -> Self {
		Self { value: value.into(), successors: Vec::new(), selector: Selector::Uniform }
	}

	/// Replaces the successor selection strategy.
	pub fn with_selector(mut self, selector: Selector) -> Self {
		self.selector = selector;
		self
	}

	/// Adds a possible successor.
	///
	/// Returns itself to allow chaining.
	pub fn add_successor(mut self, next: impl Into<Arc<Token>>) -> Self {
		self.successors.push(next.into());
		self
	}

	/// Adds several possible successors, keeping their order.
	///
	/// Returns itself to allow chaining.
	pub fn add_successors<I>(mut self, next: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<Arc<Token>>,
	{
		self.successors.extend(next.into_iter().map(Into::into));
		self
	}

	/// Wraps the token so it can be shared between several parents.
	pub fn shared(self) -> Arc<Token> {
		Arc::new(self)
	}

	pub fn value(&self) -> &TokenValue {
		&self.value
	}

	pub fn successors(&self) -> &[Arc<Token>] {
		&self.successors
	}

	pub fn is_leaf(&self) -> bool {
		self.successors.is_empty()
	}

	/// Picks the next token, if any, with this token's strategy.
	pub fn next(&self) -> Option<&Arc<Token>> {
		self.selector.choose(&self.successors)
	}

	/// Renders this token and one randomly chosen path below it.
	///
	/// Each non-empty fragment along the path is separated by a single
	/// space. Deferred values are evaluated once, at this point.
	pub fn render(&self) -> String {
		let mut parts: Vec<String> = Vec::new();
		let mut current = self;
		loop {
			let text = current.value.render();
			if !text.is_empty() {
				parts.push(text);
			}
			match current.next() {
				Some(next) => current = next,
				None => break,
			}
		}
		parts.join(" ")
	}

	/// Lists every string this token can render to.
	///
	/// Returns `None` if a deferred value is reachable, since its output
	/// cannot be enumerated.
	///
	/// # Notes
	/// - Every successor is considered reachable, whatever the strategy.
	/// - The cost grows with the number of distinct paths.
	pub fn possible_renderings(&self) -> Option<BTreeSet<String>> {
		let left = self.value.as_literal()?;
		if self.is_leaf() {
			return Some(BTreeSet::from([left.to_owned()]));
		}

		let mut renderings = BTreeSet::new();
		for next in &self.successors {
			for right in next.possible_renderings()? {
				renderings.insert(join_fragments(left, &right));
			}
		}
		Some(renderings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::text::DeferredText;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	#[test]
	fn test_leaf_renders_value() {
		assert_eq!(Token::new("Hola").render(), "Hola");
		assert!(Token::new("Hola").is_leaf());
		assert!(Token::new("Hola").next().is_none());
	}

	#[test]
	fn test_empty_successor_adds_no_space() {
		let wenas = Token::new("Wenas").add_successor(Token::new(""));
		assert_eq!(wenas.render(), "Wenas");
	}

	#[test]
	fn test_empty_middle_token() {
		let token = Token::new("a").add_successor(Token::new("").add_successor(Token::new("b")));
		assert_eq!(token.render(), "a b");
		let token = Token::new("").add_successor(Token::new("b"));
		assert_eq!(token.render(), "b");
	}

	#[test]
	fn test_chain() {
		let token = Token::new("Good")
			.add_successor(Token::new("morning").add_successor(Token::new("my love")));
		assert_eq!(token.render(), "Good morning my love");
	}

	#[test]
	fn test_builder_keeps_order() {
		let token = Token::new("x").add_successors([Token::new("a"), Token::new("b")]).add_successor(Token::new("c"));
		let values: Vec<_> = token.successors().iter().map(|t| t.value().render()).collect();
		assert_eq!(values, ["a", "b", "c"]);
	}

	#[test]
	fn test_shared_successor() {
		let leaf = Token::new("amor").shared();
		let a = Token::new("Hola").add_successor(Arc::clone(&leaf));
		let b = Token::new("Jelou").add_successor(leaf);
		assert_eq!(a.render(), "Hola amor");
		assert_eq!(b.render(), "Jelou amor");
	}

	#[test]
	fn test_custom_selector() {
		let token = Token::new("x")
			.add_successors([Token::new("first"), Token::new("last")])
			.with_selector(Selector::custom(|len| len - 1));
		for _ in 0..20 {
			assert_eq!(token.render(), "x last");
		}
		let clamped = Selector::custom(|_| 100);
		assert_eq!(clamped.choose(&[1, 2, 3]), Some(&3));
	}

	#[test]
	fn test_selector_empty() {
		let items: [u8; 0] = [];
		assert!(Selector::Uniform.choose(&items).is_none());
		assert!(Selector::Skewed(Skew::LOW).choose(&items).is_none());
		assert!(Selector::custom(|_| 0).choose(&items).is_none());
	}

	#[test]
	fn test_skewed_selector_prefers_first() {
		let mut rng = StdRng::seed_from_u64(3);
		let selector = Selector::Skewed(Skew::new(4.0).unwrap());
		let items = [0, 1];
		let firsts = (0..10_000)
			.filter(|_| selector.choose_with(&mut rng, &items) == Some(&0))
			.count();
		// P(first) = 0.5^(1/4) ≈ 0.84
		assert!(firsts > 7_500, "{firsts}");
	}

	#[test]
	fn test_uniform_selector_reaches_all() {
		let mut rng = StdRng::seed_from_u64(11);
		let items = ["a", "b", "c"];
		let seen: BTreeSet<_> = (0..300)
			.filter_map(|_| Selector::Uniform.choose_with(&mut rng, &items))
			.collect();
		assert_eq!(seen.len(), 3);
	}

	#[test]
	fn test_deferred_is_rendered_each_time() {
		use std::sync::atomic::{AtomicUsize, Ordering};
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let token = Token::new(DeferredText::new(move || {
			format!("n{}", counter.fetch_add(1, Ordering::SeqCst))
		}));
		assert_eq!(token.render(), "n0");
		assert_eq!(token.render(), "n1");
		assert!(token.possible_renderings().is_none());
	}

	#[test]
	fn test_possible_renderings() {
		let token = Token::new("Wenas")
			.add_successors([Token::new("amor").add_successors([Token::new(""), Token::new("wenas")]), Token::new("")]);
		let expected: BTreeSet<String> = ["Wenas", "Wenas amor", "Wenas amor wenas"]
			.into_iter()
			.map(str::to_owned)
			.collect();
		assert_eq!(token.possible_renderings().unwrap(), expected);
		for _ in 0..200 {
			assert!(expected.contains(&token.render()));
		}
	}

	#[test]
	fn test_join_fragments() {
		assert_eq!(join_fragments("", ""), "");
		assert_eq!(join_fragments("a", ""), "a");
		assert_eq!(join_fragments("", "b"), "b");
		assert_eq!(join_fragments("a", "b"), "a b");
	}
}
