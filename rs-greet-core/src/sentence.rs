use std::collections::BTreeSet;
use std::sync::Arc;

use crate::token::{Selector, Token};

/// Generates sentences by walking a token graph from one of its roots.
///
/// # Responsibilities
/// - Hold the possible entry points (roots) of a sentence graph
/// - Pick a root with the configured strategy and render its path
///
/// Built once from an authored graph and read-only afterwards; every call
/// to `eval` makes fresh, independent choices.
#[derive(Clone, Debug, Default)]
pub struct SentenceGenerator {
	roots: Vec<Arc<Token>>,
	selector: Selector,
}

impl SentenceGenerator {
	/// Creates a generator picking uniformly between `roots`.
	pub fn new<I>(roots: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<Arc<Token>>,
	{
		Self {
			roots: roots.into_iter().map(Into::into).collect(),
			selector: Selector::Uniform,
		}
	}

	/// Replaces the root selection strategy.
	pub fn with_selector(mut self, selector: Selector) -> Self {
		self.selector = selector;
		self
	}

	pub fn roots(&self) -> &[Arc<Token>] {
		&self.roots
	}

	/// Generates one sentence.
	///
	/// Returns an empty string if there is no root.
	pub fn eval(&self) -> String {
		match self.selector.choose(&self.roots) {
			Some(root) => root.render(),
			None => String::new(),
		}
	}

	/// Lists every sentence the generator can produce.
	///
	/// Returns `None` if any reachable token has a deferred value.
	pub fn possible_sentences(&self) -> Option<BTreeSet<String>> {
		let mut sentences = BTreeSet::new();
		for root in &self.roots {
			sentences.extend(root.possible_renderings()?);
		}
		Some(sentences)
	}
}
