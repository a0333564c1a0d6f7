//! The authored morning greeting graph.
//!
//! Greetings are made of an opening word (Spanish, English, Swedish,
//! French, Italian or a mix of them) followed by a term of endearment, then
//! a short random run of emoji. Some words are stretched at render time
//! ("Holaaa", "amooor") by a low-biased random amount.

use std::sync::{Arc, LazyLock};

use log::debug;

use crate::sampler::Skew;
use crate::sentence::SentenceGenerator;
use crate::text::DeferredText;
use crate::token::{Selector, Token};

/// One emoji position of the greeting suffix.
///
/// The first choice is always the empty string; the skew decides how often
/// the slot stays empty (higher exponent = emptier).
#[derive(Debug)]
pub struct EmojiSlot {
	pub choices: &'static [&'static str],
	pub skew: Skew,
}

impl EmojiSlot {
	fn draw(&self) -> &'static str {
		self.skew
			.index(&mut rand::rng(), self.choices.len())
			.and_then(|i| self.choices.get(i))
			.copied()
			.unwrap_or_default()
	}
}

pub const EMOJI_SLOTS: [EmojiSlot; 6] = [
	EmojiSlot { choices: &["", "\u{1f44b}", "\u{270c}"], skew: Skew::fixed(3.5) },
	EmojiSlot { choices: &["", "\u{1f61b}", "\u{1f61d}", "\u{1f92a}", "\u{1f60b}"], skew: Skew::fixed(5.0) },
	EmojiSlot { choices: &["", "\u{1f643}", "\u{1f601}", "\u{1f604}", "\u{1f603}"], skew: Skew::fixed(4.0) },
	EmojiSlot {
		choices: &["", "\u{1f917}", "\u{1f61a}", "\u{1f60a}", "\u{263a}", "\u{1f92d}"],
		skew: Skew::fixed(3.0),
	},
	EmojiSlot { choices: &["", "\u{1f970}", "\u{1f618}"], skew: Skew::fixed(1.3) },
	EmojiSlot { choices: &["", "\u{1faf6}", "\u{2764}"], skew: Skew::fixed(2.0) },
];

/// Builds `prefix` + `run` repeated 1..=max times + `suffix`, drawn with the
/// default low skew on every render.
fn stretched(prefix: &'static str, run: char, suffix: &'static str, max: u64) -> DeferredText {
	DeferredText::new(move || {
		let count = 1 + Skew::LOW.offset(&mut rand::rng(), max).unwrap_or(0);
		let mut text = String::from(prefix);
		text.extend(std::iter::repeat_n(run, count as usize));
		text.push_str(suffix);
		text
	})
}

/// Builds the morning sentence graph.
pub fn morning_sentences() -> SentenceGenerator {
	let amooor = Token::new(stretched("am", 'o', "r", 10)).shared();
	let mi_amooor = Token::new(stretched("mi am", 'o', "r", 10)).shared();
	let amorcitaaa = Token::new(stretched("amorcit", 'a', "", 10)).shared();
	let mi_amorcitaaa = Token::new(stretched("mi amorcit", 'a', "", 10)).shared();
	let amorcitooo = Token::new(stretched("amorcit", 'o', "", 10)).shared();
	let mi_amorcitooo = Token::new(stretched("mi amorcit", 'o', "", 10)).shared();
	let mailob = Token::new("mailob").shared();
	let my_love = Token::new("my love").shared();
	let preciosura_tropical = Token::new("preciosura tropical").shared();

	let right_part: Vec<Arc<Token>> = vec![
		amooor,
		mi_amooor,
		amorcitaaa,
		mi_amorcitaaa,
		amorcitooo,
		mi_amorcitooo,
		mailob,
		my_love,
		Arc::clone(&preciosura_tropical),
	];

	// "Wenas amor" is sometimes echoed: "Wenas amor wenaaas"
	let echoed = right_part.iter().map(|token| {
		Token::new(token.value().clone())
			.with_selector(Selector::Skewed(Skew::LOW))
			.add_successors([Token::new(""), Token::new(stretched("wen", 'a', "s", 5))])
	});

	let roots = [
		Token::new(stretched("Hol", 'a', "", 10)).add_successors(right_part.clone()),
		Token::new("Buenos días")
			.add_successors(right_part.clone())
			.add_successors([Token::new("señorita"), Token::new("princesita")]),
		Token::new("Wenas").add_successors(echoed).add_successor(preciosura_tropical),
		Token::new("Güenas").add_successors(right_part.clone()),
		Token::new("Jelou").add_successors(right_part.clone()),
		Token::new("Gusmornin").add_successors(right_part.clone()),
		Token::new("Good morning").add_successors(right_part.clone()),
		Token::new("God morgon").add_successors(right_part).add_successor(Token::new("prinsessa")),
		Token::new("Bonjour").add_successors([Token::new("mademoiselle"), Token::new("princesse")]),
		Token::new("Buongiorno").add_successors([Token::new("principessa"), Token::new("signorina")]),
	];

	SentenceGenerator::new(roots)
}

static MORNING: LazyLock<SentenceGenerator> = LazyLock::new(morning_sentences);

/// Returns a random, non-empty run of emoji.
///
/// Each slot of [`EMOJI_SLOTS`] is drawn independently; the whole draw is
/// repeated while every slot came out empty.
pub fn emoji_suffix() -> String {
	loop {
		let emojis: String = EMOJI_SLOTS.iter().map(EmojiSlot::draw).collect();
		if !emojis.is_empty() {
			return emojis;
		}
	}
}

/// Renders a sentence from `sentences` followed by an emoji suffix.
pub fn greeting_with(sentences: &SentenceGenerator) -> String {
	format!("{} {}", sentences.eval(), emoji_suffix())
}

/// Generates a morning greeting, e.g. `"Holaaa mi amooor 👋🥰"`.
pub fn generate_greeting_text() -> String {
	let greeting = greeting_with(&MORNING);
	debug!("Generated greeting: {greeting}");
	greeting
}
