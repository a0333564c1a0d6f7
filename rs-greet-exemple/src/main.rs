use rs_greet_core::config::{Config, AFTERNOON_MEDIA};
use rs_greet_core::morning::{emoji_suffix, morning_sentences};
use rs_greet_core::rotation::Rotation;
use rs_greet_core::sampler::Skew;
use rs_greet_core::sentence::SentenceGenerator;
use rs_greet_core::text::DeferredText;
use rs_greet_core::token::Token;
use rs_greet_core::{generate_greeting_text, skewed_random, GreetError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go through env_logger, set RUST_LOG=info to see the register updates
    env_logger::init();

    // Generate 5 morning greetings (sentence + emoji suffix)
    for i in 0..5 {
        println!("Greeting {}: {}", i + 1, generate_greeting_text());
    }

    // Skewed sampling: p = 1 is uniform, p > 1 favors the low end of the range
    let draws: Vec<i64> = (0..10).map(|_| skewed_random(1, 10, 3.0)).collect::<Result<_, _>>()?;
    println!("Skewed draws in [1, 10] with p = 3: {:?}", draws);

    // Invalid parameters are reported, never silently fixed
    match Skew::new(0.0) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    // A small custom graph: a root token and its successors.
    // Deferred text is computed again on every render
    let laugh = DeferredText::new(|| "ja".repeat(Skew::LOW.sample(2, 6).unwrap_or(2) as usize));
    let sentences = SentenceGenerator::new([
        Token::new("Hello").add_successors([Token::new("world"), Token::new(laugh)]),
        Token::new("Bye"),
    ]);
    for _ in 0..3 {
        println!("Custom sentence: {} {}", sentences.eval(), emoji_suffix());
    }

    // Every sentence the morning graph can produce (deferred parts excluded)
    match morning_sentences().possible_sentences() {
        Some(all) => println!("Fixed morning sentences: {}", all.len()),
        None => println!("The morning graph has deferred parts, it cannot be fully enumerated"),
    }

    // Same configuration file as the server; without it the defaults apply
    // (catalogs and register under "./data")
    let config = Config::load_or_default("config.yaml")?;
    let mut rotation = Rotation::open(&config)?;
    println!("{}", rotation.summary());

    // A test send: checkout, then release (the entry stays unused)
    let lease = rotation.checkout(AFTERNOON_MEDIA)?;
    println!("Test send of {:?}", lease.entry());
    rotation.release(AFTERNOON_MEDIA, lease.uid())?;

    // A second checkout while one is outstanding is refused
    let lease = rotation.checkout(AFTERNOON_MEDIA)?;
    match rotation.checkout(AFTERNOON_MEDIA) {
        Err(GreetError::Busy(kind)) => println!("'{kind}' is busy until the first checkout ends"),
        _ => println!("Should not happen"),
    }

    // A real send: commit marks the entry as used and saves the register
    let outcome = rotation.commit(AFTERNOON_MEDIA, lease.uid())?;
    println!("Sent {} ({:?})", lease.uid(), outcome);
    println!("{}", rotation.summary());

    Ok(())
}
