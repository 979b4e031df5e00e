use signatory_rs::{
    logsignature_channels, lyndon_brackets, lyndon_words, lyndon_words_to_basis_transform,
    signature_channels,
};
use std::env;

/// Prints the Lyndon words, their standard bracketing and the basis transform.
///
/// Usage: cargo run --example lyndon [channels] [depth]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let parse = |i: usize, default: usize| {
        args.get(i).map_or(default, |s| {
            s.parse().unwrap_or_else(|_| {
                eprintln!("Expected a positive integer, got \"{}\".", s);
                std::process::exit(1);
            })
        })
    };
    let channels = parse(1, 2);
    let depth = parse(2, 4);

    let words = lyndon_words(channels, depth).unwrap_or_else(|err| {
        eprintln!("{}", err);
        std::process::exit(1);
    });
    let brackets = lyndon_brackets(channels, depth).expect("valid after lyndon_words");
    let transforms =
        lyndon_words_to_basis_transform(channels, depth).expect("valid after lyndon_words");

    println!("=== Dimensions ===");
    println!(
        "Signature channels: {}",
        signature_channels(channels, depth).expect("valid after lyndon_words")
    );
    println!(
        "Log-signature channels: {}",
        logsignature_channels(channels, depth).expect("valid after lyndon_words")
    );

    println!("\n=== Lyndon words ===");
    for (i, (word, bracket)) in words.iter().zip(&brackets).enumerate() {
        let letters: String = word.iter().map(|l| l.to_string()).collect();
        println!("{:>4}  {:<8} {}", i, letters, bracket);
    }

    println!("\n=== Basis transform (non-diagonal entries) ===");
    for entry in transforms.iter().filter(|t| t.coefficient != 1) {
        println!(
            "lyndon {:>3}  word {:>4}  coefficient {:>3}",
            entry.lyndon_index, entry.word_index, entry.coefficient
        );
    }
}
