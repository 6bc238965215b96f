//! Subject command implementation.

use pubstream_core::{CryptoRandom, FastRandom, ReplySubject};
use pubstream_protocol::{is_valid_subject, new_uid};

/// Generates `count` values with the named strategy.
pub fn generate(
    strategy: &str,
    prefix: &str,
    count: usize,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if strategy != "uid" && !is_valid_subject(prefix) {
        return Err(format!("Invalid subject prefix {:?}", prefix).into());
    }
    let values = match strategy {
        "fast" => {
            let generator = FastRandom::new(prefix);
            (0..count).map(|_| generator.reply_subject()).collect()
        }
        "crypto" => {
            let generator = CryptoRandom::new(prefix);
            (0..count).map(|_| generator.reply_subject()).collect()
        }
        "uid" => (0..count).map(|_| new_uid()).collect(),
        other => return Err(format!("Unknown strategy {:?} (fast, crypto, uid)", other).into()),
    };
    Ok(values)
}

/// Runs the subject command.
pub fn run(strategy: &str, prefix: &str, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    for value in generate(strategy, prefix, count)? {
        println!("{}", value);
    }
    Ok(())
}
