//! Decode command implementation.

use pubstream_protocol::{Decoded, FrameDecoder, Message, ProtocolResult};

/// Parses `NAME=VALUE` header arguments into a message on a scratch subject.
pub fn build_message(
    headers: &[String],
    body: &str,
) -> Result<Message, Box<dyn std::error::Error>> {
    let mut message = Message::new("_STREAM.decode", body.to_string());
    for header in headers {
        let (name, value) = header
            .split_once('=')
            .ok_or_else(|| format!("Header {:?} is not NAME=VALUE", header))?;
        if name.is_empty() {
            return Err(format!("Header {:?} has an empty name", header).into());
        }
        message.headers.insert(name, value);
    }
    Ok(message)
}

/// Decodes one frame for a receiver expecting `expected` next.
pub fn decode(uid: &str, expected: u64, message: Message) -> ProtocolResult<Decoded> {
    FrameDecoder::resume(uid, expected).decode(message)
}

/// Runs the decode command.
pub fn run(
    uid: &str,
    expected: u64,
    headers: &[String],
    body: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = build_message(headers, body)?;
    match decode(uid, expected, message) {
        Ok(Decoded::Frame(frame)) => {
            println!("Data frame");
            println!("  Sequence: {}", frame.sequence);
            println!("  Body:     {} bytes", frame.payload.len());
            Ok(())
        }
        Ok(Decoded::End) => {
            println!("End of stream");
            Ok(())
        }
        Err(violation) => {
            println!("Protocol violation: {}", violation);
            Err("Frame rejected".into())
        }
    }
}
