//! Fuzz target for Archive::open with arbitrary byte input.
//!
//! Exercises magic detection, header decoding, name handling and hardlink
//! resolution with malformed or adversarial input, looking for panics and
//! hangs.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use std::io::{Cursor, Read};

use cpioarc::{Archive, ReadOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = ReadOptions::new().verify_checksums(false);
    let Ok(mut archive) = Archive::open_with(Cursor::new(data), options) else {
        return;
    };

    let names: Vec<String> = archive.names().into_iter().map(str::to_owned).collect();
    for name in names {
        if let Ok(mut reader) = archive.member_reader(&name) {
            let mut sink = Vec::new();
            let _ = reader.by_ref().take(1 << 16).read_to_end(&mut sink);
        }
    }
    let _ = archive.close();
});
