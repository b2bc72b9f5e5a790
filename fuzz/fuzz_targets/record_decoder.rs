#![no_main]

use jobstats::{decode_profile, decode_stats, DecodeOptions};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Arbitrary contents, including invalid UTF-8 and truncated JSON,
    // must never panic either decoder
    let opts = DecodeOptions::default();
    let _ = decode_stats(Path::new("t0.pid1.frontend.Fuzz"), data, &opts);
    let _ = decode_profile(Path::new("profile.t0.pid1.frontend.Fuzz"), data, &opts);
});
