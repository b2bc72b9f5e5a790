#![no_main]

use jobstats::NamingScheme;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        for scheme in [NamingScheme::DottedV1, NamingScheme::SwiftV1, NamingScheme::Auto] {
            let _ = scheme.classify(name, true);
        }
    }
});
