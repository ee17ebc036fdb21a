#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed files must produce errors, never panics
    let Ok(text) = std::str::from_utf8(data) else {
        let _ = microspec::xy::read_xy(data);
        return;
    };

    if let Ok(doc) = microspec::xy::parse_xy(text) {
        let rows = doc.len();
        if let Ok(spectrum) = doc.into_spectrum() {
            assert_eq!(spectrum.len(), rows);
            assert!(spectrum.wavelengths().windows(2).all(|w| w[0] < w[1]));
        }
    }
});
