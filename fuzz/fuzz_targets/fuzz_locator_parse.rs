#![no_main]
use bucketfs::{Locator, OpenPolicy};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    path: String,
    separator: String,
    dir: bool,
    mode: String,
}

fuzz_target!(|input: Input| {
    let _ = OpenPolicy::from_mode(&input.mode);

    if let Ok(loc) = Locator::parse(&input.path, &input.separator, input.dir) {
        assert!(!loc.bucket.is_empty());
        if !input.separator.is_empty() {
            assert!(!loc.key.starts_with(input.separator.as_str()));
            if !input.dir {
                assert!(!loc.key.ends_with(input.separator.as_str()));
            }
        }
    }
});
