#![no_main]

use formstate_doc::Path;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let path = Path::parse(raw);
    assert_eq!(path.to_string(), raw);
    assert_eq!(Path::parse(&path.to_string()), path);
    if let Some(parent) = path.parent() {
        assert!(parent.is_prefix_of(&path));
        assert_eq!(parent.len() + 1, path.len());
    }
});
