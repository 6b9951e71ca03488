//! Mapping declaration fuzz target: feed arbitrary strings to the tag parser.
//! Parsing must not panic; it returns a FieldSpec or a TagError.
//! Build with: cargo fuzz run tag_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(spec) = scim_marshal::FieldSpec::parse("field", Some(s)) {
        let _ = scim_marshal::tag::slots(&spec.indexes);
        let _ = spec.shape();
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run tag_fuzz");
}
