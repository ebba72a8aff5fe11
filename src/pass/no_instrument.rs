//! Opt-out naming convention for instrumentation.
//!
//! A function whose linkage name starts with [`NOINSTRUMENT_PREFIX`] is never
//! visited. For Itanium-mangled C++ names (`_Z...`) the prefix is part of the
//! encoded identifier, so it is searched for anywhere after the `_Z`.

pub const NOINSTRUMENT_PREFIX: &str = "NOINSTRUMENT_";

/// Whether `name` opts out of instrumentation.
pub fn is_no_instrument(name: &str) -> bool {
    if name.starts_with(NOINSTRUMENT_PREFIX) {
        return true;
    }
    match name.strip_prefix("_Z") {
        Some(rest) => rest.contains(NOINSTRUMENT_PREFIX),
        None => false,
    }
}

/// Name under which a helper must be emitted to stay uninstrumented.
pub fn no_instrument_name(name: &str) -> String {
    format!("{}{}", NOINSTRUMENT_PREFIX, name)
}
