// Row identifier generation.
//
// Every record the adapters persist gets a URL-safe nanoid.

/// A fresh 21-character nanoid.
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

/// A fresh nanoid of the given length, for callers that want longer opaque
/// handles (checkout sessions).
pub fn generate_id_with_length(len: usize) -> String {
    nanoid::nanoid!(len)
}
