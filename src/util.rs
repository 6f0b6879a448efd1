use std::ascii;

/// Renders protocol bytes for logs, escaping CR, LF and anything else that
/// isn't printable ASCII.
pub fn bytes_to_human_str(input: &[u8]) -> String {
    input
        .iter()
        .flat_map(|&c| ascii::escape_default(c))
        .map(char::from)
        .collect()
}
