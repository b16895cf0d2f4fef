use nanoid::nanoid;

/// Alphabet for device-local user identifiers (base36, lowercase).
const LOCAL_USER_ID_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
    'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const LOCAL_USER_ID_LENGTH: usize = 8;

/// Alphabet for document identifiers minted by this crate (no ambiguous glyphs).
const DOCUMENT_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const DOCUMENT_ID_LENGTH: usize = 20;

/// Mints the opaque id a device uses as its "who liked/commented" actor.
pub fn generate_local_user_id() -> String {
    nanoid!(LOCAL_USER_ID_LENGTH, LOCAL_USER_ID_ALPHABET)
}

/// Mints a document id for posts published through this crate.
pub fn generate_document_id() -> String {
    nanoid!(DOCUMENT_ID_LENGTH, DOCUMENT_ID_ALPHABET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_user_id_has_expected_length_and_charset() {
        let id = generate_local_user_id();
        assert_eq!(id.len(), LOCAL_USER_ID_LENGTH);
        assert!(id.chars().all(|c| LOCAL_USER_ID_ALPHABET.contains(&c)));
    }

    #[test]
    fn document_id_has_expected_length_and_charset() {
        let id = generate_document_id();
        assert_eq!(id.len(), DOCUMENT_ID_LENGTH);
        assert!(id.chars().all(|c| DOCUMENT_ID_ALPHABET.contains(&c)));
    }
}
