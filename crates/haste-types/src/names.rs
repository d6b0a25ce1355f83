//! Tag and uid validation.
//!
//! An identifier `tag-uid` doubles as the stem of the record file in a
//! filesystem-backed store, and identifier parsing splits at the *first*
//! separator. Both components are therefore restricted:
//!
//! - Tags must be non-empty, must not contain the separator `-`, and must
//!   not contain filesystem-hostile or invisible characters.
//! - Uids must be non-empty and obey the same character rules, except that
//!   `-` is allowed (uuid v7 renders with hyphens).

use crate::error::TypeError;

/// The character joining tag and uid in an identifier.
pub const IDENTIFIER_SEPARATOR: char = '-';

/// Characters that are forbidden anywhere in a tag or uid.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '.', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Validate a tag, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use haste_types::validate_tag;
///
/// assert!(validate_tag("Object").is_ok());
/// assert!(validate_tag("Book").is_ok());
/// assert!(validate_tag("").is_err());
/// assert!(validate_tag("Pet-Shop").is_err());
/// ```
pub fn validate_tag(tag: &str) -> Result<(), TypeError> {
    if tag.is_empty() {
        return Err(TypeError::InvalidTag {
            tag: tag.to_string(),
            reason: "tag must not be empty".into(),
        });
    }

    if tag.contains(IDENTIFIER_SEPARATOR) {
        return Err(TypeError::InvalidTag {
            tag: tag.to_string(),
            reason: format!("must not contain the identifier separator {IDENTIFIER_SEPARATOR:?}"),
        });
    }

    if let Err(reason) = check_chars(tag) {
        return Err(TypeError::InvalidTag {
            tag: tag.to_string(),
            reason,
        });
    }

    Ok(())
}

/// Validate a uid, returning `Ok(())` if valid.
pub fn validate_uid(uid: &str) -> Result<(), TypeError> {
    if uid.is_empty() {
        return Err(TypeError::InvalidIdentifier {
            input: uid.to_string(),
            reason: "uid must not be empty".into(),
        });
    }

    if let Err(reason) = check_chars(uid) {
        return Err(TypeError::InvalidIdentifier {
            input: uid.to_string(),
            reason,
        });
    }

    Ok(())
}

fn check_chars(component: &str) -> Result<(), String> {
    for ch in FORBIDDEN_CHARS {
        if component.contains(*ch) {
            return Err(format!("contains forbidden character: {ch:?}"));
        }
    }

    if component.chars().any(char::is_whitespace) {
        return Err("must not contain whitespace".into());
    }

    if component.chars().any(char::is_control) {
        return Err("must not contain control characters".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tags_are_valid() {
        for tag in ["Object", "Book", "Person", "Pet", "a", "Tag2"] {
            assert!(validate_tag(tag).is_ok(), "expected {tag:?} to be valid");
        }
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert!(validate_tag("").is_err());
    }

    #[test]
    fn separator_in_tag_is_rejected() {
        assert!(validate_tag("Pet-Shop").is_err());
    }

    #[test]
    fn path_characters_are_rejected() {
        for tag in ["a/b", "a\\b", "a.b", "a:b", "a*b"] {
            assert!(validate_tag(tag).is_err(), "expected {tag:?} to be invalid");
        }
    }

    #[test]
    fn whitespace_and_control_are_rejected() {
        assert!(validate_tag("two words").is_err());
        assert!(validate_tag("tab\there").is_err());
        assert!(validate_tag("bell\u{7}").is_err());
    }

    #[test]
    fn uid_allows_hyphens() {
        assert!(validate_uid("0192b1c4-7f7e-7c1a-9b9a-1234567890ab").is_ok());
        assert!(validate_uid("1").is_ok());
    }

    #[test]
    fn empty_uid_is_rejected() {
        assert!(validate_uid("").is_err());
    }

    #[test]
    fn uid_with_path_characters_is_rejected() {
        assert!(validate_uid("../escape").is_err());
    }
}
