use std::sync::LazyLock;

use regex::Regex;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PHONE_MESSAGE: &str = "Please enter a valid phone number";

/// Fewest digits a phone number may carry once punctuation is stripped.
pub const MIN_PHONE_DIGITS: usize = 10;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));
static PHONE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\s\-()+]+$").expect("phone pattern compiles"));

/// Which format rule, if any, applies to a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Email,
    Telephone,
    Other,
}

impl FieldKind {
    /// Map a control's `type` attribute.
    pub fn from_type_attr(ty: Option<&str>) -> Self {
        match ty.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("email") => FieldKind::Email,
            Some("tel") => FieldKind::Telephone,
            _ => FieldKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidation {
    pub is_valid: bool,
    pub error_message: String,
}

impl FieldValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: String::new(),
        }
    }

    pub fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            error_message: message.to_string(),
        }
    }
}

/// Validate one value. Rules run on the trimmed value and the first failure
/// wins: presence, then email format, then phone format.
pub fn validate(kind: FieldKind, required: bool, raw: &str) -> FieldValidation {
    let value = raw.trim();

    if value.is_empty() {
        return if required {
            FieldValidation::invalid(REQUIRED_MESSAGE)
        } else {
            FieldValidation::valid()
        };
    }

    match kind {
        FieldKind::Email if !is_valid_email(value) => FieldValidation::invalid(EMAIL_MESSAGE),
        FieldKind::Telephone if !is_valid_phone(value) => FieldValidation::invalid(PHONE_MESSAGE),
        _ => FieldValidation::valid(),
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_CHARS.is_match(value)
        && value.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        for ok in ["a@b.co", "first.last@mail.example.com", "x+tag@d.io"] {
            assert!(is_valid_email(ok), "{ok} should pass");
        }
        for bad in ["a@b", "a @b.co", "a@b .co", "@b.co", "a@.co", "a@b.", "a@@b.co", ""] {
            assert!(!is_valid_email(bad), "{bad} should fail");
        }
    }

    #[test]
    fn test_phone_shapes() {
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(is_valid_phone("+1 555 123 4567"));
        assert!(!is_valid_phone("555-123"));
        assert!(!is_valid_phone("555-CALL-NOW"));
        assert!(!is_valid_phone("555.123.4567"));
        // non-ASCII digits are neither allowed characters nor counted
        assert!(!is_valid_phone("５５５１２３４５６７"));
    }

    #[test]
    fn test_presence_applies_to_every_kind() {
        for kind in [FieldKind::Email, FieldKind::Telephone, FieldKind::Other] {
            let result = validate(kind, true, "   ");
            assert_eq!(result, FieldValidation::invalid(REQUIRED_MESSAGE));
        }
    }

    #[test]
    fn test_optional_empty_field_is_valid() {
        assert!(validate(FieldKind::Telephone, false, "").is_valid);
        assert!(validate(FieldKind::Email, false, "  ").is_valid);
    }

    #[test]
    fn test_other_kinds_only_check_presence() {
        assert!(validate(FieldKind::Other, true, "not an email").is_valid);
        assert!(validate(FieldKind::Other, true, "555").is_valid);
    }

    #[test]
    fn test_format_rules_see_trimmed_value() {
        assert!(validate(FieldKind::Email, true, "  a@b.co  ").is_valid);
        assert_eq!(
            validate(FieldKind::Telephone, false, "555-123"),
            FieldValidation::invalid(PHONE_MESSAGE)
        );
    }

    #[test]
    fn test_type_attribute_mapping() {
        assert_eq!(FieldKind::from_type_attr(Some("email")), FieldKind::Email);
        assert_eq!(FieldKind::from_type_attr(Some("TEL")), FieldKind::Telephone);
        assert_eq!(FieldKind::from_type_attr(Some("text")), FieldKind::Other);
        assert_eq!(FieldKind::from_type_attr(None), FieldKind::Other);
    }
}
