use crate::domain::errors::DomainError;

/// Recipient phone number in E.164 digit form (country code first, no `+`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn normalize(raw: &str) -> Result<Self, DomainError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 8 || digits.len() > 15 {
            return Err(DomainError::Validation(format!(
                "recipient is not a dialable phone number: {raw}"
            )));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting_characters() {
        let phone = PhoneNumber::normalize("+55 (46) 99999-0001").unwrap();
        assert_eq!(phone.as_str(), "5546999990001");
    }

    #[test]
    fn keeps_plain_digit_strings() {
        let phone = PhoneNumber::normalize("5546999990002").unwrap();
        assert_eq!(phone.as_str(), "5546999990002");
    }

    #[test]
    fn rejects_too_short_numbers() {
        assert!(PhoneNumber::normalize("12345").is_err());
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(PhoneNumber::normalize("not a phone").is_err());
    }
}
