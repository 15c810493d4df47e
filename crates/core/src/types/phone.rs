//! Mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input string is empty or contains no digits.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not reduce to a 10-digit subscriber number.
    #[error("phone number must be a 10-digit mobile number")]
    WrongLength,
    /// The subscriber number does not start with a valid mobile prefix.
    #[error("phone number must start with 6, 7, 8, or 9")]
    InvalidPrefix,
}

/// A normalized 10-digit Indian mobile number.
///
/// Parsing strips formatting noise (spaces, dashes, a `+91` country code, a
/// single leading zero) and keeps the canonical 10-digit subscriber number.
/// Two inputs that reach the same subscriber compare equal, so the OTP
/// challenge store and the user table both key on this canonical form.
///
/// ## Examples
///
/// ```
/// use marigold_core::Phone;
///
/// let a = Phone::parse("9876543210").unwrap();
/// let b = Phone::parse("+91 98765 43210").unwrap();
/// let c = Phone::parse("09876543210").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, c);
///
/// assert!(Phone::parse("12345").is_err());      // too short
/// assert!(Phone::parse("1234567890").is_err()); // landline prefix
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Length of the canonical subscriber number.
    pub const DIGITS: usize = 10;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Contains no digits
    /// - Does not reduce to 10 digits after stripping `91`/`0` prefixes
    /// - Does not start with 6-9 (Indian mobile prefix range)
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        let subscriber = match digits.len() {
            Self::DIGITS => digits.as_str(),
            12 => digits.strip_prefix("91").ok_or(PhoneError::WrongLength)?,
            11 => digits.strip_prefix('0').ok_or(PhoneError::WrongLength)?,
            13 if digits.starts_with("091") => digits.get(3..).ok_or(PhoneError::WrongLength)?,
            _ => return Err(PhoneError::WrongLength),
        };

        if subscriber.len() != Self::DIGITS {
            return Err(PhoneError::WrongLength);
        }

        if !subscriber.starts_with(['6', '7', '8', '9']) {
            return Err(PhoneError::InvalidPrefix);
        }

        Ok(Self(subscriber.to_owned()))
    }

    /// Returns the canonical 10-digit number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the number in E.164 form (`+91XXXXXXXXXX`), the shape most
    /// SMS gateways expect.
    #[must_use]
    pub fn to_e164(&self) -> String {
        format!("+91{}", self.0)
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Phone {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Phone {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values were normalized at write time
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Phone {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let phone = Phone::parse("9876543210").unwrap();
        assert_eq!(phone.as_str(), "9876543210");
    }

    #[test]
    fn test_parse_with_country_code() {
        assert_eq!(
            Phone::parse("+919876543210").unwrap().as_str(),
            "9876543210"
        );
        assert_eq!(
            Phone::parse("919876543210").unwrap().as_str(),
            "9876543210"
        );
    }

    #[test]
    fn test_parse_with_leading_zero() {
        assert_eq!(
            Phone::parse("09876543210").unwrap().as_str(),
            "9876543210"
        );
    }

    #[test]
    fn test_parse_with_formatting_noise() {
        assert_eq!(
            Phone::parse("+91 98765-43210").unwrap().as_str(),
            "9876543210"
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(Phone::parse(""), Err(PhoneError::Empty)));
        assert!(matches!(Phone::parse("abc"), Err(PhoneError::Empty)));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            Phone::parse("12345"),
            Err(PhoneError::WrongLength)
        ));
        assert!(matches!(
            Phone::parse("98765432101234"),
            Err(PhoneError::WrongLength)
        ));
    }

    #[test]
    fn test_parse_invalid_prefix() {
        assert!(matches!(
            Phone::parse("1234567890"),
            Err(PhoneError::InvalidPrefix)
        ));
        assert!(matches!(
            Phone::parse("5876543210"),
            Err(PhoneError::InvalidPrefix)
        ));
    }

    #[test]
    fn test_all_mobile_prefixes_accepted() {
        for prefix in ['6', '7', '8', '9'] {
            let number = format!("{prefix}876543210");
            assert!(Phone::parse(&number).is_ok());
        }
    }

    #[test]
    fn test_e164() {
        let phone = Phone::parse("9876543210").unwrap();
        assert_eq!(phone.to_e164(), "+919876543210");
    }

    #[test]
    fn test_serde_roundtrip() {
        let phone = Phone::parse("9876543210").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"9876543210\"");

        let parsed: Phone = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, phone);
    }

    #[test]
    fn test_from_str() {
        let phone: Phone = "+91 98765 43210".parse().unwrap();
        assert_eq!(phone.as_str(), "9876543210");
    }
}
