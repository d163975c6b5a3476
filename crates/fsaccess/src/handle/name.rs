//! Entry name validation.

use std::path::is_separator;

use crate::error::{Error, Result};

/// Reject names that could address anything other than a direct child.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Argument("Name can't be an empty string.".into()));
    }
    if name == "." || name == ".." || name.contains(is_separator) {
        return Err(Error::Argument("Name contains invalid characters.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("file.txt").is_ok());
        assert!(validate_name("..hidden").is_ok());
        assert!(validate_name("with space").is_ok());

        let err = validate_name("").unwrap_err();
        assert_eq!(err.to_string(), "Name can't be an empty string.");

        for bad in [".", "..", "a/b", "/"] {
            let err = validate_name(bad).unwrap_err();
            assert_eq!(err.to_string(), "Name contains invalid characters.", "{bad}");
        }
    }
}
