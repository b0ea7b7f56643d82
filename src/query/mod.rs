mod filter;
pub use filter::*;

mod builder;
pub use builder::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad field `{field}`")]
    BadField { field: String },
    #[error("operation error on field `{field}` :: {err}")]
    OpError { field: String, err: OpError },
}

/// Checks that a field name is a plain identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// Field names are embedded in SQL text by the PostgreSQL backend, anything outside
/// this alphabet is rejected.
pub fn validate_field(field: &str) -> Result<(), Error> {
    let mut chars = field.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid {
        return Err(Error::BadField {
            field: field.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names() {
        assert!(validate_field("idx").is_ok());
        assert!(validate_field("_id").is_ok());
        assert!(validate_field("birth_2").is_ok());

        assert!(validate_field("").is_err());
        assert!(validate_field("2nd").is_err());
        assert!(validate_field("name'--").is_err());
        assert!(validate_field("info.height").is_err());
    }
}
