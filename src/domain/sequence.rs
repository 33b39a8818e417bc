//! Sequence definitions and name rules.

/// Longest sequence name, bounded by the `MySQL` identifier limit.
pub const MAX_SEQUENCE_NAME_LEN: usize = 64;

/// A sequence to provision at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDefinition {
    /// Sequence name, also the name of its backing table.
    pub name: String,
    /// Width in bytes of the correlation token column.
    pub token_width: u16,
}

impl SequenceDefinition {
    /// Create a new sequence definition.
    #[must_use]
    pub fn new(name: impl Into<String>, token_width: u16) -> Self {
        Self {
            name: name.into(),
            token_width,
        }
    }
}

/// Check that a name is safe to splice into DDL and DML as a table name.
///
/// Accepted names match `[A-Za-z_][A-Za-z0-9_]*` and are at most
/// [`MAX_SEQUENCE_NAME_LEN`] bytes long.
///
/// # Errors
///
/// Returns the reason the name was rejected.
pub fn validate_sequence_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return Err("name is empty".to_string());
    };

    if name.len() > MAX_SEQUENCE_NAME_LEN {
        return Err(format!(
            "name is longer than {MAX_SEQUENCE_NAME_LEN} bytes"
        ));
    }

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err("name must start with a letter or underscore".to_string());
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(format!("character '{bad}' is not allowed"));
    }

    Ok(())
}
