#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CollectionNameError {
    #[error("empty collection name")]
    Empty,
    #[error("invalid character `{ch}` in collection name `{name}`")]
    BadCharacter { name: String, ch: char },
}

/// Name of a document collection.
///
/// Names are normalized to lowercase, so two names differing only by casing
/// identify the same collection. Allowed characters are ASCII alphanumerics and `_`,
/// which makes a name safe to embed in SQL identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionName(String);

impl CollectionName {
    pub fn try_new(name: &str) -> Result<Self, CollectionNameError> {
        if name.is_empty() {
            return Err(CollectionNameError::Empty);
        }

        if let Some(ch) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(CollectionNameError::BadCharacter {
                name: name.to_owned(),
                ch,
            });
        }

        Ok(Self(name.to_ascii_lowercase()))
    }

    /// Builds the collection name used to store records of a logical entity,
    /// e.g. `Kitten` is stored into `kittens`.
    pub fn from_entity(entity: &str) -> Result<Self, CollectionNameError> {
        let name = Self::try_new(entity)?;
        Ok(Self(pluralize(&name.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// English pluralization covering the regular cases.
fn pluralize(word: &str) -> String {
    const ES_SUFFIXES: [&str; 4] = ["x", "ch", "ss", "sh"];

    if ES_SUFFIXES.iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }

    if let Some(stem) = word.strip_suffix('y') {
        let vowel_before = stem
            .chars()
            .last()
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if !stem.is_empty() && !vowel_before {
            return format!("{stem}ies");
        }
    }

    if word.ends_with('s') {
        return word.to_owned();
    }

    format!("{word}s")
}
