use serde::{Deserialize, Serialize};

use super::Filetime;
use crate::traits::Model;

/// A kitten record, stored into the `kittens` collection.
///
/// `id` and `idx` are empty on records built by the caller and get populated
/// by the repository on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kitten {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<uuid::Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<i64>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,

    /// Height in centimeters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<Filetime>,
}

impl Model for Kitten {
    const ENTITY: &'static str = "Kitten";
    const REQUIRED_FIELDS: &'static [&'static str] = &["name", "age"];
}

impl Kitten {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_height(mut self, height: i64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_birth(mut self, birth: impl Into<Filetime>) -> Self {
        self.birth = Some(birth.into());
        self
    }

    pub fn greeting(&self) -> String {
        if self.name.is_empty() {
            "I don't have a name".to_owned()
        } else {
            format!("Meow name is {}", self.name)
        }
    }
}
