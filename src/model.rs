use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of a person.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Time-ordered id: lexicographic order follows creation order.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PersonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

impl Person {
    pub fn new(
        id: PersonId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date,
            death_date: None,
            quote: None,
        }
    }

    pub fn with_death_date(mut self, death_date: NaiveDate) -> Self {
        self.death_date = Some(death_date);
        self
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        let quote = quote.into();
        self.quote = if quote.trim().is_empty() { None } else { Some(quote) };
        self
    }

    pub fn full_name(&self) -> String {
        let first = self.first_name.trim();
        let last = self.last_name.trim();
        match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{first} {last}"),
            (false, true) => first.to_string(),
            (true, false) => last.to_string(),
            (true, true) => String::new(),
        }
    }

    pub fn is_living(&self) -> bool {
        self.death_date.is_none()
    }

    /// `1950–2010` for the deceased, `b. 1950` for the living.
    pub fn lifespan(&self) -> String {
        match self.death_date {
            Some(death) => format!("{}–{}", self.birth_date.year(), death.year()),
            None => format!("b. {}", self.birth_date.year()),
        }
    }

    /// Splits a single "First Rest of name" entry: the first whitespace
    /// token becomes the first name, the remainder the last name.
    pub fn split_full_name(input: &str) -> (String, String) {
        let trimmed = input.trim();
        match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (trimmed.to_string(), String::new()),
        }
    }
}

/// Replacement values for the mutable fields of a [`Person`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// `Some(None)` clears the death date.
    pub death_date: Option<Option<NaiveDate>>,
    /// `Some(None)` clears the quote.
    pub quote: Option<Option<String>>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.birth_date.is_none()
            && self.death_date.is_none()
            && self.quote.is_none()
    }

    pub(crate) fn apply(self, person: &mut Person) {
        if let Some(v) = self.first_name {
            person.first_name = v;
        }
        if let Some(v) = self.last_name {
            person.last_name = v;
        }
        if let Some(v) = self.birth_date {
            person.birth_date = v;
        }
        if let Some(v) = self.death_date {
            person.death_date = v;
        }
        if let Some(v) = self.quote {
            person.quote = v.filter(|quote| !quote.trim().is_empty());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationKind {
    Parent,
    Spouse,
    Sibling,
}

impl RelationKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "parent" => Some(Self::Parent),
            "spouse" => Some(Self::Spouse),
            "sibling" => Some(Self::Sibling),
            _ => None,
        }
    }

    /// SPOUSE and SIBLING are stored as two directed edges.
    pub fn is_symmetric(self) -> bool {
        !matches!(self, Self::Parent)
    }
}

/// Directed, typed edge. For `Parent`, `from` is the parent of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from: PersonId,
    pub to: PersonId,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(from: PersonId, to: PersonId, kind: RelationKind) -> Self {
        Self { from, to, kind }
    }

    pub fn parent(parent: &PersonId, child: &PersonId) -> Self {
        Self::new(parent.clone(), child.clone(), RelationKind::Parent)
    }

    pub fn spouse(a: &PersonId, b: &PersonId) -> Self {
        Self::new(a.clone(), b.clone(), RelationKind::Spouse)
    }

    pub fn sibling(a: &PersonId, b: &PersonId) -> Self {
        Self::new(a.clone(), b.clone(), RelationKind::Sibling)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.to.clone(), self.from.clone(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn split_full_name_keeps_compound_last_names() {
        assert_eq!(
            Person::split_full_name("  Ada King Lovelace "),
            ("Ada".to_string(), "King Lovelace".to_string())
        );
        assert_eq!(
            Person::split_full_name("Ada"),
            ("Ada".to_string(), String::new())
        );
    }

    #[test]
    fn lifespan_reflects_death_date() {
        let person = Person::new("p".into(), "Ada", "Lovelace", date(1815, 12, 10));
        assert_eq!(person.lifespan(), "b. 1815");
        let person = person.with_death_date(date(1852, 11, 27));
        assert_eq!(person.lifespan(), "1815–1852");
        assert!(!person.is_living());
    }

    #[test]
    fn patch_clears_optional_fields() {
        let mut person = Person::new("p".into(), "Ada", "", date(1815, 12, 10))
            .with_death_date(date(1852, 11, 27))
            .with_quote("The Analytical Engine weaves algebraic patterns");
        PersonPatch {
            last_name: Some("Lovelace".to_string()),
            death_date: Some(None),
            quote: Some(Some("   ".to_string())),
            ..Default::default()
        }
        .apply(&mut person);
        assert_eq!(person.full_name(), "Ada Lovelace");
        assert!(person.is_living());
        assert_eq!(person.quote, None);
    }

    #[test]
    fn relation_kind_serializes_upper_case() {
        let rel = Relation::parent(&"a".into(), &"b".into());
        let json = serde_json::to_string(&rel).unwrap();
        assert_eq!(json, r#"{"from":"a","to":"b","kind":"PARENT"}"#);
        assert_eq!(RelationKind::from_token("Sibling"), Some(RelationKind::Sibling));
        assert_eq!(RelationKind::from_token("cousin"), None);
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = PersonId::generate();
        let second = PersonId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
    }
}
