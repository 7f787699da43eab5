use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single object identifier as it appears in `ObjectEntitiesID`.
///
/// Ground truth uses Wikidata QIDs, but numeric answers (e.g. counts) are
/// stored as bare JSON numbers. A string and a number never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Text(String),
    Number(serde_json::Number),
}

impl EntityId {
    pub fn text(s: impl Into<String>) -> Self {
        EntityId::Text(s.into())
    }

    /// True for the `""` placeholder some ground-truth files use for "no answer".
    pub fn is_empty_text(&self) -> bool {
        matches!(self, EntityId::Text(s) if s.is_empty())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Text(s) => write!(f, "{}", s),
            EntityId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Text(s)
    }
}

/// The `ObjectEntitiesID` field of a row.
///
/// The field must be present, but its value is only checked for shape here:
/// anything other than an array of strings/numbers is kept as `Malformed` so
/// the scorer can degrade that one pair instead of rejecting the whole file.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEntities {
    Ids(Vec<EntityId>),
    Malformed(serde_json::Value),
}

impl ObjectEntities {
    pub fn ids(&self) -> Option<&[EntityId]> {
        match self {
            ObjectEntities::Ids(ids) => Some(ids),
            ObjectEntities::Malformed(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ObjectEntities::Malformed(_))
    }
}

impl Default for ObjectEntities {
    fn default() -> Self {
        ObjectEntities::Ids(Vec::new())
    }
}

impl<I: Into<EntityId>> FromIterator<I> for ObjectEntities {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        ObjectEntities::Ids(iter.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for ObjectEntities {
    fn from(value: serde_json::Value) -> Self {
        let serde_json::Value::Array(items) = &value else {
            return ObjectEntities::Malformed(value);
        };

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            match item {
                serde_json::Value::String(s) => ids.push(EntityId::Text(s.clone())),
                serde_json::Value::Number(n) => ids.push(EntityId::Number(n.clone())),
                _ => return ObjectEntities::Malformed(value),
            }
        }
        ObjectEntities::Ids(ids)
    }
}

impl<'de> Deserialize<'de> for ObjectEntities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Going through Value keeps "missing field" a hard error.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(ObjectEntities::from(value))
    }
}

impl Serialize for ObjectEntities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ObjectEntities::Ids(ids) => ids.serialize(serializer),
            ObjectEntities::Malformed(value) => value.serialize(serializer),
        }
    }
}

/// A prediction or ground-truth row, as consumed by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbcRow {
    #[serde(rename = "SubjectEntityID", default, skip_serializing_if = "Option::is_none")]
    pub subject_entity_id: Option<String>,
    #[serde(rename = "SubjectEntity")]
    pub subject_entity: String,
    #[serde(rename = "Relation")]
    pub relation: String,
    #[serde(rename = "ObjectEntitiesID")]
    pub object_entities_id: ObjectEntities,
}

impl KbcRow {
    pub fn new(
        subject_entity: impl Into<String>,
        relation: impl Into<String>,
        object_entities_id: ObjectEntities,
    ) -> Self {
        Self {
            subject_entity_id: None,
            subject_entity: subject_entity.into(),
            relation: relation.into(),
            object_entities_id,
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.subject_entity.clone(), self.relation.clone())
    }
}

/// A row of the test input handed to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRow {
    #[serde(rename = "SubjectEntityID")]
    pub subject_entity_id: String,
    #[serde(rename = "SubjectEntity")]
    pub subject_entity: String,
    #[serde(rename = "Relation")]
    pub relation: String,
}

/// A training row; only the surface forms of the objects are used, for
/// in-context examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRow {
    #[serde(rename = "SubjectEntity")]
    pub subject_entity: String,
    #[serde(rename = "Relation")]
    pub relation: String,
    #[serde(rename = "ObjectEntities", default)]
    pub object_entities: Vec<String>,
}

/// A row produced by a model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    #[serde(rename = "SubjectEntityID")]
    pub subject_entity_id: String,
    #[serde(rename = "SubjectEntity")]
    pub subject_entity: String,
    #[serde(rename = "Relation")]
    pub relation: String,
    #[serde(rename = "ObjectEntitiesID")]
    pub object_entities_id: Vec<String>,
}

impl PredictionRow {
    pub fn for_input(input: &InputRow, object_entities_id: Vec<String>) -> Self {
        Self {
            subject_entity_id: input.subject_entity_id.clone(),
            subject_entity: input.subject_entity.clone(),
            relation: input.relation.clone(),
            object_entities_id,
        }
    }
}
