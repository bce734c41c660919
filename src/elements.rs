//! The owned output data model: `Header`, `Node`, `Way`, `Relation` and the
//! `Batch` that carries them in source order.
//!
//! Unlike the borrowing `Node`/`Way`/`Relation` types of earlier OSM PBF
//! readers in this family, these entities own every field. A `Batch` is
//! built once per blob by the reconstructor and must outlive the
//! `PrimitiveBlock` it was built from, so nothing here can borrow from the
//! decoded protobuf message or its string table.

use crate::block::HeaderBlock;

/// The type of a relation member.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

/// A member of a relation: the referenced element's type and id, plus its
/// role string within the relation.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub member_type: MemberType,
    pub member_id: i64,
    pub role: String,
}

/// Additional per-element metadata, present only when at least one field
/// survives the omission rules (§3 of the data model).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Info {
    pub version: Option<i32>,
    pub timestamp: Option<i64>,
    pub changeset: Option<i64>,
    pub uid: Option<i32>,
    pub user: Option<String>,
    pub visible: Option<bool>,
}

impl Info {
    /// Returns `None` in place of an `Info` whose every field was omitted,
    /// per the "info is present only if at least one field survives"
    /// invariant.
    pub(crate) fn non_empty(self) -> Option<Info> {
        if self.version.is_none()
            && self.timestamp.is_none()
            && self.changeset.is_none()
            && self.uid.is_none()
            && self.user.is_none()
            && self.visible.is_none()
        {
            None
        } else {
            Some(self)
        }
    }
}

/// An OpenStreetMap node (see the [OSM wiki](https://wiki.openstreetmap.org/wiki/Node)).
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Option<Vec<(String, String)>>,
    pub info: Option<Info>,
}

/// An OpenStreetMap way (see the [OSM wiki](https://wiki.openstreetmap.org/wiki/Way)).
#[derive(Clone, Debug, PartialEq)]
pub struct Way {
    pub id: i64,
    pub refs: Vec<i64>,
    pub tags: Option<Vec<(String, String)>>,
    pub info: Option<Info>,
}

/// An OpenStreetMap relation (see the [OSM wiki](https://wiki.openstreetmap.org/wiki/Relation)).
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Option<Vec<(String, String)>>,
    pub info: Option<Info>,
}

/// One decoded entity: the file header, or an OSM core element.
#[derive(Clone, Debug)]
pub enum Entity {
    Header(HeaderBlock),
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// An ordered group of entities corresponding to exactly one decoded blob:
/// a single-element batch for the header, or the concatenated entities of
/// one `PrimitiveBlock` for a data blob.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    entities: Vec<Entity>,
}

impl Batch {
    pub(crate) fn new() -> Batch {
        Batch {
            entities: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Batch {
        Batch {
            entities: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub(crate) fn single(entity: Entity) -> Batch {
        Batch {
            entities: vec![entity],
        }
    }

    /// Returns the entities of this batch in source order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl IntoIterator for Batch {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}
