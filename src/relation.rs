//! Relationship accessors.
//!
//! Each relationship field is stored behind [`RelationshipAccess`], which the
//! marshal engine uses to build linkage and find include candidates, and the
//! unmarshal engine uses to assign decoded linkage back onto the record.

use std::sync::OnceLock;

use crate::document::{PrimaryData, Ref};
use crate::error::{MarshalError, UnmarshalError};
use crate::marshal::{identify, Bound, Child};
use crate::schema::{Model, ResourceId, Schema};
use crate::types::Cardinality;
use crate::unmarshal::Reader;

pub(crate) trait RelationshipAccess<T>: Send + Sync {
    fn cardinality(&self) -> Cardinality;

    /// Wire linkage for `record`. `None` when the relationship has no `data`.
    fn linkage(&self, name: &str, record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError>;

    /// Push the related records of `record` as include candidates.
    fn related<'a>(&'a self, name: &'a str, record: &'a T, out: &mut Vec<Child<'a>>);

    /// Assign decoded linkage onto `record`. To-many relationships append.
    ///
    /// `record` is only touched once every identifier has been read.
    fn assign(
        &self,
        name: &str,
        record: &mut T,
        data: &PrimaryData<Ref>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError>;
}

/// An accessor of `E` reached through a field of `T`.
pub(crate) struct Project<T, E, A> {
    pub(crate) get: fn(&T) -> &E,
    pub(crate) get_mut: fn(&mut T) -> &mut E,
    pub(crate) inner: A,
}

impl<T, E> RelationshipAccess<T> for Project<T, E, Box<dyn RelationshipAccess<E>>> {
    fn cardinality(&self) -> Cardinality {
        self.inner.cardinality()
    }

    fn linkage(&self, name: &str, record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError> {
        self.inner.linkage(name, (self.get)(record))
    }

    fn related<'a>(&'a self, name: &'a str, record: &'a T, out: &mut Vec<Child<'a>>) {
        self.inner.related(name, (self.get)(record), out)
    }

    fn assign(
        &self,
        name: &str,
        record: &mut T,
        data: &PrimaryData<Ref>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        self.inner.assign(name, (self.get_mut)(record), data, reader)
    }
}

/// Storage for a to-one related record.
pub(crate) trait ToOneSlot<R> {
    fn related(&self) -> Option<&R>;
    fn replace(&mut self, value: Option<R>);
}

impl<R> ToOneSlot<R> for Option<R> {
    fn related(&self) -> Option<&R> {
        self.as_ref()
    }

    fn replace(&mut self, value: Option<R>) {
        *self = value;
    }
}

impl<R> ToOneSlot<R> for Option<Box<R>> {
    fn related(&self) -> Option<&R> {
        self.as_deref()
    }

    fn replace(&mut self, value: Option<R>) {
        *self = value.map(Box::new);
    }
}

pub(crate) struct ToOne<T, R, S> {
    get: fn(&T) -> &S,
    get_mut: fn(&mut T) -> &mut S,
    schema: OnceLock<Schema<R>>,
}

impl<T, R: Model, S> ToOne<T, R, S> {
    pub(crate) fn new(get: fn(&T) -> &S, get_mut: fn(&mut T) -> &mut S) -> Self {
        Self {
            get,
            get_mut,
            schema: OnceLock::new(),
        }
    }

    fn schema(&self) -> &Schema<R> {
        self.schema.get_or_init(R::schema)
    }
}

impl<T, R, S> RelationshipAccess<T> for ToOne<T, R, S>
where
    R: Model + Default,
    S: ToOneSlot<R>,
{
    fn cardinality(&self) -> Cardinality {
        Cardinality::ToOne
    }

    fn linkage(&self, name: &str, record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError> {
        match (self.get)(record).related() {
            None => Ok(Some(PrimaryData::Null)),
            Some(related) => identify(related, self.schema())
                .map(|id| Some(PrimaryData::One(id)))
                .map_err(|e| e.in_relationship(name, None)),
        }
    }

    fn related<'a>(&'a self, name: &'a str, record: &'a T, out: &mut Vec<Child<'a>>) {
        if let Some(related) = (self.get)(record).related() {
            out.push(Child {
                name,
                index: None,
                node: Box::new(Bound::new(related, self.schema())),
            });
        }
    }

    fn assign(
        &self,
        name: &str,
        record: &mut T,
        data: &PrimaryData<Ref>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        match data {
            PrimaryData::Null => {
                (self.get_mut)(record).replace(None);
                Ok(())
            }
            PrimaryData::One(id) => {
                let related = reader
                    .materialize(id, self.schema())
                    .map_err(|e| e.in_relationship(name, None))?;
                (self.get_mut)(record).replace(Some(related));
                Ok(())
            }
            PrimaryData::Many(_) => Err(UnmarshalError::Cardinality {
                name: name.to_string(),
                expected: Cardinality::ToOne,
            }),
        }
    }
}

pub(crate) struct ToMany<T, R> {
    get: fn(&T) -> &Vec<R>,
    get_mut: fn(&mut T) -> &mut Vec<R>,
    schema: OnceLock<Schema<R>>,
}

impl<T, R: Model> ToMany<T, R> {
    pub(crate) fn new(get: fn(&T) -> &Vec<R>, get_mut: fn(&mut T) -> &mut Vec<R>) -> Self {
        Self {
            get,
            get_mut,
            schema: OnceLock::new(),
        }
    }

    fn schema(&self) -> &Schema<R> {
        self.schema.get_or_init(R::schema)
    }
}

impl<T, R: Model + Default> RelationshipAccess<T> for ToMany<T, R> {
    fn cardinality(&self) -> Cardinality {
        Cardinality::ToMany
    }

    fn linkage(&self, name: &str, record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError> {
        let schema = self.schema();
        let ids = (self.get)(record)
            .iter()
            .enumerate()
            .map(|(i, related)| {
                identify(related, schema).map_err(|e| e.in_relationship(name, Some(i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(PrimaryData::Many(ids)))
    }

    fn related<'a>(&'a self, name: &'a str, record: &'a T, out: &mut Vec<Child<'a>>) {
        let schema = self.schema();
        for (i, related) in (self.get)(record).iter().enumerate() {
            out.push(Child {
                name,
                index: Some(i),
                node: Box::new(Bound::new(related, schema)),
            });
        }
    }

    fn assign(
        &self,
        name: &str,
        record: &mut T,
        data: &PrimaryData<Ref>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        let ids = match data {
            PrimaryData::Many(ids) => ids,
            PrimaryData::Null => {
                return Err(UnmarshalError::NullToMany {
                    name: name.to_string(),
                })
            }
            PrimaryData::One(_) => {
                return Err(UnmarshalError::Cardinality {
                    name: name.to_string(),
                    expected: Cardinality::ToMany,
                })
            }
        };
        let schema = self.schema();
        let related = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                reader
                    .materialize(id, schema)
                    .map_err(|e| e.in_relationship(name, Some(i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        (self.get_mut)(record).extend(related);
        Ok(())
    }
}

pub(crate) struct ToOneId<T, I> {
    pub(crate) related: String,
    pub(crate) get: fn(&T) -> &I,
    pub(crate) get_mut: fn(&mut T) -> &mut I,
}

impl<T, I: ResourceId> RelationshipAccess<T> for ToOneId<T, I> {
    fn cardinality(&self) -> Cardinality {
        Cardinality::ToOne
    }

    fn linkage(&self, _name: &str, record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError> {
        let id = (self.get)(record).to_id();
        if id.is_empty() {
            return Ok(Some(PrimaryData::Null));
        }
        Ok(Some(PrimaryData::One(Ref::new(self.related.as_str(), id))))
    }

    fn related<'a>(&'a self, _name: &'a str, _record: &'a T, _out: &mut Vec<Child<'a>>) {}

    fn assign(
        &self,
        name: &str,
        record: &mut T,
        data: &PrimaryData<Ref>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        match data {
            PrimaryData::Null => {
                *(self.get_mut)(record) = I::default();
                Ok(())
            }
            PrimaryData::One(id) => {
                let value = parse_id::<I>(&self.related, id, reader)
                    .map_err(|e| e.in_relationship(name, None))?;
                *(self.get_mut)(record) = value;
                Ok(())
            }
            PrimaryData::Many(_) => Err(UnmarshalError::Cardinality {
                name: name.to_string(),
                expected: Cardinality::ToOne,
            }),
        }
    }
}

pub(crate) struct ToManyIds<T, I> {
    pub(crate) related: String,
    pub(crate) get: fn(&T) -> &Vec<I>,
    pub(crate) get_mut: fn(&mut T) -> &mut Vec<I>,
}

impl<T, I: ResourceId> RelationshipAccess<T> for ToManyIds<T, I> {
    fn cardinality(&self) -> Cardinality {
        Cardinality::ToMany
    }

    fn linkage(&self, _name: &str, record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError> {
        let ids = (self.get)(record)
            .iter()
            .map(|id| Ref::new(self.related.as_str(), id.to_id()))
            .collect();
        Ok(Some(PrimaryData::Many(ids)))
    }

    fn related<'a>(&'a self, _name: &'a str, _record: &'a T, _out: &mut Vec<Child<'a>>) {}

    fn assign(
        &self,
        name: &str,
        record: &mut T,
        data: &PrimaryData<Ref>,
        reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        let ids = match data {
            PrimaryData::Many(ids) => ids,
            PrimaryData::Null => {
                return Err(UnmarshalError::NullToMany {
                    name: name.to_string(),
                })
            }
            PrimaryData::One(_) => {
                return Err(UnmarshalError::Cardinality {
                    name: name.to_string(),
                    expected: Cardinality::ToMany,
                })
            }
        };
        let values = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                parse_id::<I>(&self.related, id, reader).map_err(|e| e.in_relationship(name, Some(i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        (self.get_mut)(record).extend(values);
        Ok(())
    }
}

pub(crate) struct LinksOnly;

impl<T> RelationshipAccess<T> for LinksOnly {
    fn cardinality(&self) -> Cardinality {
        Cardinality::LinksOnly
    }

    fn linkage(&self, _name: &str, _record: &T) -> Result<Option<PrimaryData<Ref>>, MarshalError> {
        Ok(None)
    }

    fn related<'a>(&'a self, _name: &'a str, _record: &'a T, _out: &mut Vec<Child<'a>>) {}

    fn assign(
        &self,
        _name: &str,
        _record: &mut T,
        _data: &PrimaryData<Ref>,
        _reader: &mut Reader<'_>,
    ) -> Result<(), UnmarshalError> {
        Ok(())
    }
}

fn parse_id<I: ResourceId>(
    related: &str,
    id: &Ref,
    reader: &Reader<'_>,
) -> Result<I, UnmarshalError> {
    reader.check_type(related, &id.kind)?;
    I::from_id(&id.id).ok_or_else(|| UnmarshalError::InvalidId {
        id: id.id.clone(),
        expected: std::any::type_name::<I>(),
    })
}
