//! Entities shared by the unit tests of this crate.

use crate::error::{Error, Result};
use crate::eval::sort_rows;
use crate::query::{Projection, QuerySpec};
use crate::schema::{Entity, EntityId, Field, FieldDef};
use crate::session::StoreSession;
use crate::value::{Row, Value};
use std::cell::Cell;

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<EntityId>,
    pub username: Option<String>,
    pub age: i32,
    pub team: Option<EntityId>,
}

impl Member {
    pub const ID: Field<Member, Option<EntityId>> = Field::new("id");
    pub const USERNAME: Field<Member, Option<String>> = Field::new("username");
    pub const AGE: Field<Member, i32> = Field::new("age");
    pub const TEAM: Field<Member, Option<EntityId>> = Field::new("team");
}

impl Entity for Member {
    const NAME: &'static str = "Member";
    const FIELDS: &'static [FieldDef] = &[
        Member::ID.def(),
        Member::USERNAME.def(),
        Member::AGE.def(),
        Member::TEAM.def(),
    ];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(&Self::ID, self.id)
            .with(&Self::USERNAME, self.username.clone())
            .with(&Self::AGE, self.age)
            .with(&Self::TEAM, self.team)
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            username: row.get(&Self::USERNAME)?,
            age: row.get(&Self::AGE)?,
            team: row.get(&Self::TEAM)?,
        })
    }
}

pub fn member(username: Option<&str>, age: i32) -> Member {
    Member {
        id: None,
        username: username.map(str::to_string),
        age,
        team: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Team {
    pub const ID: Field<Team, Option<EntityId>> = Field::new("id");
    pub const NAME: Field<Team, String> = Field::new("name");
}

impl Entity for Team {
    const NAME: &'static str = "Team";
    const FIELDS: &'static [FieldDef] = &[Team::ID.def(), Team::NAME.def()];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(&Self::ID, self.id)
            .with(&Self::NAME, self.name.clone())
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            name: row.get(&Self::NAME)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hello {
    pub id: Option<EntityId>,
}

impl Hello {
    pub const ID: Field<Hello, Option<EntityId>> = Field::new("id");
}

impl Entity for Hello {
    const NAME: &'static str = "Hello";
    const FIELDS: &'static [FieldDef] = &[Hello::ID.def()];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Row {
        Row::new().with(&Self::ID, self.id)
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub id: Option<EntityId>,
    pub points: f64,
}

impl Score {
    pub const ID: Field<Score, Option<EntityId>> = Field::new("id");
    pub const POINTS: Field<Score, f64> = Field::new("points");
}

impl Entity for Score {
    const NAME: &'static str = "Score";
    const FIELDS: &'static [FieldDef] = &[Score::ID.def(), Score::POINTS.def()];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(&Self::ID, self.id)
            .with(&Self::POINTS, self.points)
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            points: row.get(&Self::POINTS)?,
        })
    }
}

pub fn score(points: f64) -> Score {
    Score { id: None, points }
}

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct Unavailable;

/// Minimal in-process session over `Member` rows, counting calls.
#[derive(Debug, Default)]
pub struct MemorySession {
    rows: Vec<Row>,
    failing: bool,
    executed: Cell<usize>,
    counted: Cell<usize>,
    last_limit: Cell<Option<u64>>,
}

impl MemorySession {
    pub fn with_members(members: Vec<Member>) -> Self {
        let rows = members
            .into_iter()
            .enumerate()
            .map(|(i, mut m)| {
                m.set_id(EntityId(i as i64 + 1));
                m.to_row()
            })
            .collect();
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn executed(&self) -> usize {
        self.executed.get()
    }

    pub fn counted(&self) -> usize {
        self.counted.get()
    }

    pub fn last_limit(&self) -> Option<u64> {
        self.last_limit.get()
    }

    fn matching(&self, spec: &QuerySpec) -> Result<Vec<Row>> {
        if self.failing {
            return Err(Error::store(Unavailable));
        }
        let mut rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| spec.predicate.as_ref().map_or(true, |p| p.matches(row)))
            .cloned()
            .collect();
        sort_rows(&mut rows, &spec.order);

        let offset = spec.offset.unwrap_or(0) as usize;
        let limit = spec.limit.map_or(usize::MAX, |l| l as usize);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

impl StoreSession for MemorySession {
    fn execute(&self, spec: &QuerySpec) -> Result<Vec<Row>> {
        self.executed.set(self.executed.get() + 1);
        self.last_limit.set(spec.limit);
        let rows = self.matching(spec)?;
        match &spec.projection {
            Projection::Entity => Ok(rows),
            Projection::Fields(fields) => Ok(rows
                .into_iter()
                .map(|row| {
                    let mut projected = Row::new();
                    for field in fields {
                        let value = row.value(field.name()).cloned().unwrap_or(Value::Null);
                        projected.push(field.name(), value);
                    }
                    projected
                })
                .collect()),
        }
    }

    fn execute_count(&self, spec: &QuerySpec) -> Result<u64> {
        self.counted.set(self.counted.get() + 1);
        Ok(self.matching(spec)?.len() as u64)
    }
}
