// Common entities and fixtures for store integration tests

use querylite_core::{Entity, EntityId, Field, FieldDef, Result, Row, Schema};
use querylite_store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Option<EntityId>,
    pub username: Option<String>,
    pub age: i32,
}

impl Member {
    pub const ID: Field<Member, Option<EntityId>> = Field::new("id");
    pub const USERNAME: Field<Member, Option<String>> = Field::new("username");
    pub const AGE: Field<Member, i32> = Field::new("age");

    pub fn new(username: Option<&str>, age: i32) -> Self {
        Self {
            id: None,
            username: username.map(str::to_string),
            age,
        }
    }
}

impl Entity for Member {
    const NAME: &'static str = "Member";
    const FIELDS: &'static [FieldDef] = &[Member::ID.def(), Member::USERNAME.def(), Member::AGE.def()];

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
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            username: row.get(&Self::USERNAME)?,
            age: row.get(&Self::AGE)?,
        })
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

pub fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .register::<Member>()
            .register::<Team>()
            .build()
            .expect("Failed to build schema"),
    )
}

/// Store seeded with four members aged 10..=40
#[allow(dead_code)]
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new(schema());
    for (name, age) in [("member1", 10), ("member2", 20), ("member3", 30), ("member4", 40)] {
        store
            .persist(&mut Member::new(Some(name), age))
            .expect("Failed to persist member");
    }
    store
}

/// Temporary directory holding snapshot files
#[allow(dead_code)]
pub struct SnapshotFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl SnapshotFixture {
    #[allow(dead_code)]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("store.qlsnap");
        Self { temp_dir, path }
    }
}

impl Default for SnapshotFixture {
    fn default() -> Self {
        Self::new()
    }
}
