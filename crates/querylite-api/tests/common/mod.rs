// Entities and seed data shared by the querylite integration tests

use querylite::{Entity, EntityId, Field, FieldDef, MemoryStore, Result, Row, Schema};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
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
pub struct Team {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Team {
    pub const ID: Field<Team, Option<EntityId>> = Field::new("id");
    pub const NAME: Field<Team, String> = Field::new("name");

    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
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

    pub fn new(username: Option<&str>, age: i32, team: Option<&Team>) -> Self {
        Self {
            id: None,
            username: username.map(str::to_string),
            age,
            team: team.and_then(|t| t.id),
        }
    }
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

pub fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .register::<Hello>()
            .register::<Team>()
            .register::<Member>()
            .build()
            .expect("Failed to build schema"),
    )
}

/// Persists teamA and teamB, then member1..member4 aged 10..=40, two per
/// team.
pub fn seed(store: &MemoryStore) {
    let mut team_a = Team::new("teamA");
    let mut team_b = Team::new("teamB");
    store.persist(&mut team_a).expect("Failed to persist teamA");
    store.persist(&mut team_b).expect("Failed to persist teamB");

    let members = [
        ("member1", 10, &team_a),
        ("member2", 20, &team_a),
        ("member3", 30, &team_b),
        ("member4", 40, &team_b),
    ];
    for (name, age, team) in members {
        store
            .persist(&mut Member::new(Some(name), age, Some(team)))
            .expect("Failed to persist member");
    }
}

#[allow(dead_code)]
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new(schema());
    seed(&store);
    store
}
