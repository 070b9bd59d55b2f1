//! Query Demo
//!
//! Declares two entities, stores a few rows and queries them with the typed
//! builder and with a string query.

use querylite::logging::{LogConfig, LogFormat};
use querylite::prelude::*;
use querylite::StoreConfig;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Team {
    id: Option<EntityId>,
    name: String,
}

impl Team {
    const ID: Field<Team, Option<EntityId>> = Field::new("id");
    const NAME: Field<Team, String> = Field::new("name");
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

    fn from_row(row: &Row) -> querylite::Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            name: row.get(&Self::NAME)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Member {
    id: Option<EntityId>,
    username: Option<String>,
    age: i32,
    team: Option<EntityId>,
}

impl Member {
    const ID: Field<Member, Option<EntityId>> = Field::new("id");
    const USERNAME: Field<Member, Option<String>> = Field::new("username");
    const AGE: Field<Member, i32> = Field::new("age");
    const TEAM: Field<Member, Option<EntityId>> = Field::new("team");

    fn new(username: Option<&str>, age: i32, team: Option<EntityId>) -> Self {
        Self {
            id: None,
            username: username.map(str::to_string),
            age,
            team,
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

    fn from_row(row: &Row) -> querylite::Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            username: row.get(&Self::USERNAME)?,
            age: row.get(&Self::AGE)?,
            team: row.get(&Self::TEAM)?,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::debug().with_format(LogFormat::Compact).init()?;

    println!("=== querylite {} Query Demo ===\n", querylite::VERSION);

    let schema = Arc::new(
        Schema::builder()
            .register::<Team>()
            .register::<Member>()
            .build()?,
    );
    let store = MemoryStore::with_config(schema.clone(), StoreConfig::default())?;

    let mut team_a = Team {
        id: None,
        name: "teamA".to_string(),
    };
    let mut team_b = Team {
        id: None,
        name: "teamB".to_string(),
    };
    store.persist(&mut team_a)?;
    store.persist(&mut team_b)?;
    for (name, age, team) in [
        (Some("member1"), 10, team_a.id),
        (Some("member2"), 20, team_a.id),
        (Some("member3"), 30, team_b.id),
        (Some("member4"), 40, team_b.id),
        (None, 40, None),
    ] {
        store.persist(&mut Member::new(name, age, team))?;
    }

    println!("1. Members aged 20 or more, oldest first, unnamed last:");
    let query = Query::select_from(Member::path())
        .filter(Member::AGE.gte(20))
        .order_by_all([Member::AGE.desc(), Member::USERNAME.asc().nulls_last()])
        .build();
    println!("   {}", query);
    for member in query.fetch(&store)? {
        println!("   {:?} age {}", member.username, member.age);
    }

    println!("\n2. Optional search conditions:");
    let username: Option<&str> = None;
    let team = team_a.id;
    let query = Query::select_from(Member::path())
        .filter_all([
            username.map(|u| Member::USERNAME.eq(u)),
            team.map(|t| Member::TEAM.eq(t)),
        ])
        .build();
    println!("   {}", query);
    println!("   {} match", query.fetch_count(&store)?);

    println!("\n3. Field projection, second page of two:");
    let names = Query::select(Member::USERNAME)
        .from(EntityPath::new("m"))
        .order_by(Member::AGE.asc())
        .build()
        .fetch_page(&store, 2, 2, TotalCount::Compute)?;
    println!(
        "   {:?} (total {:?}, more: {:?})",
        names.results,
        names.total,
        names.has_next()
    );

    println!("\n4. String query with a bound parameter:");
    let member = TypedQuery::<Member>::parse(
        &schema,
        "select m from Member m where m.username = :username",
    )?
    .bind("username", "member1")?
    .single_result(&store)?;
    println!("   {:?}", member);

    println!("\n5. Transaction rolled back on drop:");
    {
        let _tx = store.begin()?;
        store.persist(&mut Member::new(Some("temp"), 99, None))?;
        println!("   rows inside transaction: {}", store.len()?);
    }
    println!("   rows after rollback: {}", store.len()?);

    println!("\n=== Demo Complete ===");
    Ok(())
}
