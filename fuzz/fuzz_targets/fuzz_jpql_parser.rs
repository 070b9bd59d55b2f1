#![no_main]

use libfuzzer_sys::fuzz_target;
use querylite_core::jpql::Parser;
use querylite_core::{Entity, EntityId, Field, FieldDef, Result, Row, Schema, TypedQuery};
use querylite_store::MemoryStore;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: Option<EntityId>,
    label: Option<String>,
    rank: i64,
    weight: f64,
}

impl Item {
    const ID: Field<Item, Option<EntityId>> = Field::new("id");
    const LABEL: Field<Item, Option<String>> = Field::new("label");
    const RANK: Field<Item, i64> = Field::new("rank");
    const WEIGHT: Field<Item, f64> = Field::new("weight");
}

impl Entity for Item {
    const NAME: &'static str = "Item";
    const FIELDS: &'static [FieldDef] = &[
        Item::ID.def(),
        Item::LABEL.def(),
        Item::RANK.def(),
        Item::WEIGHT.def(),
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
            .with(&Self::LABEL, self.label.clone())
            .with(&Self::RANK, self.rank)
            .with(&Self::WEIGHT, self.weight)
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            label: row.get(&Self::LABEL)?,
            rank: row.get(&Self::RANK)?,
            weight: row.get(&Self::WEIGHT)?,
        })
    }
}

fn store() -> Option<&'static MemoryStore> {
    static STORE: OnceLock<Option<MemoryStore>> = OnceLock::new();
    STORE
        .get_or_init(|| {
            let schema = Arc::new(Schema::builder().register::<Item>().build().ok()?);
            let store = MemoryStore::new(schema);
            for (i, weight) in [1.5, f64::NAN, -0.0, 1e20, f64::INFINITY].into_iter().enumerate() {
                let mut item = Item {
                    id: None,
                    label: (i % 2 == 0).then(|| format!("item{}", i)),
                    rank: i as i64,
                    weight,
                };
                store.persist(&mut item).ok()?;
            }
            Some(store)
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string (ignore invalid UTF-8)
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Limit query length to prevent timeout
    if text.len() > 10_000 {
        return;
    }

    // Parsing must return an error, never panic
    if let Ok(mut parser) = Parser::new(text) {
        let _ = parser.parse();
    }

    // Resolution, execution and re-rendering must not panic either
    let Some(store) = store() else {
        return;
    };
    if let Ok(query) = TypedQuery::<Item>::parse(store.schema(), text) {
        let _ = query.result_list(store);
        let rendered = query.spec().to_string();
        assert!(
            TypedQuery::<Item>::parse(store.schema(), &rendered).is_ok(),
            "rendered query does not parse back: {}",
            rendered
        );
    }
});
