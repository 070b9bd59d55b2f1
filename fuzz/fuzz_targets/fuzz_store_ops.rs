#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use querylite_core::{Entity, EntityId, Field, FieldDef, Query, Result, Row, Schema};
use querylite_store::MemoryStore;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: Option<EntityId>,
    label: Option<String>,
    rank: i64,
}

impl Item {
    const ID: Field<Item, Option<EntityId>> = Field::new("id");
    const LABEL: Field<Item, Option<String>> = Field::new("label");
    const RANK: Field<Item, i64> = Field::new("rank");
}

impl Entity for Item {
    const NAME: &'static str = "Item";
    const FIELDS: &'static [FieldDef] = &[Item::ID.def(), Item::LABEL.def(), Item::RANK.def()];

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
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(&Self::ID)?,
            label: row.get(&Self::LABEL)?,
            rank: row.get(&Self::RANK)?,
        })
    }
}

#[derive(Arbitrary, Debug)]
enum StoreOp {
    Persist { id: Option<i64>, label: Option<String>, rank: i64 },
    Remove { id: i64 },
    Query { min_rank: i64, offset: i64, limit: i64, nulls_last: bool },
    Begin,
    Rollback,
}

fuzz_target!(|ops: Vec<StoreOp>| {
    let schema = match Schema::builder().register::<Item>().build() {
        Ok(schema) => Arc::new(schema),
        Err(_) => return,
    };
    let store = MemoryStore::new(schema);
    let mut tx = None;

    for op in ops.iter().take(100) { // Limit operations to prevent timeout
        match op {
            StoreOp::Persist { id, label, rank } => {
                let mut item = Item {
                    id: id.map(EntityId),
                    label: label.clone().filter(|l| l.len() <= 1024),
                    rank: *rank,
                };
                let _ = store.persist(&mut item);
            }
            StoreOp::Remove { id } => {
                let _ = store.remove::<Item>(EntityId(*id));
            }
            StoreOp::Query { min_rank, offset, limit, nulls_last } => {
                let order = if *nulls_last {
                    Item::LABEL.asc().nulls_last()
                } else {
                    Item::LABEL.desc()
                };
                let built = Query::select_from(Item::path())
                    .filter(Item::RANK.gte(*min_rank))
                    .order_by(order)
                    .offset(*offset)
                    .and_then(|q| q.limit(*limit))
                    .map(|q| q.build());
                if let Ok(query) = built {
                    // count and fetch must agree for every query
                    if let (Ok(rows), Ok(count)) = (query.fetch(&store), query.fetch_count(&store)) {
                        assert_eq!(rows.len() as u64, count);
                    }
                }
            }
            StoreOp::Begin => {
                if tx.is_none() {
                    tx = store.begin().ok();
                }
            }
            StoreOp::Rollback => {
                if let Some(open) = tx.take() {
                    let _ = open.rollback();
                }
            }
        }
    }
});
