//! Executor: runs a [`QueryDescriptor`] against a [`StoreSession`] and
//! materializes typed results.
//!
//! Every call takes the session explicitly and blocks until the store
//! answers. Store failures are returned as they came; nothing is retried.

use crate::error::{Error, Result};
use crate::query::{QueryDescriptor, QuerySpec, Select};
use crate::schema::Entity;
use crate::session::StoreSession;
use tracing::{debug, trace};

/// Whether [`QueryDescriptor::fetch_page`] also counts every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalCount {
    /// Leave [`Page::total`] empty
    #[default]
    Skip,
    /// Run an extra count query without paging
    Compute,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows of this page, in query order
    pub results: Vec<T>,
    /// Rows skipped before this page
    pub offset: u64,
    /// Requested page size
    pub limit: Option<u64>,
    /// Number of matches ignoring paging, when it was computed
    pub total: Option<u64>,
}

impl<T> Page<T> {
    /// Rows on this page.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// True when the page has no rows.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether rows exist past this page. Unknown without a total.
    pub fn has_next(&self) -> Option<bool> {
        let total = self.total?;
        Some(self.offset + (self.results.len() as u64) < total)
    }
}

impl<E: Entity, P: Select<Entity = E>> QueryDescriptor<E, P> {
    /// Runs the query and returns every result in order.
    pub fn fetch<S>(&self, session: &S) -> Result<Vec<P::Output>>
    where
        S: StoreSession + ?Sized,
    {
        self.run(session, self.spec())
    }

    /// Returns the only result, `None` when nothing matched.
    ///
    /// Fails with [`Error::NonUniqueResult`] when more than one row matches.
    pub fn fetch_one<S>(&self, session: &S) -> Result<Option<P::Output>>
    where
        S: StoreSession + ?Sized,
    {
        // Two rows are enough to detect a second match.
        let limit = self.spec().limit.map_or(2, |limit| limit.min(2));
        let spec = self.spec().with_paging(self.spec().offset, Some(limit));

        let mut results = self.run(session, &spec)?;
        if results.len() > 1 {
            return Err(Error::NonUniqueResult {
                entity: E::NAME.to_string(),
            });
        }
        Ok(results.pop())
    }

    /// Returns the first result in query order, if any.
    ///
    /// Never fails on cardinality: the limit is clamped to one row before
    /// the store is asked.
    pub fn fetch_first<S>(&self, session: &S) -> Result<Option<P::Output>>
    where
        S: StoreSession + ?Sized,
    {
        let limit = self.spec().limit.map_or(1, |limit| limit.min(1));
        let spec = self.spec().with_paging(self.spec().offset, Some(limit));
        Ok(self.run(session, &spec)?.into_iter().next())
    }

    /// Number of results [`fetch`](Self::fetch) would return, counted by the
    /// store without materializing rows.
    pub fn fetch_count<S>(&self, session: &S) -> Result<u64>
    where
        S: StoreSession + ?Sized,
    {
        debug!(query = %self.spec(), "count");
        let count = session.execute_count(self.spec())?;
        trace!(count, "count finished");
        Ok(count)
    }

    /// Fetches `limit` results starting at `offset`, replacing any paging
    /// set on the descriptor.
    ///
    /// The total is only computed when asked for; callers must not assume
    /// [`Page::total`] is populated.
    pub fn fetch_page<S>(
        &self,
        session: &S,
        offset: u64,
        limit: u64,
        total: TotalCount,
    ) -> Result<Page<P::Output>>
    where
        S: StoreSession + ?Sized,
    {
        let spec = self.spec().with_paging(Some(offset), Some(limit));
        let results = self.run(session, &spec)?;
        let total = match total {
            TotalCount::Skip => None,
            TotalCount::Compute => Some(self.count_all(session)?),
        };

        Ok(Page {
            results,
            offset,
            limit: Some(limit),
            total,
        })
    }

    /// Fetches with the descriptor's own paging and always computes the
    /// total number of matches.
    pub fn fetch_results<S>(&self, session: &S) -> Result<Page<P::Output>>
    where
        S: StoreSession + ?Sized,
    {
        let results = self.fetch(session)?;
        let total = self.count_all(session)?;

        Ok(Page {
            results,
            offset: self.spec().offset.unwrap_or(0),
            limit: self.spec().limit,
            total: Some(total),
        })
    }

    fn count_all<S>(&self, session: &S) -> Result<u64>
    where
        S: StoreSession + ?Sized,
    {
        session.execute_count(&self.spec().without_paging())
    }

    fn run<S>(&self, session: &S, spec: &QuerySpec) -> Result<Vec<P::Output>>
    where
        S: StoreSession + ?Sized,
    {
        debug!(query = %spec, "fetch");
        let rows = session.execute(spec)?;
        trace!(rows = rows.len(), "fetch finished");

        rows.into_iter()
            .map(|row| self.projection().materialize(row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;
    use crate::schema::EntityPath;
    use crate::test_fixtures::{member, Member, MemorySession};

    fn session() -> MemorySession {
        MemorySession::with_members(vec![
            member(Some("member1"), 10),
            member(Some("member2"), 20),
            member(Some("member3"), 30),
            member(Some("member4"), 40),
        ])
    }

    #[test]
    fn test_fetch_filters_exactly() {
        let session = session();
        let found = Query::select_from(Member::path())
            .filter(Member::USERNAME.eq("member1"))
            .build()
            .fetch(&session)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username.as_deref(), Some("member1"));

        let none = Query::select_from(Member::path())
            .filter(Member::USERNAME.eq("nobody"))
            .build()
            .fetch(&session)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_fetch_one_cardinality() {
        let session = session();
        let one = Query::select_from(Member::path())
            .filter(Member::AGE.eq(20))
            .build()
            .fetch_one(&session)
            .unwrap();
        assert_eq!(one.map(|m| m.age), Some(20));

        let zero = Query::select_from(Member::path())
            .filter(Member::AGE.eq(99))
            .build()
            .fetch_one(&session)
            .unwrap();
        assert!(zero.is_none());

        let many = Query::select_from(Member::path()).build().fetch_one(&session);
        assert!(matches!(many, Err(Error::NonUniqueResult { entity }) if entity == "Member"));
    }

    #[test]
    fn test_fetch_first_never_fails() {
        let session = session();
        let first = Query::select_from(Member::path())
            .order_by(Member::AGE.desc())
            .build()
            .fetch_first(&session)
            .unwrap();
        assert_eq!(first.map(|m| m.age), Some(40));

        let none = Query::select_from(Member::path())
            .filter(Member::AGE.gt(100))
            .build()
            .fetch_first(&session)
            .unwrap();
        assert!(none.is_none());
        assert_eq!(session.last_limit(), Some(1));
    }

    #[test]
    fn test_fetch_count_matches_fetch_len() {
        let session = session();
        let builders = [
            Query::select_from(Member::path()),
            Query::select_from(Member::path()).filter(Member::AGE.gte(20)),
            Query::select_from(Member::path()).filter(Member::USERNAME.is_null()),
            Query::select_from(Member::path())
                .limit(2)
                .unwrap()
                .offset(3)
                .unwrap(),
        ];
        for builder in builders {
            let query = builder.build();
            assert_eq!(
                query.fetch_count(&session).unwrap(),
                query.fetch(&session).unwrap().len() as u64
            );
        }
    }

    #[test]
    fn test_fetch_count_does_not_materialize() {
        let session = session();
        Query::select_from(Member::path())
            .build()
            .fetch_count(&session)
            .unwrap();
        assert_eq!(session.executed(), 0);
        assert_eq!(session.counted(), 1);
    }

    #[test]
    fn test_fetch_page_total_is_opt_in() {
        let session = session();
        let query = Query::select_from(Member::path())
            .order_by(Member::AGE.asc())
            .build();

        let page = query
            .fetch_page(&session, 1, 2, TotalCount::Skip)
            .unwrap();
        let ages: Vec<i32> = page.results.iter().map(|m| m.age).collect();
        assert_eq!(ages, vec![20, 30]);
        assert_eq!(page.total, None);
        assert_eq!(page.has_next(), None);
        assert_eq!(session.counted(), 0);

        let page = query
            .fetch_page(&session, 3, 2, TotalCount::Compute)
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.total, Some(4));
        assert_eq!(page.has_next(), Some(false));
    }

    #[test]
    fn test_fetch_results_uses_descriptor_paging() {
        let session = session();
        let page = Query::select_from(Member::path())
            .order_by(Member::AGE.desc())
            .offset(1)
            .unwrap()
            .limit(2)
            .unwrap()
            .build()
            .fetch_results(&session)
            .unwrap();
        let ages: Vec<i32> = page.results.iter().map(|m| m.age).collect();
        assert_eq!(ages, vec![30, 20]);
        assert_eq!((page.offset, page.limit, page.total), (1, Some(2), Some(4)));
        assert_eq!(page.has_next(), Some(true));
    }

    #[test]
    fn test_projection_fetch() {
        let session = session();
        let names = Query::select(Member::USERNAME)
            .from(EntityPath::new("m"))
            .filter(Member::AGE.lt(30))
            .order_by(Member::AGE.desc())
            .build()
            .fetch(&session)
            .unwrap();
        assert_eq!(
            names,
            vec![Some("member2".to_string()), Some("member1".to_string())]
        );
    }

    #[test]
    fn test_store_error_passes_through() {
        let session = MemorySession::failing();
        let err = Query::select_from(Member::path())
            .build()
            .fetch(&session)
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.to_string(), "store error: store unavailable");
    }
}
