//! Conflict reconciliation for resource creation.
//!
//! A creation call that ends in a conflict means a resource with the same
//! natural key already exists on the platform - either from a retried
//! attempt, a concurrent creation with the same spec, or an unrelated intent
//! reusing the key. [`reconcile`] re-queries the remote collection, locates
//! the resource matching the attempted natural key, and validates its
//! immutable fields against the request:
//!
//! - all fields equal: the existing resource is adopted and creation is
//!   idempotent;
//! - any field diverges: a hard mismatch - two different intents share one
//!   key and silently adopting would mask the collision;
//! - no key match: the original conflict stands unresolved.
//!
//! Implemented once and parameterized per resource type by a natural-key
//! predicate and a field-equivalence comparator.

use std::future::Future;

use tracing::debug;

use crate::error::RemoteError;

/// An immutable field that diverged between the requested spec and the
/// existing remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl FieldMismatch {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result of resolving a creation conflict against the remote collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome<A> {
    /// An equivalent resource already exists; creation succeeded in effect.
    Adopted(A),
    /// A resource shares the natural key but diverges on an immutable field.
    Mismatch(FieldMismatch),
    /// Nothing in the collection matches the natural key; the conflict came
    /// from some other concern and stands unresolved.
    NotFound,
}

impl<A> ReconcileOutcome<A> {
    /// Collapses the outcome into the create call's final result: adoption
    /// succeeds, a mismatch becomes a hard error, and not-found surfaces the
    /// original conflict error unchanged.
    pub fn into_result(self, conflict: RemoteError) -> Result<A, RemoteError> {
        match self {
            Self::Adopted(adopted) => Ok(adopted),
            Self::Mismatch(mismatch) => Err(RemoteError::Mismatch {
                field: mismatch.field,
                expected: mismatch.expected,
                actual: mismatch.actual,
            }),
            Self::NotFound => Err(conflict),
        }
    }
}

/// Resolves a creation conflict by locating and validating an equivalent
/// pre-existing resource.
///
/// `query` re-reads the remote collection, already filtered by the natural
/// key fields where the API supports it. `key_matches` narrows the candidates
/// to the attempted natural key, `diverging_field` reports the first
/// immutable field that differs from the request, and `adopt` extracts what
/// the caller keeps from the match - typically the server-assigned identity.
///
/// A failure of the query itself is wrapped as a permanent error:
/// reconciliation cannot recover from a broken read path.
pub async fn reconcile<R, A, Fut>(
    query: Fut,
    key_matches: impl Fn(&R) -> bool,
    diverging_field: impl Fn(&R) -> Option<FieldMismatch>,
    adopt: impl Fn(&R) -> A,
) -> Result<ReconcileOutcome<A>, RemoteError>
where
    Fut: Future<Output = Result<Vec<R>, RemoteError>>,
{
    let candidates = query
        .await
        .map_err(|err| RemoteError::ConflictLookup(Box::new(err)))?;
    debug!(candidates = candidates.len(), "reconciling creation conflict");

    let Some(existing) = candidates.iter().find(|candidate| key_matches(candidate)) else {
        return Ok(ReconcileOutcome::NotFound);
    };
    if let Some(mismatch) = diverging_field(existing) {
        return Ok(ReconcileOutcome::Mismatch(mismatch));
    }
    Ok(ReconcileOutcome::Adopted(adopt(existing)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[derive(Debug, Clone, PartialEq)]
    struct Remote {
        id: String,
        key: String,
        description: String,
    }

    fn remote(id: &str, key: &str, description: &str) -> Remote {
        Remote {
            id: id.into(),
            key: key.into(),
            description: description.into(),
        }
    }

    fn description_check(expected: &str) -> impl Fn(&Remote) -> Option<FieldMismatch> + '_ {
        move |candidate| {
            (candidate.description != expected).then(|| {
                FieldMismatch::new("description", expected, candidate.description.clone())
            })
        }
    }

    #[tokio::test]
    async fn adopts_an_equivalent_resource() {
        let existing = vec![remote("srv-1", "K", "observation store")];

        let outcome = reconcile(
            async { Ok(existing.clone()) },
            |r: &Remote| r.key == "K",
            description_check("observation store"),
            |r| r.id.clone(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Adopted("srv-1".to_string()));
        assert_eq!(
            outcome.into_result(RemoteError::api(409, "conflict")).unwrap(),
            "srv-1"
        );
    }

    #[tokio::test]
    async fn divergent_description_is_a_hard_mismatch() {
        let existing = vec![remote("srv-1", "K", "something else entirely")];

        let outcome = reconcile(
            async { Ok(existing.clone()) },
            |r: &Remote| r.key == "K",
            description_check("observation store"),
            |r| r.id.clone(),
        )
        .await
        .unwrap();

        let err = outcome
            .into_result(RemoteError::api(409, "conflict"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("description"));
        assert!(message.contains("observation store"));
        assert!(message.contains("something else entirely"));
    }

    #[tokio::test]
    async fn no_key_match_surfaces_the_original_conflict() {
        let existing = vec![remote("srv-2", "OTHER", "observation store")];

        let outcome = reconcile(
            async { Ok(existing.clone()) },
            |r: &Remote| r.key == "K",
            description_check("observation store"),
            |r| r.id.clone(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ReconcileOutcome::NotFound);
        let err = outcome
            .into_result(RemoteError::api(409, "the original conflict"))
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("the original conflict"));
    }

    #[tokio::test]
    async fn empty_collection_is_not_found() {
        let outcome = reconcile(
            async { Ok(Vec::<Remote>::new()) },
            |_: &Remote| true,
            |_| None,
            |r| r.id.clone(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ReconcileOutcome::NotFound);
    }

    #[tokio::test]
    async fn first_key_match_wins() {
        let existing = vec![
            remote("srv-1", "K", "observation store"),
            remote("srv-2", "K", "observation store"),
        ];

        let outcome = reconcile(
            async { Ok(existing.clone()) },
            |r: &Remote| r.key == "K",
            description_check("observation store"),
            |r| r.id.clone(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Adopted("srv-1".to_string()));
    }

    #[tokio::test]
    async fn query_failure_is_permanent() {
        let err = reconcile(
            async { Err::<Vec<Remote>, _>(RemoteError::api(500, "list broke")) },
            |_: &Remote| true,
            |_| None,
            |r| r.id.clone(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Permanent);
        assert!(err.to_string().contains("list broke"));
    }
}
