//! Default-flag failures after the address row was already written.
//!
//! The flag store is wrapped so that `apply_default` fails while every other
//! call reaches the in-memory store; the owner must never end with two
//! defaults.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rstest::{fixture, rstest};
use storefront::domain::ports::{DefaultFlagRepository, DefaultFlagRepositoryError};
use storefront::domain::{AddressBookService, ErrorCode, UpsertAddressRequest, UserId};
use storefront::outbound::memory::InMemoryAddressRepository;
use support::{SteppingClock, address_draft, fixture_instant};
use uuid::Uuid;

/// Flag store whose `apply_default` always fails with `failure`.
struct FailingApply {
    inner: Arc<InMemoryAddressRepository>,
    failure: DefaultFlagRepositoryError,
}

#[async_trait]
impl DefaultFlagRepository for FailingApply {
    async fn find_owner(&self, entity_id: &Uuid) -> Result<Option<UserId>, DefaultFlagRepositoryError> {
        self.inner.find_owner(entity_id).await
    }

    async fn apply_default(
        &self,
        _owner: &UserId,
        _target: &Uuid,
        _touched_at: DateTime<Utc>,
    ) -> Result<u64, DefaultFlagRepositoryError> {
        Err(self.failure.clone())
    }
}

fn clock() -> Arc<SteppingClock> {
    Arc::new(SteppingClock::new(fixture_instant(), TimeDelta::seconds(1)))
}

fn default_request(label: &str, id: Option<Uuid>) -> UpsertAddressRequest {
    UpsertAddressRequest {
        id,
        fields: address_draft(label),
        is_default: true,
    }
}

fn default_ids(store: &InMemoryAddressRepository, owner: &UserId) -> Vec<Uuid> {
    store
        .snapshot()
        .into_iter()
        .filter(|address| address.is_owned_by(owner) && address.is_default)
        .map(|address| address.id)
        .collect()
}

struct Seeded {
    store: Arc<InMemoryAddressRepository>,
    owner: UserId,
    first: Uuid,
    second: Uuid,
}

#[fixture]
async fn seeded() -> Seeded {
    let store = Arc::new(InMemoryAddressRepository::new());
    let healthy = AddressBookService::new(Arc::clone(&store), Arc::clone(&store), clock());
    let owner = UserId::random();
    let first = healthy
        .upsert(&owner, default_request("A", None))
        .await
        .expect("seed default");
    let second = healthy
        .upsert(
            &owner,
            UpsertAddressRequest {
                is_default: false,
                ..default_request("B", None)
            },
        )
        .await
        .expect("seed second");
    Seeded {
        store,
        owner,
        first: first.id,
        second: second.id,
    }
}

fn failing_service(
    store: &Arc<InMemoryAddressRepository>,
    failure: DefaultFlagRepositoryError,
) -> AddressBookService<InMemoryAddressRepository, FailingApply> {
    let flags = Arc::new(FailingApply {
        inner: Arc::clone(store),
        failure,
    });
    AddressBookService::new(Arc::clone(store), flags, clock())
}

#[rstest]
#[case(DefaultFlagRepositoryError::connection("db went away"), ErrorCode::ServiceUnavailable)]
#[case(DefaultFlagRepositoryError::query("deadlock detected"), ErrorCode::InternalError)]
#[case(DefaultFlagRepositoryError::target_missing(), ErrorCode::NotFound)]
#[tokio::test]
async fn failed_apply_on_create_keeps_the_previous_default(
    #[future] seeded: Seeded,
    #[case] failure: DefaultFlagRepositoryError,
    #[case] expected: ErrorCode,
) {
    let seeded = seeded.await;
    let service = failing_service(&seeded.store, failure);

    let error = service
        .upsert(&seeded.owner, default_request("C", None))
        .await
        .expect_err("apply_default fails");

    assert_eq!(error.code(), expected);
    assert_eq!(default_ids(&seeded.store, &seeded.owner), vec![seeded.first]);
    assert_eq!(seeded.store.snapshot().len(), 3);
}

#[rstest]
#[tokio::test]
async fn failed_apply_on_update_keeps_the_previous_default(#[future] seeded: Seeded) {
    let seeded = seeded.await;
    let service = failing_service(
        &seeded.store,
        DefaultFlagRepositoryError::connection("db went away"),
    );

    let error = service
        .upsert(&seeded.owner, default_request("B2", Some(seeded.second)))
        .await
        .expect_err("apply_default fails");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(default_ids(&seeded.store, &seeded.owner), vec![seeded.first]);
}
