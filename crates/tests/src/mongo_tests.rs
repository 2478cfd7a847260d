use std::sync::Arc;

use bson::oid::ObjectId;
use invitely_db::models::{Invitation, User};
use invitely_services::{
    InvitationError,
    dao::{base::DaoError, invitation_stats::InvitationStatsDao},
    store::{InvitationStore, StatsStore, UserStore},
};

use crate::fixtures::mongo::TestDb;

async fn sender(test_db: &TestDb) -> User {
    test_db
        .stores
        .users
        .insert(User::new(
            "sender@test.com".to_string(),
            "sender".to_string(),
            "Sender".to_string(),
            None,
        ))
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn get_or_create_is_idempotent() {
    let test_db = TestDb::spawn().await;
    let stats = &test_db.stores.stats;
    let user_id = ObjectId::new();

    let created = stats.get_or_create(user_id, 10).await.unwrap();
    assert_eq!((created.available, created.sent, created.accepted), (10, 0, 0));

    stats.use_invitations(user_id, 1, true).await.unwrap();
    let again = stats.get_or_create(user_id, 99).await.unwrap();
    assert_eq!((again.available, again.sent), (9, 1));
    assert_eq!(stats.list(None).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn debit_is_rejected_without_quota() {
    let test_db = TestDb::spawn().await;
    let stats = &test_db.stores.stats;
    let user_id = ObjectId::new();
    stats.get_or_create(user_id, 1).await.unwrap();

    let debited = stats.use_invitations(user_id, 1, true).await.unwrap().unwrap();
    assert_eq!((debited.available, debited.sent), (0, 1));

    assert!(stats.use_invitations(user_id, 1, true).await.unwrap().is_none());
    let unchanged = stats.find_by_user(user_id).await.unwrap();
    assert_eq!((unchanged.available, unchanged.sent), (0, 1));

    // open mode only counts
    let counted = stats.use_invitations(user_id, 1, false).await.unwrap().unwrap();
    assert_eq!((counted.available, counted.sent), (0, 2));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn concurrent_debits_never_overdraw() {
    let test_db = TestDb::spawn().await;
    let stats = Arc::new(InvitationStatsDao::new(&test_db.db));
    let user_id = ObjectId::new();
    stats.get_or_create(user_id, 10).await.unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let stats = stats.clone();
            tokio::spawn(async move { stats.use_invitations(user_id, 1, true).await })
        })
        .collect();
    let mut granted = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_some() {
            granted += 1;
        }
    }

    assert_eq!(granted, 10);
    let ledger = stats.find_by_user(user_id).await.unwrap();
    assert_eq!((ledger.available, ledger.sent), (0, 10));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn accept_is_rejected_beyond_sent() {
    let test_db = TestDb::spawn().await;
    let stats = &test_db.stores.stats;
    let user_id = ObjectId::new();
    stats.get_or_create(user_id, 10).await.unwrap();

    assert!(stats.mark_accepted(user_id, 1).await.unwrap().is_none());

    stats.use_invitations(user_id, 1, true).await.unwrap();
    let accepted = stats.mark_accepted(user_id, 1).await.unwrap().unwrap();
    assert_eq!((accepted.sent, accepted.accepted), (1, 1));
    assert!(stats.mark_accepted(user_id, 1).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn missing_ledger_is_not_found() {
    let test_db = TestDb::spawn().await;
    let stats = &test_db.stores.stats;
    let user_id = ObjectId::new();

    assert!(matches!(
        stats.use_invitations(user_id, 1, true).await,
        Err(DaoError::NotFound)
    ));
    assert!(matches!(
        stats.mark_accepted(user_id, 1).await,
        Err(DaoError::NotFound)
    ));
    assert!(matches!(
        stats.add_available(user_id, 1).await,
        Err(DaoError::NotFound)
    ));
    assert!(matches!(
        stats.revert_use(user_id, 1, true).await,
        Err(DaoError::NotFound)
    ));
    assert!(stats.list(None).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn revert_restores_counters() {
    let test_db = TestDb::spawn().await;
    let stats = &test_db.stores.stats;
    let user_id = ObjectId::new();
    stats.get_or_create(user_id, 10).await.unwrap();
    stats.use_invitations(user_id, 2, true).await.unwrap();

    let reverted = stats.revert_use(user_id, 1, true).await.unwrap();
    assert_eq!((reverted.available, reverted.sent), (9, 1));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn duplicate_invitation_key_is_rejected() {
    let test_db = TestDb::spawn().await;
    let invitations = &test_db.stores.invitations;
    let key = "a".repeat(40);

    invitations
        .insert(Invitation::new(ObjectId::new(), "a@test.com".to_string(), key.clone()))
        .await
        .unwrap();
    assert!(matches!(
        invitations
            .insert(Invitation::new(ObjectId::new(), "b@test.com".to_string(), key))
            .await,
        Err(DaoError::DuplicateKey(_))
    ));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn invitation_is_accepted_once() {
    let test_db = TestDb::spawn().await;
    let (ledger, invitations) = test_db.services(true);
    let sender = sender(&test_db).await;
    let sender_id = sender.id.unwrap();
    ledger.open(sender_id).await.unwrap();

    let invitation = invitations.invite(&sender, "a@test.com").await.unwrap();
    invitations.invite(&sender, "b@test.com").await.unwrap();

    invitations.accept(&invitation, ObjectId::new()).await.unwrap();
    assert!(matches!(
        invitations.accept(&invitation, ObjectId::new()).await,
        Err(InvitationError::NotFound)
    ));

    let stats = ledger.stats(sender_id).await.unwrap();
    assert_eq!((stats.available, stats.sent, stats.accepted), (8, 2, 1));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn failed_accept_restores_invitation() {
    let test_db = TestDb::spawn().await;
    let (ledger, invitations) = test_db.services(true);
    let sender = sender(&test_db).await;
    let sender_id = sender.id.unwrap();
    ledger.open(sender_id).await.unwrap();

    // never debited, so the ledger refuses the acceptance
    let orphan = test_db
        .stores
        .invitations
        .insert(Invitation::new(sender_id, "a@test.com".to_string(), "b".repeat(40)))
        .await
        .unwrap();

    assert!(matches!(
        invitations.accept(&orphan, ObjectId::new()).await,
        Err(InvitationError::AcceptanceExceedsSent)
    ));
    assert_eq!(invitations.find(&orphan.key).await.unwrap(), orphan);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn invite_without_quota_stores_nothing() {
    let test_db = TestDb::spawn().await;
    let (ledger, invitations) = test_db.services(true);
    let sender = sender(&test_db).await;
    let sender_id = sender.id.unwrap();
    ledger.open(sender_id).await.unwrap();
    test_db
        .stores
        .stats
        .use_invitations(sender_id, 10, true)
        .await
        .unwrap();

    assert!(matches!(
        invitations.invite(&sender, "a@test.com").await,
        Err(InvitationError::QuotaExceeded)
    ));
    assert!(invitations.list_for_user(sender_id).await.unwrap().is_empty());
}
