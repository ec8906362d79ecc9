//! Unit tests for the identifiers module

use core_kernel::{BatchId, OrganizationId};
use uuid::Uuid;

#[test]
fn test_new_generates_unique_ids() {
    let id1 = OrganizationId::new();
    let id2 = OrganizationId::new();
    assert_ne!(id1, id2);
}

#[test]
fn test_batch_ids_are_time_ordered() {
    let id1 = BatchId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let id2 = BatchId::new_v7();
    let uuid1: Uuid = id1.into();
    let uuid2: Uuid = id2.into();
    assert!(uuid1 < uuid2);
}

#[test]
fn test_default_is_time_ordered() {
    let id = BatchId::default();
    assert_eq!(id.as_uuid().get_version_num(), 7);
}

#[test]
fn test_prefixes() {
    assert_eq!(OrganizationId::prefix(), "ORG");
    assert_eq!(BatchId::prefix(), "CDRB");
}

#[test]
fn test_from_str_rejects_garbage() {
    let result: Result<OrganizationId, _> = "ORG-not-a-uuid".parse();
    assert!(result.is_err());
}

#[test]
fn test_serde_is_transparent() {
    let uuid = Uuid::new_v4();
    let id = OrganizationId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", uuid));

    let back: OrganizationId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
