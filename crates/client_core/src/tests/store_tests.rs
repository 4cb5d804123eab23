use shared::domain::{LeadId, LeadStatus};
use tokio::sync::broadcast;

use super::*;
use crate::test_support::sample_lead;

fn store() -> (LeadStore, broadcast::Receiver<StoreEvent>) {
    let (events, rx) = broadcast::channel(64);
    (LeadStore::new(events), rx)
}

#[test]
fn upsert_appends_in_arrival_order_and_replaces_in_place() {
    let (mut store, _rx) = store();
    let a = sample_lead("a", 1.0, LeadStatus::Leads);
    let b = sample_lead("b", 2.0, LeadStatus::Contacted);
    store.upsert(a.clone());
    store.upsert(b.clone());

    let mut changed = a.clone();
    changed.value = 9.0;
    store.upsert(changed.clone());

    let leads = store.list();
    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0], changed);
    assert_eq!(leads[1], b);
}

#[test]
fn get_and_position_agree() {
    let (mut store, _rx) = store();
    let a = sample_lead("a", 1.0, LeadStatus::Leads);
    let b = sample_lead("b", 2.0, LeadStatus::Won);
    store.upsert(a.clone());
    store.upsert(b.clone());

    assert_eq!(store.position(b.id), Some(1));
    assert_eq!(store.get(b.id).map(|lead| lead.name.as_str()), Some("b"));
    assert_eq!(store.len(), 2);
    assert!(!store.is_empty());
}

#[test]
fn remove_of_unknown_id_is_quiet() {
    let (mut store, mut rx) = store();
    assert!(store.remove(LeadId::generate()).is_none());
    assert!(rx.try_recv().is_err());
}

#[test]
fn every_write_notifies_observers_before_returning() {
    let (mut store, mut rx) = store();
    let a = sample_lead("a", 1.0, LeadStatus::Leads);

    store.upsert(a.clone());
    assert!(matches!(rx.try_recv(), Ok(StoreEvent::Upserted(_))));

    store.remove(a.id);
    assert!(matches!(rx.try_recv(), Ok(StoreEvent::Removed(id)) if id == a.id));

    store.replace_all(vec![a.clone()]);
    assert!(matches!(rx.try_recv(), Ok(StoreEvent::Replaced(leads)) if leads.len() == 1));
}

#[test]
fn insert_at_clamps_past_the_tail() {
    let (mut store, _rx) = store();
    let a = sample_lead("a", 1.0, LeadStatus::Leads);
    store.insert_at(5, a.clone());
    assert_eq!(store.list(), vec![a]);
}

#[test]
fn insert_at_restores_the_original_ordering() {
    let (mut store, _rx) = store();
    let a = sample_lead("a", 1.0, LeadStatus::Leads);
    let b = sample_lead("b", 2.0, LeadStatus::Leads);
    let c = sample_lead("c", 3.0, LeadStatus::Leads);
    store.upsert(a.clone());
    store.upsert(b.clone());
    store.upsert(c.clone());

    let removed = store.remove(b.id).expect("removed");
    store.insert_at(1, removed);

    let leads = store.list();
    let names: Vec<&str> = leads.iter().map(|lead| lead.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}
