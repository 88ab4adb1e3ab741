// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes Events for state transitions and copy changes.
//!
//! Events are derived from what a reconcile returned, so the reconcilers stay
//! free of anything but the object store. Publishing is best effort.

use super::consumer::ConsumerOutcome;
use crate::store::OperationResult;
use crate::types::{ConsumerState, ObjectKey, PublisherState};
use kube::runtime::events::{Event, EventType, Recorder};
use kube::Resource;
use tracing::warn;

const ACTION: &str = "Reconcile";

fn event(type_: EventType, reason: &str, note: String) -> Event {
    Event {
        type_,
        reason: reason.to_string(),
        note: Some(note),
        action: ACTION.to_string(),
        secondary: None,
    }
}

/// Events for a Publisher going from `previous` to `current`
pub(crate) fn publisher_events(
    previous: Option<PublisherState>,
    current: PublisherState,
    source: &ObjectKey,
) -> Vec<Event> {
    if previous == Some(current) {
        return Vec::new();
    }

    match current {
        PublisherState::SourceNotFound => vec![event(
            EventType::Warning,
            "SourceNotFound",
            format!("Secret {} not found", source),
        )],
        PublisherState::Ready if previous.is_some() => vec![event(
            EventType::Normal,
            "SourceFound",
            format!("Secret {} is available again", source),
        )],
        PublisherState::Ready => Vec::new(),
    }
}

/// Events for a Consumer reconcile that started from `previous`
pub(crate) fn consumer_events(previous: Option<ConsumerState>, outcome: &ConsumerOutcome) -> Vec<Event> {
    let mut events = Vec::new();

    if previous != Some(outcome.state) {
        let reason = match outcome.state {
            ConsumerState::DestinationConflict => Some("DestinationConflict"),
            ConsumerState::NamespaceNotAllowed => Some("NamespaceNotAllowed"),
            _ => None,
        };
        if let Some(reason) = reason {
            events.push(event(EventType::Warning, reason, outcome.message.clone()));
        }
    }

    match outcome.copy {
        Some(OperationResult::Created) => {
            events.push(event(EventType::Normal, "SecretCreated", outcome.message.clone()))
        }
        Some(OperationResult::Updated) => {
            events.push(event(EventType::Normal, "SecretUpdated", outcome.message.clone()))
        }
        _ => {}
    }

    for key in &outcome.pruned {
        events.push(event(
            EventType::Normal,
            "StaleCopyDeleted",
            format!("Deleted previous copy {}", key),
        ));
    }

    events
}

/// Publish `events` about `object`, logging failures
pub(crate) async fn publish<K>(recorder: &Recorder, object: &K, events: Vec<Event>)
where
    K: Resource<DynamicType = ()>,
{
    if events.is_empty() {
        return;
    }

    let reference = object.object_ref(&());
    for event in events {
        if let Err(e) = recorder.publish(&event, &reference).await {
            warn!("Failed to publish {} event: {}", event.reason, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(state: ConsumerState, copy: Option<OperationResult>) -> ConsumerOutcome {
        ConsumerOutcome {
            state,
            message: "msg".to_string(),
            copy,
            pruned: Vec::new(),
        }
    }

    fn reasons(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.reason.as_str()).collect()
    }

    #[test]
    fn test_publisher_losing_source_warns() {
        let source = ObjectKey::new("ns1", "s");

        let events = publisher_events(Some(PublisherState::Ready), PublisherState::SourceNotFound, &source);

        assert_eq!(reasons(&events), vec!["SourceNotFound"]);
        assert!(matches!(events[0].type_, EventType::Warning));
        assert_eq!(events[0].note.as_deref(), Some("Secret ns1/s not found"));
    }

    #[test]
    fn test_publisher_steady_state_is_quiet() {
        let source = ObjectKey::new("ns1", "s");

        assert!(publisher_events(Some(PublisherState::Ready), PublisherState::Ready, &source).is_empty());
        assert!(publisher_events(None, PublisherState::Ready, &source).is_empty());
        assert!(publisher_events(
            Some(PublisherState::SourceNotFound),
            PublisherState::SourceNotFound,
            &source
        )
        .is_empty());
    }

    #[test]
    fn test_publisher_recovery_is_normal() {
        let source = ObjectKey::new("ns1", "s");

        let events = publisher_events(Some(PublisherState::SourceNotFound), PublisherState::Ready, &source);

        assert_eq!(reasons(&events), vec!["SourceFound"]);
        assert!(matches!(events[0].type_, EventType::Normal));
    }

    #[test]
    fn test_consumer_entering_conflict_warns_once() {
        let conflict = outcome(ConsumerState::DestinationConflict, None);

        let events = consumer_events(Some(ConsumerState::Ready), &conflict);
        assert_eq!(reasons(&events), vec!["DestinationConflict"]);
        assert!(matches!(events[0].type_, EventType::Warning));

        assert!(consumer_events(Some(ConsumerState::DestinationConflict), &conflict).is_empty());
    }

    #[test]
    fn test_consumer_namespace_not_allowed_warns() {
        let events = consumer_events(None, &outcome(ConsumerState::NamespaceNotAllowed, None));
        assert_eq!(reasons(&events), vec!["NamespaceNotAllowed"]);
    }

    #[test]
    fn test_consumer_copy_writes_are_reported() {
        let created = consumer_events(None, &outcome(ConsumerState::Ready, Some(OperationResult::Created)));
        assert_eq!(reasons(&created), vec!["SecretCreated"]);

        let updated = consumer_events(
            Some(ConsumerState::Ready),
            &outcome(ConsumerState::Ready, Some(OperationResult::Updated)),
        );
        assert_eq!(reasons(&updated), vec!["SecretUpdated"]);

        let unchanged = consumer_events(
            Some(ConsumerState::Ready),
            &outcome(ConsumerState::Ready, Some(OperationResult::Unchanged)),
        );
        assert!(unchanged.is_empty());
    }

    #[test]
    fn test_consumer_pruned_copies_are_reported() {
        let mut renamed = outcome(ConsumerState::Ready, Some(OperationResult::Created));
        renamed.pruned = vec![ObjectKey::new("ns2", "a")];

        let events = consumer_events(Some(ConsumerState::Ready), &renamed);

        assert_eq!(reasons(&events), vec!["SecretCreated", "StaleCopyDeleted"]);
        assert_eq!(events[1].note.as_deref(), Some("Deleted previous copy ns2/a"));
    }
}
