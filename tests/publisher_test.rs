//! Integration tests for the job publisher.

mod common;

use assert_matches::assert_matches;
use common::{batch, entry, PublisherHarness};
use dvrflow::derive::CropAnswer;
use dvrflow::publisher::{accept_batch, JobOutcome};
use dvrflow_common::{CropRect, FieldOrder, Recording, Resolution, ValidationRules};
use dvrflow_db::Ledger;

const ER_UUID: &str = "5c1f9a7e20b34d6f8a21";
const VERA_UUID: &str = "0d7e4c2b91a84f35b6e0";

fn recording(uuid: &str, title: &str, channel: &str, episode: Option<&str>) -> Recording {
    Recording::from_entry(&entry(uuid, title, channel, episode), &ValidationRules::default())
        .expect("valid entry")
}

fn er() -> Recording {
    recording(ER_UUID, "ER", "abc1", Some("Season 3 - Episode 22"))
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn letterbox_free_title_publishes_without_prompt() {
    let h = PublisherHarness::new(vec![]);

    let outcome = h.publisher.process(er()).await;

    let JobOutcome::Published(order) = outcome else {
        panic!("expected a published order, got {outcome:?}");
    };
    assert_eq!(order.preferred_output_filename, "er.s3e22.mkv");
    assert_eq!(order.recording_file, "/data/recordings/ER.ts");
    assert_eq!(order.crop_settings, None);
    assert_eq!(order.interlace_settings, None);
    assert_eq!(order.output_res, Some(Resolution::new(1280, 720)));
    assert_eq!(order.bitrate, Some(h.config.publisher.bitrate));
    assert_eq!(h.inspector.prompts(), 0);

    let published = h.bus.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "rkmppenc");
    assert_eq!(h.bus.orders(), vec![order]);

    assert!(h.ledger.already_scheduled(ER_UUID).unwrap());
    assert!(!h.staged().exists());
    assert_eq!(h.fetcher.calls(), vec!["hts@pvr.lan:/data/recordings/ER.ts"]);
}

#[tokio::test]
async fn published_payload_uses_wire_field_names() {
    let h = PublisherHarness::new(vec![]);
    h.publisher.process(er()).await;

    let (_, payload) = &h.bus.published()[0];
    let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
    assert_eq!(json["recording_file"], "/data/recordings/ER.ts");
    assert_eq!(json["preferred_output_filename"], "er.s3e22.mkv");
    assert!(json["crop_settings"].is_null());
    assert!(json["interlace_settings"].is_null());
    assert_eq!(json["output_res"], serde_json::json!([1280, 720]));
}

#[tokio::test]
async fn finale_notification_publishes_uncropped_720p_order() {
    let h = PublisherHarness::new(vec![]);
    let payload = batch(vec![serde_json::json!({
        "uuid": "0123456789ABCDEF0",
        "status": "recording-complete",
        "filename": "/recordings/x.ts",
        "title": { "eng": "ER Season Finale" },
        "channelname": "abc1"
    })]);

    let accepted = accept_batch(&payload, &ValidationRules::default());
    assert_eq!(accepted.len(), 1);

    let mut outcomes = Vec::new();
    for recording in accepted {
        outcomes.push(h.publisher.process(recording).await);
    }

    let [JobOutcome::Published(order)] = outcomes.as_slice() else {
        panic!("expected one published order, got {outcomes:?}");
    };
    assert_eq!(order.crop_settings, None);
    assert_eq!(order.interlace_settings, None);
    assert_eq!(order.output_res, Some(Resolution::new(1280, 720)));
    assert_eq!(order.preferred_output_filename, "x.mkv");
    assert_eq!(h.inspector.prompts(), 0);
    assert_eq!(h.bus.orders(), vec![order.clone()]);
    assert!(h.ledger.already_scheduled("0123456789ABCDEF0").unwrap());
}

#[tokio::test]
async fn crop_answer_suppresses_channel_deinterlace() {
    let h = PublisherHarness::new(vec![CropAnswer::Crop([8, 72, 8, 70])]);

    let outcome = h
        .publisher
        .process(recording(VERA_UUID, "Vera", "9Gem", Some("Season 1 - Episode 1")))
        .await;

    let JobOutcome::Published(order) = outcome else {
        panic!("expected a published order, got {outcome:?}");
    };
    assert_eq!(order.crop_settings, Some(CropRect::new(8, 72, 8, 70)));
    assert_eq!(order.interlace_settings, None);
    assert_eq!(order.output_res, None);
    assert_eq!(h.inspector.asked(), vec!["Vera"]);
}

#[tokio::test]
async fn interlaced_channel_without_crop_deinterlaces() {
    let h = PublisherHarness::new(vec![CropAnswer::Crop([0, 0, 0, 0])]);

    let outcome = h
        .publisher
        .process(recording(VERA_UUID, "Vera", "9Gem", None))
        .await;

    let JobOutcome::Published(order) = outcome else {
        panic!("expected a published order, got {outcome:?}");
    };
    assert_eq!(order.crop_settings, None);
    assert_eq!(order.interlace_settings, Some(FieldOrder::Tff));
    assert_eq!(order.preferred_output_filename, "vera.mkv");
}

// ---------------------------------------------------------------------------
// Ledger semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_across_batches_publishes_once() {
    let h = PublisherHarness::new(vec![]);
    let rules = ValidationRules::default();
    let payload = batch(vec![entry(ER_UUID, "ER", "abc1", Some("Season 3 - Episode 22"))]);

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        for recording in accept_batch(&payload, &rules) {
            outcomes.push(h.publisher.process(recording).await);
        }
    }

    assert_eq!(outcomes.len(), 2);
    assert_matches!(outcomes[0], JobOutcome::Published(_));
    assert_eq!(outcomes[1], JobOutcome::SkippedDuplicate);
    assert_eq!(h.bus.published().len(), 1);
    assert_eq!(h.fetcher.calls().len(), 1);
    assert_eq!(h.ledger.count().unwrap(), 1);
}

#[tokio::test]
async fn operator_skip_commits_without_publishing() {
    let h = PublisherHarness::new(vec![CropAnswer::Skip]);

    let outcome = h
        .publisher
        .process(recording(VERA_UUID, "Vera", "abc1", None))
        .await;

    assert_eq!(outcome, JobOutcome::Aborted);
    assert!(h.bus.published().is_empty());
    assert!(h.ledger.already_scheduled(VERA_UUID).unwrap());
    assert!(!h.staged().exists());

    // A redelivery is now a duplicate and never prompts again.
    let again = h
        .publisher
        .process(recording(VERA_UUID, "Vera", "abc1", None))
        .await;
    assert_eq!(again, JobOutcome::SkippedDuplicate);
    assert_eq!(h.inspector.prompts(), 1);
}

#[tokio::test]
async fn publish_failure_leaves_recording_uncommitted() {
    let h = PublisherHarness::new(vec![]);
    h.bus.set_failing(true);

    let outcome = h.publisher.process(er()).await;

    assert_matches!(outcome, JobOutcome::Failed(ref reason) if reason.contains("publish"));
    assert!(!h.ledger.already_scheduled(ER_UUID).unwrap());
    assert!(!h.staged().exists());

    // Retried once the bus recovers.
    h.bus.set_failing(false);
    assert_matches!(
        h.publisher.process(er()).await,
        JobOutcome::Published(_)
    );
    assert!(h.ledger.already_scheduled(ER_UUID).unwrap());
}

#[tokio::test]
async fn fetch_failure_is_not_committed() {
    let h = PublisherHarness::with_failing_fetch();

    let outcome = h.publisher.process(er()).await;

    assert_matches!(outcome, JobOutcome::Failed(ref reason) if reason.contains("fetch"));
    assert!(h.bus.published().is_empty());
    assert_eq!(h.ledger.count().unwrap(), 0);
    assert_eq!(h.inspector.prompts(), 0);
}

#[tokio::test]
async fn publishers_sharing_a_ledger_file_skip_each_others_work() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recordings.db");

    let first = PublisherHarness::with_ledger(vec![], Ledger::open(&path).unwrap());
    let second = PublisherHarness::with_ledger(vec![], Ledger::open(&path).unwrap());

    assert_matches!(
        first.publisher.process(er()).await,
        JobOutcome::Published(_)
    );
    assert_eq!(
        second.publisher.process(er()).await,
        JobOutcome::SkippedDuplicate
    );
    assert!(second.bus.published().is_empty());
}

// ---------------------------------------------------------------------------
// Batch intake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_entries_do_not_block_the_batch() {
    let h = PublisherHarness::new(vec![]);
    let bad = entry("tooshort", "Vera", "abc1", None);
    let mut incomplete = entry(VERA_UUID, "Vera", "abc1", None);
    incomplete["status"] = serde_json::json!("Recording");

    let payload = batch(vec![
        bad,
        incomplete,
        entry(ER_UUID, "ER", "abc1", Some("Season 3 - Episode 22")),
    ]);
    let accepted = accept_batch(&payload, &ValidationRules::default());
    assert_eq!(accepted.len(), 1);

    for recording in accepted {
        h.publisher.process(recording).await;
    }
    assert_eq!(h.bus.published().len(), 1);
}
