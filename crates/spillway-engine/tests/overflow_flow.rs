use spillway_engine::{
    ChannelKind, ChannelPlacer, ChannelRequest, MemoryTopology, MoveOutcome, PlacementError,
    ReclaimOutcome, TopologyEvent,
};
use spillway_kernel::{
    CapacityLimits, DEFAULT_BAND_WIDTH, OverwriteTarget, PermissionOverwrite, TopologyProvider,
};
use spillway_ledger::{JsonlRecordStore, MemoryRecordStore, OverflowLedger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

struct Harness {
    topology: Arc<MemoryTopology>,
    ledger: OverflowLedger,
    placer: ChannelPlacer,
}

fn harness(limits: CapacityLimits) -> Harness {
    let topology = Arc::new(MemoryTopology::new());
    let ledger = OverflowLedger::new(Arc::new(MemoryRecordStore::new()));
    let placer = ChannelPlacer::new(topology.clone(), ledger.clone(), limits, DEFAULT_BAND_WIDTH);
    Harness {
        topology,
        ledger,
        placer,
    }
}

fn small_categories(category_limit: usize) -> CapacityLimits {
    CapacityLimits {
        category_limit,
        ..CapacityLimits::default()
    }
}

fn temp_path(prefix: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "spillway-flow-{prefix}-{}-{unique}.jsonl",
        std::process::id()
    ))
}

#[tokio::test]
async fn original_at_capacity_minus_one_is_kept() {
    let h = harness(CapacityLimits::default());
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.fill(incomplete, "dctf-misc", 49);

    let target = h
        .placer
        .resolver()
        .resolve_target(incomplete)
        .await
        .expect("resolve");
    assert_eq!(target, incomplete);
    assert!(h.ledger.all().await.expect("all").is_empty());
}

#[tokio::test]
async fn overflows_are_numbered_from_two() {
    let h = harness(small_categories(2));
    let incomplete = h.topology.add_category("INCOMPLETE");

    let mut placed = Vec::new();
    for leaf in ["a", "b", "c", "d", "e"] {
        placed.push(
            h.placer
                .create_channel(&ChannelRequest::challenge(format!("dctf-pwn-{leaf}"), incomplete))
                .await
                .expect("create"),
        );
    }

    assert_eq!(placed[0].category, incomplete);
    assert_eq!(placed[1].category, incomplete);
    let second = h.topology.category_by_name("INCOMPLETE 2").expect("index 2");
    let third = h.topology.category_by_name("INCOMPLETE 3").expect("index 3");
    assert_eq!(placed[2].category, second);
    assert_eq!(placed[3].category, second);
    assert_eq!(placed[4].category, third);
    assert_eq!(placed[2].allocated.as_ref().map(|r| r.index), Some(2));
    assert!(placed[3].allocated.is_none());
    assert_eq!(placed[4].allocated.as_ref().map(|r| r.index), Some(3));

    let indexes: Vec<u32> = h
        .ledger
        .overflows_of(incomplete)
        .await
        .expect("overflows")
        .iter()
        .map(|r| r.index)
        .collect();
    assert_eq!(indexes, vec![2, 3]);

    // No returned target was ever at capacity.
    for category in [incomplete, second, third] {
        assert!(h.topology.child_count(category).await.expect("count") <= 2);
    }
}

#[tokio::test]
async fn allocate_then_empty_restores_ledger() {
    let h = harness(small_categories(1));
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.add_channel(incomplete, "dctf-web-a", 0);

    let placed = h
        .placer
        .create_channel(&ChannelRequest::challenge("dctf-web-b", incomplete))
        .await
        .expect("create");
    let backup = placed.category;
    assert_ne!(backup, incomplete);
    assert_eq!(h.ledger.overflows_of(incomplete).await.expect("list").len(), 1);

    let outcome = h
        .placer
        .delete_channel(placed.channel)
        .await
        .expect("delete");
    assert!(matches!(
        outcome.reclaimed,
        Some(ReclaimOutcome::Reclaimed { .. })
    ));
    assert!(h.ledger.overflows_of(incomplete).await.expect("list").is_empty());
    assert!(!h.topology.has_category(backup));
    assert!(h.topology.has_category(incomplete));

    let again = h
        .placer
        .reclaimer()
        .on_channel_removed(backup)
        .await
        .expect("repeat");
    assert_eq!(again, ReclaimOutcome::Untracked);
}

#[tokio::test]
async fn removing_from_occupied_overflow_keeps_it() {
    let h = harness(small_categories(1));
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.add_channel(incomplete, "dctf-web-a", 0);
    let first = h
        .placer
        .create_channel(&ChannelRequest::challenge("dctf-web-b", incomplete))
        .await
        .expect("create");
    // The overflow is full now, so a third channel opens index 3.
    let second = h
        .placer
        .create_channel(&ChannelRequest::challenge("dctf-web-c", incomplete))
        .await
        .expect("create");
    assert_ne!(first.category, second.category);

    let events_before = h.topology.events().len();
    let outcome = h
        .placer
        .reclaimer()
        .on_channel_removed(first.category)
        .await
        .expect("reclaim");
    assert_eq!(outcome, ReclaimOutcome::NotEmpty { remaining: 1 });
    assert_eq!(h.topology.events().len(), events_before);
    assert_eq!(h.ledger.all().await.expect("all").len(), 2);
}

#[tokio::test]
async fn moving_out_of_overflow_reclaims_it() {
    let h = harness(small_categories(1));
    let incomplete = h.topology.add_category("INCOMPLETE");
    let complete = h.topology.add_category("COMPLETE");
    h.topology.add_channel(incomplete, "dctf-rev-a", 0);

    let placed = h
        .placer
        .create_channel(&ChannelRequest::challenge("dctf-rev-b", incomplete))
        .await
        .expect("create");

    let outcome = h
        .placer
        .move_channel(placed.channel, complete, ChannelKind::Challenge)
        .await
        .expect("move");
    let MoveOutcome::Moved {
        placed: moved,
        source,
        reclaimed,
    } = outcome
    else {
        panic!("expected a move");
    };
    assert_eq!(moved.category, complete);
    assert_eq!(source, Some(placed.category));
    assert!(matches!(reclaimed, Some(ReclaimOutcome::Reclaimed { .. })));
    assert!(!h.topology.has_category(placed.category));
}

#[tokio::test]
async fn move_into_current_category_is_a_no_op() {
    let h = harness(CapacityLimits::default());
    let incomplete = h.topology.add_category("INCOMPLETE");
    let channel = h.topology.add_channel(incomplete, "dctf-pwn-a", 0);

    let outcome = h
        .placer
        .move_channel(channel, incomplete, ChannelKind::Challenge)
        .await
        .expect("move");
    assert_eq!(
        outcome,
        MoveOutcome::Unchanged {
            channel,
            category: incomplete
        }
    );
    assert!(h.topology.events().is_empty());
}

#[tokio::test]
async fn challenge_channels_group_by_event_and_category() {
    let h = harness(CapacityLimits::default());
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.add_channel(incomplete, "pwn-baby-rev0", 5);
    h.topology.add_channel(incomplete, "web-sqli", 6);

    let same_subgroup = h
        .placer
        .policy()
        .compute_ordinal(incomplete, "pwn-baby-rev1")
        .await
        .expect("ordinal");
    assert_eq!(same_subgroup, 5);

    let placed = h
        .placer
        .create_channel(&ChannelRequest::challenge("pwn-crypto-aes", incomplete))
        .await
        .expect("create");
    assert_eq!(placed.ordinal.map(|o| o.position), Some(6));

    let names: Vec<String> = h
        .topology
        .ordered_children(incomplete)
        .await
        .expect("children")
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, vec!["pwn-baby-rev0", "pwn-crypto-aes", "web-sqli"]);
}

#[tokio::test]
async fn event_channels_are_appended() {
    let h = harness(CapacityLimits::default());
    let ctfs = h.topology.add_category("CTFS");
    h.topology.add_channel(ctfs, "dctf", 0);

    let placed = h
        .placer
        .create_channel(&ChannelRequest::event("bsides", ctfs))
        .await
        .expect("create");
    assert!(placed.ordinal.is_none());
    let children = h.topology.ordered_children(ctfs).await.expect("children");
    assert_eq!(children.last().map(|c| c.id), Some(placed.channel));
}

#[tokio::test]
async fn invalid_challenge_name_fails_before_any_call() {
    let h = harness(CapacityLimits::default());
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.fail_on("guild_channel_count");

    let err = h
        .placer
        .create_channel(&ChannelRequest::challenge("general", incomplete))
        .await
        .expect_err("must fail");
    assert!(matches!(err, PlacementError::InvalidName(_)));
    assert!(h.topology.events().is_empty());
}

#[tokio::test]
async fn full_server_refuses_creation_but_not_deletion() {
    let h = harness(CapacityLimits {
        category_limit: 50,
        guild_limit: 10,
        guild_headroom: 3,
    });
    let incomplete = h.topology.add_category("INCOMPLETE");
    let channels = h.topology.fill(incomplete, "dctf-pwn", 6);

    let err = h
        .placer
        .create_channel(&ChannelRequest::challenge("dctf-pwn-z", incomplete))
        .await
        .expect_err("ceiling reached");
    assert!(matches!(
        err,
        PlacementError::GuildFull {
            count: 7,
            ceiling: 7
        }
    ));

    h.placer
        .delete_channel(channels[0])
        .await
        .expect("deletes are never refused");
    h.placer
        .create_channel(&ChannelRequest::challenge("dctf-pwn-z", incomplete))
        .await
        .expect("room again");
}

#[tokio::test]
async fn provider_failure_during_allocation_records_nothing() {
    let h = harness(small_categories(1));
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.add_channel(incomplete, "dctf-pwn-a", 0);
    h.topology.fail_on("create_category");

    let err = h
        .placer
        .create_channel(&ChannelRequest::challenge("dctf-pwn-b", incomplete))
        .await
        .expect_err("must fail");
    assert!(matches!(err, PlacementError::ProviderUnavailable(_)));
    assert!(err.is_transient());
    assert!(h.ledger.all().await.expect("all").is_empty());
    assert_eq!(h.topology.category_ids().len(), 1);
}

#[tokio::test]
async fn concurrent_creates_share_one_overflow() {
    let h = harness(small_categories(3));
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.fill(incomplete, "dctf-pwn", 3);

    let mut tasks = Vec::new();
    for leaf in ["x", "y", "z"] {
        let placer = h.placer.clone();
        tasks.push(tokio::spawn(async move {
            placer
                .create_channel(&ChannelRequest::challenge(format!("dctf-web-{leaf}"), incomplete))
                .await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("create");
    }

    let overflows = h.ledger.overflows_of(incomplete).await.expect("list");
    assert_eq!(overflows.len(), 1);
    let created = h
        .topology
        .events()
        .into_iter()
        .filter(|e| matches!(e, TopologyEvent::CategoryCreated { .. }))
        .count();
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_overflows_of_different_categories_all_reach_jsonl_ledger() {
    let path = temp_path("concurrent");
    let topology = Arc::new(MemoryTopology::new());
    let ledger = OverflowLedger::new(Arc::new(JsonlRecordStore::new(&path)));
    let placer = ChannelPlacer::new(
        topology.clone(),
        ledger.clone(),
        small_categories(1),
        DEFAULT_BAND_WIDTH,
    );

    let mut originals = Vec::new();
    for i in 0..16 {
        let category = topology.add_category(&format!("CTF {i}"));
        topology.add_channel(category, &format!("ctf{i}-pwn-a"), 0);
        originals.push(category);
    }

    let mut tasks = Vec::new();
    for (i, &category) in originals.iter().enumerate() {
        let placer = placer.clone();
        tasks.push(tokio::spawn(async move {
            placer
                .create_channel(&ChannelRequest::challenge(format!("ctf{i}-web-b"), category))
                .await
        }));
    }
    let mut backups = Vec::new();
    for task in tasks {
        let placed = task.await.expect("join").expect("create under contention");
        backups.push(placed.category);
    }

    let records = ledger.all().await.expect("all");
    assert_eq!(records.len(), originals.len());
    for backup in backups {
        assert!(!originals.contains(&backup));
        assert!(
            records.iter().any(|r| r.backup_category_id == backup),
            "backup {backup} has no ledger record"
        );
    }
    assert_eq!(topology.category_ids().len(), originals.len() * 2);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn permission_overwrites_follow_the_channel_into_overflow() {
    let h = harness(small_categories(1));
    let incomplete = h.topology.add_category("INCOMPLETE");
    h.topology.add_channel(incomplete, "dctf-pwn-a", 0);

    let overwrites = vec![
        PermissionOverwrite {
            target: OverwriteTarget::Role(7),
            allow: 1024,
            deny: 0,
        },
        PermissionOverwrite {
            target: OverwriteTarget::Member(42),
            allow: 0,
            deny: 2048,
        },
    ];
    let placed = h
        .placer
        .create_channel(
            &ChannelRequest::challenge("dctf-pwn-b", incomplete).with_overwrites(overwrites.clone()),
        )
        .await
        .expect("create");
    assert_ne!(placed.category, incomplete);

    let node = h
        .topology
        .snapshot()
        .channels
        .into_iter()
        .find(|c| c.id == placed.channel)
        .expect("created channel");
    assert_eq!(node.parent, Some(placed.category));
    assert_eq!(node.overwrites, overwrites);
}

#[tokio::test]
async fn jsonl_ledger_survives_restart() {
    let path = temp_path("restart");
    let topology = Arc::new(MemoryTopology::new());
    let incomplete = topology.add_category("INCOMPLETE");
    topology.add_channel(incomplete, "dctf-pwn-a", 0);

    let first = ChannelPlacer::new(
        topology.clone(),
        OverflowLedger::new(Arc::new(JsonlRecordStore::new(&path))),
        small_categories(1),
        DEFAULT_BAND_WIDTH,
    );
    let placed = first
        .create_channel(&ChannelRequest::challenge("dctf-pwn-b", incomplete))
        .await
        .expect("create");
    drop(first);

    let ledger = OverflowLedger::new(Arc::new(JsonlRecordStore::new(&path)));
    let second = ChannelPlacer::new(
        topology.clone(),
        ledger.clone(),
        small_categories(1),
        DEFAULT_BAND_WIDTH,
    );
    let records = ledger.overflows_of(incomplete).await.expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].backup_category_id, placed.category);

    second.delete_channel(placed.channel).await.expect("delete");
    assert!(ledger.all().await.expect("all").is_empty());
    assert!(!topology.has_category(placed.category));

    let _ = std::fs::remove_file(&path);
}
