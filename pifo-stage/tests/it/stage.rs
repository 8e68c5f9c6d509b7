use rand::{seq::SliceRandom, Rng};

use pifo_stage::{
    DisciplineKind, NextHop, NextHopTable, Operation, OrderingKey, Packet, PipelineStage,
    RoutingTarget, StageError, StageOptions, DEFAULT_RANK_FIELD,
};

fn class_table() -> NextHopTable {
    NextHopTable::new(
        "class",
        [(0, NextHop::transmit()), (1, NextHop::enqueue([RoutingTarget::priority(0, 0)]))],
    )
    .unwrap()
}

fn ranked(rank: i64) -> Packet {
    Packet::new().with_field("class", 0).with_field(DEFAULT_RANK_FIELD, rank)
}

/// A stage without the per-tick check, for tests that load many packets on one tick.
fn relaxed_stage(priority_queues: u32, calendar_queues: u32) -> PipelineStage {
    let options = StageOptions::default()
        .priority_queues(priority_queues)
        .calendar_queues(calendar_queues)
        .enforce_tick_contract(false);
    PipelineStage::new(options, class_table())
}

#[test]
fn enqueue_then_dequeue_returns_packet_with_its_key() {
    let _ = tracing_subscriber::fmt::try_init();
    let mut rng = rand::thread_rng();

    let mut stage = PipelineStage::with_priority_computer(
        StageOptions::default().priority_queues(4),
        class_table(),
        |packet| OrderingKey::new(packet.get("weight").unwrap_or_default() * 2),
    );

    for (tick, queue_id) in (0..4).enumerate() {
        let tick = tick as u64;
        let weight = rng.gen_range(-1000..1000);
        let packet = Packet::new().with_field("class", 0).with_field("weight", weight);

        stage.enqueue(DisciplineKind::Priority, queue_id, packet.clone(), tick).unwrap();
        assert_eq!(
            stage.priority_queues()[queue_id as usize].peek_key(),
            Some(OrderingKey::new(weight * 2))
        );

        let released = stage.dequeue(DisciplineKind::Priority, queue_id, tick).unwrap();
        assert_eq!(released, Some(packet));
    }
}

#[test]
fn out_of_range_queue_ids_fail_for_both_banks() {
    let mut stage = relaxed_stage(2, 3);

    for queue_id in [2, 3, 17, u32::MAX] {
        let err = stage.enqueue(DisciplineKind::Priority, queue_id, ranked(0), 0).unwrap_err();
        assert_eq!(
            err,
            StageError::InvalidQueueId { kind: DisciplineKind::Priority, queue_id, bank_size: 2 }
        );
        assert!(matches!(
            stage.dequeue(DisciplineKind::Priority, queue_id, 0),
            Err(StageError::InvalidQueueId { .. })
        ));
    }

    for queue_id in [3, 4, u32::MAX] {
        assert!(matches!(
            stage.enqueue(DisciplineKind::Calendar, queue_id, ranked(0), 0),
            Err(StageError::InvalidQueueId { bank_size: 3, .. })
        ));
        assert!(matches!(
            stage.dequeue(DisciplineKind::Calendar, queue_id, 0),
            Err(StageError::InvalidQueueId { bank_size: 3, .. })
        ));
    }

    // Nothing was admitted anywhere.
    assert!(stage.priority_queues().iter().all(|queue| queue.iter().next().is_none()));
}

#[test]
fn stage_with_empty_banks_rejects_everything() {
    let mut stage = relaxed_stage(0, 0);

    assert!(stage.enqueue(DisciplineKind::Priority, 0, ranked(0), 0).is_err());
    assert!(stage.dequeue(DisciplineKind::Calendar, 0, 0).is_err());
}

#[test]
fn next_hop_lookup_is_deterministic() {
    let stage = relaxed_stage(1, 1);

    for class in [0, 1] {
        let packet = Packet::new().with_field("class", class).with_field("rank", 4);
        let first = stage.find_next_hop(&packet).unwrap().clone();

        for _ in 0..32 {
            assert_eq!(stage.find_next_hop(&packet).unwrap(), &first);
        }
        // Other fields play no part in the lookup.
        let other = Packet::new().with_field("class", class).with_field("rank", -9);
        assert_eq!(stage.find_next_hop(&other).unwrap(), &first);
    }
}

#[test]
fn next_hop_lookup_misses_are_errors() {
    let stage = relaxed_stage(1, 1);
    let mut rng = rand::thread_rng();

    for _ in 0..64 {
        let value = rng.gen_range(2..i64::MAX);
        let packet = Packet::new().with_field("class", value);
        assert_eq!(
            stage.find_next_hop(&packet),
            Err(StageError::LookupMiss { field: "class".to_string(), value })
        );
    }

    let negative = Packet::new().with_field("class", -1);
    assert!(matches!(stage.find_next_hop(&negative), Err(StageError::LookupMiss { .. })));
}

#[test]
fn priority_bank_releases_in_key_order() {
    let mut stage = relaxed_stage(1, 1);

    for rank in [5, 1, 3] {
        stage.enqueue(DisciplineKind::Priority, 0, ranked(rank), 0).unwrap();
    }

    let released: Vec<i64> =
        std::iter::from_fn(|| stage.dequeue(DisciplineKind::Priority, 0, 0).unwrap())
            .map(|packet| packet.get(DEFAULT_RANK_FIELD).unwrap())
            .collect();
    assert_eq!(released, vec![1, 3, 5]);
}

#[test]
fn priority_bank_matches_sorted_reference() {
    let mut stage = relaxed_stage(1, 0);
    let mut rng = rand::thread_rng();

    let mut ranks: Vec<i64> = (0..128).map(|_| rng.gen_range(0..16)).collect();
    ranks.shuffle(&mut rng);
    for (seq, rank) in ranks.iter().enumerate() {
        let packet = ranked(*rank).with_field("seq", seq as i64);
        stage.enqueue(DisciplineKind::Priority, 0, packet, 0).unwrap();
    }

    // Expected: by rank, equal ranks in arrival order.
    let mut expected: Vec<(i64, i64)> =
        ranks.iter().enumerate().map(|(seq, rank)| (*rank, seq as i64)).collect();
    expected.sort();

    let released: Vec<(i64, i64)> =
        std::iter::from_fn(|| stage.dequeue(DisciplineKind::Priority, 0, 1).unwrap())
            .map(|packet| (packet.get("rank").unwrap(), packet.get("seq").unwrap()))
            .collect();
    assert_eq!(released, expected);
}

#[test]
fn calendar_bank_holds_until_scheduled_tick() {
    let mut stage = PipelineStage::new(StageOptions::default(), class_table());

    stage.enqueue(DisciplineKind::Calendar, 0, ranked(6), 0).unwrap();

    for tick in 1..6 {
        assert_eq!(stage.dequeue(DisciplineKind::Calendar, 0, tick), Ok(None));
    }
    let released = stage.dequeue(DisciplineKind::Calendar, 0, 6).unwrap();
    assert_eq!(released, Some(ranked(6)));
}

#[test]
fn calendar_bank_releases_on_first_dequeue_past_schedule() {
    let mut stage = PipelineStage::new(StageOptions::default(), class_table());

    stage.enqueue(DisciplineKind::Calendar, 0, ranked(3), 0).unwrap();

    // Nobody dequeues on tick 3; the first dequeue after it gets the packet.
    assert_eq!(stage.dequeue(DisciplineKind::Calendar, 0, 2), Ok(None));
    assert_eq!(stage.dequeue(DisciplineKind::Calendar, 0, 9), Ok(Some(ranked(3))));
}

#[test]
fn dequeue_of_empty_queue_is_not_an_error() {
    let mut stage = relaxed_stage(2, 2);

    for kind in [DisciplineKind::Priority, DisciplineKind::Calendar] {
        for queue_id in 0..2 {
            assert_eq!(stage.dequeue(kind, queue_id, 0), Ok(None));
        }
    }
}

#[test]
fn second_operation_on_a_tick_is_rejected() {
    let mut stage = PipelineStage::new(StageOptions::default().priority_queues(2), class_table());

    stage.enqueue(DisciplineKind::Priority, 0, ranked(1), 10).unwrap();
    assert_eq!(
        stage.enqueue(DisciplineKind::Priority, 1, ranked(1), 10),
        Err(StageError::TickContractViolation { op: Operation::Enqueue, tick: 10 })
    );
    assert_eq!(stage.dequeue(DisciplineKind::Priority, 1, 10), Ok(None));
    assert!(matches!(
        stage.dequeue(DisciplineKind::Priority, 0, 10),
        Err(StageError::TickContractViolation { op: Operation::Dequeue, .. })
    ));

    // The packet is still there for the next tick.
    assert_eq!(stage.dequeue(DisciplineKind::Priority, 0, 11), Ok(Some(ranked(1))));
}

#[test]
fn revisiting_an_earlier_tick_is_rejected() {
    let mut stage = PipelineStage::new(StageOptions::default(), class_table());

    stage.enqueue(DisciplineKind::Priority, 0, ranked(1), 5).unwrap();
    assert_eq!(
        stage.enqueue(DisciplineKind::Priority, 0, ranked(2), 3),
        Err(StageError::TickRegression { op: Operation::Enqueue, tick: 3, last: 5 })
    );
    assert_eq!(
        stage.enqueue(DisciplineKind::Priority, 0, ranked(3), 5),
        Err(StageError::TickContractViolation { op: Operation::Enqueue, tick: 5 })
    );
    assert_eq!(stage.queue_len(DisciplineKind::Priority, 0), Ok(1));

    stage.enqueue(DisciplineKind::Priority, 0, ranked(4), 6).unwrap();
    assert_eq!(stage.queue_len(DisciplineKind::Priority, 0), Ok(2));
}

#[test]
fn end_to_end_single_stage() {
    let _ = tracing_subscriber::fmt::try_init();

    let options = StageOptions::default().priority_queues(1).calendar_queues(1);
    let mut stage = PipelineStage::new(options, class_table());

    let packet = Packet::new().with_field("class", 1);
    stage.enqueue(DisciplineKind::Priority, 0, packet.clone(), 0).unwrap();

    let released = stage.dequeue(DisciplineKind::Priority, 0, 0).unwrap().unwrap();
    assert_eq!(released, packet);

    let hop = stage.find_next_hop(&released).unwrap();
    assert_eq!(hop.op(), Operation::Enqueue);
    assert_eq!(hop.targets(), &[RoutingTarget::new(0, DisciplineKind::Priority, 0)]);

    let transmit = Packet::new().with_field("class", 0);
    assert_eq!(stage.find_next_hop(&transmit).unwrap(), &NextHop::transmit());
}
