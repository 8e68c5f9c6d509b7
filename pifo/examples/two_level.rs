use rand::Rng;
use tracing::{info, warn};

use pifo::{
    Hierarchy, NextHop, NextHopTable, OrderingKey, Outcome, Packet, PipelineStage, RoutingTarget,
    StageOptions,
};

const ROOT: u32 = 0;
const LEAVES: u32 = 1;
const FLOWS: u32 = 3;

fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    // The root picks which flow to serve: lower flow id wins.
    let decisions = (0..FLOWS)
        .map(|flow| (flow as i64, NextHop::dequeue(RoutingTarget::priority(LEAVES, flow))));
    let root_table = NextHopTable::new("flow", decisions).unwrap();
    let root = PipelineStage::with_priority_computer(
        StageOptions::default().calendar_queues(0),
        root_table,
        |packet| OrderingKey::new(packet.get("flow").unwrap_or_default()),
    );

    // One FIFO per flow, ordered by arrival sequence.
    let leaf_table =
        NextHopTable::new("flow", (0..FLOWS).map(|flow| (flow as i64, NextHop::transmit())))
            .unwrap();
    let leaves = PipelineStage::with_priority_computer(
        StageOptions::default().priority_queues(FLOWS).calendar_queues(0).queue_capacity(4),
        leaf_table,
        |packet| OrderingKey::new(packet.get("seq").unwrap_or_default()),
    );

    let mut hierarchy = Hierarchy::new();
    hierarchy.push_stage(root).unwrap();
    hierarchy.push_stage(leaves).unwrap();

    let mut rng = rand::thread_rng();
    let mut seq = 0;

    for tick in 0..32 {
        // Even ticks admit a packet of a random flow, odd ticks serve the root.
        if tick % 2 == 0 {
            let flow = rng.gen_range(0..FLOWS);
            let packet = Packet::new().with_field("flow", flow as i64).with_field("seq", seq);
            seq += 1;

            let arrival = NextHop::enqueue([
                RoutingTarget::priority(LEAVES, flow),
                RoutingTarget::priority(ROOT, 0),
            ]);
            match hierarchy.apply(&arrival, packet, tick) {
                Ok(_) => info!(tick, flow, "admitted"),
                Err(e) => warn!(tick, flow, "dropped: {e}"),
            }
            continue;
        }

        let Some(reference) = hierarchy.dequeue(RoutingTarget::priority(ROOT, 0), tick).unwrap()
        else {
            continue;
        };

        let hop = hierarchy.next_hop(ROOT, &reference).unwrap().clone();
        if let Ok(Outcome::Released(Some(packet))) = hierarchy.apply(&hop, reference, tick) {
            let hop = hierarchy.next_hop(LEAVES, &packet).unwrap().clone();
            if let Ok(Outcome::Transmitted(packet)) = hierarchy.apply(&hop, packet, tick) {
                info!(tick, "transmitted {packet}");
            }
        }
    }

    println!("{hierarchy}");
}
