//! Property tests: accumulating fields are independent of completion order.

use std::time::Duration;

use proptest::prelude::*;
use serde_json::{Value, json};

use agentflow_core::config::RunnableConfig;
use agentflow_core::runnable::Runnable;
use agentflow_graph::prelude::*;

/// plan → N send tasks, each sleeping for its own delay before writing.
fn fan_out_graph() -> CompiledStateGraph {
    let mut g = StateGraph::new();
    g.add_append_channel("results");
    g.add_binary_operator_channel("total", json!(0), AggregateOp::Sum);

    g.add_node(NodeFn::new("plan", |_s: Value, _c| async move { Ok(Value::Null) }))
        .unwrap();
    g.add_node(NodeFn::new("worker", |state: Value, _c| async move {
        let index = state["index"].as_u64().unwrap_or_default();
        let delay = state["delay_ms"].as_u64().unwrap_or_default();
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(json!({"results": [index], "total": index}))
    }))
    .unwrap();
    g.set_entry_point("plan").unwrap();
    g.add_send_edges(SendEdge::new(
        "plan",
        |state: &Value| {
            state["delays"]
                .as_array()
                .into_iter()
                .flatten()
                .enumerate()
                .map(|(index, delay)| {
                    SendDirective::new("worker", json!({"index": index, "delay_ms": delay}))
                })
                .collect()
        },
        ["worker"],
    ))
    .unwrap();
    g.compile().unwrap()
}

fn apply_in_order(spec: &ChannelSpec, values: &[Value]) -> Value {
    let mut channel = spec.create();
    for value in values {
        channel.update(value.clone());
    }
    channel.get().clone()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every contribution lands exactly once whatever order workers finish in.
    #[test]
    fn send_fan_out_collects_every_contribution(
        delays in prop::collection::vec(0u64..15, 1..8),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime
            .block_on(fan_out_graph().invoke(json!({"delays": &delays}), &RunnableConfig::default()))
            .unwrap();

        let n = delays.len() as u64;
        let mut indices: Vec<u64> = result["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap())
            .collect();
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..n).collect::<Vec<_>>());
        prop_assert_eq!(result["total"].as_u64(), Some(n * (n - 1) / 2));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Append and Sum channels produce the same contents for any permutation
    /// of the same writes.
    #[test]
    fn accumulation_is_permutation_invariant(
        writes in prop::collection::vec(-1000i64..1000, 0..12),
        seed in any::<u64>(),
    ) {
        let values: Vec<Value> = writes.iter().map(|n| json!(n)).collect();
        let mut shuffled = values.clone();
        // Deterministic rotation driven by the seed.
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
            shuffled.reverse();
        }

        let sum = ChannelSpec::BinaryOperator { default: json!(0), op: AggregateOp::Sum };
        prop_assert_eq!(apply_in_order(&sum, &values), apply_in_order(&sum, &shuffled));

        let sort = |v: Value| {
            let mut items: Vec<i64> = v
                .as_array()
                .unwrap()
                .iter()
                .map(|x| x.as_i64().unwrap())
                .collect();
            items.sort_unstable();
            items
        };
        prop_assert_eq!(
            sort(apply_in_order(&ChannelSpec::Append, &values)),
            sort(apply_in_order(&ChannelSpec::Append, &shuffled))
        );
    }
}
