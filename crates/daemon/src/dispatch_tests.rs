// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn id(s: &str) -> AgentId {
    AgentId::from_string(s)
}

#[test]
fn empty_candidate_set_yields_none() {
    assert_eq!(pick_least_loaded(&[]), None);
}

#[test]
fn smallest_load_wins() {
    let loads = vec![(id("ag_c"), 3), (id("ag_a"), 1), (id("ag_b"), 2)];
    assert_eq!(pick_least_loaded(&loads), Some(id("ag_a")));
}

#[test]
fn ties_break_by_agent_id_ascending() {
    let loads = vec![(id("ag_b"), 2), (id("ag_a"), 2), (id("ag_c"), 2)];
    assert_eq!(pick_least_loaded(&loads), Some(id("ag_a")));
}

#[test]
fn choice_ignores_input_order() {
    let forward = vec![(id("ag_x"), 0), (id("ag_y"), 0)];
    let reversed: Vec<_> = forward.iter().rev().copied().collect();
    assert_eq!(pick_least_loaded(&forward), pick_least_loaded(&reversed));
}

// Dispatcher fairness: with equal starting loads and round-robin growth,
// every agent ends with ⌊N/K⌋ or ⌈N/K⌉ assignments.
#[test]
fn sequential_assignment_spreads_load_evenly() {
    let agents = [id("ag_a"), id("ag_b"), id("ag_c")];
    let mut loads: Vec<(AgentId, i64)> = agents.iter().map(|a| (*a, 0)).collect();

    let jobs = 10;
    for _ in 0..jobs {
        let winner = pick_least_loaded(&loads).unwrap();
        for entry in &mut loads {
            if entry.0 == winner {
                entry.1 += 1;
            }
        }
    }

    let floor = jobs / agents.len() as i64;
    for (agent, load) in &loads {
        assert!(
            *load >= floor,
            "agent {agent} got {load}, below the fairness floor {floor}",
        );
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn load_sets() -> impl Strategy<Value = Vec<(AgentId, i64)>> {
        proptest::collection::vec((0u8..26, 0i64..100), 1..12).prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(index, (letter, load))| {
                    let suffix = (b'a' + letter) as char;
                    (AgentId::from_string(format!("ag_{suffix}{index}")), load)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn winner_always_carries_the_minimum_load(loads in load_sets()) {
            let winner = pick_least_loaded(&loads).unwrap();
            let min = loads.iter().map(|(_, load)| *load).min().unwrap();
            let winner_load =
                loads.iter().find(|(id, _)| *id == winner).map(|(_, load)| *load).unwrap();
            prop_assert_eq!(winner_load, min);
        }

        #[test]
        fn choice_is_independent_of_input_order(loads in load_sets()) {
            let mut reversed = loads.clone();
            reversed.reverse();
            prop_assert_eq!(pick_least_loaded(&loads), pick_least_loaded(&reversed));
        }
    }
}
