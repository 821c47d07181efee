use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use ram_core::{
    Action, EnergyLevel, HISTORY_CAP, Interaction, Item, Sequencer, SequencerConfig, TunnelSession, Urgency,
    record_interaction_at,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn energy() -> impl Strategy<Value = EnergyLevel> {
    prop_oneof![Just(EnergyLevel::Low), Just(EnergyLevel::Medium), Just(EnergyLevel::High)]
}

fn urgency() -> impl Strategy<Value = Urgency> {
    prop_oneof![Just(Urgency::Low), Just(Urgency::Medium), Just(Urgency::High)]
}

fn tasks() -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec((energy(), urgency(), 0i64..500), 0..25).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (e, u, mins))| {
                Item::new(format!("t{i}"), format!("task {i}"), t0() + Duration::minutes(mins))
                    .with_energy(e)
                    .with_urgency(u)
            })
            .collect()
    })
}

fn history() -> impl Strategy<Value = Vec<Interaction>> {
    prop::collection::vec((energy(), any::<bool>(), 0i64..10_000), 0..120).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (e, skipped, mins))| {
                let task = Item::new(format!("h{i}"), "h", t0()).with_energy(e);
                let action = if skipped { Action::Skipped } else { Action::Completed };
                Interaction::new(&task, action, t0() + Duration::minutes(mins))
            })
            .collect()
    })
}

fn ids(items: &[Item]) -> Vec<String> {
    items.iter().map(|i| i.id.clone()).collect()
}

proptest! {
    #[test]
    fn ranking_is_a_deterministic_permutation(pool in tasks(), user in energy(), h in history()) {
        let seq = Sequencer::default();
        let a = seq.rank(pool.clone(), user, &h);
        let b = seq.rank(pool.clone(), user, &h);
        prop_assert_eq!(ids(&a), ids(&b));

        let mut sorted_in = ids(&pool);
        let mut sorted_out = ids(&a);
        sorted_in.sort();
        sorted_out.sort();
        prop_assert_eq!(sorted_in, sorted_out);
    }

    #[test]
    fn scores_descend_and_ties_keep_creation_order(pool in tasks(), user in energy(), h in history()) {
        let scored = Sequencer::default().rank_scored(pool, user, &h);
        for pair in scored.windows(2) {
            let (x, y) = (pair[0].score.total(), pair[1].score.total());
            prop_assert!(x >= y);
            if x == y {
                prop_assert!(pair[0].task.created_at <= pair[1].task.created_at);
            }
        }
    }

    #[test]
    fn high_energy_users_never_see_a_penalty(pool in tasks(), h in history()) {
        let scored = Sequencer::default().rank_scored(pool, EnergyLevel::High, &h);
        prop_assert!(scored.iter().all(|s| s.score.penalty == 0));
    }

    #[test]
    fn history_never_exceeds_cap(n in 0usize..250) {
        let task = Item::new("x", "x", t0());
        let mut h = Vec::new();
        for i in 0..n {
            h = record_interaction_at(&h, &task, Action::Skipped, t0() + Duration::seconds(i as i64), HISTORY_CAP);
        }
        prop_assert_eq!(h.len(), n.min(HISTORY_CAP));
        if n > 0 {
            prop_assert_eq!(h[0].timestamp, t0() + Duration::seconds(n as i64 - 1));
        }
    }

    #[test]
    fn skips_alone_never_drain_the_queue(pool in tasks(), user in energy(), skips in 0usize..60) {
        let expected = pool.len();
        let mut session = TunnelSession::new(Sequencer::new(SequencerConfig::default()));
        session.declare_energy(user, pool, &[]).unwrap();

        let mut h = Vec::new();
        for i in 0..skips {
            if session.current().is_none() {
                break;
            }
            h = session.skip(&h, t0() + Duration::seconds(i as i64)).unwrap().history;
        }
        prop_assert_eq!(session.queue().len(), expected);
        if expected > 0 {
            let (pos, len) = session.position().unwrap();
            prop_assert_eq!(pos, skips % expected + 1);
            prop_assert_eq!(len, expected);
        }
    }
}
