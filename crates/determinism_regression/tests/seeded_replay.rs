use determinism_regression::{replay, BlockGenerator, DEFAULT_SEED};
use prospect_core::EngineParams;
use regtest_harness::check_invariants;

#[test]
fn seeded_chains_replay_identically() {
    let params = EngineParams::default();
    let blocks = BlockGenerator::new(DEFAULT_SEED, 8).chain(60);
    let baseline = replay(&params, &blocks).unwrap();
    let repeat = replay(&params, &blocks).unwrap();
    assert_eq!(baseline.state(), repeat.state(), "same blocks should match");
    assert_eq!(baseline.state_json(), repeat.state_json());

    let other = BlockGenerator::new(7, 8).chain(60);
    let different = replay(&params, &other).unwrap();
    assert_ne!(
        baseline.state_json(),
        different.state_json(),
        "different seeds should diverge"
    );
}

#[test]
fn invariants_hold_after_every_random_block() {
    let params = EngineParams::default();
    for seed in [DEFAULT_SEED, 1, 2, 3] {
        let blocks = BlockGenerator::new(seed, 6).chain(80);
        let mut engine = replay(&params, &blocks[..1]).unwrap();
        for block in &blocks[1..] {
            engine.process_block(block).unwrap();
            let violations = check_invariants(engine.state(), &params);
            assert!(
                violations.is_empty(),
                "seed {seed} height {}: {violations:?}",
                block.height
            );
        }
    }
}

#[test]
fn rewind_and_replay_of_a_fork_restores_the_original() {
    let params = EngineParams::default();
    let blocks = BlockGenerator::new(DEFAULT_SEED, 6).chain(40);
    let mut engine = replay(&params, &blocks).unwrap();
    let original = engine.state().clone();

    let fork_height = 15;
    let fork_tip = blocks[fork_height as usize - 1].hash;
    engine.rewind_to(fork_height).unwrap();
    assert_eq!(engine.state().height, fork_height);
    let fork = BlockGenerator::from_tip(99, 6, fork_tip, fork_height).chain(30);
    // The fork's first block is a spawn block; that is still a valid block.
    for block in &fork {
        engine.process_block(block).unwrap();
    }
    assert_ne!(engine.state(), &original);

    engine.rewind_to(fork_height).unwrap();
    for block in &blocks[fork_height as usize..] {
        engine.process_block(block).unwrap();
    }
    assert_eq!(engine.state(), &original);
}

#[test]
fn fresh_engine_matches_checkpointed_engine() {
    let params = EngineParams {
        checkpoint_depth: 5,
        ..Default::default()
    };
    let blocks = BlockGenerator::new(DEFAULT_SEED, 6).chain(50);
    let engine = replay(&params, &blocks).unwrap();
    assert_eq!(engine.oldest_checkpoint(), 47);
    assert!(engine.checkpoint(46).is_none());

    let fresh = replay(&EngineParams::default(), &blocks).unwrap();
    assert_eq!(engine.state(), fresh.state());
}
