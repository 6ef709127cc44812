use proptest::collection::vec;
use proptest::prelude::*;

use tidepool_engine::{NullBridge, NullRoles, StakingEngine};
use tidepool_types::{Address, ProtocolParams, Timestamp, TokenAmount};

fn pool() -> Address {
    Address::new("pool-under-test")
}

fn internal() -> Address {
    Address::new("internal-contract")
}

/// Engine with one member per stake entry, each staking their full deposit
/// on the single test pool. Floors zeroed, exposure check off, all three
/// cycle budgets set to `budget`.
fn engine_with_stakes(
    stakes: &[u128],
    budget: u32,
) -> (StakingEngine<NullRoles, NullBridge>, Vec<Address>) {
    let members: Vec<Address> = (0..stakes.len())
        .map(|i| Address::new(format!("member-{i}")))
        .collect();

    let mut roles = NullRoles::new();
    for m in &members {
        roles.enroll_member(m.clone());
    }
    roles.enroll_internal(internal());

    let mut params = ProtocolParams::default();
    params.min_allocation = TokenAmount::new(1);
    params.min_allowed_deallocation = TokenAmount::ZERO;
    params.min_stake = TokenAmount::ZERO;
    params.min_unstake = TokenAmount::ZERO;
    params.max_exposure = 0;
    params.max_leverage = 2;
    params.deallocate_lock_time_secs = 1_000;
    params.unstake_lock_time_secs = 100;
    params.burn_cycle_budget = budget;
    params.deallocation_cycle_budget = budget;
    params.reward_cycle_budget = budget;

    let mut engine = StakingEngine::with_params(params, roles, NullBridge::new());
    let now = Timestamp::new(0);
    for (member, &stake) in members.iter().zip(stakes) {
        engine
            .stake(member, TokenAmount::new(stake), &[pool()], &[TokenAmount::new(stake)], now)
            .unwrap();
    }
    (engine, members)
}

fn drain(engine: &mut StakingEngine<NullRoles, NullBridge>, now: Timestamp) {
    for _ in 0..10_000 {
        if engine.process_pending_actions(now).unwrap().finished {
            return;
        }
    }
    panic!("drain did not converge");
}

fn allocation_sum(
    engine: &StakingEngine<NullRoles, NullBridge>,
    members: &[Address],
) -> u128 {
    members
        .iter()
        .map(|m| engine.allocation(m, &pool()).raw())
        .sum()
}

proptest! {
    /// After a fully drained burn the pool total equals the sum of member
    /// allocations, the burned counter never exceeds the request, and the
    /// ledger's custody total matches the bridge's held balance.
    #[test]
    fn pool_total_equals_allocation_sum_after_burn(
        stakes in vec(1u128..1_000, 1..8),
        burn_pct in 1u64..=100,
        budget in 1u32..4,
    ) {
        let total: u128 = stakes.iter().sum();
        let burn = total * burn_pct as u128 / 100;
        prop_assume!(burn > 0);

        let (mut engine, members) = engine_with_stakes(&stakes, budget);
        engine
            .push_burn(&internal(), pool(), TokenAmount::new(burn), Timestamp::new(1))
            .unwrap();
        drain(&mut engine, Timestamp::new(2));

        let record = engine.pool(&pool()).unwrap();
        prop_assert_eq!(record.staked.raw(), allocation_sum(&engine, &members));
        prop_assert!(record.burned.raw() <= burn);
        prop_assert_eq!(record.staked.raw() + record.burned.raw(), total);
        prop_assert_eq!(engine.total_custody(), engine.bridge().held);
        prop_assert!(engine.first_burn() == engine.last_burn_id() + 1);
    }

    /// A burn drained in budget-limited slices lands on exactly the same
    /// ledger state as one drained in a single unbounded pass.
    #[test]
    fn sliced_drain_matches_unbounded_drain(
        stakes in vec(1u128..1_000, 1..8),
        burn_pct in 1u64..=100,
        budget in 1u32..4,
    ) {
        let total: u128 = stakes.iter().sum();
        let burn = total * burn_pct as u128 / 100;
        prop_assume!(burn > 0);

        let (mut sliced, members) = engine_with_stakes(&stakes, budget);
        let (mut unbounded, _) = engine_with_stakes(&stakes, 1_000_000);

        sliced
            .push_burn(&internal(), pool(), TokenAmount::new(burn), Timestamp::new(1))
            .unwrap();
        drain(&mut sliced, Timestamp::new(2));
        unbounded
            .push_burn(&internal(), pool(), TokenAmount::new(burn), Timestamp::new(1))
            .unwrap();

        for member in &members {
            prop_assert_eq!(
                sliced.allocation(member, &pool()),
                unbounded.allocation(member, &pool())
            );
            prop_assert_eq!(
                sliced.member(member).unwrap().balance,
                unbounded.member(member).unwrap().balance
            );
        }
        prop_assert_eq!(
            sliced.pool(&pool()).unwrap().staked,
            unbounded.pool(&pool()).unwrap().staked
        );
        prop_assert_eq!(
            sliced.pool(&pool()).unwrap().burned,
            unbounded.pool(&pool()).unwrap().burned
        );
        prop_assert_eq!(sliced.total_custody(), unbounded.total_custody());
    }

    /// A matured deallocation releases the requested amount capped at
    /// whatever an intervening burn left of the allocation, and the pool
    /// invariant survives the interleaving.
    #[test]
    fn burn_caps_matured_deallocation_release(
        stakes in vec(1u128..1_000, 1..6),
        burn_pct in 1u64..=100,
        dealloc_pct in 1u64..=100,
        budget in 1u32..4,
    ) {
        let total: u128 = stakes.iter().sum();
        let burn = total * burn_pct as u128 / 100;
        let requested = stakes[0] * dealloc_pct as u128 / 100;
        prop_assume!(burn > 0 && requested > 0);

        let (mut engine, members) = engine_with_stakes(&stakes, budget);
        engine
            .request_deallocation(
                &members[0],
                &[pool()],
                &[TokenAmount::new(requested)],
                0,
                Timestamp::new(0),
            )
            .unwrap();

        // The burn lands while the request is still locked.
        engine
            .push_burn(&internal(), pool(), TokenAmount::new(burn), Timestamp::new(1))
            .unwrap();
        drain(&mut engine, Timestamp::new(2));
        let after_burn = engine.allocation(&members[0], &pool()).raw();
        let balance_after_burn = engine.member(&members[0]).unwrap().balance;

        let due = Timestamp::new(1_000);
        drain(&mut engine, due);

        let released = requested.min(after_burn);
        prop_assert_eq!(
            engine.allocation(&members[0], &pool()).raw(),
            after_burn - released
        );
        // Releasing exposure moves nothing in or out of custody.
        prop_assert_eq!(engine.member(&members[0]).unwrap().balance, balance_after_burn);
        prop_assert_eq!(
            engine.pool(&pool()).unwrap().staked.raw(),
            allocation_sum(&engine, &members)
        );
        prop_assert_eq!(engine.total_custody(), engine.bridge().held);
    }

    /// Rewards distribute the full amount across a live roster and leave
    /// allocations untouched.
    #[test]
    fn reward_distribution_conserves_custody(
        stakes in vec(1u128..1_000, 1..8),
        reward in 1u128..10_000,
        budget in 1u32..4,
    ) {
        let total: u128 = stakes.iter().sum();
        let (mut engine, members) = engine_with_stakes(&stakes, budget);

        engine
            .push_reward(&internal(), pool(), TokenAmount::new(reward), Timestamp::new(1))
            .unwrap();
        drain(&mut engine, Timestamp::new(2));

        prop_assert_eq!(engine.total_custody().raw(), total + reward);
        prop_assert_eq!(engine.bridge().held.raw(), total + reward);
        prop_assert_eq!(engine.pool(&pool()).unwrap().staked.raw(), total);
        prop_assert_eq!(allocation_sum(&engine, &members), total);

        let balances: u128 = members
            .iter()
            .map(|m| engine.member(m).unwrap().balance.raw())
            .sum();
        prop_assert_eq!(balances, total + reward);
    }

    /// Processing empty queues any number of times changes nothing.
    #[test]
    fn empty_processing_is_idempotent(
        stakes in vec(1u128..1_000, 1..5),
        sweeps in 1usize..5,
    ) {
        let total: u128 = stakes.iter().sum();
        let (mut engine, members) = engine_with_stakes(&stakes, 3);

        for i in 0..sweeps {
            let outcome = engine
                .process_pending_actions(Timestamp::new(i as u64))
                .unwrap();
            prop_assert!(outcome.finished);
            prop_assert_eq!(outcome.burn_steps, 0);
            prop_assert_eq!(outcome.deallocations_processed, 0);
            prop_assert_eq!(outcome.reward_steps, 0);
        }
        prop_assert_eq!(engine.pool(&pool()).unwrap().staked.raw(), total);
        prop_assert_eq!(allocation_sum(&engine, &members), total);
    }
}
