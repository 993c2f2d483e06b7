use std::collections::HashSet;

use client_sampler::{
    AvailabilityTrace, ClientId, ClientSampler, RoundOutcome, SamplerConfig, SamplingMode, Speed,
};

const CLIENTS: u64 = 20;

fn sampler(mode: SamplingMode, seed: u64) -> ClientSampler {
    let config = SamplerConfig {
        mode,
        sample_seed: seed,
        filter_less: 5,
        filter_more: 100,
        ..Default::default()
    };
    ClientSampler::new(config).unwrap()
}

fn populate(sampler: &mut ClientSampler) {
    for id in 0..CLIENTS {
        let size = 3 + id * 7;
        let trace = (id % 4 == 0).then(|| AvailabilityTrace::new(vec![(0.0, 50.0)]).unwrap());
        let host_id = (id % 3) as usize + 1;
        sampler.register_client(host_id, id, id as f64 / 10.0, size, Speed::default(), trace);
    }
}

fn play_rounds(sampler: &mut ClientSampler, rounds: usize, k: usize) -> Vec<Vec<ClientId>> {
    (0..rounds)
        .map(|round| {
            let time = round as f64 * 20.0;
            let picked = sampler.resample_clients(k, time);
            for &id in &picked {
                let reward = (id % 5) as f64 + round as f64;
                sampler.register_score(id, RoundOutcome::new(reward)).unwrap();
            }
            picked
        })
        .collect()
}

#[test]
fn sizes_are_kept_as_registered() {
    let mut sampler = sampler(SamplingMode::Bandit, 1);
    populate(&mut sampler);

    for id in 0..CLIENTS {
        assert_eq!(sampler.client_size(id).unwrap(), 3 + id * 7);
    }
}

#[test]
fn selections_are_bounded_feasible_and_unique() {
    for mode in [SamplingMode::Bandit, SamplingMode::Random] {
        let mut sampler = sampler(mode, 11);
        populate(&mut sampler);

        for round in 0..8 {
            let time = round as f64 * 20.0;
            let feasible: HashSet<_> = sampler.feasible_clients(time).into_iter().collect();

            for k in [1, 4, 9] {
                let picked = sampler.resample_clients(k, time);
                let unique: HashSet<_> = picked.iter().copied().collect();

                assert!(picked.len() <= k);
                assert_eq!(unique.len(), picked.len());
                assert!(unique.is_subset(&feasible));
            }
        }
    }
}

#[test]
fn same_seed_same_selections() {
    for mode in [SamplingMode::Bandit, SamplingMode::Random] {
        let mut first = sampler(mode, 42);
        let mut second = sampler(mode, 42);
        populate(&mut first);
        populate(&mut second);

        assert_eq!(play_rounds(&mut first, 6, 4), play_rounds(&mut second, 6, 4));
    }
}

#[test]
fn different_seeds_diverge_on_random_rounds() {
    let mut first = sampler(SamplingMode::Random, 1);
    let mut second = sampler(SamplingMode::Random, 2);
    populate(&mut first);
    populate(&mut second);

    assert_ne!(play_rounds(&mut first, 6, 4), play_rounds(&mut second, 6, 4));
}

#[test]
fn exact_fit_returns_the_feasible_set() {
    let mut sampler = sampler(SamplingMode::Random, 3);
    populate(&mut sampler);

    let feasible = sampler.feasible_clients(0.0);
    let picked = sampler.resample_clients(feasible.len(), 0.0);

    let feasible: HashSet<_> = feasible.into_iter().collect();
    let picked: HashSet<_> = picked.into_iter().collect();
    assert_eq!(picked, feasible);
}

#[test]
fn traced_clients_drop_out_after_their_window() {
    let mut sampler = sampler(SamplingMode::Bandit, 5);
    populate(&mut sampler);

    let early = sampler.feasible_clients(10.0);
    let late = sampler.feasible_clients(60.0);

    assert!(early.contains(&4));
    assert!(!late.contains(&4));
    // ids 4, 8 and 12 carry a trace, 0 and 16 are filtered by size
    assert_eq!(early.len(), late.len() + 3);
}

#[test]
fn bandit_converges_on_rewarded_clients() {
    let mut sampler = sampler(SamplingMode::Bandit, 9);
    populate(&mut sampler);
    sampler.resample_clients(3, 100.0);

    for id in sampler.feasible_clients(100.0) {
        let reward = if id == 7 || id == 13 { 500.0 } else { 1.0 };
        sampler.register_score(id, RoundOutcome::new(reward)).unwrap();
    }

    let picked = sampler.resample_clients(2, 100.0);
    assert_eq!(picked, vec![7, 13]);
}
