//! Bank Transfer Tests
//!
//! Money moves between accounts atomically:
//! - A single transfer is visible as a whole or not at all
//! - Readers never observe a half-applied transfer
//! - Concurrent transfers conserve the total balance

use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tl2stm::prelude::*;

fn transfer(tx: &mut Transaction, from: &TVar<i64>, to: &TVar<i64>, amount: i64) {
    let a = tx.load(from);
    let b = tx.load(to);
    tx.store(from, a - amount);
    tx.store(to, b + amount);
}

/// Alice sends Bob 20
#[test]
fn test_transfer_between_two_accounts() {
    let alice = TVar::new(100i64);
    let bob = TVar::new(0i64);

    atomically(|tx| transfer(tx, &alice, &bob, 20));

    let balances = atomically(|tx| (tx.load(&alice), tx.load(&bob)));
    assert_eq!(balances, (80, 20));
}

/// Readers racing a single transfer see (100, 0) or (80, 20), nothing else
#[test]
fn test_readers_never_see_partial_transfer() {
    const NUM_READERS: usize = 4;

    let alice = TVar::new(100i64);
    let bob = TVar::new(0i64);
    let done = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(NUM_READERS + 1));

    let readers: Vec<_> = (0..NUM_READERS)
        .map(|_| {
            let alice = alice.clone();
            let bob = bob.clone();
            let done = Arc::clone(&done);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                let mut observations = 0u64;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    let pair = atomically(|tx| (tx.load(&alice), tx.load(&bob)));
                    assert!(
                        pair == (100, 0) || pair == (80, 20),
                        "reader observed partial transfer {:?}",
                        pair
                    );
                    observations += 1;
                    if finished {
                        assert_eq!(pair, (80, 20));
                        return observations;
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    atomically(|tx| transfer(tx, &alice, &bob, 20));
    done.store(true, Ordering::SeqCst);

    for h in readers {
        assert!(h.join().unwrap() > 0);
    }
    assert_eq!(alice.read_atomic(), 80);
    assert_eq!(bob.read_atomic(), 20);
}

/// Random transfers between many accounts keep the total constant
#[test]
fn test_concurrent_transfers_conserve_total() {
    const NUM_ACCOUNTS: usize = 16;
    const NUM_THREADS: usize = 8;
    const TRANSFERS_PER_THREAD: usize = 1_000;
    const INITIAL: i64 = 1_000;

    let accounts: Arc<Vec<TVar<i64>>> =
        Arc::new((0..NUM_ACCOUNTS).map(|_| TVar::new(INITIAL)).collect());
    let barrier = Arc::new(Barrier::new(NUM_THREADS + 1));
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            let accounts = Arc::clone(&accounts);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                let mut rng = rand::rngs::StdRng::seed_from_u64(i as u64);
                barrier.wait();
                for _ in 0..TRANSFERS_PER_THREAD {
                    let from = rng.gen_range(0..NUM_ACCOUNTS);
                    let mut to = rng.gen_range(0..NUM_ACCOUNTS);
                    if to == from {
                        to = (to + 1) % NUM_ACCOUNTS;
                    }
                    let amount = rng.gen_range(1..=50);
                    atomically(|tx| transfer(tx, &accounts[from], &accounts[to], amount));
                }
            })
        })
        .collect();

    // Auditor: every consistent snapshot sums to the same total
    let auditor = {
        let accounts = Arc::clone(&accounts);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut audits = 0u64;
            while !done.load(Ordering::SeqCst) {
                let total: i64 = atomically(|tx| accounts.iter().map(|a| tx.load(a)).sum());
                assert_eq!(total, INITIAL * NUM_ACCOUNTS as i64);
                audits += 1;
            }
            audits
        })
    };

    barrier.wait();
    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    auditor.join().unwrap();

    let total: i64 = accounts.iter().map(|a| a.read_atomic()).sum();
    assert_eq!(total, INITIAL * NUM_ACCOUNTS as i64);
}

/// A bounded runner reports conflicts instead of retrying forever, and a
/// failed attempt leaves balances untouched
#[test]
fn test_bounded_transfer_gives_up_cleanly() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .with_test_writer()
        .try_init();

    let stm = Stm::new(StmConfig::bounded(2));
    let alice = TVar::new(100i64);
    let bob = TVar::new(0i64);
    let fee = TVar::new(0i64);

    let err = stm
        .atomically(|tx| {
            let a = tx.load(&alice);
            // Someone else keeps charging a fee on Alice's account mid-transfer
            atomically(|other| other.modify(&alice, |v| v - 1));
            tx.store(&fee, 1);
            tx.store(&bob, a)
        })
        .unwrap_err();

    assert!(err.is_retry_limit());
    assert_eq!(err.attempts(), 3);
    assert_eq!(
        err,
        Error::RetryLimitExceeded {
            attempts: 3,
            last_conflict: tl2stm::ConflictKind::ReadSetInvalidated,
        }
    );

    let stats = stm.stats();
    assert_eq!(stats.validation_failures, 3);
    assert_eq!(stats.retry_limit_hits, 1);
    assert_eq!(stats.commits, 0);

    // Only the interfering fee commits landed
    assert_eq!(alice.read_atomic(), 97);
    assert_eq!(bob.read_atomic(), 0);
    assert_eq!(fee.read_atomic(), 0);
    assert!(!bob.is_locked());
    assert!(!fee.is_locked());
}
