// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    first = { 0, 100 },
    second = { 1, 200 },
    third = { 2, 400 },
    fourth = { 3, 800 },
    capped = { 9, 5_000 },
    deep = { 40, 5_000 },
)]
fn backoff_doubles_then_caps(attempt: u32, expect_ms: u64) {
    assert_eq!(backoff_delay(attempt), Duration::from_millis(expect_ms));
}

#[test]
fn budget_yields_n_minus_one_delays() {
    let mut budget = RetryBudget::new(3);
    assert_eq!(budget.next_delay(), Some(Duration::from_millis(100)));
    assert_eq!(budget.next_delay(), Some(Duration::from_millis(200)));
    assert_eq!(budget.next_delay(), None);
    assert_eq!(budget.attempts_used(), 2);
}

#[test]
fn single_attempt_budget_never_sleeps() {
    let mut budget = RetryBudget::new(1);
    assert_eq!(budget.next_delay(), None);
}

#[test]
fn default_budget_is_five_attempts() {
    let mut budget = RetryBudget::default();
    let mut delays = 0;
    while budget.next_delay().is_some() {
        delays += 1;
    }
    assert_eq!(delays, 4);
}
