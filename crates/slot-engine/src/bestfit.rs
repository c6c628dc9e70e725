//! Best-fit selection: which resource subset should take a capacity request.
//!
//! Given the remaining capacities of a slot's candidate resources,
//! [`select_best`] picks the subset that satisfies the asked capacity,
//! preferring an exact single match, then the lowest-sequence single
//! resource that covers alone, then the combination with the most exact
//! total and fewest members. Ties always break on the resources' configured
//! sequence numbers, so results are deterministic.
//!
//! Many slots in one resolution pass see identical capacity snapshots, so
//! selections are memoized in a [`SelectorCache`] keyed by the frozen
//! snapshot. The cache lives for one resolution pass only — capacity
//! figures from another request must never leak in.

use std::collections::{BTreeMap, HashMap};

use crate::schedule::{AssignmentMode, EntityId};

/// Capacity figures for one candidate resource on one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityInfo {
    /// The resource's configured capacity.
    pub declared: u32,
    /// Capacity still free for the slot window (own, not pooled).
    pub remaining: i64,
    /// Configured tie-break order.
    pub sequence: u32,
}

/// Memo for [`select_best`], scoped to a single resolution pass.
///
/// The key freezes the capacity snapshot as sorted `(entity, remaining)`
/// pairs plus the asked capacity; assignment mode and capacity management
/// do not vary within a pass.
#[derive(Debug, Default)]
pub struct SelectorCache {
    memo: HashMap<(Vec<(EntityId, i64)>, u32), Vec<EntityId>>,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Choose the resource subset that best satisfies `asked` capacity.
///
/// Returns an empty vector when no combination suffices — the caller omits
/// the slot, it is not an error.
pub fn select_best(
    cache: &mut SelectorCache,
    info: &BTreeMap<EntityId, CapacityInfo>,
    asked: u32,
    manage_capacity: bool,
    mode: AssignmentMode,
) -> Vec<EntityId> {
    if info.is_empty() {
        return Vec::new();
    }

    // Deterministic scan order: configured sequence, then id
    let mut by_seq: Vec<(EntityId, CapacityInfo)> =
        info.iter().map(|(id, ci)| (*id, *ci)).collect();
    by_seq.sort_by_key(|(id, ci)| (ci.sequence, *id));

    if !manage_capacity {
        // Capacity off: any candidate can take the booking whole
        return match mode {
            AssignmentMode::Manual => by_seq.iter().map(|(id, _)| *id).collect(),
            AssignmentMode::Auto => vec![by_seq[0].0],
        };
    }

    if mode == AssignmentMode::Manual {
        // Surface every resource with spare capacity, provided the set as a
        // whole can satisfy the request
        let eligible: Vec<EntityId> = by_seq
            .iter()
            .filter(|(_, ci)| ci.remaining > 0)
            .map(|(id, _)| *id)
            .collect();
        let total: i64 = by_seq
            .iter()
            .filter(|(_, ci)| ci.remaining > 0)
            .map(|(_, ci)| ci.remaining)
            .sum();
        return if total >= i64::from(asked) {
            eligible
        } else {
            Vec::new()
        };
    }

    let key = (freeze(&by_seq), asked);
    if let Some(hit) = cache.memo.get(&key) {
        return hit.clone();
    }

    let selection = select_auto(&by_seq, asked);
    cache.memo.insert(key, selection.clone());
    selection
}

fn freeze(by_seq: &[(EntityId, CapacityInfo)]) -> Vec<(EntityId, i64)> {
    let mut pairs: Vec<(EntityId, i64)> =
        by_seq.iter().map(|(id, ci)| (*id, ci.remaining)).collect();
    pairs.sort_unstable();
    pairs
}

fn select_auto(by_seq: &[(EntityId, CapacityInfo)], asked: u32) -> Vec<EntityId> {
    let asked_i = i64::from(asked);

    // 1. A resource declared at exactly the asked capacity and still fully
    //    free at that capacity is the canonical pick
    if let Some((id, _)) = by_seq
        .iter()
        .find(|(_, ci)| i64::from(ci.declared) == asked_i && ci.remaining == asked_i)
    {
        return vec![*id];
    }

    // 2. The lowest-sequence candidate wins when it covers alone
    let (baseline_id, baseline) = by_seq[0];
    if baseline.remaining >= asked_i {
        return vec![baseline_id];
    }

    // 3. Subset search over candidates with spare capacity
    let pool: Vec<(EntityId, i64, u32)> = by_seq
        .iter()
        .filter(|(_, ci)| ci.remaining > 0)
        .map(|(id, ci)| (*id, ci.remaining, ci.sequence))
        .collect();
    if pool.len() > 20 {
        // Fleets this large cannot take an exponential scan; fall back to a
        // greedy sweep in sequence order
        let mut acc = 0i64;
        let mut picked = Vec::new();
        for (id, remaining, _) in &pool {
            picked.push(*id);
            acc += remaining;
            if acc >= asked_i {
                return picked;
            }
        }
        return Vec::new();
    }

    let mut best: Option<(bool, usize, Vec<u32>, Vec<EntityId>)> = None;
    for mask in 1u32..(1 << pool.len()) {
        let mut sum = 0i64;
        let mut members = Vec::new();
        let mut sequences = Vec::new();
        for (bit, (id, remaining, sequence)) in pool.iter().enumerate() {
            if mask & (1 << bit) != 0 {
                sum += remaining;
                members.push(*id);
                sequences.push(*sequence);
            }
        }
        if sum < asked_i {
            continue;
        }
        // Exact totals beat overshoot, then fewer members, then lower sequences
        let candidate = (sum != asked_i, members.len(), sequences, members);
        match &best {
            Some(current) if *current <= candidate => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|(_, _, _, members)| members).unwrap_or_default()
}

// ── Tests ───────────────────────────────────────────────────────────────────
