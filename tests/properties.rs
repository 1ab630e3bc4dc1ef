use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use xa_sink::prelude::*;

mod common;

use common::{branch, failed, ids, setup_committer, FacadeScript};

fn task_records(tasks: usize, per_task: usize) -> Vec<CommitRecord> {
    (0..tasks)
        .map(|task| {
            let branches = (0..per_task)
                .map(|n| branch(&format!("T{}-{}", task, n)))
                .collect();
            CommitRecord::new(task as u32, branches)
        })
        .collect()
}

#[test]
fn test_combine_is_order_independent() {
    let script = FacadeScript::new();
    let committer = setup_committer(&script, 3, false);
    let records = task_records(6, 4);

    let expected: BTreeSet<BranchId> = records
        .iter()
        .flat_map(|record| record.branches.iter().cloned())
        .collect();
    let baseline = committer.combine(records.clone());
    assert_eq!(ids(&baseline).into_iter().collect::<BTreeSet<_>>(), expected);

    let mut rng = rand::rng();
    for _ in 0..20 {
        let mut shuffled = records.clone();
        shuffled.shuffle(&mut rng);
        for record in shuffled.iter_mut() {
            record.branches.shuffle(&mut rng);
        }
        assert_eq!(committer.combine(shuffled), baseline);
    }
}

#[test]
fn test_combine_is_associative() {
    let script = FacadeScript::new();
    let committer = setup_committer(&script, 3, false);
    let records = task_records(3, 2);

    // Combining everything at once equals combining the branches of a
    // partial combination with the rest.
    let all = committer.combine(records.clone());
    let partial = committer.combine(records[..2].to_vec());
    let regrouped = committer.combine(vec![
        CommitRecord::new(0, ids(&partial)),
        records[2].clone(),
    ]);
    assert_eq!(all, regrouped);
}

#[test]
fn test_remainder_never_grows() {
    let script = FacadeScript::new();
    let mut rng = rand::rng();
    let max_commit_attempts = 8;

    let records = task_records(4, 5);
    for record in &records {
        for id in &record.branches {
            // Each branch fails a random number of times, always below the ceiling.
            let failures = rng.random_range(0..max_commit_attempts - 1);
            let mut outcomes: Vec<_> = (0..failures).map(|_| failed("transient")).collect();
            outcomes.push(Ok(()));
            script.script_commit(id, outcomes);
        }
    }

    let mut committer = setup_committer(&script, max_commit_attempts, false);
    let mut pending = vec![committer.combine(records)];
    let mut previous: BTreeSet<BranchId> = ids(&pending[0]).into_iter().collect();

    for _ in 0..max_commit_attempts {
        pending = committer.commit(pending).unwrap();
        let current: BTreeSet<BranchId> = pending.iter().flat_map(ids).collect();
        assert!(current.is_subset(&previous));
        previous = current;
        if pending.is_empty() {
            break;
        }
    }
    assert!(pending.is_empty());
}

#[test]
fn test_resolved_branch_never_retried() {
    let script = FacadeScript::new();
    script.script_commit(&branch("slow"), vec![failed("busy"), failed("busy"), Ok(())]);
    let mut committer = setup_committer(&script, 5, false);

    let mut pending = vec![committer.combine(vec![CommitRecord::new(
        0,
        vec![branch("fast"), branch("slow")],
    )])];
    while !pending.is_empty() {
        pending = committer.commit(pending).unwrap();
        for record in &pending {
            assert!(!record.contains(&branch("fast")));
        }
    }
    assert_eq!(script.commit_calls(&branch("fast")), 1);
}
