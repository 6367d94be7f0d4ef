//! Branch-and-bound search over task dispatch sequences.
//!
//! # Algorithm
//!
//! 1. Compile the model into tasks (start, occupancy, machine literals)
//!    and derived variables (`var >= start + offset`, weighted in the
//!    objective). Only regular objectives are accepted: every derived
//!    value is non-decreasing in every start.
//! 2. Warm start: list-schedule tasks in urgency order, then improve the
//!    order by seeded random swap descent. The result is the first
//!    incumbent.
//! 3. Depth-first search. Each level dispatches one more task on the
//!    earliest-ready machine (left-shifted schedules dominate under a
//!    regular objective, and machines are interchangeable). Dispatches
//!    are canonical: non-decreasing start, ties by task index, and tasks
//!    with identical timing and cost are taken in index order.
//! 4. Prune when the node's lower bound reaches the incumbent, or when a
//!    capacity relaxation shows the remaining tasks cannot fit.
//!
//! # Reference
//!
//! Brucker (2007), "Scheduling Algorithms", Ch. 5 (parallel machines)
//! Baptiste et al. (2001), "Constraint-Based Scheduling"

use super::model::{Constraint, CpModel};
use super::solver::SolverConfig;
use super::variables::{BoolVarId, IntVarId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::debug;

/// Nodes between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 64;

#[derive(Debug, Clone)]
struct TaskInfo {
    start: IntVarId,
    start_min: i64,
    start_max: i64,
    occupancy: i64,
    /// (derived index, offset) for every derived variable this task bounds.
    terms: Vec<(usize, i64)>,
    /// Lower-index task with the same signature, dispatched first.
    class_prev: Option<usize>,
}

#[derive(Debug, Clone)]
struct DerivedVar {
    var: IntVarId,
    min: i64,
    max: i64,
    weight: i64,
    is_start: bool,
    /// (task, offset), one entry per task.
    sources: Vec<(usize, i64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum SignatureTerm {
    Private {
        weight: i64,
        min: i64,
        max: i64,
        offset: i64,
    },
    Shared {
        derived: usize,
        offset: i64,
    },
}

/// A model compiled for dispatch search.
#[derive(Debug)]
pub(crate) struct SearchProblem {
    tasks: Vec<TaskInfo>,
    derived: Vec<DerivedVar>,
    machine_count: usize,
    min_occupancy: i64,
    min_release: i64,
    latest_start: i64,
}

/// Start and machine of every task.
pub(crate) type Placements = Vec<(i64, usize)>;

impl SearchProblem {
    /// Compiles `model`, rejecting structures the search cannot honor.
    pub(crate) fn from_model(model: &CpModel) -> Result<Self, String> {
        model.validate()?;
        let n = model.tasks.len();
        if n > 0 && model.machine_count == 0 {
            return Err("tasks but no machines".into());
        }

        let mut task_of_start: HashMap<IntVarId, usize> = HashMap::new();
        let mut literal_owner: HashMap<BoolVarId, (usize, usize)> = HashMap::new();
        for (t, task) in model.tasks.iter().enumerate() {
            if task_of_start.insert(task.start, t).is_some() {
                return Err(format!("task {t} shares its start variable"));
            }
            for (m, &lit) in task.literals.iter().enumerate() {
                if literal_owner.insert(lit, (t, m)).is_some() {
                    return Err(format!("task {t} reuses a machine literal"));
                }
            }
        }

        let indicators: HashMap<BoolVarId, (BoolVarId, BoolVarId)> = model
            .constraints
            .iter()
            .filter_map(|c| match c {
                Constraint::BothTrue { indicator, a, b } => Some((*indicator, (*a, *b))),
                _ => None,
            })
            .collect();

        let mut occupancy: Vec<i64> = model.tasks.iter().map(|t| t.occupancy).collect();
        let mut covered: HashSet<(usize, usize, usize)> = HashSet::new();
        let mut derived: Vec<DerivedVar> = Vec::new();
        let mut derived_index: HashMap<IntVarId, usize> = HashMap::new();

        for constraint in &model.constraints {
            match constraint {
                Constraint::ExactlyOne { literals } => {
                    let owner = literals
                        .first()
                        .and_then(|l| literal_owner.get(l))
                        .map(|&(t, _)| t);
                    let Some(t) = owner else {
                        return Err("exactly-one over non-task literals".into());
                    };
                    let matches_task = literals.len() == model.machine_count
                        && literals
                            .iter()
                            .all(|l| literal_owner.get(l).map(|&(o, _)| o) == Some(t));
                    if !matches_task {
                        return Err(format!("exactly-one does not match the literals of task {t}"));
                    }
                }
                Constraint::BothTrue { .. } => {}
                Constraint::GatedNoOverlap {
                    gate,
                    first,
                    second,
                } => {
                    let gated = indicators.get(gate).and_then(|(a, b)| {
                        Some((*literal_owner.get(a)?, *literal_owner.get(b)?))
                    });
                    let Some(((ta, ma), (tb, mb))) = gated else {
                        return Err("no-overlap gate is not a conjunction of task literals".into());
                    };
                    let (Some(&t1), Some(&t2)) =
                        (task_of_start.get(&first.start), task_of_start.get(&second.start))
                    else {
                        return Err("no-overlap over a non-task interval".into());
                    };
                    let same_pair = (t1, t2) == (ta, tb) || (t1, t2) == (tb, ta);
                    if t1 == t2 || ma != mb || !same_pair {
                        return Err(format!("no-overlap gate does not match tasks {t1} and {t2}"));
                    }
                    occupancy[t1] = occupancy[t1].max(first.length);
                    occupancy[t2] = occupancy[t2].max(second.length);
                    covered.insert((t1.min(t2), t1.max(t2), ma));
                }
                Constraint::AtLeast {
                    target,
                    source,
                    offset,
                } => {
                    let Some(&t) = task_of_start.get(source) else {
                        return Err(format!(
                            "{} is bounded by a non-task variable",
                            model.int_vars[target.0].name
                        ));
                    };
                    if task_of_start.contains_key(target) {
                        return Err("a task start cannot be a bounded target".into());
                    }
                    let d = derived_slot(&mut derived, &mut derived_index, model, *target, false);
                    derived[d].sources.push((t, *offset));
                }
            }
        }

        let expected_pairs = model.machine_count * n * n.saturating_sub(1) / 2;
        if covered.len() != expected_pairs {
            return Err(format!(
                "no-overlap covers {} of {expected_pairs} task pairs per machine",
                covered.len()
            ));
        }

        if let Some(objective) = &model.objective {
            for &(var, coeff) in objective.terms() {
                if coeff < 0 {
                    return Err(format!(
                        "negative objective coefficient on {}",
                        model.int_vars[var.0].name
                    ));
                }
                let start_of = task_of_start.get(&var).copied();
                let d = derived_slot(&mut derived, &mut derived_index, model, var, start_of.is_some());
                if let Some(t) = start_of {
                    if derived[d].sources.is_empty() {
                        derived[d].sources.push((t, 0));
                    }
                }
                derived[d].weight = derived[d]
                    .weight
                    .checked_add(coeff)
                    .ok_or_else(|| "objective coefficients overflow".to_string())?;
            }
        }

        let worst = derived.iter().try_fold(0i64, |total, d| {
            let extreme = d.min.checked_abs()?.max(d.max.checked_abs()?);
            total.checked_add(d.weight.checked_mul(extreme)?)
        });
        if worst.is_none() {
            return Err("objective can exceed the integer range".into());
        }

        for d in &mut derived {
            d.sources.sort_by_key(|&(t, off)| (t, Reverse(off)));
            d.sources.dedup_by_key(|&mut (t, _)| t);
        }

        let mut tasks: Vec<TaskInfo> = model
            .tasks
            .iter()
            .zip(&occupancy)
            .map(|(task, &occ)| {
                let var = &model.int_vars[task.start.0];
                TaskInfo {
                    start: task.start,
                    start_min: var.min,
                    start_max: var.max,
                    occupancy: occ,
                    terms: Vec::new(),
                    class_prev: None,
                }
            })
            .collect();
        for (d, var) in derived.iter().enumerate() {
            for &(t, off) in &var.sources {
                tasks[t].terms.push((d, off));
            }
        }

        // Tasks with equal signatures are interchangeable.
        let mut last_of_class: HashMap<(i64, i64, i64, Vec<SignatureTerm>), usize> = HashMap::new();
        for t in 0..n {
            let mut terms: Vec<SignatureTerm> = tasks[t]
                .terms
                .iter()
                .map(|&(d, offset)| {
                    let var = &derived[d];
                    if var.sources.len() == 1 {
                        SignatureTerm::Private {
                            weight: var.weight,
                            min: var.min,
                            max: var.max,
                            offset,
                        }
                    } else {
                        SignatureTerm::Shared { derived: d, offset }
                    }
                })
                .collect();
            terms.sort();
            let key = (tasks[t].start_min, tasks[t].start_max, tasks[t].occupancy, terms);
            tasks[t].class_prev = last_of_class.insert(key, t);
        }

        Ok(Self {
            min_occupancy: tasks.iter().map(|t| t.occupancy).min().unwrap_or(0),
            min_release: tasks.iter().map(|t| t.start_min).min().unwrap_or(0),
            latest_start: tasks.iter().map(|t| t.start_max).max().unwrap_or(0),
            tasks,
            derived,
            machine_count: model.machine_count,
        })
    }

    pub(crate) fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Optimistic objective of any completion of a partial schedule, or
    /// `None` when no completion is feasible.
    ///
    /// `floor` is the earliest start any remaining dispatch may take.
    fn lower_bound(
        &self,
        starts: &[Option<i64>],
        ready: &[i64],
        floor: i64,
        remaining: usize,
    ) -> Option<i64> {
        let (first, last) = if remaining > 0 {
            self.relaxed_starts(ready, floor, remaining)?
        } else {
            (floor, floor)
        };

        let mut total = 0i64;
        for d in &self.derived {
            let mut value = d.min;
            let mut unfixed = 0usize;
            let mut min_unfixed_offset = i64::MAX;
            for &(t, offset) in &d.sources {
                let start = match starts[t] {
                    Some(s) => s,
                    None => {
                        unfixed += 1;
                        min_unfixed_offset = min_unfixed_offset.min(offset);
                        first.max(self.tasks[t].start_min)
                    }
                };
                value = value.max(start + offset);
            }
            if remaining > 0 && unfixed == remaining {
                // Some remaining task starts no earlier than the relaxed last start.
                value = value.max(last + min_unfixed_offset);
            }
            if value > d.max {
                return None;
            }
            total += d.weight * value;
        }
        Some(total)
    }

    /// List-schedules `remaining` copies of the shortest task on the
    /// current machines. Returns the first and last relaxed start.
    fn relaxed_starts(&self, ready: &[i64], floor: i64, remaining: usize) -> Option<(i64, i64)> {
        let floor = floor.max(self.min_release);
        let mut heap: BinaryHeap<Reverse<i64>> = ready.iter().map(|&r| Reverse(r)).collect();
        let mut first = None;
        let mut last = floor;
        for _ in 0..remaining {
            let Reverse(r) = heap.pop()?;
            let start = r.max(floor);
            first.get_or_insert(start);
            last = start;
            heap.push(Reverse(start + self.min_occupancy));
        }
        if last > self.latest_start {
            return None;
        }
        Some((first.unwrap_or(floor), last))
    }

    /// Objective contribution of variables bounded by task `t` alone.
    fn private_cost(&self, t: usize, start: i64) -> i64 {
        self.tasks[t]
            .terms
            .iter()
            .filter(|&&(d, _)| self.derived[d].sources.len() == 1)
            .map(|&(d, offset)| {
                let var = &self.derived[d];
                var.weight
                    .saturating_mul(var.min.max(start.saturating_add(offset)))
            })
            .fold(0i64, i64::saturating_add)
    }

    /// Exact objective of a complete placement, or `None` if a derived
    /// variable leaves its domain.
    pub(crate) fn objective(&self, placements: &[(i64, usize)]) -> Option<i64> {
        let starts: Vec<Option<i64>> = placements.iter().map(|&(s, _)| Some(s)).collect();
        self.lower_bound(&starts, &[], self.min_release, 0)
    }

    /// Value of every integer variable the search determines:
    /// task starts, then derived variables.
    pub(crate) fn int_values(&self, placements: &[(i64, usize)]) -> Vec<(IntVarId, i64)> {
        let mut values: Vec<(IntVarId, i64)> = self
            .tasks
            .iter()
            .zip(placements)
            .map(|(task, &(s, _))| (task.start, s))
            .collect();
        for d in self.derived.iter().filter(|d| !d.is_start) {
            let value = d
                .sources
                .iter()
                .map(|&(t, offset)| placements[t].0 + offset)
                .fold(d.min, i64::max);
            values.push((d.var, value));
        }
        values
    }

    /// List-schedules tasks in `order` on the earliest-ready machine.
    fn decode(&self, order: &[usize]) -> Option<Placements> {
        let mut ready = vec![self.min_release; self.machine_count];
        let mut placements = vec![(0i64, 0usize); self.tasks.len()];
        for &t in order {
            let (machine, &r) = ready
                .iter()
                .enumerate()
                .min_by_key(|&(m, &r)| (r, m))?;
            let task = &self.tasks[t];
            let start = r.max(task.start_min);
            if start > task.start_max {
                return None;
            }
            placements[t] = (start, machine);
            ready[machine] = start + task.occupancy;
        }
        Some(placements)
    }

    /// Greedy dispatch order: heaviest private penalty first, then the
    /// task whose penalty starts earliest.
    fn urgency_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by_key(|&t| {
            let private = self.tasks[t]
                .terms
                .iter()
                .filter(|&&(d, _)| self.derived[d].sources.len() == 1);
            let weight: i64 = private.clone().map(|&(d, _)| self.derived[d].weight).sum();
            let urgency = private
                .map(|&(d, offset)| offset - self.derived[d].min)
                .max()
                .unwrap_or(i64::MIN);
            (Reverse(weight), Reverse(urgency), t)
        });
        order
    }
}

fn derived_slot(
    derived: &mut Vec<DerivedVar>,
    index: &mut HashMap<IntVarId, usize>,
    model: &CpModel,
    var: IntVarId,
    is_start: bool,
) -> usize {
    *index.entry(var).or_insert_with(|| {
        let v = &model.int_vars[var.0];
        derived.push(DerivedVar {
            var,
            min: v.min,
            max: v.max,
            weight: 0,
            is_start,
            sources: Vec::new(),
        });
        derived.len() - 1
    })
}

#[derive(Debug)]
struct Incumbent {
    cost: i64,
    placements: Placements,
}

/// Incumbent and stop flags shared by all search workers.
#[derive(Debug)]
pub(crate) struct SharedIncumbent {
    best_cost: AtomicI64,
    best: Mutex<Option<Incumbent>>,
    nodes: AtomicU64,
    improvements: AtomicU64,
    timed_out: AtomicBool,
    stopped: AtomicBool,
    stop_after_first: bool,
}

impl SharedIncumbent {
    pub(crate) fn new(stop_after_first: bool) -> Self {
        Self {
            best_cost: AtomicI64::new(i64::MAX),
            best: Mutex::new(None),
            nodes: AtomicU64::new(0),
            improvements: AtomicU64::new(0),
            timed_out: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            stop_after_first,
        }
    }

    fn best_cost(&self) -> i64 {
        self.best_cost.load(Ordering::Acquire)
    }

    /// Installs a strictly better incumbent. Returns whether it was taken.
    fn offer(&self, cost: i64, placements: impl FnOnce() -> Placements) -> bool {
        let mut guard = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        let current = guard.as_ref().map_or(i64::MAX, |b| b.cost);
        if cost >= current {
            return false;
        }
        *guard = Some(Incumbent {
            cost,
            placements: placements(),
        });
        self.best_cost.store(cost, Ordering::Release);
        self.improvements.fetch_add(1, Ordering::Relaxed);
        debug!(cost, "new incumbent");
        if self.stop_after_first {
            self.stopped.store(true, Ordering::Release);
        }
        true
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn expire(&self) {
        self.timed_out.store(true, Ordering::Release);
        self.stopped.store(true, Ordering::Release);
    }

    pub(crate) fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Acquire)
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.is_stopped()
    }

    pub(crate) fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    pub(crate) fn improvements(&self) -> u64 {
        self.improvements.load(Ordering::Relaxed)
    }

    /// Takes the best incumbent found, if any.
    pub(crate) fn into_best(self) -> Option<(i64, Placements)> {
        self.best
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|b| (b.cost, b.placements))
    }
}

#[derive(Debug, Clone, Copy)]
struct Choice {
    task: usize,
    machine: usize,
    start: i64,
}

/// Depth-first search state of one worker.
struct Worker<'a> {
    problem: &'a SearchProblem,
    shared: &'a SharedIncumbent,
    deadline: Instant,
    starts: Vec<Option<i64>>,
    machines: Vec<Option<usize>>,
    ready: Vec<i64>,
    /// Dispatched tasks with the previous ready time of their machine.
    trail: Vec<(usize, i64)>,
    nodes: u64,
}

impl<'a> Worker<'a> {
    fn new(problem: &'a SearchProblem, shared: &'a SharedIncumbent, deadline: Instant) -> Self {
        let n = problem.tasks.len();
        Self {
            problem,
            shared,
            deadline,
            starts: vec![None; n],
            machines: vec![None; n],
            ready: vec![problem.min_release; problem.machine_count],
            trail: Vec::with_capacity(n),
            nodes: 0,
        }
    }

    fn last_dispatch(&self) -> Option<(i64, usize)> {
        self.trail
            .last()
            .and_then(|&(t, _)| self.starts[t].map(|s| (s, t)))
    }

    fn remaining(&self) -> usize {
        self.problem.tasks.len() - self.trail.len()
    }

    fn should_stop(&mut self) -> bool {
        if self.shared.is_stopped() {
            return true;
        }
        if self.nodes % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            self.shared.expire();
            return true;
        }
        false
    }

    fn bound(&self) -> Option<i64> {
        let floor = self
            .last_dispatch()
            .map_or(self.problem.min_release, |(s, _)| s);
        self.problem
            .lower_bound(&self.starts, &self.ready, floor, self.remaining())
    }

    fn apply(&mut self, choice: Choice) {
        let previous = self.ready[choice.machine];
        self.starts[choice.task] = Some(choice.start);
        self.machines[choice.task] = Some(choice.machine);
        self.ready[choice.machine] = choice.start + self.problem.tasks[choice.task].occupancy;
        self.trail.push((choice.task, previous));
    }

    fn undo(&mut self) {
        if let Some((t, previous)) = self.trail.pop() {
            if let Some(m) = self.machines[t] {
                self.ready[m] = previous;
            }
            self.starts[t] = None;
            self.machines[t] = None;
        }
    }

    fn placements(&self) -> Placements {
        self.starts
            .iter()
            .zip(&self.machines)
            .map(|(s, m)| (s.unwrap_or(0), m.unwrap_or(0)))
            .collect()
    }

    /// Canonical dispatches from the current node, most promising first.
    fn children(&self) -> Vec<Choice> {
        let problem = self.problem;
        let Some((min_machine, &r_min)) = self
            .ready
            .iter()
            .enumerate()
            .min_by_key(|&(m, &r)| (r, m))
        else {
            return Vec::new();
        };

        let latest_release = (0..problem.tasks.len())
            .filter(|&t| self.starts[t].is_none())
            .map(|t| problem.tasks[t].start_min)
            .max()
            .unwrap_or(r_min);

        // Once every remaining task is released, skipping the earliest
        // machine would leave it idle for good; that is never better.
        let machine_choices: Vec<(usize, i64)> = if latest_release <= r_min {
            vec![(min_machine, r_min)]
        } else {
            let mut seen = HashSet::new();
            self.ready
                .iter()
                .enumerate()
                .filter(|&(_, r)| seen.insert(*r))
                .map(|(m, &r)| (m, r))
                .collect()
        };

        let last = self.last_dispatch();
        let mut choices = Vec::new();
        for &(machine, r) in &machine_choices {
            for (t, task) in problem.tasks.iter().enumerate() {
                if self.starts[t].is_some() {
                    continue;
                }
                if task.class_prev.is_some_and(|p| self.starts[p].is_none()) {
                    continue;
                }
                let start = r.max(task.start_min);
                if start > task.start_max {
                    continue;
                }
                if let Some((last_start, last_task)) = last {
                    if start < last_start || (start == last_start && t < last_task) {
                        continue;
                    }
                }
                choices.push(Choice {
                    task: t,
                    machine,
                    start,
                });
            }
        }

        choices.sort_by_cached_key(|c| {
            let task = &problem.tasks[c.task];
            let regret = problem.private_cost(c.task, c.start + task.occupancy)
                - problem.private_cost(c.task, c.start);
            (c.start, Reverse(regret), c.task)
        });
        choices
    }

    fn dfs(&mut self) {
        if self.should_stop() {
            return;
        }
        self.nodes += 1;

        let Some(bound) = self.bound() else {
            return;
        };
        if bound >= self.shared.best_cost() {
            return;
        }
        if self.remaining() == 0 {
            let placements = self.placements();
            self.shared.offer(bound, || placements);
            return;
        }

        for choice in self.children() {
            self.apply(choice);
            self.dfs();
            self.undo();
            if self.shared.is_stopped() {
                break;
            }
        }
    }

    fn finish(self) {
        self.shared.nodes.fetch_add(self.nodes, Ordering::Relaxed);
    }
}

/// Produces the first incumbent from a greedy order refined by random
/// pairwise swaps.
pub(crate) fn warm_start(
    problem: &SearchProblem,
    config: &SolverConfig,
    shared: &SharedIncumbent,
    deadline: Instant,
) {
    if Instant::now() >= deadline {
        shared.expire();
        return;
    }

    let n = problem.tasks.len();
    let evaluate = |order: &[usize]| {
        let placements = problem.decode(order)?;
        let cost = problem.objective(&placements)?;
        Some((cost, placements))
    };

    let mut order = problem.urgency_order();
    let mut best = evaluate(&order);

    if n >= 2 {
        let mut rng = StdRng::seed_from_u64(config.seed.unwrap_or(42));
        for iteration in 0..config.warm_start_iterations {
            if iteration % 32 == 0 && Instant::now() >= deadline {
                break;
            }
            let a = rng.random_range(0..n);
            let b = rng.random_range(0..n);
            if a == b {
                continue;
            }
            order.swap(a, b);
            match evaluate(&order) {
                Some((cost, placements))
                    if best.as_ref().map_or(true, |(best_cost, _)| cost < *best_cost) =>
                {
                    best = Some((cost, placements));
                }
                _ => order.swap(a, b),
            }
        }
    }

    match best {
        Some((cost, placements)) => {
            debug!(cost, "warm start incumbent");
            shared.offer(cost, || placements);
        }
        None => debug!("warm start found no feasible order"),
    }
}

/// Runs the exhaustive search, in parallel over root subtrees when
/// `workers > 1`.
pub(crate) fn branch_and_bound(
    problem: &SearchProblem,
    shared: &SharedIncumbent,
    deadline: Instant,
    workers: usize,
) {
    if shared.is_stopped() {
        return;
    }

    let mut root = Worker::new(problem, shared, deadline);
    if root.should_stop() {
        root.finish();
        return;
    }
    root.nodes += 1;
    let open = matches!(root.bound(), Some(bound) if bound < shared.best_cost());
    if !open {
        root.finish();
        return;
    }
    if problem.task_count() == 0 {
        let placements = root.placements();
        if let Some(cost) = problem.objective(&placements) {
            shared.offer(cost, || placements);
        }
        root.finish();
        return;
    }

    let children = root.children();
    if workers > 1 && children.len() > 1 {
        root.finish();
        explore_parallel(problem, shared, deadline, &children, workers);
    } else {
        for choice in children {
            root.apply(choice);
            root.dfs();
            root.undo();
            if shared.is_stopped() {
                break;
            }
        }
        root.finish();
    }
}

fn explore_subtree(problem: &SearchProblem, shared: &SharedIncumbent, deadline: Instant, choice: Choice) {
    if shared.is_stopped() {
        return;
    }
    let mut worker = Worker::new(problem, shared, deadline);
    worker.apply(choice);
    worker.dfs();
    worker.finish();
}

#[cfg(feature = "parallel")]
fn explore_parallel(
    problem: &SearchProblem,
    shared: &SharedIncumbent,
    deadline: Instant,
    children: &[Choice],
    workers: usize,
) {
    use rayon::prelude::*;

    let threads = pool_size(workers, children.len(), rayon::current_num_threads());
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| {
            children
                .par_iter()
                .for_each(|&choice| explore_subtree(problem, shared, deadline, choice));
        }),
        Err(err) => {
            tracing::warn!(%err, "worker pool unavailable, searching sequentially");
            for &choice in children {
                explore_subtree(problem, shared, deadline, choice);
            }
        }
    }
}

/// Threads worth spawning: never more than the root children or the
/// machine's parallelism.
#[cfg(feature = "parallel")]
fn pool_size(workers: usize, children: usize, available: usize) -> usize {
    workers.min(children).min(available).max(1)
}

#[cfg(not(feature = "parallel"))]
fn explore_parallel(
    problem: &SearchProblem,
    shared: &SharedIncumbent,
    deadline: Instant,
    children: &[Choice],
    _workers: usize,
) {
    for &choice in children {
        explore_subtree(problem, shared, deadline, choice);
    }
}
