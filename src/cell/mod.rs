//! Reactive value cells and the per-machine arena that owns them.
//!
//! Every input and output port of every block is a cell in a [`CellGraph`].
//! Writes never recurse: [`CellGraph::set`] queues the write and drains the
//! queue iteratively. Draining a write stores the (admitted) value, notifies
//! subscribers, then queues the value for every downstream cell. Subscribers
//! receive a [`CellWriter`] that can only queue further writes, so a
//! feedback loop becomes a longer queue rather than a deeper stack.
//!
//! Propagation runs in frames. A cell commits at most once per frame: a
//! write that reaches a cell already committed in the current frame is
//! deferred to the next [`CellGraph::begin_frame`]. A feedback cycle
//! therefore advances one step per frame while acyclic chains still settle
//! in a single pass. Each flush also stops after the configured propagation
//! budget; anything left over is drained by the next flush.
//!
//! The arena also acts as the fault watcher for every cell: storing a
//! non-finite value records the owning unit as faulted and stops the value
//! from reaching subscribers or downstream cells.

mod kind;

use std::collections::VecDeque;
use std::mem;

use log::{debug, warn};
use thiserror::Error;

pub use kind::CellKind;
use kind::Admit;

use crate::unit::UnitId;
use crate::value::{Value, ValueType};

/// Index of a cell inside its [`CellGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u32);

impl CellId {
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle returned by [`CellGraph::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Callback invoked with the new and the previous value of a cell.
pub type Subscriber = Box<dyn FnMut(&Value, &Value, &mut CellWriter<'_>)>;

/// Errors raised while connecting two cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("cell has been destroyed")]
    Destroyed,
    #[error("cannot connect a {from} output to a {to} input")]
    TypeMismatch { from: ValueType, to: ValueType },
}

struct Subscription {
    id: SubscriptionId,
    scope: Option<UnitId>,
    callback: Subscriber,
}

struct Cell {
    owner: UnitId,
    name: String,
    kind: CellKind,
    value: Value,
    subscribers: Vec<Subscription>,
    downstream: Vec<CellId>,
    upstream: Vec<CellId>,
    committed: u64,
    output: bool,
    live: bool,
}

struct Write {
    target: CellId,
    value: Value,
    scope: Option<UnitId>,
}

/// Write access handed to subscribers; writes are queued, not applied.
///
/// A writer scoped to a unit only reaches that unit's output cells; writes
/// anywhere else are dropped when the queue drains.
pub struct CellWriter<'a> {
    queue: &'a mut VecDeque<Write>,
    scope: Option<UnitId>,
}

impl CellWriter<'_> {
    /// Queue `value` for `cell`. It is applied later in the same flush, or a
    /// later one if the budget runs out or `cell` already changed this frame.
    pub fn set(&mut self, cell: CellId, value: impl Into<Value>) {
        self.queue.push_back(Write {
            target: cell,
            value: value.into(),
            scope: self.scope,
        });
    }
}

/// Arena of every cell belonging to one machine.
pub struct CellGraph {
    cells: Vec<Cell>,
    queue: VecDeque<Write>,
    deferred: VecDeque<Write>,
    faulted: Vec<(UnitId, CellId)>,
    budget: usize,
    frame: u64,
    commits: u64,
    next_subscription: u64,
}

impl CellGraph {
    /// Creates an empty graph that processes at most `budget` queued writes
    /// per flush.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Self {
            cells: Vec::new(),
            queue: VecDeque::new(),
            deferred: VecDeque::new(),
            faulted: Vec::new(),
            budget: budget.max(1),
            frame: 1,
            commits: 0,
            next_subscription: 0,
        }
    }

    pub(crate) fn insert(
        &mut self,
        owner: UnitId,
        name: impl Into<String>,
        kind: CellKind,
        initial: Value,
    ) -> CellId {
        let id = CellId(u32::try_from(self.cells.len()).unwrap_or(u32::MAX));
        self.cells.push(Cell {
            owner,
            name: name.into(),
            kind,
            value: initial,
            subscribers: Vec::new(),
            downstream: Vec::new(),
            upstream: Vec::new(),
            committed: 0,
            output: false,
            live: true,
        });
        id
    }

    /// Mark `id` as an output port, writable by its owner's subscribers.
    pub(crate) fn mark_output(&mut self, id: CellId) {
        if let Some(cell) = self.cell_mut(id) {
            cell.output = true;
        }
    }

    fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.index()).filter(|cell| cell.live)
    }

    fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id.index()).filter(|cell| cell.live)
    }

    /// Number of cells ever created, live or destroyed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current value of a live cell.
    #[must_use]
    pub fn get(&self, id: CellId) -> Option<&Value> {
        self.cell(id).map(|cell| &cell.value)
    }

    #[must_use]
    pub fn is_live(&self, id: CellId) -> bool {
        self.cell(id).is_some()
    }

    #[must_use]
    pub fn owner(&self, id: CellId) -> Option<UnitId> {
        self.cells.get(id.index()).map(|cell| cell.owner)
    }

    #[must_use]
    pub fn name(&self, id: CellId) -> Option<&str> {
        self.cells.get(id.index()).map(|cell| cell.name.as_str())
    }

    #[must_use]
    pub fn kind(&self, id: CellId) -> Option<&CellKind> {
        self.cell(id).map(|cell| &cell.kind)
    }

    #[must_use]
    pub fn value_type(&self, id: CellId) -> Option<ValueType> {
        self.kind(id).map(CellKind::value_type)
    }

    /// Cells that receive every value stored in `id`, in connection order.
    #[must_use]
    pub fn downstream(&self, id: CellId) -> &[CellId] {
        self.cell(id).map_or(&[], |cell| cell.downstream.as_slice())
    }

    /// Live subscriptions on `id`.
    #[must_use]
    pub fn subscriber_count(&self, id: CellId) -> usize {
        self.cell(id).map_or(0, |cell| cell.subscribers.len())
    }

    /// Writes still waiting to be drained, including deferred ones.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len() + self.deferred.len()
    }

    /// Values committed since the graph was created.
    #[must_use]
    pub const fn commits(&self) -> u64 {
        self.commits
    }

    /// Every live connection as `(from, to)`.
    pub fn connections(&self) -> impl Iterator<Item = (CellId, CellId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.live)
            .flat_map(|(index, cell)| {
                let from = CellId(u32::try_from(index).unwrap_or(u32::MAX));
                cell.downstream.iter().map(move |to| (from, *to))
            })
    }

    /// Start a new propagation frame and release the writes deferred by the
    /// previous one ahead of anything still queued.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        if self.deferred.is_empty() {
            return;
        }
        let mut released = mem::take(&mut self.deferred);
        released.append(&mut self.queue);
        self.queue = released;
    }

    /// Store `value` in `id` and propagate it in a frame of its own.
    ///
    /// Writes to destroyed cells are ignored. Returns the number of queued
    /// writes drained by the flush.
    pub fn set(&mut self, id: CellId, value: impl Into<Value>) -> usize {
        self.begin_frame();
        self.write(id, value.into())
    }

    /// Queue and flush a write inside the current frame.
    pub(crate) fn write(&mut self, id: CellId, value: Value) -> usize {
        self.enqueue(id, value);
        self.flush()
    }

    pub(crate) fn enqueue(&mut self, id: CellId, value: Value) {
        self.queue.push_back(Write {
            target: id,
            value,
            scope: None,
        });
    }

    /// Drain queued writes, up to the propagation budget.
    pub fn flush(&mut self) -> usize {
        let mut processed = 0;
        while processed < self.budget {
            let Some(write) = self.queue.pop_front() else {
                return processed;
            };
            self.apply(write);
            processed += 1;
        }
        if !self.queue.is_empty() {
            debug!(
                "propagation budget of {} writes exhausted; {} carried over",
                self.budget,
                self.queue.len()
            );
        }
        processed
    }

    fn apply(&mut self, write: Write) {
        let frame = self.frame;
        let Write {
            target,
            value,
            scope,
        } = write;
        let Some(cell) = self.cell_mut(target) else {
            return;
        };
        if scope.is_some_and(|owner| owner != cell.owner || !cell.output) {
            warn!("dropping subscriber write into foreign cell '{}'", cell.name);
            return;
        }
        let admitted = match cell.kind.admit(value) {
            Admit::Store(admitted) => admitted,
            Admit::Hold => return,
            Admit::Reject(rejected) => {
                warn!(
                    "dropping {} write into {} cell '{}'",
                    rejected.value_type(),
                    cell.kind.value_type(),
                    cell.name
                );
                return;
            }
        };
        if cell.committed == frame {
            self.deferred.push_back(Write {
                target,
                value: admitted,
                scope: None,
            });
            return;
        }
        if admitted == cell.value {
            return;
        }
        self.commit(target, admitted);
    }

    /// Store an already admitted value, then notify and propagate.
    fn commit(&mut self, id: CellId, value: Value) {
        let frame = self.frame;
        self.commits += 1;
        let Some(cell) = self.cell_mut(id) else {
            return;
        };
        cell.committed = frame;
        let previous = mem::replace(&mut cell.value, value);
        if !cell.value.is_finite() {
            warn!("cell '{}' received non-finite value {}", cell.name, cell.value);
            let owner = cell.owner;
            self.faulted.push((owner, id));
            return;
        }
        let current = cell.value.clone();
        let downstream = cell.downstream.clone();
        let mut subscribers = mem::take(&mut cell.subscribers);

        for subscription in &mut subscribers {
            let mut writer = CellWriter {
                queue: &mut self.queue,
                scope: subscription.scope,
            };
            (subscription.callback)(&current, &previous, &mut writer);
        }
        if let Some(cell) = self.cell_mut(id) {
            cell.subscribers = subscribers;
        }
        for target in downstream {
            self.queue.push_back(Write {
                target,
                value: current.clone(),
                scope: None,
            });
        }
    }

    /// Register `callback` on `id`.
    ///
    /// With `fire_immediately` the callback runs once straight away with the
    /// current value as both the new and the previous value, and any writes
    /// it queues are flushed. Returns `None` for destroyed cells.
    pub fn subscribe(
        &mut self,
        id: CellId,
        fire_immediately: bool,
        callback: Subscriber,
    ) -> Option<SubscriptionId> {
        self.subscribe_scoped(id, fire_immediately, None, callback)
    }

    /// As [`CellGraph::subscribe`], with the callback's writes limited to the
    /// outputs of `scope` when given.
    pub(crate) fn subscribe_scoped(
        &mut self,
        id: CellId,
        fire_immediately: bool,
        scope: Option<UnitId>,
        mut callback: Subscriber,
    ) -> Option<SubscriptionId> {
        let current = self.cell(id)?.value.clone();
        let handle = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        if fire_immediately {
            self.begin_frame();
            let mut writer = CellWriter {
                queue: &mut self.queue,
                scope,
            };
            callback(&current, &current, &mut writer);
        }
        if let Some(cell) = self.cell_mut(id) {
            cell.subscribers.push(Subscription {
                id: handle,
                scope,
                callback,
            });
        }
        if fire_immediately {
            self.flush();
        }
        Some(handle)
    }

    /// Remove a subscription; returns whether it existed.
    pub fn unsubscribe(&mut self, id: CellId, subscription: SubscriptionId) -> bool {
        let Some(cell) = self.cell_mut(id) else {
            return false;
        };
        let before = cell.subscribers.len();
        cell.subscribers.retain(|s| s.id != subscription);
        cell.subscribers.len() != before
    }

    /// Make `to` receive every value stored in `from`, and push the current
    /// value of `from` once straight away.
    ///
    /// Connecting the same pair twice is a no-op.
    ///
    /// # Errors
    /// Returns [`CellError::Destroyed`] if either cell is gone and
    /// [`CellError::TypeMismatch`] if the wire types are incompatible.
    pub fn connect(&mut self, from: CellId, to: CellId) -> Result<(), CellError> {
        let from_type = self.value_type(from).ok_or(CellError::Destroyed)?;
        let to_type = self.value_type(to).ok_or(CellError::Destroyed)?;
        if !from_type.feeds(to_type) {
            return Err(CellError::TypeMismatch {
                from: from_type,
                to: to_type,
            });
        }
        if from == to || self.downstream(from).contains(&to) {
            return Ok(());
        }
        let current = match self.cell_mut(from) {
            Some(cell) => {
                cell.downstream.push(to);
                cell.value.clone()
            }
            None => return Err(CellError::Destroyed),
        };
        if let Some(cell) = self.cell_mut(to) {
            cell.upstream.push(from);
        }
        self.begin_frame();
        self.write(to, current);
        Ok(())
    }

    /// Advance timing state of `ids` by `ticks`, propagating any changes.
    ///
    /// A cell already committed this frame keeps its timing state until the
    /// next one.
    pub fn advance(&mut self, ids: &[CellId], ticks: u32) {
        let frame = self.frame;
        for &id in ids {
            let Some(cell) = self.cell_mut(id).filter(|cell| cell.committed != frame) else {
                continue;
            };
            let Some(next) = cell.kind.advance(&cell.value, ticks) else {
                continue;
            };
            if next != cell.value {
                self.commit(id, next);
            }
        }
        self.flush();
    }

    /// Tear `id` down: drop subscribers, unlink it from every connection and
    /// discard writes queued for it. Idempotent.
    pub fn destroy(&mut self, id: CellId) {
        let Some(cell) = self.cell_mut(id) else {
            return;
        };
        cell.live = false;
        cell.subscribers.clear();
        let downstream = mem::take(&mut cell.downstream);
        let upstream = mem::take(&mut cell.upstream);
        for target in downstream {
            if let Some(other) = self.cells.get_mut(target.index()) {
                other.upstream.retain(|u| *u != id);
            }
        }
        for source in upstream {
            if let Some(other) = self.cells.get_mut(source.index()) {
                other.downstream.retain(|d| *d != id);
            }
        }
        self.queue.retain(|write| write.target != id);
        self.deferred.retain(|write| write.target != id);
    }

    /// Units whose cells stored a non-finite value since the last call.
    pub fn take_faults(&mut self) -> Vec<(UnitId, CellId)> {
        mem::take(&mut self.faulted)
    }

    /// Total subscriptions across every live cell.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.live)
            .map(|cell| cell.subscribers.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use rstest::{fixture, rstest};

    const OWNER: UnitId = UnitId(0);

    #[fixture]
    fn graph() -> CellGraph {
        CellGraph::new(64)
    }

    fn number(graph: &mut CellGraph, name: &str) -> CellId {
        graph.insert(OWNER, name, CellKind::Plain(ValueType::Number), Value::Number(0.0))
    }

    #[rstest]
    fn set_propagates_along_chain(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        let c = number(&mut graph, "c");
        graph.connect(a, b).expect("connect a->b");
        graph.connect(b, c).expect("connect b->c");
        graph.set(a, 3.5);
        assert_eq!(graph.get(c), Some(&Value::Number(3.5)));
    }

    #[rstest]
    fn connect_pushes_current_value(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        graph.set(a, 2.0);
        graph.connect(a, b).expect("connect");
        assert_eq!(graph.get(b), Some(&Value::Number(2.0)));
    }

    #[rstest]
    fn connect_rejects_mismatched_types(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let flag = graph.insert(OWNER, "flag", CellKind::Plain(ValueType::Bool), false.into());
        assert_eq!(
            graph.connect(a, flag),
            Err(CellError::TypeMismatch {
                from: ValueType::Number,
                to: ValueType::Bool,
            })
        );
    }

    #[rstest]
    fn subscribers_see_new_and_previous(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        graph.subscribe(
            a,
            true,
            Box::new(move |new, old, _| log.borrow_mut().push((new.clone(), old.clone()))),
        );
        graph.set(a, 1.0);
        graph.set(a, 1.0);
        assert_eq!(
            *seen.borrow(),
            vec![
                (Value::Number(0.0), Value::Number(0.0)),
                (Value::Number(1.0), Value::Number(0.0)),
            ]
        );
    }

    #[rstest]
    fn subscriber_writes_are_queued(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        graph.subscribe(
            a,
            false,
            Box::new(move |new, _, writer| {
                if let Some(n) = new.as_number() {
                    writer.set(b, n * 2.0);
                }
            }),
        );
        graph.set(a, 4.0);
        assert_eq!(graph.get(b), Some(&Value::Number(8.0)));
    }

    #[rstest]
    fn inverter_loop_toggles_once_per_frame(mut graph: CellGraph) {
        let a = graph.insert(OWNER, "a", CellKind::Plain(ValueType::Bool), false.into());
        // An inverter feeding itself never settles.
        graph.subscribe(
            a,
            false,
            Box::new(move |new, _, writer| {
                writer.set(a, !new.as_bool().unwrap_or(false));
            }),
        );
        graph.set(a, true);
        assert_eq!(graph.get(a), Some(&Value::Bool(true)));
        assert_eq!(graph.pending(), 1);

        let before = graph.commits();
        graph.begin_frame();
        graph.flush();
        assert_eq!(graph.get(a), Some(&Value::Bool(false)));
        assert_eq!(graph.commits() - before, 1);
        assert_eq!(graph.pending(), 1);
    }

    #[rstest]
    fn budget_exhaustion_carries_writes_over() {
        let mut graph = CellGraph::new(2);
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        let c = number(&mut graph, "c");
        let d = number(&mut graph, "d");
        for (from, to) in [(a, b), (b, c), (c, d)] {
            graph.connect(from, to).expect("connect");
        }
        assert_eq!(graph.set(a, 5.0), 2);
        assert_eq!(graph.get(d), Some(&Value::Number(0.0)));
        assert_eq!(graph.pending(), 1);
        graph.flush();
        assert_eq!(graph.get(d), Some(&Value::Number(5.0)));
        assert_eq!(graph.pending(), 0);
    }

    #[rstest]
    fn diamond_settles_in_one_frame(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        let c = number(&mut graph, "c");
        graph.connect(a, b).expect("connect a->b");
        graph.connect(a, c).expect("connect a->c");
        graph.set(a, 1.5);
        assert_eq!(graph.get(b), Some(&Value::Number(1.5)));
        assert_eq!(graph.get(c), Some(&Value::Number(1.5)));
        assert_eq!(graph.pending(), 0);
    }

    #[rstest]
    fn non_finite_values_fault_and_stop(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        graph.connect(a, b).expect("connect");
        graph.set(a, f64::INFINITY);
        assert_eq!(graph.take_faults(), vec![(OWNER, a)]);
        assert_eq!(graph.get(b), Some(&Value::Number(0.0)));
    }

    #[rstest]
    fn destroy_is_idempotent_and_unlinks(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let b = number(&mut graph, "b");
        graph.connect(a, b).expect("connect");
        graph.subscribe(b, false, Box::new(|_, _, _| {}));
        graph.destroy(b);
        graph.destroy(b);
        assert!(graph.downstream(a).is_empty());
        assert_eq!(graph.live_subscriptions(), 0);
        graph.set(a, 9.0);
        assert_eq!(graph.get(b), None);
    }

    #[rstest]
    fn unsubscribe_removes_callback(mut graph: CellGraph) {
        let a = number(&mut graph, "a");
        let handle = graph
            .subscribe(a, false, Box::new(|_, _, _| {}))
            .expect("live cell");
        assert!(graph.unsubscribe(a, handle));
        assert!(!graph.unsubscribe(a, handle));
        assert_eq!(graph.subscriber_count(a), 0);
    }
}
