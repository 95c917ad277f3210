//! The seam between staging logic and the external task-execution engine.
//!
//! The engine owns scheduling. Each tick it hands the active [`Task`] a
//! [`TickContext`] and executes whatever [`SubTask`] comes back, or re-polls
//! immediately if nothing does. The engine also reports, through
//! [`SubTaskStatus`], what happened to the sub-task returned last time.
//!
//! Process-wide side effects a task installs while running (protection of
//! its containers from destructive sub-tasks, for example) go through the
//! [`Behaviour`] stack and must be popped again in [`Task::on_stop`].

use std::any::Any;
use std::collections::BTreeSet;

use quartermaster_types::{BlockPos, MaterialId, SubTask, SubTaskStatus};
use quartermaster_world::{InventoryView, WorldView};

// ---------------------------------------------------------------------------
// Behaviour stack
// ---------------------------------------------------------------------------

/// Process-wide behaviour settings, pushed and popped by tasks.
pub trait Behaviour {
    /// Open a new frame owned by `owner`.
    fn push(&mut self, owner: &str);

    /// Close the top frame. Returns `false` if the stack was empty.
    fn pop(&mut self) -> bool;

    /// Protect `positions` from destructive sub-tasks in the top frame.
    fn protect_positions(&mut self, positions: &[BlockPos]);

    /// Keep `items` from being thrown away or consumed in the top frame.
    fn protect_items(&mut self, items: &[MaterialId]);

    /// Whether any open frame protects `pos`.
    fn is_position_protected(&self, pos: BlockPos) -> bool;

    /// Whether any open frame protects `item`.
    fn is_item_protected(&self, item: &MaterialId) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Frame {
    owner: String,
    positions: BTreeSet<BlockPos>,
    items: BTreeSet<MaterialId>,
}

/// The default [`Behaviour`] implementation: a plain stack of frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BehaviourStack {
    frames: Vec<Frame>,
}

impl BehaviourStack {
    /// An empty stack.
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Owner of the top frame.
    pub fn top_owner(&self) -> Option<&str> {
        self.frames.last().map(|f| f.owner.as_str())
    }
}

impl Behaviour for BehaviourStack {
    fn push(&mut self, owner: &str) {
        self.frames.push(Frame {
            owner: owner.to_owned(),
            ..Frame::default()
        });
    }

    fn pop(&mut self) -> bool {
        self.frames.pop().is_some()
    }

    fn protect_positions(&mut self, positions: &[BlockPos]) {
        match self.frames.last_mut() {
            Some(frame) => frame.positions.extend(positions.iter().copied()),
            None => tracing::warn!("Position protection requested with no behaviour frame open"),
        }
    }

    fn protect_items(&mut self, items: &[MaterialId]) {
        match self.frames.last_mut() {
            Some(frame) => frame.items.extend(items.iter().cloned()),
            None => tracing::warn!("Item protection requested with no behaviour frame open"),
        }
    }

    fn is_position_protected(&self, pos: BlockPos) -> bool {
        self.frames.iter().any(|f| f.positions.contains(&pos))
    }

    fn is_item_protected(&self, item: &MaterialId) -> bool {
        self.frames.iter().any(|f| f.items.contains(item))
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Everything a task may look at or touch during one tick.
pub struct TickContext<'a> {
    /// The engine's tick counter.
    pub tick: u64,
    /// The agent's inventory and vitals.
    pub inventory: &'a dyn InventoryView,
    /// The world around the agent.
    pub world: &'a dyn WorldView,
    /// Process-wide behaviour settings.
    pub behaviour: &'a mut dyn Behaviour,
    /// What happened to the sub-task returned on the previous tick.
    pub status: SubTaskStatus,
}

/// A long-running, interruptible unit of agent work.
pub trait Task {
    /// Called once when the engine starts (or restarts) the task.
    fn on_start(&mut self, behaviour: &mut dyn Behaviour);

    /// Advance the task. `None` asks the engine to poll again immediately.
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Option<SubTask>;

    /// Called when the task finishes or is interrupted. Must undo every
    /// behaviour frame pushed in [`Task::on_start`].
    fn on_stop(&mut self, behaviour: &mut dyn Behaviour);

    /// Whether the task has reached its terminal state.
    fn is_finished(&self) -> bool;

    /// Whether `other` is the same task for de-duplication purposes.
    fn is_equal(&self, other: &dyn Task) -> bool;

    /// One-line human-readable state.
    fn debug_label(&self) -> String;

    /// Downcasting support for [`Task::is_equal`].
    fn as_any(&self) -> &dyn Any;
}
