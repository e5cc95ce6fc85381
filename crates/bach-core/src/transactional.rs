//! Scoped undo records and checkpoints.
//!
//! Every stateful setter in the execution core applies its mutation eagerly
//! and pushes one undo action onto a [`Journal`]. A [`Checkpoint`] is the
//! journal depth at the time it was taken; reverting to it pops and undoes
//! everything pushed since, newest first. Committing a checkpoint does
//! nothing to the journal: the records stay for an enclosing checkpoint, or
//! until the top-level [`Journal::commit_all`].

/// An undo action applied once against a target
pub trait Revert<T: ?Sized> {
    /// Undo the recorded mutation
    fn revert(self, target: &mut T);
}

/// Boxed closure undo action, for targets without a dedicated action enum
pub type UndoFn<T> = Box<dyn FnOnce(&mut T) + Send>;

impl<T: ?Sized> Revert<T> for UndoFn<T> {
    fn revert(self, target: &mut T) {
        self(target)
    }
}

#[derive(Debug)]
enum Undo<A> {
    One(A),
    Many(Vec<A>),
}

/// Handle to one recorded mutation.
///
/// `commit` disarms the handle and keeps the mutation. `revert` runs the undo
/// action exactly once; later calls are no-ops.
#[derive(Debug)]
#[must_use = "an undo record does nothing unless committed or reverted"]
pub struct Transaction<A> {
    undo: Option<Undo<A>>,
}

impl<A> Transaction<A> {
    /// Record a single undo action
    pub fn new(action: A) -> Self {
        Self {
            undo: Some(Undo::One(action)),
        }
    }

    /// Keep the mutation
    pub fn commit(&mut self) {
        self.undo = None;
    }

    /// Whether the undo action is still armed
    pub fn is_pending(&self) -> bool {
        self.undo.is_some()
    }

    /// Undo the mutation if still armed
    pub fn revert<T: ?Sized>(&mut self, target: &mut T)
    where
        A: Revert<T>,
    {
        match self.undo.take() {
            Some(Undo::One(action)) => action.revert(target),
            Some(Undo::Many(actions)) => {
                for action in actions.into_iter().rev() {
                    action.revert(target);
                }
            }
            None => {}
        }
    }

    fn actions(&self) -> &[A] {
        match &self.undo {
            Some(Undo::One(action)) => std::slice::from_ref(action),
            Some(Undo::Many(actions)) => actions,
            None => &[],
        }
    }
}

/// Several undo actions that commit or revert together
#[derive(Debug)]
pub struct Group<A> {
    actions: Vec<A>,
}

impl<A> Default for Group<A> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<A> Group<A> {
    /// Empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the group
    pub fn push(&mut self, action: A) {
        self.actions.push(action);
    }

    /// Number of actions
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Keep every mutation in the group
    pub fn commit(self) {}

    /// Undo every mutation, newest first
    pub fn revert<T: ?Sized>(self, target: &mut T)
    where
        A: Revert<T>,
    {
        self.into_transaction().revert(target);
    }

    /// Turn the group into one journal record
    pub fn into_transaction(self) -> Transaction<A> {
        Transaction {
            undo: Some(Undo::Many(self.actions)),
        }
    }
}

/// Journal depth marker
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[must_use = "a checkpoint should be committed or reverted"]
pub struct Checkpoint {
    depth: usize,
}

impl Checkpoint {
    /// Journal depth when the checkpoint was taken
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Stack of undo records shared by one execution context
#[derive(Debug)]
pub struct Journal<A> {
    records: Vec<Transaction<A>>,
}

impl<A> Default for Journal<A> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<A> Journal<A> {
    /// Empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an undo action
    pub fn record(&mut self, action: A) {
        self.records.push(Transaction::new(action));
    }

    /// Push an existing record (a single action or a group)
    pub fn push(&mut self, transaction: Transaction<A>) {
        self.records.push(transaction);
    }

    /// Mark the current depth
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            depth: self.records.len(),
        }
    }

    /// Undo everything recorded after `checkpoint`, newest first
    pub fn revert_to<T: ?Sized>(&mut self, checkpoint: Checkpoint, target: &mut T)
    where
        A: Revert<T>,
    {
        while self.records.len() > checkpoint.depth {
            if let Some(mut record) = self.records.pop() {
                record.revert(target);
            }
        }
    }

    /// Forget every record, keeping all mutations
    pub fn commit_all(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Undo every record, newest first
    pub fn revert_all<T: ?Sized>(&mut self, target: &mut T)
    where
        A: Revert<T>,
    {
        self.revert_to(Checkpoint { depth: 0 }, target);
    }

    /// Pending undo actions, oldest first
    pub fn records(&self) -> impl Iterator<Item = &A> {
        self.records.iter().flat_map(|record| record.actions().iter())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the journal is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Restores a value on drop unless committed.
///
/// ```
/// use bach_core::transactional::Guard;
///
/// let mut depth = 3;
/// {
///     let mut guard = Guard::new(&mut depth);
///     *guard += 1;
///     assert_eq!(*guard, 4);
/// }
/// assert_eq!(depth, 3);
/// ```
pub struct Guard<'a, T: Clone> {
    target: &'a mut T,
    saved: Option<T>,
}

impl<'a, T: Clone> Guard<'a, T> {
    /// Snapshot `target`
    pub fn new(target: &'a mut T) -> Self {
        let saved = Some(target.clone());
        Self { target, saved }
    }

    /// Keep the current value
    pub fn commit(mut self) {
        self.saved = None;
    }
}

impl<T: Clone> std::ops::Deref for Guard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: Clone> std::ops::DerefMut for Guard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: Clone> Drop for Guard<'_, T> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.target = saved;
        }
    }
}
