/// Number of session slots, addressed by the digits `0` to `9`.
pub const MAX_SESSIONS: usize = 10;

/// Every slot is occupied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("all {} session slots are in use", MAX_SESSIONS)]
pub struct TableFull;

/// Fixed-capacity registry of live sessions.
///
/// Slots are handed out lowest-first. A parallel activity flag per slot
/// records whether the slot currently hosts a live session; it is what the
/// help screen reports.
pub struct SessionTable<S> {
    slots: [Option<S>; MAX_SESSIONS],
    activity: [bool; MAX_SESSIONS],
}

impl<S> SessionTable<S> {
    /// Create a new, empty table.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            activity: [false; MAX_SESSIONS],
        }
    }

    /// Store `handle` in the lowest free slot and return that slot.
    pub fn assign(&mut self, handle: S) -> Result<usize, TableFull> {
        let index = self.next_free().ok_or(TableFull)?;
        self.slots[index] = Some(handle);
        self.activity[index] = true;
        Ok(index)
    }

    /// The slot the next [`assign`](Self::assign) would use.
    pub fn next_free(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// The session in slot `index`, if any.
    pub fn get(&self, index: usize) -> Option<&S> {
        self.slots.get(index)?.as_ref()
    }

    /// Mutable access to the session in slot `index`, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut S> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Free slot `index`, handing back whatever it held.
    ///
    /// Removing an empty or out-of-range slot changes nothing.
    pub fn remove(&mut self, index: usize) -> Option<S> {
        let handle = self.slots.get_mut(index)?.take()?;
        self.activity[index] = false;
        Some(handle)
    }

    /// Whether slot `index` hosts a live session. `false` when out of range.
    pub fn activity(&self, index: usize) -> bool {
        self.activity.get(index).copied().unwrap_or(false)
    }

    /// Activity flags of all slots, indexed by slot.
    pub fn activities(&self) -> [bool; MAX_SESSIONS] {
        self.activity
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`assign`](Self::assign) would fail.
    pub fn is_full(&self) -> bool {
        self.next_free().is_none()
    }

    /// Occupied slot indices in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| i))
    }

    /// Lowest occupied slot.
    pub fn first_occupied(&self) -> Option<usize> {
        self.occupied().next()
    }

    /// Empty the table, returning every handle in slot order.
    pub fn drain_all(&mut self) -> Vec<(usize, S)> {
        (0..MAX_SESSIONS)
            .filter_map(|i| self.remove(i).map(|s| (i, s)))
            .collect()
    }
}

impl<S> Default for SessionTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
