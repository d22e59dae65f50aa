//! Slot arena with free-list reuse
//!
//! Insertion and removal are O(1). A removed slot's index goes on the free
//! list and is handed out again by the next insert, so indices stay dense.

/// Index of an occupied arena slot
pub type SlotIndex = u32;

#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free_list: Vec<SlotIndex>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> SlotIndex {
        if let Some(index) = self.free_list.pop() {
            // Free-listed slots are always empty
            self.slots[index as usize] = Some(value);
            index
        } else {
            let index = self.slots.len() as SlotIndex;
            self.slots.push(Some(value));
            index
        }
    }

    pub fn remove(&mut self, index: SlotIndex) -> Option<T> {
        let value = self.slots.get_mut(index as usize)?.take()?;
        self.free_list.push(index);
        Some(value)
    }

    #[inline]
    pub fn get(&self, index: SlotIndex) -> Option<&T> {
        self.slots.get(index as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, index: SlotIndex) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    pub fn contains(&self, index: SlotIndex) -> bool {
        self.get(index).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupied slots in index order
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i as SlotIndex, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotIndex, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (i as SlotIndex, v)))
    }
}
