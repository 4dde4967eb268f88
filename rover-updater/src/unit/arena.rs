use super::UpdateUnit;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Opaque handle to an update unit. A handle outlives its unit harmlessly:
/// once the slot is released, lookups through the old handle find nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitHandle {
    index: u32,
    generation: u32,
}

impl UnitHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Debug for UnitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitHandle({}v{})", self.index, self.generation)
    }
}

pub type SharedUnit = Rc<RefCell<UpdateUnit>>;

struct Slot {
    generation: u32,
    unit: Option<SharedUnit>,
}

/// Generational storage for update units
#[derive(Default)]
pub struct UnitArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl UnitArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: UpdateUnit) -> UnitHandle {
        let unit = Rc::new(RefCell::new(unit));
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.unit = Some(unit);
            UnitHandle::new(idx, slot.generation)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                unit: Some(unit),
            });
            UnitHandle::new(idx, 0)
        }
    }

    pub fn get(&self, handle: UnitHandle) -> Option<SharedUnit> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.unit.clone()
    }

    /// Free the slot; every outstanding handle to it goes stale.
    pub fn release(&mut self, handle: UnitHandle) -> Option<SharedUnit> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let unit = slot.unit.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        Some(unit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitHandle, &SharedUnit)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.unit
                .as_ref()
                .map(|unit| (UnitHandle::new(idx as u32, slot.generation), unit))
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.unit.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
