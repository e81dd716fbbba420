use crate::ecs::ComponentId;
use std::fmt;

/// Maximum number of component types a single registry can index.
pub const MAX_COMPONENTS: usize = 256;

const WORDS: usize = MAX_COMPONENTS / 64;

/// Fixed-width bitset with one bit per component type.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature([u64; WORDS]);

impl Signature {
    pub const fn empty() -> Self {
        Self([0; WORDS])
    }

    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let mut signature = Self::empty();
        for id in ids {
            signature.set(id);
        }
        signature
    }

    #[inline]
    pub fn set(&mut self, id: ComponentId) {
        let (word, bit) = Self::locate(id);
        self.0[word] |= 1 << bit;
    }

    #[inline]
    pub fn clear(&mut self, id: ComponentId) {
        let (word, bit) = Self::locate(id);
        self.0[word] &= !(1 << bit);
    }

    #[inline]
    pub fn test(&self, id: ComponentId) -> bool {
        let (word, bit) = Self::locate(id);
        self.0[word] & (1 << bit) != 0
    }

    /// True when every bit of `required` is also set here.
    pub fn contains(&self, required: &Signature) -> bool {
        self.0
            .iter()
            .zip(required.0.iter())
            .all(|(have, need)| have & need == *need)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    pub fn count(&self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        (0..MAX_COMPONENTS as ComponentId).filter(move |id| self.test(*id))
    }

    fn locate(id: ComponentId) -> (usize, u32) {
        debug_assert!((id as usize) < MAX_COMPONENTS, "component id {id} out of range");
        ((id as usize / 64) % WORDS, id % 64)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_and_superset() {
        let mut sig = Signature::empty();
        sig.set(0);
        sig.set(65);
        sig.set(255);
        assert!(sig.test(65));
        assert_eq!(sig.count(), 3);

        let required = Signature::from_ids([0, 255]);
        assert!(sig.contains(&required));
        assert!(!required.contains(&sig));

        sig.clear(255);
        assert!(!sig.contains(&required));
        assert_eq!(sig.ids().collect::<Vec<_>>(), vec![0, 65]);
    }

    #[test]
    fn empty_requirement_matches_everything() {
        assert!(Signature::empty().contains(&Signature::empty()));
        assert!(Signature::from_ids([4]).contains(&Signature::empty()));
    }
}
