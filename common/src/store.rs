use std::{
    cmp::{Eq, Ord, PartialEq, PartialOrd},
    fmt, hash,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// Type-safe index into a [`Store`].
pub struct Id<T> {
    idx: u32,
    phantom: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn id(&self) -> u64 { self.idx as u64 }
}

impl<T> Copy for Id<T> {}
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self { *self }
}
impl<T> Eq for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool { self.idx == other.idx }
}
impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.idx.cmp(&other.idx) }
}
impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}
impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Id<{}>({})", std::any::type_name::<T>(), self.idx)
    }
}
impl<T> hash::Hash for Id<T> {
    fn hash<H: hash::Hasher>(&self, h: &mut H) { self.idx.hash(h); }
}

/// Append-only arena. Ids handed out by a store stay valid for its lifetime.
#[derive(Clone, Debug)]
pub struct Store<T> {
    items: Vec<T>,
}

impl<T> Default for Store<T> {
    fn default() -> Self { Self { items: Vec::new() } }
}

impl<T> Store<T> {
    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn get(&self, id: Id<T>) -> &T {
        // NOTE: Ids are only ever created by `insert`, so this can't be out of bounds
        &self.items[id.idx as usize]
    }

    pub fn get_mut(&mut self, id: Id<T>) -> &mut T { &mut self.items[id.idx as usize] }

    pub fn ids(&self) -> impl Iterator<Item = Id<T>> {
        (0..self.items.len()).map(|i| Id {
            idx: i as u32,
            phantom: PhantomData,
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> { self.items.iter() }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> { self.ids().zip(self.values()) }

    pub fn insert(&mut self, item: T) -> Id<T> {
        let id = Id {
            idx: self.items.len() as u32,
            phantom: PhantomData,
        };
        self.items.push(item);
        id
    }
}

impl<T> Index<Id<T>> for Store<T> {
    type Output = T;

    fn index(&self, id: Id<T>) -> &Self::Output { self.get(id) }
}

impl<T> IndexMut<Id<T>> for Store<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut Self::Output { self.get_mut(id) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable() {
        let mut store = Store::default();
        let a = store.insert("a");
        let b = store.insert("b");
        assert_ne!(a, b);
        assert_eq!(store[a], "a");
        assert_eq!(store[b], "b");
        assert_eq!(store.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![a, b]);
    }
}
