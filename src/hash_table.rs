//! A raw separate-chaining hash table.
//!
//! [`HashTable`] stores values in a prime-length array of buckets, each bucket
//! a chain of `(hash, value)` pairs. Callers supply the hash and an equality
//! predicate for every operation; [`HashMap`](crate::HashMap) builds the keyed
//! interface on top of this.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::marker::PhantomData;

use crate::prime::DEFAULT_CAPACITY;
use crate::prime::MAX_PRIME;
use crate::prime::prime_below;

/// A collision chain. The stored hash is the full 64-bit hash of the entry, so
/// redistribution on rehash never needs the hasher.
type Chain<V> = Vec<(u64, V)>;

/// Statistics about bucket and chain usage.
///
/// Available with the `stats` feature (and always under `cfg(test)`).
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct TableStats {
    /// Number of entries currently stored
    pub populated: usize,
    /// Length of the bucket array
    pub bucket_count: usize,
    /// Capacity value the next rehash doubles
    pub target_capacity: usize,
    /// Buckets with an empty chain
    pub empty_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// `populated / bucket_count`
    pub load_factor: f64,
    /// `histogram[n]` is the number of buckets whose chain holds `n` entries.
    pub chain_histogram: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl TableStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Chained Table Statistics ===");
        println!(
            "Population: {}/{} buckets ({:.2}% load factor)",
            self.populated,
            self.bucket_count,
            self.load_factor * 100.0
        );
        println!("Target capacity: {}", self.target_capacity);
        println!(
            "Empty buckets: {} ({:.02}%)",
            self.empty_buckets,
            if self.bucket_count == 0 {
                0.0
            } else {
                (self.empty_buckets as f64 / self.bucket_count as f64) * 100.0
            }
        );
        println!("Longest chain: {}", self.longest_chain);
        for (len, &count) in self.chain_histogram.iter().enumerate() {
            if count != 0 {
                println!("{:>3} | {}", len, count);
            }
        }
    }
}

/// A hash table using separate chaining over a prime-sized bucket array.
///
/// `HashTable<V>` stores values of type `V`. Like a raw table, it requires
/// you to provide both the hash value and an equality predicate for each
/// operation. The bucket for a hash is `hash % bucket_count()`.
///
/// The table grows only when an insertion finds it holding exactly
/// `bucket_count()` entries: the target capacity doubles (capped at
/// [`MAX_PRIME`]), the bucket array is reallocated at the largest prime not
/// above it, and every entry is moved into its new bucket.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use prime_chain::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::with_capacity(100);
/// assert_eq!(table.bucket_count(), 97);
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     prime_chain::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     prime_chain::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    buckets: Vec<Chain<V>>,
    populated: usize,
    target_capacity: usize,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field(
                "chains",
                &self
                    .buckets
                    .iter()
                    .map(|chain| chain.len())
                    .collect::<Vec<_>>(),
            )
            .field("populated", &self.populated)
            .field("bucket_count", &self.buckets.len())
            .field("target_capacity", &self.target_capacity)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<V> HashTable<V> {
    /// Creates a new hash table sized for `capacity`.
    ///
    /// The bucket array length is the largest prime not above `capacity`. If
    /// `capacity` is outside `(1, MAX_PRIME]`, [`DEFAULT_CAPACITY`] is used
    /// instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.bucket_count(), 97);
    ///
    /// // Out of range requests fall back to the default of 101.
    /// let table: HashTable<String> = HashTable::with_capacity(0);
    /// assert_eq!(table.bucket_count(), 101);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let target_capacity = if capacity > 1 && capacity <= MAX_PRIME {
            capacity
        } else {
            log::debug!(
                "requested capacity {capacity} outside (1, {MAX_PRIME}], using {DEFAULT_CAPACITY}"
            );
            DEFAULT_CAPACITY
        };

        let bucket_count = prime_below(target_capacity);
        debug_assert!(bucket_count >= 2);

        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Vec::new);

        Self {
            buckets,
            populated: 0,
            target_capacity,
        }
    }

    /// Returns an iterator over all values, in bucket order and then chain
    /// order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(11);
    /// table.entry(3, |&v: &u64| v == 30).or_insert(30);
    /// table.entry(1, |&v: &u64| v == 10).or_insert(10);
    ///
    /// let values: Vec<_> = table.iter().copied().collect();
    /// assert_eq!(values, vec![10, 30]);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: Default::default(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over the buckets. Each item iterates one bucket's
    /// chain in storage order; empty buckets yield empty chains.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(5);
    /// table.entry(7, |&v: &u64| v == 7).or_insert(7);
    /// table.entry(2, |&v: &u64| v == 2).or_insert(2);
    ///
    /// let lens: Vec<_> = table.buckets().map(|chain| chain.len()).collect();
    /// assert_eq!(lens, vec![0, 0, 2, 0, 0]);
    /// ```
    pub fn buckets(&self) -> Buckets<'_, V> {
        Buckets {
            inner: self.buckets.iter(),
        }
    }

    /// Removes all values from the table and returns them as an iterator.
    ///
    /// The bucket array keeps its length. Values not consumed by the iterator
    /// are dropped when it is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(11);
    /// table.entry(1, |&v: &u64| v == 1).or_insert(1);
    /// table.entry(2, |&v: &u64| v == 2).or_insert(2);
    ///
    /// let mut drained: Vec<_> = table.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, vec![1, 2]);
    /// assert!(table.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        let remaining = core::mem::replace(&mut self.populated, 0);
        let empty = (0..self.buckets.len()).map(|_| Vec::new()).collect();
        let buckets = core::mem::replace(&mut self.buckets, empty);
        Drain {
            buckets: buckets.into_iter(),
            chain: Default::default(),
            remaining,
            _table: PhantomData,
        }
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// assert_eq!(table.len(), 0);
    ///
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the length of the bucket array. Always prime.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the capacity value the next rehash will double.
    pub fn target_capacity(&self) -> usize {
        self.target_capacity
    }

    /// Removes all elements from the table.
    ///
    /// The bucket array keeps its length; the table never shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// table.entry(2, |&n: &u64| n == 2).or_insert(2);
    /// let buckets = table.bucket_count();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.bucket_count(), buckets);
    /// ```
    pub fn clear(&mut self) {
        for chain in &mut self.buckets {
            chain.clear();
        }
        self.populated = 0;
    }

    /// Removes and returns a value from the table.
    ///
    /// The value is identified by its hash and an equality predicate. The
    /// first match in the chain is removed; chain order of the remaining
    /// values is preserved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(99, |&n| n == 99), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.populated == 0 {
            return None;
        }

        let bucket = self.bucket_index(hash);
        let chain = &mut self.buckets[bucket];
        let index = chain.iter().position(|(_, v)| eq(v))?;

        self.populated -= 1;
        Some(chain.remove(index).1)
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If the table already holds exactly `bucket_count()` values, it is
    /// rehashed first, whether or not the entry turns out to be occupied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::Entry;
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    ///
    /// match table.entry(7, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         *entry.get_mut() = "updated".to_string();
    ///     }
    /// }
    ///
    /// table
    ///     .entry(7, |s: &String| s == "hello")
    ///     .or_insert("ignored".to_string());
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        self.maybe_rehash();

        let bucket = self.bucket_index(hash);
        match self.buckets[bucket].iter().position(|(_, v)| eq(v)) {
            Some(index) => Entry::Occupied(OccupiedEntry {
                table: self,
                bucket,
                index,
            }),
            None => Entry::Vacant(VacantEntry {
                table: self,
                hash,
                bucket,
            }),
        }
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(42, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(99, |&n| n == 99), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        if self.populated == 0 {
            return None;
        }

        self.buckets[self.bucket_index(hash)]
            .iter()
            .map(|(_, v)| v)
            .find(|v| eq(v))
    }

    /// Finds a value in the table by hash and equality predicate, returning a
    /// mutable reference.
    ///
    /// The predicate must keep matching the same logical key; mutating the
    /// parts of a value that feed its hash breaks lookup.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use prime_chain::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(1, |v: &(u64, u64)| v.0 == 1).or_insert((1, 10));
    ///
    /// if let Some(v) = table.find_mut(1, |v| v.0 == 1) {
    ///     v.1 = 100;
    /// }
    /// assert_eq!(table.find(1, |v| v.0 == 1), Some(&(1, 100)));
    /// ```
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        if self.populated == 0 {
            return None;
        }

        let bucket = self.bucket_index(hash);
        self.buckets[bucket]
            .iter_mut()
            .map(|(_, v)| v)
            .find(|v| eq(v))
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    #[inline]
    fn maybe_rehash(&mut self) {
        if self.populated == self.buckets.len() {
            self.rehash();
        }
    }

    #[cold]
    fn rehash(&mut self) {
        let target = self.target_capacity.saturating_mul(2).min(MAX_PRIME);
        let bucket_count = prime_below(target);
        if bucket_count <= self.buckets.len() {
            log::debug!(
                "bucket array already at {} buckets, chains will grow instead",
                self.buckets.len()
            );
            self.target_capacity = target;
            return;
        }

        log::debug!(
            "rehashing {} entries: {} -> {} buckets",
            self.populated,
            self.buckets.len(),
            bucket_count
        );

        let mut buckets: Vec<Chain<V>> = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, Vec::new);

        for chain in core::mem::take(&mut self.buckets) {
            for (hash, value) in chain {
                buckets[(hash % bucket_count as u64) as usize].push((hash, value));
            }
        }

        self.buckets = buckets;
        self.target_capacity = target;
    }

    /// Returns bucket and chain statistics for the current table state.
    ///
    /// Requires the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn stats(&self) -> TableStats {
        let longest_chain = self.buckets.iter().map(Vec::len).max().unwrap_or(0);
        let mut chain_histogram = alloc::vec![0usize; longest_chain + 1];
        for chain in &self.buckets {
            chain_histogram[chain.len()] += 1;
        }

        TableStats {
            populated: self.populated,
            bucket_count: self.buckets.len(),
            target_capacity: self.target_capacity,
            empty_buckets: chain_histogram[0],
            longest_chain,
            load_factor: self.populated as f64 / self.buckets.len() as f64,
            chain_histogram,
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let mut total = 0;
        for (index, chain) in self.buckets.iter().enumerate() {
            for (hash, _) in chain {
                assert_eq!(
                    self.bucket_index(*hash),
                    index,
                    "entry with hash {hash:#018x} stored in wrong bucket"
                );
            }
            total += chain.len();
        }
        assert_eq!(total, self.populated);
        assert!(crate::prime::try_prime_below(self.buckets.len()) == Ok(self.buckets.len()));
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - no matching value is in the table
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is in the table
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to an occupied entry's value. Returns the mutable reference
    /// for occupied entries and `None` for vacant ones.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
    bucket: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Appends `value` to the end of the bucket's chain and returns a mutable
    /// reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        table.populated += 1;

        let chain = &mut table.buckets[self.bucket];
        chain.push((self.hash, value));

        let last = chain.len() - 1;
        &mut chain[last].1
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    bucket: usize,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.table.buckets[self.bucket][self.index].1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.table.buckets[self.bucket][self.index].1
    }

    /// Converts the entry into a mutable reference to its value.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        &mut table.buckets[self.bucket][self.index].1
    }

    /// Replaces the value in place, keeping its chain position, and returns
    /// the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from its chain and returns its value.
    pub fn remove(self) -> V {
        self.table.populated -= 1;
        self.table.buckets[self.bucket].remove(self.index).1
    }
}

/// An iterator over the values of a [`HashTable`], in bucket order.
pub struct Iter<'a, V> {
    buckets: core::slice::Iter<'a, Chain<V>>,
    chain: core::slice::Iter<'a, (u64, V)>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, value)) = self.chain.next() {
                self.remaining -= 1;
                return Some(value);
            }
            self.chain = self.buckets.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// An iterator over the buckets of a [`HashTable`].
pub struct Buckets<'a, V> {
    inner: core::slice::Iter<'a, Chain<V>>,
}

impl<'a, V> Iterator for Buckets<'a, V> {
    type Item = ChainIter<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|chain| ChainIter {
            inner: chain.iter(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Buckets<'_, V> {}

/// An iterator over one bucket's chain, in storage order.
pub struct ChainIter<'a, V> {
    inner: core::slice::Iter<'a, (u64, V)>,
}

impl<'a, V> Iterator for ChainIter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for ChainIter<'_, V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// The table is emptied when the drain is created. Values not yet yielded
/// are dropped with the drain.
pub struct Drain<'a, V> {
    buckets: alloc::vec::IntoIter<Chain<V>>,
    chain: alloc::vec::IntoIter<(u64, V)>,
    remaining: usize,
    _table: PhantomData<&'a mut HashTable<V>>,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, value)) = self.chain.next() {
                self.remaining -= 1;
                return Some(value);
            }
            self.chain = self.buckets.next()?.into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert_item(table: &mut HashTable<Item>, hash: u64, key: u64, value: i32) {
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(_) => panic!("unexpected occupied for {key}: {:#?}", table),
        }
    }

    #[test]
    fn capacity_fallback() {
        for capacity in [0, 1, MAX_PRIME + 1, usize::MAX] {
            let table: HashTable<Item> = HashTable::with_capacity(capacity);
            assert_eq!(table.bucket_count(), 101);
            assert_eq!(table.target_capacity(), DEFAULT_CAPACITY);
        }

        let table: HashTable<Item> = HashTable::with_capacity(2);
        assert_eq!(table.bucket_count(), 2);

        let table: HashTable<Item> = HashTable::with_capacity(MAX_PRIME);
        assert_eq!(table.bucket_count(), MAX_PRIME);

        let table: HashTable<Item> = HashTable::default();
        assert_eq!(table.bucket_count(), 101);
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, (k as i32) * 2);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }
        assert_eq!(table.len(), 32);
        table.check_invariants();

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        let k = 42u64;
        let hash = hash_key(&state, k);

        insert_item(&mut table, hash, k, 7);

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev = occ.insert(Item { key: k, value: 11 });
                assert_eq!(prev.value, 7);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, 11);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 0..5u64 {
            insert_item(&mut table, hash_key(&state, k), k, 1);
        }

        for k in 0..5u64 {
            if let Some(v) = table.find_mut(hash_key(&state, k), |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let v = table.find(hash_key(&state, k), |v| v.key == k).unwrap();
            assert_eq!(v.value, 10);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 0..8u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }
        assert_eq!(table.len(), 8);
        for k in [0u64, 3, 7] {
            let removed = table
                .remove(hash_key(&state, k), |v| v.key == k)
                .expect("should remove");
            assert_eq!(removed.key, k);
        }
        assert_eq!(table.len(), 5);
        table.check_invariants();

        assert!(table.remove(hash_key(&state, 1000), |v| v.key == 1000).is_none());
        assert!(table.remove(hash_key(&state, 3), |v| v.key == 3).is_none());
    }

    #[test]
    fn rehash_triggers_at_full_load() {
        let mut table: HashTable<u64> = HashTable::with_capacity(5);
        assert_eq!(table.bucket_count(), 5);

        for k in 0..5u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        assert_eq!(table.bucket_count(), 5);

        // The sixth entry call sees len == bucket_count.
        table.entry(5, |&v| v == 5).or_insert(5);
        assert_eq!(table.target_capacity(), 10);
        assert_eq!(table.bucket_count(), 7);
        table.check_invariants();
    }

    #[test]
    fn occupied_lookup_at_full_load_still_rehashes() {
        let mut table: HashTable<u64> = HashTable::with_capacity(3);
        for k in 0..3u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        assert!(matches!(table.entry(1, |&v| v == 1), Entry::Occupied(_)));
        assert_eq!(table.bucket_count(), 5);
        assert_eq!(table.len(), 3);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many_survives_rehashes() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        let mut rehashes = 0;
        let mut buckets = table.bucket_count();
        for k in 0..20000u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
            if table.bucket_count() != buckets {
                rehashes += 1;
                buckets = table.bucket_count();
            }
        }

        assert!(rehashes >= 3, "only {rehashes} rehashes");
        assert_eq!(table.len(), 20000);
        table.check_invariants();
        for k in 0..20000u64 {
            assert_eq!(
                table.find(hash_key(&state, k), |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                })
            );
        }
    }

    #[test]
    fn explicit_collision() {
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        let hash = 0;
        for k in 0..65u64 {
            insert_item(&mut table, hash, k, k as i32);
        }

        assert_eq!(table.len(), 65);
        assert_eq!(table.stats().longest_chain, 65);
        for k in 0..65u64 {
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                }),
            );
        }

        // Chain order is insertion order, and removal keeps it.
        assert!(table.remove(hash, |v| v.key == 10).is_some());
        let order: Vec<u64> = table.iter().map(|v| v.key).take(12).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 12]);
    }

    #[test]
    fn ceiling_stops_growth() {
        let mut table: HashTable<u64> = HashTable::with_capacity(MAX_PRIME);
        table.target_capacity = MAX_PRIME;
        table.populated = table.bucket_count();
        table.rehash();
        assert_eq!(table.bucket_count(), MAX_PRIME);
        assert_eq!(table.target_capacity(), MAX_PRIME);
    }

    #[test]
    fn iter_buckets_and_drain() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::with_capacity(0);
        for k in 10..20u64 {
            insert_item(&mut table, hash_key(&state, k), k, (k as i32) + 1);
        }
        let collected: Vec<u64> = table.iter().map(|v| v.key).collect();
        assert_eq!(collected.len(), 10, "{:#?}", table);
        assert_eq!(table.iter().len(), 10);
        for k in 10..20u64 {
            assert!(collected.contains(&k));
        }

        let by_bucket: Vec<u64> = table.buckets().flatten().map(|v| v.key).collect();
        assert_eq!(by_bucket, collected);
        assert_eq!(table.buckets().len(), table.bucket_count());

        let drained: Vec<Item> = table.drain().collect();
        assert_eq!(drained.len(), 10);
        assert_eq!(table.len(), 0);
        table.check_invariants();

        for k in 10..20u64 {
            assert!(table.find(hash_key(&state, k), |v| v.key == k).is_none());
        }
    }

    #[test]
    fn partial_drain_empties_table() {
        let mut table: HashTable<u64> = HashTable::with_capacity(11);
        for k in 0..8u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        let first: Vec<u64> = table.drain().take(3).collect();
        assert_eq!(first.len(), 3);
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
        table.check_invariants();
    }

    #[test]
    fn forgotten_drain_leaves_table_consistent() {
        let mut table: HashTable<u64> = HashTable::with_capacity(5);
        for k in 0..5u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        let buckets = table.bucket_count();

        let mut drain = table.drain();
        assert_eq!(drain.next().map(|_| ()), Some(()));
        core::mem::forget(drain);

        assert_eq!(table.len(), 0);
        assert_eq!(table.iter().count(), 0);
        assert_eq!(table.buckets().flatten().count(), table.len());
        assert_eq!(table.bucket_count(), buckets);
        table.check_invariants();

        table.entry(100, |&v| v == 100).or_insert(100);
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().count(), 1);
        assert_eq!(table.find(100, |&v| v == 100), Some(&100));
        assert!(table.find(3, |&v| v == 3).is_none());
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct StringItem {
        key: String,
        value: i32,
    }

    fn hash_string_key(state: &HashState, key: &str) -> u64 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish()
    }

    #[test]
    fn string_keys() {
        let state = HashState::default();
        let mut table: HashTable<StringItem> = HashTable::with_capacity(0);
        let keys = ["hello", "world", "foo", "bar", "baz"];

        for (i, k) in keys.iter().enumerate() {
            let hash = hash_string_key(&state, k);
            table
                .entry(hash, |v: &StringItem| v.key == *k)
                .or_insert_with(|| StringItem {
                    key: k.to_string(),
                    value: i as i32,
                });
        }

        assert_eq!(table.len(), keys.len());
        let hash_c = hash_string_key(&state, "foo");
        let removed = table.remove(hash_c, |v| v.key == "foo").unwrap();
        assert_eq!(removed.value, 2);
        assert_eq!(table.len(), 4);
        assert!(table.find(hash_c, |v| v.key == "foo").is_none());
    }

    #[test]
    fn entry_and_modify() {
        let mut table: HashTable<(u64, u64)> = HashTable::with_capacity(7);
        assert!(table.entry(1, |v| v.0 == 1).and_modify(|v| v.1 += 1).is_none());

        table.entry(1, |v| v.0 == 1).or_insert((1, 1));
        let value = table.entry(1, |v| v.0 == 1).and_modify(|v| v.1 += 1);
        assert_eq!(value, Some(&mut (1, 2)));

        match table.entry(1, |v| v.0 == 1) {
            Entry::Occupied(occ) => assert_eq!(occ.remove(), (1, 2)),
            Entry::Vacant(_) => panic!("expected occupied"),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut original: HashTable<Item> = HashTable::with_capacity(10);
        for k in 0..30u64 {
            insert_item(&mut original, hash_key(&state, k), k, k as i32);
        }

        let cloned = original.clone();
        assert_eq!(cloned.len(), 30);
        assert_eq!(cloned.bucket_count(), original.bucket_count());

        let hash = hash_key(&state, 3);
        original.find_mut(hash, |v| v.key == 3).unwrap().value = 999;
        assert_eq!(original.find(hash, |v| v.key == 3).unwrap().value, 999);
        assert_eq!(cloned.find(hash, |v| v.key == 3).unwrap().value, 3);
    }

    #[test]
    fn stats_report_chains() {
        let mut table: HashTable<u64> = HashTable::with_capacity(7);
        for k in [0u64, 7, 14, 1] {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        let stats = table.stats();
        assert_eq!(stats.populated, 4);
        assert_eq!(stats.bucket_count, 7);
        assert_eq!(stats.longest_chain, 3);
        assert_eq!(stats.empty_buckets, 5);
        assert_eq!(stats.chain_histogram, vec![5, 1, 0, 1]);
        assert!((stats.load_factor - 4.0 / 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clear_keeps_buckets() {
        let mut table: HashTable<u64> = HashTable::with_capacity(3);
        for k in 0..20u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        let buckets = table.bucket_count();
        assert!(buckets > 3);

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.bucket_count(), buckets);
        assert!(table.find(4, |&v| v == 4).is_none());
        table.check_invariants();
    }
}
