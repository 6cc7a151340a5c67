use core::borrow::Borrow;
use core::fmt::Debug;
use core::fmt::Display;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;
use crate::prime::DEFAULT_CAPACITY;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used when none is given.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used when none is given.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        compile_error!("enable the `foldhash` or `std` feature to get a default hasher");
    }
}

/// A key-value map backed by the separate-chaining [`HashTable`].
///
/// `HashMap<K, V, S>` keeps at most one entry per key and hashes keys with the
/// hasher builder `S`. Every operation reports its outcome as a `bool`:
/// inserting a pair that is already stored, or removing an absent key, is a
/// normal `false` rather than an error.
///
/// # Examples
///
/// ```rust
/// use prime_chain::HashMap;
///
/// let mut ages = HashMap::new();
/// assert!(ages.insert("alice".to_string(), 30));
/// assert!(ages.insert("bob".to_string(), 25));
///
/// // Same key, new value: overwritten in place.
/// assert!(ages.insert("alice".to_string(), 31));
/// assert_eq!(ages.len(), 2);
/// assert!(ages.matches("alice", &31));
/// assert!(!ages.matches("alice", &30));
///
/// assert!(ages.remove("bob"));
/// assert!(!ages.contains("bob"));
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Returns the number of entries in the map.
    #[doc(alias = "size")]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the length of the bucket array. Always prime.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Returns the capacity value the next rehash will double.
    pub fn target_capacity(&self) -> usize {
        self.table.target_capacity()
    }

    /// Removes all entries. The bucket array keeps its length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map = HashMap::with_capacity(50);
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.bucket_count(), 47);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over the entries, in bucket order and then chain
    /// order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns a view that renders every bucket and its chain, one bucket per
    /// line, as `v[index]: key value : key value`. Empty buckets render as
    /// `v[index]: `.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map = HashMap::with_capacity(3);
    /// map.insert(7, 70);
    ///
    /// let rendered = map.dump().to_string();
    /// assert_eq!(rendered.lines().count(), 3);
    /// assert!(rendered.contains("7 70"));
    /// ```
    pub fn dump(&self) -> Dump<'_, K, V> {
        Dump { table: &self.table }
    }

    /// Returns bucket and chain statistics.
    ///
    /// Requires the `stats` feature.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> crate::hash_table::TableStats {
        self.table.stats()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map with the default capacity of 101 and the given
    /// hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_CAPACITY, hash_builder)
    }

    /// Creates an empty map sized for `capacity` with the given hasher
    /// builder.
    ///
    /// The bucket array length is the largest prime not above `capacity`;
    /// capacities outside `(1, MAX_PRIME]` fall back to 101.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns `true` if an entry with this key is stored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert("k".to_string(), 1);
    /// assert!(map.contains("k"));
    /// assert!(!map.contains("missing"));
    /// ```
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Returns `true` if this exact key-value pair is stored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "one");
    /// assert!(map.matches(&1, &"one"));
    /// assert!(!map.matches(&1, &"uno"));
    /// assert!(!map.matches(&2, &"one"));
    /// ```
    pub fn matches<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        self.get(key).is_some_and(|stored| stored == value)
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Inserts a key-value pair.
    ///
    /// Returns `false` and leaves the map untouched if the exact pair is
    /// already stored. Otherwise the value is written, either replacing the
    /// value of an existing entry in place or appending a new entry to its
    /// bucket's chain, and `true` is returned. Only new keys change
    /// [`len`](Self::len).
    ///
    /// If the map holds exactly [`bucket_count`](Self::bucket_count) entries
    /// when a write is needed, the bucket array is grown and every entry is
    /// redistributed first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert!(map.insert(37, "a"));
    /// assert!(!map.insert(37, "a"));
    /// assert!(map.insert(37, "b"));
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> bool
    where
        V: PartialEq,
    {
        if self.matches(&key, &value) {
            return false;
        }

        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(mut entry) => {
                entry.get_mut().1 = value;
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
            }
        }
        true
    }

    /// Removes the entry for `key`. Returns `false` if no such entry exists.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert!(map.remove(&1));
    /// assert!(!map.remove(&1));
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if !self.contains(key) {
            return false;
        }

        let hash = self.hash_builder.hash_one(key);
        let removed = self.table.remove(hash, |(k, _)| k.borrow() == key);
        // `contains` just located the key in this same chain.
        debug_assert!(removed.is_some(), "key vanished between lookup and removal");
        removed.is_some()
    }
}

impl<K, V> HashMap<K, V, DefaultHashBuilder>
where
    K: Hash + Eq,
{
    /// Creates an empty map with the default capacity of 101.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty map sized for `capacity`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let map: HashMap<u32, u32> = HashMap::with_capacity(1000);
    /// assert_eq!(map.bucket_count(), 997);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`HashMap`].
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Bucket-by-bucket rendering of a [`HashMap`], returned by
/// [`HashMap::dump`].
pub struct Dump<'a, K, V> {
    table: &'a HashTable<(K, V)>,
}

impl<K, V> Display for Dump<'_, K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (index, chain) in self.table.buckets().enumerate() {
            write!(f, "v[{index}]: ")?;
            for (position, (k, v)) in chain.enumerate() {
                if position != 0 {
                    f.write_str(" : ")?;
                }
                write!(f, "{k} {v}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
