use std::{
    borrow::Borrow,
    cmp::{Ord, Ordering},
    mem,
    ops::Deref,
};

use rand::Rng;

use crate::depth::Depth;
use crate::error::ScapegoatError;

// β is a point on [MAX_BALANCE, FRAC_LIMIT] and the balance fraction is
// (β + MAX_BALANCE) / FRAC_LIMIT, so breakpoint computations stay in
// fixed-point integer arithmetic.
const MAX_BALANCE: usize = 1000;
const FRAC_LIMIT: usize = 2 * MAX_BALANCE;

/// Scapegoat manage a single instance of in-memory index using
/// [scapegoat][sgt] tree, described by Galperin and Rivest.
///
/// Interior nodes carry no balancing metadata. Instead the tree tolerates
/// imbalance up to a configurable depth limit and, when an insertion
/// crosses it, flattens one unbalanced subtree (the scapegoat) and rebuilds
/// it perfectly balanced in a single linear pass. Lookup is worst-case
/// O(log n), insert and remove are amortized O(log n) with an O(n)
/// worst-case for a single operation.
///
/// [sgt]: https://en.wikipedia.org/wiki/Scapegoat_tree
#[derive(Clone)]
pub struct Scapegoat<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    name: String,
    root: Option<Box<Node<K, V>>>,
    balance: usize,   // balancing factor β, [0, 1000]
    limit_base: f64,  // ln(1/α(β)), 0.0 when α == 1.0
    n_count: usize,   // number of entries in the tree.
    high_water: usize, // max of n_count since last rebuild of root.
}

/// Different ways to construct a new Scapegoat instance.
impl<K, V> Scapegoat<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Create an empty instance of Scapegoat, identified by `name`, with
    /// balancing factor `balance` in the range 0..=1000. Factor 0 is the
    /// strictest, close to 50% weight balance, while 1000 never triggers
    /// a rebuild and degenerates to an unbalanced BST.
    ///
    /// Return [`ScapegoatError::InvalidBalance`] if `balance` is out of
    /// range.
    pub fn new<S>(name: S, balance: usize) -> Result<Scapegoat<K, V>, ScapegoatError<K>>
    where
        S: AsRef<str>,
    {
        if balance > MAX_BALANCE {
            return Err(ScapegoatError::InvalidBalance(balance));
        }
        let alpha = (balance as f64 + MAX_BALANCE as f64) / FRAC_LIMIT as f64;
        let limit_base = if alpha >= 1.0 { 0.0 } else { (1.0 / alpha).ln() };
        Ok(Scapegoat {
            name: name.as_ref().to_string(),
            root: Default::default(),
            balance,
            limit_base,
            n_count: Default::default(),
            high_water: Default::default(),
        })
    }

    /// Create a new instance of Scapegoat tree and load it with entries
    /// from `iter`. Entries are sorted and the tree is built perfectly
    /// balanced in one pass, which is equivalent in shape to inserting
    /// each entry into an empty tree but avoids the incremental cost.
    ///
    /// Duplicate keys collapse to a single entry and the value supplied
    /// last wins.
    pub fn load_from<S, I>(
        name: S,
        balance: usize,
        iter: I,
    ) -> Result<Scapegoat<K, V>, ScapegoatError<K>>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut tree = Scapegoat::new(name, balance)?;
        let mut entries: Vec<(K, V)> = iter.into_iter().collect();
        // sort_by is stable, so among equal keys the last supplied entry
        // ends an equal run.
        entries.sort_by(|x, y| x.0.cmp(&y.0));

        let mut nodes: Vec<Option<Box<Node<K, V>>>> = Vec::with_capacity(entries.len());
        for (key, value) in entries.into_iter() {
            let duplicate = match nodes.last() {
                Some(slot) => slot.as_ref().unwrap().key.cmp(&key) == Ordering::Equal,
                None => false,
            };
            if duplicate {
                let slot = nodes.last_mut().unwrap();
                slot.as_mut().unwrap().set_value(value);
            } else {
                nodes.push(Some(Node::new(key, value)));
            }
        }
        tree.n_count = nodes.len();
        tree.high_water = nodes.len();
        tree.root = Node::extract(&mut nodes);
        Ok(tree)
    }
}

/// Maintenance API.
impl<K, V> Scapegoat<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Identify this instance. Applications can choose unique names while
    /// creating Scapegoat instances.
    #[inline]
    pub fn id(&self) -> String {
        self.name.clone()
    }

    /// Return the balancing factor this instance was constructed with.
    #[inline]
    pub fn balance(&self) -> usize {
        self.balance
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return quickly with basic statisics, only entries() method is valid
    /// with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<K, V>>(), self.balance)
    }

    // Maximum tolerable depth for a subtree of n nodes. Depends only on β,
    // hence memoized as limit_base at construction.
    pub(crate) fn depth_limit(&self, n: usize) -> usize {
        if self.limit_base == 0.0 {
            n + 1 // α == 1.0, depth is unconstrained.
        } else {
            ((n as f64).ln() / self.limit_base) as usize
        }
    }

    // Weight-balance breakpoint for a tree that grew to n nodes.
    fn breakpoint(&self, n: usize) -> usize {
        let bw = (n * self.balance + MAX_BALANCE) / FRAC_LIMIT;
        if bw > 0 {
            bw
        } else {
            1
        }
    }

    pub(crate) fn root_node(&self) -> Option<&Node<K, V>> {
        self.root.as_ref().map(Deref::deref)
    }
}

// (root, added, size-of-violating-subtree, height-above-insertion)
type Insert<K, V> = (Box<Node<K, V>>, bool, usize, usize);

type Remove<K, V> = (Option<Box<Node<K, V>>>, Option<V>);

type PopMin<K, V> = (Option<Box<Node<K, V>>>, Option<Box<Node<K, V>>>);

/// Write operations on Scapegoat instance.
impl<K, V> Scapegoat<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Create a new {key, value} entry in the index, and report whether a
    /// new entry was added. If key is already present the insert is a
    /// no-op and false is returned.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        // The insertion may or may not add mass to the tree; assume it
        // does for the purpose of choosing a depth limit.
        let limit = self.depth_limit(self.n_count + 1) as isize;
        let root = self.root.take();
        let (root, added, _, _) = self.insert_node(root, key, value, false, limit);
        self.root = Some(root);
        self.inc_size(added);
        added
    }

    /// Set value for key, overwriting the old value if there is an
    /// existing entry for key. Report whether a new entry was added,
    /// false meaning an existing entry was updated.
    pub fn replace(&mut self, key: K, value: V) -> bool {
        let limit = self.depth_limit(self.n_count + 1) as isize;
        let root = self.root.take();
        let (root, added, _, _) = self.insert_node(root, key, value, true, limit);
        self.root = Some(root);
        self.inc_size(added);
        added
    }

    /// Delete key from this instance and return its value. If key is
    /// not present, then delete is effectively a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (root, old_value) = Scapegoat::remove_node(self.root.take(), key);
        self.root = root;
        if old_value.is_some() {
            self.n_count -= 1;
            // Shrinkage check: once enough mass has been removed since the
            // high-water mark, rebuild the whole tree and reset the mark.
            if self.n_count < self.breakpoint(self.high_water) {
                if let Some(root) = self.root.take() {
                    self.root = Some(Node::rewrite(root, self.n_count));
                }
                self.high_water = self.n_count;
            }
        }
        old_value
    }

    /// Validate the tree against its stated invariants:
    ///
    /// * Keys are in sort order, strictly increasing, no duplicates.
    /// * The recorded entry count equals the number of nodes reachable
    ///   from the root.
    ///
    /// Additionally return full statistics on the tree, including the
    /// leaf-depth distribution. Refer to [`Stats`] for more information.
    pub fn validate(&self) -> Result<Stats, ScapegoatError<K>> {
        let root = self.root.as_ref().map(Deref::deref);
        let mut stats = Stats::new(self.n_count, mem::size_of::<Node<K, V>>(), self.balance);
        stats.set_depths(Depth::new());
        let count = Scapegoat::validate_tree(root, 0, &mut stats)?;
        if count != self.n_count {
            return Err(ScapegoatError::SizeMismatch(count, self.n_count));
        }
        Ok(stats)
    }

    fn inc_size(&mut self, added: bool) {
        if added {
            self.n_count += 1;
            if self.n_count > self.high_water {
                self.high_water = self.n_count;
            }
        }
    }
}

/// Read operations on Scapegoat instance.
impl<K, V> Scapegoat<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// Get the value for key.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root.as_ref().map(Deref::deref);
        while let Some(nref) = node {
            node = match nref.key.borrow().cmp(key) {
                Ordering::Less => nref.right_deref(),
                Ordering::Greater => nref.left_deref(),
                Ordering::Equal => return Some(nref.value.clone()),
            };
        }
        None
    }

    /// Return the smallest entry in this instance, or None if the index
    /// is empty.
    pub fn min(&self) -> Option<(K, V)> {
        let mut nref = self.root.as_ref().map(Deref::deref)?;
        while let Some(left) = nref.left_deref() {
            nref = left;
        }
        Some((nref.key.clone(), nref.value.clone()))
    }

    /// Return the largest entry in this instance, or None if the index
    /// is empty.
    pub fn max(&self) -> Option<(K, V)> {
        let mut nref = self.root.as_ref().map(Deref::deref)?;
        while let Some(right) = nref.right_deref() {
            nref = right;
        }
        Some((nref.key.clone(), nref.value.clone()))
    }

    /// Return a random entry from this index.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<(K, V)> {
        let mut nref = self.root.as_ref().map(Deref::deref)?;

        let mut at_depth = rng.gen::<u8>() % 40;
        loop {
            let next = match rng.gen::<u8>() % 2 {
                0 => nref.left_deref(),
                1 => nref.right_deref(),
                _ => unreachable!(),
            };
            if at_depth == 0 || next.is_none() {
                break Some((nref.key.clone(), nref.value.clone()));
            }
            at_depth -= 1;
            nref = next.unwrap();
        }
    }

    /// Return an iterator over all entries in this instance, in key
    /// order.
    pub fn iter(&self) -> Iter<K, V> {
        let mut stack = vec![];
        let mut node = self.root.as_ref().map(Deref::deref);
        while let Some(nref) = node {
            stack.push(nref);
            node = nref.left_deref();
        }
        Iter { stack }
    }

    /// Return an iterator over entries whose key is greater than or equal
    /// to `key`, in key order. The iterator is seeded with the descent
    /// path from the root to where `key` is, or would be; subtrees
    /// entirely less than `key` are never re-entered.
    pub fn iter_from<Q>(&self, key: &Q) -> Iter<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut stack = vec![];
        let mut node = self.root.as_ref().map(Deref::deref);
        while let Some(nref) = node {
            node = match nref.key.borrow().cmp(key) {
                Ordering::Greater => {
                    stack.push(nref);
                    nref.left_deref()
                }
                Ordering::Less => nref.right_deref(),
                Ordering::Equal => {
                    stack.push(nref);
                    None
                }
            };
        }
        Iter { stack }
    }
}

impl<K, V> Scapegoat<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    // Descend-then-ascend insertion. While descending the depth budget
    // shrinks by one per level; creating a leaf on a negative budget flags
    // a violation by returning the subtree size 1. While ascending with a
    // flagged violation, each ancestor recomputes its would-be subtree
    // size from the sibling and either propagates the size upward or, if
    // its height above the insertion exceeds the limit for that size, is
    // the scapegoat and gets rewritten. At most one rewrite per insert.
    fn insert_node(
        &self,
        node: Option<Box<Node<K, V>>>,
        key: K,
        value: V,
        replace: bool,
        limit: isize,
    ) -> Insert<K, V> {
        let mut node = match node {
            None => {
                let size = if limit < 0 { 1 } else { 0 };
                return (Node::new(key, value), true, size, 0);
            }
            Some(node) => node,
        };

        let (added, mut size, height, went_left) = match node.key.cmp(&key) {
            Ordering::Greater => {
                let left = node.left.take();
                let (left, added, size, height) =
                    self.insert_node(left, key, value, replace, limit - 1);
                node.left = Some(left);
                (added, size, height + 1, true)
            }
            Ordering::Less => {
                let right = node.right.take();
                let (right, added, size, height) =
                    self.insert_node(right, key, value, replace, limit - 1);
                node.right = Some(right);
                (added, size, height + 1, false)
            }
            Ordering::Equal => {
                // Updating an existing node cannot introduce a violation,
                // so no scapegoat search is needed above this point.
                if replace {
                    node.set_value(value);
                }
                return (node, false, 0, 0);
            }
        };

        // Ascending phase, a.k.a. the goat rodeo. Selection strategy from
        // section 4.6 of Galperin and Rivest. Note that the sibling size
        // is only computed while a violation is being tracked.
        if size > 0 {
            let sibling = if went_left {
                node.right_deref()
            } else {
                node.left_deref()
            };
            let node_size = Node::size_of(sibling) + 1 + size;

            if height <= self.depth_limit(node_size) {
                // not the goat we are looking for, keep climbing.
                size = node_size;
            } else {
                node = Node::rewrite(node, node_size);
                size = 0;
            }
        }
        (node, added, size, height)
    }

    fn remove_node<Q>(node: Option<Box<Node<K, V>>>, key: &Q) -> Remove<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = match node {
            None => return (None, None), // nothing to do
            Some(node) => node,
        };

        match node.key.borrow().cmp(key) {
            Ordering::Greater => {
                let (left, old_value) = Scapegoat::remove_node(node.left.take(), key);
                node.left = left;
                (Some(node), old_value)
            }
            Ordering::Less => {
                let (right, old_value) = Scapegoat::remove_node(node.right.take(), key);
                node.right = right;
                (Some(node), old_value)
            }
            Ordering::Equal if node.left.is_none() => {
                let Node { value, right, .. } = *node;
                (right, Some(value))
            }
            Ordering::Equal if node.right.is_none() => {
                let Node { value, left, .. } = *node;
                (left, Some(value))
            }
            Ordering::Equal => {
                // Two children: pull up the in-order successor, the
                // minimum of the right subtree.
                let (right, succ) = Node::pop_min(node.right.take());
                node.right = right;
                let succ = match succ {
                    Some(succ) => succ,
                    None => panic!("remove(): fatal logic, call the programmer"),
                };
                let Node {
                    key: skey,
                    value: svalue,
                    ..
                } = *succ;
                node.key = skey;
                let old_value = mem::replace(&mut node.value, svalue);
                (Some(node), Some(old_value))
            }
        }
    }

    fn validate_tree(
        node: Option<&Node<K, V>>,
        depth: usize,
        stats: &mut Stats,
    ) -> Result<usize, ScapegoatError<K>> {
        let node = match node {
            None => {
                stats.depths.as_mut().unwrap().sample(depth);
                return Ok(0);
            }
            Some(node) => node,
        };

        let lcount = Scapegoat::validate_tree(node.left_deref(), depth + 1, stats)?;
        let rcount = Scapegoat::validate_tree(node.right_deref(), depth + 1, stats)?;
        if let Some(left) = node.left.as_ref() {
            if left.key.ge(&node.key) {
                let (lkey, parent) = (left.key.clone(), node.key.clone());
                return Err(ScapegoatError::SortError(lkey, parent));
            }
        }
        if let Some(right) = node.right.as_ref() {
            if right.key.le(&node.key) {
                let (rkey, parent) = (right.key.clone(), node.key.clone());
                return Err(ScapegoatError::SortError(rkey, parent));
            }
        }
        Ok(lcount + 1 + rcount)
    }
}

/// Lazy in-order iterator over a [`Scapegoat`] instance. The stack holds
/// the unvisited left-spine of the traversal; entries are cloned out as
/// they are yielded.
pub struct Iter<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    stack: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let mut next = node.right_deref();
        while let Some(nref) = next {
            self.stack.push(nref);
            next = nref.left_deref();
        }
        Some((node.key.clone(), node.value.clone()))
    }
}

/// Node corresponds to a single entry in Scapegoat instance.
#[derive(Clone)]
pub struct Node<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    key: K,
    value: V,
    left: Option<Box<Node<K, V>>>,  // store: left child
    right: Option<Box<Node<K, V>>>, // store: right child
}

// Primary operations on a single node.
impl<K, V> Node<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    // CREATE operation
    fn new(key: K, value: V) -> Box<Node<K, V>> {
        Box::new(Node {
            key,
            value,
            left: None,
            right: None,
        })
    }

    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) fn left_deref(&self) -> Option<&Node<K, V>> {
        self.left.as_ref().map(Deref::deref)
    }

    #[inline]
    pub(crate) fn right_deref(&self) -> Option<&Node<K, V>> {
        self.right.as_ref().map(Deref::deref)
    }

    // prepend operation, equivalent to SET / INSERT / UPDATE
    #[inline]
    fn set_value(&mut self, value: V) {
        self.value = value
    }

    // Number of nodes in the subtree under node, 0 for None.
    fn size_of(node: Option<&Node<K, V>>) -> usize {
        match node {
            None => 0,
            Some(node) => 1 + Node::size_of(node.left_deref()) + Node::size_of(node.right_deref()),
        }
    }

    // Move the nodes of this subtree into `nodes` in key order. Existing
    // node boxes are reused, no key or value is copied.
    fn flatten_into(mut node: Box<Node<K, V>>, nodes: &mut Vec<Option<Box<Node<K, V>>>>) {
        let right = node.right.take();
        if let Some(left) = node.left.take() {
            Node::flatten_into(left, nodes);
        }
        nodes.push(Some(node));
        if let Some(right) = right {
            Node::flatten_into(right, nodes);
        }
    }

    // Rebuild a perfectly balanced subtree from nodes in key order,
    // rewiring child links only. The lower-middle element roots each
    // subtree, so the arrangement is left-biased on even sizes.
    fn extract(nodes: &mut [Option<Box<Node<K, V>>>]) -> Option<Box<Node<K, V>>> {
        if nodes.is_empty() {
            return None;
        }
        let mid = (nodes.len() - 1) / 2;
        let (left, rest) = nodes.split_at_mut(mid);
        let (slot, right) = rest.split_first_mut().unwrap();
        let mut node = slot.take().unwrap();
        node.left = Node::extract(left);
        node.right = Node::extract(right);
        Some(node)
    }

    // Compose flatten_into and extract. Costs one size-element vector
    // plus O(log size) stack space, and allocates no nodes.
    fn rewrite(node: Box<Node<K, V>>, size: usize) -> Box<Node<K, V>> {
        let mut nodes = Vec::with_capacity(size);
        Node::flatten_into(node, &mut nodes);
        if nodes.len() != size {
            panic!(
                "rewrite(): flattened {} nodes but size is {}, call the programmer",
                nodes.len(),
                size
            );
        }
        Node::extract(&mut nodes).unwrap()
    }

    // Detach the smallest node of this subtree with a single downward
    // walk along the left-spine, rewiring child links only. Returns the
    // remaining subtree and the detached node.
    fn pop_min(node: Option<Box<Node<K, V>>>) -> PopMin<K, V> {
        let mut node = match node {
            None => return (None, None),
            Some(node) => node,
        };
        if node.left.is_none() {
            let right = node.right.take();
            return (right, Some(node));
        }
        let (left, min) = Node::pop_min(node.left.take());
        node.left = left;
        (Some(node), min)
    }
}

/// Statistics on [`Scapegoat`] tree. Serves two purpose:
///
/// * To get partial but quick statistics via [`Scapegoat::stats`] method.
/// * To get full statisics via [`Scapegoat::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    balance: usize,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize, balance: usize) -> Stats {
        Stats {
            entries,
            node_size,
            balance,
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`Scapegoat`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head for `Scapegoat<K,V>`.
    /// Although the node overhead is constant, the node size varies based
    /// on key and value types.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return the balancing factor of the instance.
    #[inline]
    pub fn balance(&self) -> usize {
        self.balance
    }

    /// Return [`Depth`] statistics, available only on stats obtained via
    /// [`Scapegoat::validate`] and only for non-empty instances.
    pub fn depths(&self) -> Option<Depth> {
        match self.depths.as_ref() {
            Some(depths) if depths.samples() > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
