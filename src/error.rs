/// ScapegoatError enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq)]
pub enum ScapegoatError<K>
where
    K: Clone + Ord,
{
    /// Returned by constructors when the balancing factor is outside the
    /// permitted range of 0..=1000.
    InvalidBalance(usize),
    /// Fatal case, index entries are not in sort-order. Carries the
    /// offending key and its parent key.
    SortError(K, K),
    /// Fatal case, the recorded entry count does not match the number of
    /// nodes reachable from the root, as (counted, recorded).
    SizeMismatch(usize, usize),
}
