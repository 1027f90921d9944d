/// Can be used while indexing keys without values, like
/// ``Scapegoat<K, Empty>``.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct Empty {}
