/// Returned by the strict accessors of [`AvlMap`](crate::AvlMap) when the requested key is not
/// present.
///
/// Plain lookups and removals report an absent key with `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("key not found")]
pub struct KeyError;
