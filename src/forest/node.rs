/// A node in a tree arena.
///
/// Interior nodes carry the split plane plus the bounds of the node's
/// sub-region along its own split dimension; bounds along the remaining
/// dimensions are inherited implicitly from the path. Leaves own a half-open
/// range into the tree's point-index permutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Node {
    Interior {
        /// Arena index of the child holding coordinates `<= threshold`.
        lower: u32,
        /// Arena index of the child holding coordinates `> threshold`.
        upper: u32,
        split_dim: u32,
        threshold: f64,
        /// Lower edge of the sub-region along `split_dim`; `-inf` at the root.
        lower_bound: f64,
        /// Upper edge of the sub-region along `split_dim`; `+inf` at the root.
        upper_bound: f64,
    },
    Leaf {
        begin: u32,
        end: u32,
    },
}
