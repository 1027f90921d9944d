use std::fmt::Display;
use std::io::{self, Write};

use crate::scapegoat::{Node, Scapegoat};

/// Diagnostic export of the tree shape to GraphViz DOT format.
impl<K, V> Scapegoat<K, V>
where
    K: Clone + Ord + Display,
    V: Clone,
{
    /// Render the tree shape as a GraphViz DOT graph, labelling each
    /// node with its key. Useful to eyeball how much imbalance a given
    /// balancing factor tolerates.
    pub fn write_dot<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "digraph Tree {{")?;
        let mut id = 0;
        Scapegoat::dot_node(self.root_node(), w, &mut id)?;
        writeln!(w, "}}")
    }

    fn dot_node<W: Write>(
        node: Option<&Node<K, V>>,
        w: &mut W,
        id: &mut usize,
    ) -> io::Result<usize> {
        let node = match node {
            None => return Ok(0),
            Some(node) => node,
        };
        *id += 1;
        let nid = *id;
        writeln!(w, "\tN{:04} [label=\"{}\"]", nid, node.key())?;
        let lc = Scapegoat::dot_node(node.left_deref(), w, id)?;
        if lc != 0 {
            writeln!(w, "\tN{:04} -> N{:04}", nid, lc)?;
        }
        let rc = Scapegoat::dot_node(node.right_deref(), w, id)?;
        if rc != 0 {
            writeln!(w, "\tN{:04} -> N{:04}", nid, rc)?;
        }
        Ok(nid)
    }
}
