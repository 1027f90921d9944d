#[allow(unused_imports)]
use crate::Scapegoat;

// Depths beyond this are clamped into the last bucket. Even at the
// loosest balancing factor the tree would need an absurd entry count to
// reach it.
const MAX_DEPTH: usize = 256;

/// Depth calculates minimum, maximum, average and percentile of leaf-node
/// depths in the [`Scapegoat`] tree, sampled by
/// [`validate`](Scapegoat::validate).
#[derive(Clone, Debug)]
pub struct Depth {
    samples: usize,
    total: usize,
    histogram: [u64; MAX_DEPTH],
}

impl Depth {
    pub(crate) fn new() -> Depth {
        Default::default()
    }

    pub(crate) fn sample(&mut self, depth: usize) {
        let depth = depth.min(MAX_DEPTH - 1);
        self.samples += 1;
        self.total += depth;
        self.histogram[depth] += 1;
    }

    /// Return number of leaf-nodes sampled in [`Scapegoat`] instance.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Return minimum depth of leaf-node in [`Scapegoat`] instance.
    pub fn min(&self) -> usize {
        self.histogram
            .iter()
            .position(|&count| count > 0)
            .unwrap_or(0)
    }

    /// Return maximum depth of leaf-node in [`Scapegoat`] instance.
    pub fn max(&self) -> usize {
        self.histogram
            .iter()
            .rposition(|&count| count > 0)
            .unwrap_or(0)
    }

    /// Return the average depth of leaf-nodes in [`Scapegoat`] instance.
    pub fn mean(&self) -> usize {
        self.total / self.samples
    }

    /// Return depth as tuple of percentiles, each tuple provides
    /// (percentile, depth). Returned percentiles from 90, 91 .. 99
    pub fn percentiles(&self) -> Vec<(u8, usize)> {
        let mut percentiles: Vec<(u8, usize)> = vec![];
        let (mut acc, mut prev_perc) = (0_u64, 90_u8);
        for (depth, &count) in self.histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            acc += count;
            let perc = ((acc as f64 / self.samples as f64) * 100_f64) as u8;
            if perc >= prev_perc {
                percentiles.push((perc, depth));
                prev_perc = perc;
            }
        }
        percentiles
    }

    /// Pretty print depth statistics in human readable format, useful in logs.
    pub fn pretty_print(&self, prefix: &str) {
        println!(
            "{}depth (min, max, avg): {:?}",
            prefix,
            (self.min(), self.mean(), self.max())
        );
        for (perc, depth) in self.percentiles().into_iter() {
            println!("{}  {} percentile = {}", prefix, perc, depth);
        }
    }

    /// Convert depth statistics to JSON format, useful for plotting.
    pub fn json(&self) -> String {
        let ps: Vec<String> = self
            .percentiles()
            .into_iter()
            .map(|(perc, depth)| format!("{}: {}", perc, depth))
            .collect();
        format!(
            "{{ min: {}, mean: {}, max: {}, percentiles: {} }}",
            self.min(),
            self.mean(),
            self.max(),
            ps.join(", ")
        )
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth {
            samples: 0,
            total: 0,
            histogram: [0; MAX_DEPTH],
        }
    }
}
