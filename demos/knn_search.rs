//! End-to-end k-nearest-neighbor search over a randomized KD-forest.
//!
//! Builds a forest over random data, runs an exact query, then repeats the
//! query under a comparison budget to show the accuracy/speed trade-off.

use kd_forest::{Distance, KDForestBuilder, ThresholdingMethod};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    let dimension = 16;
    let num_points = 5_000;

    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<f32> = (0..num_points * dimension)
        .map(|_| rng.gen_range(-1.0f32..1.0))
        .collect();

    let mut forest = KDForestBuilder::new(dimension, 4)
        .distance(Distance::SquaredL2)
        .thresholding_method(ThresholdingMethod::Median)
        .seed(7)
        .build(&data)
        .unwrap();

    let max_depth = (0..forest.num_trees())
        .map(|tree| forest.depth_of_tree(tree))
        .max()
        .unwrap();
    println!(
        "built {} trees over {} points, max depth {}, {} nodes total",
        forest.num_trees(),
        forest.num_points(),
        max_depth,
        forest.total_nodes()
    );

    let query: Vec<f32> = (0..dimension).map(|_| rng.gen_range(-1.0f32..1.0)).collect();

    println!("\nexact search:");
    let mut searcher = forest.searcher();
    for neighbor in searcher.nearest(&query, 5) {
        println!(
            "  point {:>4}  distance {:.4}",
            neighbor.index.unwrap(),
            neighbor.distance
        );
    }
    println!("  ({} comparisons)", searcher.stats().comparisons);

    forest.set_max_comparisons(200);
    println!("\napproximate search, budget 200:");
    let mut searcher = forest.searcher();
    for neighbor in searcher.nearest(&query, 5) {
        println!(
            "  point {:>4}  distance {:.4}",
            neighbor.index.unwrap(),
            neighbor.distance
        );
    }
    println!("  ({} comparisons)", searcher.stats().comparisons);
}
