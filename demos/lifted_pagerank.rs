use std::path::PathBuf;

use clap::Parser;
use num_rational::BigRational;

use xadd_rs::expr::int;
use xadd_rs::matrix::{lifted_pagerank, Matrix, PageRankOptions};
use xadd_rs::tree::{from_decision_tree, DecisionTree};
use xadd_rs::types::VarDecl;
use xadd_rs::xadd::Xadd;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of integer attributes per node.
    #[arg(value_name = "INT", default_value = "2")]
    attributes: usize,

    /// Largest attribute value (attributes range over `0..=max`).
    #[clap(long, value_name = "INT", default_value = "3")]
    max: i64,

    /// Damping factor, in percent.
    #[clap(long, value_name = "INT", default_value = "85")]
    damping: i64,

    /// Convergence threshold, as `1/delta`.
    #[clap(long, value_name = "INT", default_value = "1000")]
    delta: i64,

    /// Maximum number of iterations.
    #[clap(long, value_name = "INT", default_value = "50")]
    iterations: usize,

    /// Write the rank diagram in DOT format to this file.
    #[clap(long, value_name = "FILE")]
    dot: Option<PathBuf>,
}

/// Link weights: nodes prefer to link to nodes on the same side of the midpoint
/// of the first attribute.
fn link_tree(attributes: usize, max: i64) -> DecisionTree {
    let mid = BigRational::new((2 * max + 1).into(), 4.into());
    let leaf = |w: i64| DecisionTree::leaf(int(w));
    let col = attributes;
    DecisionTree::split(
        0,
        mid.clone(),
        DecisionTree::split(col, mid.clone(), leaf(2), leaf(1)),
        DecisionTree::split(col, mid, leaf(1), leaf(3)),
    )
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let xadd = Xadd::default();

    let variables: Vec<VarDecl> = (0..args.attributes)
        .map(|i| VarDecl::discrete(format!("a{}", i)).with_bounds(int(0), int(args.max)))
        .collect();
    let rows: Vec<String> = variables.iter().map(|d| format!("r_{}", d.name)).collect();
    let cols: Vec<String> = variables.iter().map(|d| format!("c_{}", d.name)).collect();
    for (decl, (row, col)) in variables.iter().zip(rows.iter().zip(&cols)) {
        for name in [row, col] {
            let mut d = decl.clone();
            d.name = name.clone();
            xadd.declare(d)?;
        }
    }

    let tree = link_tree(args.attributes, args.max);
    println!("decision tree of depth {}", tree.depth());
    let links = from_decision_tree(&xadd, &tree, &rows, &cols)?;
    println!("link diagram of size {}", links.size());
    let matrix = Matrix::new(links, rows, cols)?;

    let options = PageRankOptions::default()
        .with_damping(BigRational::new(args.damping.into(), 100.into()))
        .with_delta(BigRational::new(1.into(), args.delta.into()))
        .with_iterations(args.iterations);
    let result = lifted_pagerank(&matrix, &variables, &options)?;
    println!(
        "pagerank: {} iterations, converged = {}, residual = {}",
        result.iterations, result.converged, result.residual
    );
    println!("rank diagram of size {}", result.ranks.diagram().size());

    // Ranks depend on the first attribute only.
    for value in 0..=args.max {
        let mut point = vec![int(0); args.attributes];
        if let Some(first) = point.first_mut() {
            *first = int(value);
        }
        println!("rank(a0 = {}) = {}", value, result.rank(&point)?);
    }

    if let Some(path) = &args.dot {
        std::fs::write(path, result.ranks.diagram().to_dot()?)?;
        println!("wrote {}", path.display());
    }

    println!("xadd = {:?}", xadd);
    println!("cache hits: {}", xadd.cache().hits());
    println!("cache misses: {}", xadd.cache().misses());

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
