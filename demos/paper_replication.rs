use channel_qubo::execution::DEFAULT_MAX_VARIABLES;
use channel_qubo::{
    ExhaustiveSolver, OptimizerConfig, RouteOptimizerBuilder, RoutingConfig, TopologyGenerator, TransactionGenerator,
};
use eyre::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Routes the published batch (2000 nodes, 20000 channels, 4 payments, 3 candidates each,
/// alpha = 2, beta derived from the amounts) on the in-process exhaustive solver.
///
/// Usage: `cargo run --example paper_replication [config.toml]`
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(file_name) => RoutingConfig::load(file_name)?,
        None => RoutingConfig::from_env()?,
    };

    info!("Step 1: generating topology");
    let channel_graph = TopologyGenerator::new(config.topology_config())?.generate()?;
    let stats = channel_graph.statistics();
    println!(
        "Topology: {} nodes, {} channels, degree {}..{} (avg {:.2}), capacity {}..{} (avg {:.1}), avg fee {:.4}, connected={}",
        stats.num_nodes,
        stats.num_edges,
        stats.min_degree,
        stats.max_degree,
        stats.avg_degree,
        stats.min_capacity,
        stats.max_capacity,
        stats.avg_capacity,
        stats.avg_fee,
        stats.is_connected
    );

    info!("Step 2: drawing payments");
    let transactions = TransactionGenerator::new(config.transaction_config())?.generate(&channel_graph)?;
    for tx in &transactions {
        println!("  {tx}");
    }

    let max_variables = config.solver.max_variables.unwrap_or(DEFAULT_MAX_VARIABLES);
    let optimizer = RouteOptimizerBuilder::new(Arc::new(channel_graph), Arc::new(ExhaustiveSolver::new(max_variables)))
        .with_config(OptimizerConfig::from(&config))
        .build()?;

    info!("Step 3: candidate routes");
    let start = Instant::now();
    let candidates = optimizer.find_candidates(&transactions, config.routing.num_route_candidates)?;
    println!("Candidate search took {:.2?}, {} routes in total", start.elapsed(), candidates.total_routes());
    for warning in &candidates.warnings {
        println!("  warning: {warning}");
    }
    for tx in &transactions {
        println!("  Transaction {}:", tx.id);
        for (j, route) in candidates.routes(tx.id).iter().enumerate() {
            let route_info = route.info(optimizer.channel_graph());
            println!("    #{}: {} (hops={}, fee={:.4})", j + 1, route, route_info.num_hops, route_info.total_fee);
        }
    }

    info!("Step 4: optimizing (alpha={}, beta={:?})", config.objective.alpha, config.objective.beta);
    let result = optimizer.optimize_batch(&transactions).await?;

    println!("{result}");
    for (id, route) in &result.route_paths {
        println!("  Transaction {id}: {route}");
    }
    println!(
        "  selected {}/{}, avg hops {:.2}, avg fee {:.4}",
        result.statistics.num_selected_routes,
        transactions.len(),
        result.statistics.avg_hops,
        result.statistics.avg_fee
    );
    if !result.is_feasible {
        println!("Constraints violated, the weights may need tuning");
    }

    Ok(())
}
