/// Benchmark for batch fan-out throughput
///
/// Measures how fast the coordinator turns batches of queries around against
/// the in-memory warehouse, for growing batch sizes.

use bqsource::warehouse::{MemoryFixture, MemoryWarehouse, Warehouse, WarehouseRow};
use bqsource::{DataQuery, QueryCoordinator, QueryExecutor};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

const ROWS_PER_QUERY: i64 = 500;

fn main() {
    println!("=== Batch Throughput Benchmark ===\n");

    let rows: Vec<WarehouseRow> = (0..ROWS_PER_QUERY)
        .map(|i| WarehouseRow {
            time: Utc.timestamp_opt(1_700_000_000 + i * 60, 0).unwrap(),
            metric: i as f64 * 0.5,
        })
        .collect();
    let warehouse = MemoryWarehouse::new()
        .with_rows("SELECT time, metric FROM fast", rows.clone())
        .with_fixture(
            MemoryFixture::new("SELECT time, metric FROM slow")
                .rows(rows)
                .delay(Duration::from_millis(20)),
        );
    let executor = Arc::new(QueryExecutor::new(Arc::new(warehouse) as Arc<dyn Warehouse>));
    let coordinator = QueryCoordinator::new(executor);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime");

    for (label, sql) in [
        ("Immediate jobs", "SELECT time, metric FROM fast"),
        ("20ms jobs", "SELECT time, metric FROM slow"),
    ] {
        println!("📊 {}:", label);
        for batch_size in [1usize, 10, 100, 1000] {
            let iterations = 20;
            let start = Instant::now();

            for _ in 0..iterations {
                let queries = (0..batch_size)
                    .map(|i| {
                        DataQuery::new(
                            format!("q{}", i),
                            format!(r#"{{"project": "bench", "rawSql": "{}"}}"#, sql),
                        )
                    })
                    .collect();
                let response = runtime.block_on(coordinator.execute(queries));
                assert_eq!(response.len(), batch_size);
            }

            let duration = start.elapsed();
            let queries_per_sec = (iterations * batch_size) as f64 / duration.as_secs_f64();
            println!(
                "  batch {:>4}: {:?} per batch, {:.0} queries/sec",
                batch_size,
                duration / iterations as u32,
                queries_per_sec
            );
        }
        println!();
    }

    println!("✅ Slow batches finish in roughly one job time, not batch_size job times");
}
