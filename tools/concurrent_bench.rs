use anyhow::Result;
use clap::{Parser, ValueEnum};
use gremlin_graph_db::{
    init_logging, GraphTraversalSource, LoggingConfig, MemoryStorage, Session, SessionConfig,
    SharedStorage,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkloadType {
    Read,
    Write,
    Mixed,
}

#[derive(Parser, Debug)]
#[command(name = "concurrent_bench")]
#[command(about = "Concurrent traversal benchmark against a shared in-memory graph", long_about = None)]
struct Args {
    /// Workload type
    #[arg(short, long, value_enum)]
    workload: WorkloadType,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Duration in seconds
    #[arg(short, long, default_value_t = 30)]
    duration: u64,

    /// Graph name
    #[arg(short = 'n', long, default_value = "benchmark")]
    graph: String,

    /// Number of pre-existing vertices (0 to skip initialization)
    #[arg(short = 'v', long, default_value_t = 10000)]
    init_vertices: usize,

    /// Read/write ratio for mixed workload (0.0-1.0, where 0.9 means 90% reads)
    #[arg(short, long, default_value_t = 0.9)]
    read_ratio: f64,

    /// Output JSON results to file
    #[arg(short, long)]
    output: Option<String>,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Outcomes and latencies of one kind of operation
#[derive(Default)]
struct OpLog {
    ok: AtomicU64,
    failed: AtomicU64,
    latencies: parking_lot::Mutex<Vec<Duration>>,
}

impl OpLog {
    fn record(&self, ok: bool, latency: Duration) {
        if ok {
            self.ok.fetch_add(1, Ordering::Relaxed);
            self.latencies.lock().push(latency);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn summary(&self) -> OpSummary {
        let mut millis: Vec<f64> = self
            .latencies
            .lock()
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        millis.sort_by(|a, b| a.total_cmp(b));
        let at = |q: usize| millis.get(millis.len() * q / 100).copied().unwrap_or(0.0);

        OpSummary {
            ok: self.ok.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            p50_ms: at(50),
            p99_ms: at(99),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpSummary {
    ok: u64,
    failed: u64,
    p50_ms: f64,
    p99_ms: f64,
}

#[derive(Default)]
struct SharedStats {
    reads: OpLog,
    writes: OpLog,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    workload: String,
    sessions: usize,
    elapsed_secs: f64,
    ops_per_sec: f64,
    reads: OpSummary,
    writes: OpSummary,
    vertices_before: usize,
    vertices_after: usize,
    edges: usize,
    per_session_ops: Vec<u64>,
}

/// Seed the graph with `node` vertices linked in a ring
fn initialize_graph(g: &GraphTraversalSource, num_vertices: usize) -> Result<Vec<String>> {
    tracing::info!(num_vertices, "initializing graph");

    let mut vertex_ids = Vec::with_capacity(num_vertices);
    for i in 0..num_vertices {
        let vertex = g
            .add_v("node")
            .property("name", format!("Vertex{}", i))
            .property("value", (i * 2) as i64)
            .next()?;
        vertex_ids.push(vertex.element_id()?.to_string());

        if (i + 1) % 10000 == 0 {
            tracing::info!(created = i + 1, "vertices created");
        }
    }

    for (i, id) in vertex_ids.iter().enumerate() {
        let next = &vertex_ids[(i + 1) % vertex_ids.len()];
        g.v(id.as_str()).add_e("link").to(g.v(next.as_str())).iterate()?;
    }

    tracing::info!("graph initialization complete");
    Ok(vertex_ids)
}

/// Read: fetch a vertex's neighbours' names
fn read_op(g: &GraphTraversalSource, rng: &mut StdRng, vertex_ids: &[String]) -> bool {
    if vertex_ids.is_empty() {
        return false;
    }
    let id = &vertex_ids[rng.gen_range(0..vertex_ids.len())];
    matches!(
        g.v(id.as_str()).out("link").values("name").to_list(),
        Ok(names) if !names.is_empty()
    )
}

/// Write: add a vertex with a few properties
fn write_op(g: &GraphTraversalSource, rng: &mut StdRng, thread_id: usize, label: &str) -> bool {
    let tag = rng.gen::<u32>();
    g.add_v(label)
        .property("thread_id", thread_id as i64)
        .property("name", format!("{}_{}_{}", label, thread_id, tag))
        .iterate()
        .is_ok()
}

struct Worker {
    session: Session,
    vertex_ids: Arc<Vec<String>>,
    stats: Arc<SharedStats>,
    thread_id: usize,
    rng: StdRng,
}

impl Worker {
    fn run(mut self, workload: WorkloadType, duration: Duration, read_ratio: f64) -> u64 {
        let g = self.session.g();
        let start = Instant::now();
        let mut local_ops = 0u64;

        while start.elapsed() < duration {
            let op_start = Instant::now();
            let read = match workload {
                WorkloadType::Read => true,
                WorkloadType::Write => false,
                WorkloadType::Mixed => self.rng.gen::<f64>() < read_ratio,
            };

            let (log, ok) = if read {
                (&self.stats.reads, read_op(&g, &mut self.rng, &self.vertex_ids))
            } else {
                let label = match workload {
                    WorkloadType::Mixed => "mixed_node",
                    _ => "new_node",
                };
                (&self.stats.writes, write_op(&g, &mut self.rng, self.thread_id, label))
            };

            log.record(ok, op_start.elapsed());
            if ok {
                local_ops += 1;
            }
        }

        self.session.close();
        tracing::info!(thread_id = self.thread_id, operations = local_ops, "worker finished");
        local_ops
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&LoggingConfig::from_env())?;
    let args = Args::parse();
    let threads = args.threads.unwrap_or_else(num_cpus::get).max(1);

    tracing::info!(
        workload = ?args.workload,
        sessions = threads,
        duration_secs = args.duration,
        graph = %args.graph,
        "starting benchmark"
    );

    let config = SessionConfig {
        endpoint: format!("memory://{}", args.graph),
        ..SessionConfig::from_env()
    };
    let storage: SharedStorage = Arc::new(MemoryStorage::new(args.graph.clone()));

    let vertex_ids = {
        let setup = Session::open_with_storage(config.clone(), storage.clone())?;
        let ids = if args.init_vertices > 0 {
            initialize_graph(&setup.g(), args.init_vertices)?
        } else {
            Vec::new()
        };
        setup.close();
        Arc::new(ids)
    };

    let vertices_before = storage.vertex_count();
    let stats = Arc::new(SharedStats::default());
    let duration = Duration::from_secs(args.duration);

    let mut join_set = JoinSet::new();
    let start_time = Instant::now();

    for thread_id in 0..threads {
        let worker = Worker {
            session: Session::open_with_storage(config.clone(), storage.clone())?,
            vertex_ids: vertex_ids.clone(),
            stats: stats.clone(),
            thread_id,
            rng: StdRng::seed_from_u64(args.seed + thread_id as u64),
        };
        let workload = args.workload;
        let read_ratio = args.read_ratio;

        join_set.spawn_blocking(move || (thread_id, worker.run(workload, duration, read_ratio)));
    }

    let mut per_session_ops = vec![0u64; threads];
    while let Some(result) = join_set.join_next().await {
        let (thread_id, ops) = result?;
        per_session_ops[thread_id] = ops;
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    let reads = stats.reads.summary();
    let writes = stats.writes.summary();

    let report = BenchReport {
        workload: format!("{:?}", args.workload),
        sessions: threads,
        elapsed_secs: elapsed,
        ops_per_sec: (reads.ok + writes.ok) as f64 / elapsed,
        reads,
        writes,
        vertices_before,
        vertices_after: storage.vertex_count(),
        edges: storage.edge_count(),
        per_session_ops,
    };

    println!(
        "{:?} on '{}': {} sessions, {:.2}s, {:.0} ops/sec",
        args.workload, args.graph, report.sessions, report.elapsed_secs, report.ops_per_sec
    );
    for (kind, ops) in [("reads", &report.reads), ("writes", &report.writes)] {
        println!(
            "  {:<6} ok {:>9}  failed {:>6}  p50 {:.3}ms  p99 {:.3}ms",
            kind, ops.ok, ops.failed, ops.p50_ms, ops.p99_ms
        );
    }
    println!(
        "  graph  {} -> {} vertices, {} edges",
        report.vertices_before, report.vertices_after, report.edges
    );
    println!("  per session: {:?}", report.per_session_ops);

    if let Some(output_path) = args.output {
        std::fs::write(&output_path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(path = %output_path, "report written");
    }

    Ok(())
}
