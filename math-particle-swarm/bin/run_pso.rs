use clap::Parser;
use math_audio_particle_swarm::{
    ConvergenceRecorder, PSOConfig, PSOConfigBuilder, PSOReport, ParallelConfig, Swarm,
    function_registry::{BenchmarkFunction, FunctionRegistry},
};
use ndarray::Array1;
use std::fmt::Write as FmtWrite;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "run_pso",
    about = "Run particle swarm optimization on a selected benchmark function"
)]
struct Cli {
    /// Name of the benchmark function to optimize (use --list-functions to see available options)
    #[arg(long)]
    function: Option<String>,

    /// Dimensionality of the problem (defaults to the function's recommended dimension)
    #[arg(long)]
    dim: Option<usize>,

    /// Iteration budget
    #[arg(long, default_value_t = 30)]
    maxiter: usize,

    /// Number of particles in the swarm
    #[arg(long, default_value_t = 15)]
    particles: usize,

    /// Inertia weight (w)
    #[arg(long, default_value_t = 0.5)]
    inertia: f64,

    /// Cognitive constant (c1)
    #[arg(long, default_value_t = 1.0)]
    cognitive: f64,

    /// Social constant (c2)
    #[arg(long, default_value_t = 2.0)]
    social: f64,

    /// Optional random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Starting position shared by all particles, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    x0: Option<Vec<f64>>,

    /// Print intermediate progress every N iterations (>= 1)
    #[arg(long, default_value_t = 5)]
    progress_every: usize,

    /// Disable parallel evaluation of the swarm
    #[arg(long)]
    no_parallel: bool,

    /// Number of threads for parallel evaluation (0 = use all available cores)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Write the convergence history to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// List all available functions and exit
    #[arg(long)]
    list_functions: bool,
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    let registry = FunctionRegistry::new();

    if args.list_functions {
        list_available_functions(&registry);
        return;
    }

    let function_name = match &args.function {
        Some(name) => name.trim(),
        None => {
            eprintln!("Error: --function must be provided unless --list-functions is used.");
            process::exit(2);
        }
    };

    let (resolved_name, benchmark) = match registry.resolve(function_name) {
        Some(resolved) => resolved,
        None => {
            eprintln!(
                "Error: function '{function_name}' not found. Use --list-functions to inspect available names."
            );
            process::exit(2);
        }
    };

    let x0 = match &args.x0 {
        Some(values) => Array1::from_vec(values.clone()),
        None => benchmark.default_x0(args.dim.unwrap_or(benchmark.default_dim)),
    };
    let dimension = args.dim.unwrap_or(x0.len());
    if x0.len() != dimension {
        eprintln!(
            "Error: --x0 has {} values but --dim is {}.",
            x0.len(),
            dimension
        );
        process::exit(2);
    }
    if !benchmark.supports_dim(dimension) {
        match benchmark.fixed_dim {
            Some(d) => eprintln!(
                "Error: function '{resolved_name}' is only defined in {d} dimensions, got {dimension}."
            ),
            None => eprintln!("Error: dimension must be at least 1."),
        }
        process::exit(2);
    }
    let bounds = benchmark.bounds(dimension);

    if args.progress_every == 0 {
        eprintln!("Error: --progress-every must be at least 1.");
        process::exit(2);
    }

    let parallel = ParallelConfig {
        enabled: !args.no_parallel,
        num_threads: if args.threads == 0 {
            None
        } else {
            Some(args.threads)
        },
    };

    let recorder = ConvergenceRecorder::new();
    let progress_every = args.progress_every;
    let progress_recorder = recorder.clone();

    let mut builder = PSOConfigBuilder::new()
        .maxiter(args.maxiter)
        .particles(args.particles)
        .inertia(args.inertia)
        .cognitive(args.cognitive)
        .social(args.social)
        .parallel(parallel)
        .callback(Box::new(move |intermediate| {
            progress_recorder.record(intermediate);
            if intermediate.iter == 1 || intermediate.iter % progress_every == 0 {
                println!(
                    "iter {:>5} | best = {:>12.6e} | mean = {:>12.6e}",
                    intermediate.iter, intermediate.fun, intermediate.mean_error
                );
                println!("            x = [{}]", format_vector(&intermediate.x));
            }
        }));

    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    let config = builder.build().unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        process::exit(2);
    });

    println!(
        "Running PSO on '{}' ({}D) with {} particles...",
        resolved_name, dimension, args.particles
    );

    let overall_start = Instant::now();
    let report = match run(benchmark, &x0, &bounds, config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: optimization failed: {}", e);
            process::exit(2);
        }
    };

    let elapsed = overall_start.elapsed();
    println!("\nOptimization completed in {:.2?}", elapsed);
    println!("Status: {}", report.message);
    println!("Iterations: {} | Evaluations: {}", report.nit, report.nfev);
    println!(
        "Best objective: {:.6e} (known minimum {:.6e})",
        report.fun, benchmark.minimum
    );
    println!("Best parameters: [{}]", format_vector(&report.x));

    if let Some(path) = &args.csv {
        if let Err(e) = recorder.write_csv(path) {
            eprintln!("Error: failed to write {}: {}", path.display(), e);
            process::exit(1);
        }
        println!("History written to {}", path.display());
    }
}

fn run(
    benchmark: &BenchmarkFunction,
    x0: &Array1<f64>,
    bounds: &[(f64, f64)],
    config: PSOConfig,
) -> math_audio_particle_swarm::Result<PSOReport> {
    let objective = |x: &Array1<f64>| (benchmark.func)(x);
    let mut swarm = Swarm::initialize(&objective, x0, bounds, config)?;
    swarm.solve()
}

fn format_vector(x: &Array1<f64>) -> String {
    let mut buffer = String::new();
    for (idx, value) in x.iter().enumerate() {
        if idx > 0 {
            buffer.push_str(", ");
        }
        let _ = write!(&mut buffer, "{value:.6}");
    }
    buffer
}

fn list_available_functions(registry: &FunctionRegistry) {
    let names = registry.list_functions();
    println!("Available test functions ({}):", names.len());
    for name in names {
        if let Some(f) = registry.get(&name) {
            println!(
                "- {name:<16} bounds [{}, {}]{}",
                f.bound.0,
                f.bound.1,
                if f.multimodal { "  (multimodal)" } else { "" }
            );
        }
    }
}
