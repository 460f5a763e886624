use crate::{CallbackFn, PSOConfig, PSOIntermediate, PSOReport, particle_swarm};
use directories::ProjectDirs;
use ndarray::Array1;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of the swarm after one step
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    /// Iteration counter after the step
    pub iteration: usize,
    /// Global best error after the step
    pub best_error: f64,
    /// Global best position after the step
    pub best_position: Vec<f64>,
    /// Mean error of the evaluations made during the step
    pub mean_error: f64,
}

/// Records the convergence history of a run, one row per step
///
/// The recorder is shared with the swarm through the config callback:
///
/// ```rust
/// use math_audio_particle_swarm::{ConvergenceRecorder, PSOConfigBuilder, particle_swarm};
/// use ndarray::array;
///
/// let recorder = ConvergenceRecorder::new();
/// let config = PSOConfigBuilder::new()
///     .seed(1)
///     .maxiter(10)
///     .callback(recorder.create_callback())
///     .build()
///     .unwrap();
/// let sphere = |x: &ndarray::Array1<f64>| x.iter().map(|v| v * v).sum::<f64>();
/// particle_swarm(&sphere, &array![1.0, 1.0], &[(-2.0, 2.0); 2], config).unwrap();
/// assert_eq!(recorder.len(), 11);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConvergenceRecorder {
    records: Arc<Mutex<Vec<IterationRecord>>>,
}

impl ConvergenceRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<IterationRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append the state reported by one step
    pub fn record(&self, intermediate: &PSOIntermediate) {
        self.lock().push(IterationRecord {
            iteration: intermediate.iter,
            best_error: intermediate.fun,
            best_position: intermediate.x.to_vec(),
            mean_error: intermediate.mean_error,
        });
    }

    /// Create a callback that feeds this recorder
    pub fn create_callback(&self) -> CallbackFn {
        let recorder = self.clone();
        Box::new(move |intermediate: &PSOIntermediate| recorder.record(intermediate))
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of all records, in step order
    pub fn records(&self) -> Vec<IterationRecord> {
        self.lock().clone()
    }

    /// Write the history as CSV: `iteration,best_error,mean_error,x0,x1,...`
    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        let records = self.lock();
        let mut file = BufWriter::new(File::create(path)?);

        let num_dimensions = records.first().map_or(0, |r| r.best_position.len());
        write!(file, "iteration,best_error,mean_error")?;
        for i in 0..num_dimensions {
            write!(file, ",x{}", i)?;
        }
        writeln!(file)?;

        for record in records.iter() {
            write!(
                file,
                "{},{:.16},{:.16}",
                record.iteration, record.best_error, record.mean_error
            )?;
            for &xi in &record.best_position {
                write!(file, ",{:.16}", xi)?;
            }
            writeln!(file)?;
        }

        file.flush()
    }
}

/// Get the records directory using the directories crate
fn get_records_dir() -> Result<PathBuf, String> {
    let proj_dirs = ProjectDirs::from("org", "spinorama", "math-audio")
        .ok_or("Failed to determine project directories")?;
    Ok(proj_dirs.cache_dir().join("records"))
}

/// Run particle swarm with the convergence history saved to CSV
///
/// The CSV lands in `<cache dir>/records/<function_name>_pso.csv`. Any
/// callback already present in `config` is replaced by the recorder.
pub fn run_recorded_particle_swarm<F>(
    function_name: &str,
    func: &F,
    x0: &Array1<f64>,
    bounds: &[(f64, f64)],
    config: PSOConfig,
) -> Result<(PSOReport, PathBuf), Box<dyn std::error::Error>>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    let records_dir =
        get_records_dir().map_err(|e| format!("Failed to get records directory: {}", e))?;
    run_recorded_particle_swarm_in(&records_dir, function_name, func, x0, bounds, config)
}

/// Same as [`run_recorded_particle_swarm`], writing
/// `<records_dir>/<function_name>_pso.csv`.
pub fn run_recorded_particle_swarm_in<F>(
    records_dir: &Path,
    function_name: &str,
    func: &F,
    x0: &Array1<f64>,
    bounds: &[(f64, f64)],
    mut config: PSOConfig,
) -> Result<(PSOReport, PathBuf), Box<dyn std::error::Error>>
where
    F: Fn(&Array1<f64>) -> f64 + Sync,
{
    let recorder = ConvergenceRecorder::new();
    config.callback = Some(recorder.create_callback());

    let report = particle_swarm(func, x0, bounds, config)?;

    let csv_path = records_dir.join(format!("{}_pso.csv", function_name));
    recorder.write_csv(&csv_path)?;
    log::info!(
        "PSO history for '{}' ({} steps) saved to {}",
        function_name,
        recorder.len(),
        csv_path.display()
    );

    Ok((report, csv_path))
}
