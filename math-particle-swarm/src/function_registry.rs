/// Shared function registry for PSO benchmarks and the command-line runner
use ndarray::Array1;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Test function type definition
pub type TestFunction = fn(&Array1<f64>) -> f64;

/// A benchmark objective with the search box it is usually studied on.
#[derive(Clone, Debug)]
pub struct BenchmarkFunction {
    /// The objective itself.
    pub func: TestFunction,
    /// Per-dimension (lower, upper) bound, identical for every dimension.
    pub bound: (f64, f64),
    /// Dimension used when the caller does not choose one.
    pub default_dim: usize,
    /// Known global minimum value.
    pub minimum: f64,
    /// Whether the function has many local minima.
    pub multimodal: bool,
    /// The only dimension the function is defined for, if it has one.
    pub fixed_dim: Option<usize>,
}

impl BenchmarkFunction {
    /// Bound pairs for a `dim`-dimensional problem.
    pub fn bounds(&self, dim: usize) -> Vec<(f64, f64)> {
        vec![self.bound; dim]
    }

    /// Whether the function can be evaluated in `dim` dimensions.
    pub fn supports_dim(&self, dim: usize) -> bool {
        dim >= 1 && self.fixed_dim.is_none_or(|d| d == dim)
    }

    /// Start point at three quarters of the way to the upper bound, away
    /// from the optimum of every registered function.
    pub fn default_x0(&self, dim: usize) -> Array1<f64> {
        let (lo, hi) = self.bound;
        Array1::from_elem(dim, lo + 0.75 * (hi - lo))
    }
}

/// Function registry mapping names to benchmark functions.
pub struct FunctionRegistry {
    functions: HashMap<String, BenchmarkFunction>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Creates a new registry with all standard test functions.
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        let mut add = |name: &str,
                       func: TestFunction,
                       bound: (f64, f64),
                       default_dim: usize,
                       minimum: f64,
                       multimodal: bool,
                       fixed_dim: Option<usize>| {
            functions.insert(
                name.to_string(),
                BenchmarkFunction {
                    func,
                    bound,
                    default_dim,
                    minimum,
                    multimodal,
                    fixed_dim,
                },
            );
        };

        // Unimodal functions
        add("sphere", sphere, (-10.0, 10.0), 2, 0.0, false, None);
        add("rosenbrock", rosenbrock, (-5.0, 10.0), 2, 0.0, false, None);
        add("booth", booth, (-10.0, 10.0), 2, 0.0, false, Some(2));

        // Multimodal functions
        add("rastrigin", rastrigin, (-5.12, 5.12), 2, 0.0, true, None);
        add("ackley", ackley, (-32.768, 32.768), 2, 0.0, true, None);
        add("griewank", griewank, (-600.0, 600.0), 2, 0.0, true, None);
        add("himmelblau", himmelblau, (-5.0, 5.0), 2, 0.0, true, Some(2));
        add(
            "styblinski_tang",
            styblinski_tang,
            (-5.0, 5.0),
            2,
            -39.16616570377142 * 2.0,
            true,
            None,
        );

        Self { functions }
    }

    /// Looks a function up by exact name.
    pub fn get(&self, name: &str) -> Option<&BenchmarkFunction> {
        self.functions.get(name)
    }

    /// Looks a function up ignoring ASCII case; returns the canonical name.
    pub fn resolve(&self, name: &str) -> Option<(&str, &BenchmarkFunction)> {
        self.functions
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name.trim()))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// All registered names, sorted.
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

/// f(x) = sum(x_i^2), minimum 0 at the origin.
pub fn sphere(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

/// Rosenbrock valley, minimum 0 at (1, ..., 1).
pub fn rosenbrock(x: &Array1<f64>) -> f64 {
    x.windows(2)
        .into_iter()
        .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

/// Booth function (2D), minimum 0 at (1, 3).
///
/// # Panics
///
/// Panics if `x` has fewer than two elements.
pub fn booth(x: &Array1<f64>) -> f64 {
    (x[0] + 2.0 * x[1] - 7.0).powi(2) + (2.0 * x[0] + x[1] - 5.0).powi(2)
}

/// Rastrigin function, minimum 0 at the origin.
pub fn rastrigin(x: &Array1<f64>) -> f64 {
    10.0 * x.len() as f64
        + x.iter()
            .map(|&xi| xi * xi - 10.0 * (2.0 * PI * xi).cos())
            .sum::<f64>()
}

/// Ackley function, minimum 0 at the origin.
pub fn ackley(x: &Array1<f64>) -> f64 {
    let n = x.len() as f64;
    let s1 = x.iter().map(|&xi| xi * xi).sum::<f64>() / n;
    let s2 = x.iter().map(|&xi| (2.0 * PI * xi).cos()).sum::<f64>() / n;
    -20.0 * (-0.2 * s1.sqrt()).exp() - s2.exp() + 20.0 + std::f64::consts::E
}

/// Griewank function, minimum 0 at the origin.
pub fn griewank(x: &Array1<f64>) -> f64 {
    let sum = x.iter().map(|&xi| xi * xi).sum::<f64>() / 4000.0;
    let prod = x
        .iter()
        .enumerate()
        .map(|(i, &xi)| (xi / ((i + 1) as f64).sqrt()).cos())
        .product::<f64>();
    sum - prod + 1.0
}

/// Himmelblau function (2D), four minima of value 0.
///
/// # Panics
///
/// Panics if `x` has fewer than two elements.
pub fn himmelblau(x: &Array1<f64>) -> f64 {
    (x[0] * x[0] + x[1] - 11.0).powi(2) + (x[0] + x[1] * x[1] - 7.0).powi(2)
}

/// Styblinski-Tang function, minimum about -39.166 per dimension.
pub fn styblinski_tang(x: &Array1<f64>) -> f64 {
    0.5 * x
        .iter()
        .map(|&xi| xi.powi(4) - 16.0 * xi * xi + 5.0 * xi)
        .sum::<f64>()
}
