use math_audio_particle_swarm::{Coefficients, PSOConfig, particle_swarm};
use ndarray::{Array1, array};

fn main() {
    // Sum of squares (2D), the classic first test for a swarm
    let cost = |x: &Array1<f64>| x.iter().map(|&xi| xi * xi).sum::<f64>();

    let x0 = array![5.0, 5.0];
    let bounds = [(-10.0, 10.0), (-10.0, 10.0)];

    let mut cfg = PSOConfig::default();
    cfg.maxiter = 30;
    cfg.particles = 15;
    cfg.coefficients = Coefficients {
        inertia: 0.5,
        cognitive: 1.0,
        social: 2.0,
    };
    cfg.seed = Some(42);

    let mut iter_log = 0usize;
    cfg.callback = Some(Box::new(move |inter| {
        if iter_log % 5 == 0 {
            eprintln!(
                "iter {:4}  best_f={:.6e}  mean_f={:.3e}",
                inter.iter, inter.fun, inter.mean_error
            );
        }
        iter_log += 1;
    }));

    let report = particle_swarm(&cost, &x0, &bounds, cfg).expect("optimization failed");

    println!(
        "message=\"{}\"\nbest f={:.6e}\nbest x={:?}",
        report.message, report.fun, report.x
    );
}
