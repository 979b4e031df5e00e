use signatory_rs::{
    logsignature_backward, logsignature_forward, signature_forward, Basepoint, LogSignatureMode,
    LyndonInfoCache, Tensor,
};
use std::env;

/// Log-signature of a unit square traversed once, in every mode.
///
/// Usage: cargo run --example logsignature [depth]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let depth: usize = env::args()
        .nth(1)
        .map_or(3, |s| s.parse().expect("depth must be a positive integer"));

    // Counter-clockwise around the unit square, back to the start
    let points = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
    let path = Tensor::new(vec![1, 5, 2], points).expect("five points in two channels");

    let (signature, _) = signature_forward(&path, depth, false, &Basepoint::None)
        .unwrap_or_else(|err| {
            eprintln!("{}", err);
            std::process::exit(1);
        });
    println!("=== Signature ({} channels) ===", signature.len());
    println!("{:?}\n", signature.data());

    let cache = LyndonInfoCache::new();
    for mode in [
        LogSignatureMode::Expand,
        LogSignatureMode::Words,
        LogSignatureMode::Brackets,
    ] {
        let lyndon_info = cache
            .get_or_make(2, depth, mode)
            .expect("dimensions already validated");
        let (logsig, info) =
            logsignature_forward(&path, depth, false, &Basepoint::None, mode, Some(lyndon_info))
                .expect("dimensions already validated");

        println!("=== {} ({} channels) ===", mode, logsig.len());
        println!("{:?}", logsig.data());

        // Sensitivity of the summed log-signature to each point
        let ones = Tensor::new(logsig.shape().to_vec(), vec![1.0; logsig.len()])
            .expect("shape matches output");
        let grad = logsignature_backward(&ones, &info).expect("shape matches output");
        println!("gradient: {:?}\n", grad.path.data());
    }

    println!("Cached lyndon info entries: {}", cache.len());
}
