pub mod constant {
    // Classical: greedy construction + full-pass 2-opt
    pub(crate) const CLASSICAL_MAX_PASSES: usize = 1000;
    pub(crate) const CLASSICAL_LOG_INTERVAL: usize = 50;

    // Simulated annealing
    pub(crate) const SA_INITIAL_TEMP: f64 = 2000.0;
    pub(crate) const SA_FINAL_TEMP: f64 = 1.0;
    pub(crate) const SA_COOLING_RATE: f64 = 0.995;
    pub(crate) const SA_MAX_ITERATIONS: usize = 5000;
    pub(crate) const SA_LOG_INTERVAL: usize = 100;

    // Quantum-inspired evolutionary algorithm
    pub(crate) const QIEA_POPULATION_SIZE: usize = 60;
    pub(crate) const QIEA_MAX_GENERATIONS: usize = 250;
    pub(crate) const QIEA_MUTATION_RATE: f64 = 0.15;
    pub(crate) const QIEA_ELITE_COUNT: usize = 15;
    pub(crate) const QIEA_LEARNING_RATE: f64 = 0.1;
    pub(crate) const QIEA_MUTATION_SIGMA: f64 = 0.05;
    pub(crate) const QIEA_LOG_INTERVAL: usize = 25;

    // QAOA-inspired sampler
    pub(crate) const QAOA_P_DEPTH: usize = 4;
    pub(crate) const QAOA_NUM_SAMPLES: usize = 1200;
    pub(crate) const QAOA_OPTIMIZATION_STEPS: usize = 120;
    pub(crate) const QAOA_LOCAL_SEARCH_PASSES: usize = 10;
    pub(crate) const QAOA_GAMMA_SIGMA: f64 = 0.15;
    pub(crate) const QAOA_BETA_SIGMA: f64 = 0.1;
    pub(crate) const QAOA_LOG_INTERVAL: usize = 12;

    // Seed drawn per optimizer when the request carries none
    pub(crate) const SEED_RANGE: std::ops::RangeInclusive<u64> = 1..=10000;

    // Upstream matrix provider
    pub(crate) const PROVIDER_TIMEOUT_SECS: u64 = 10;
    pub(crate) const PROVIDER_RETRIES: usize = 1;
    pub(crate) const EARTH_RADIUS_KM: f64 = 6371.0;
    pub(crate) const HAVERSINE_TIME_FACTOR: f64 = 1.2;

    pub(crate) const DEFAULT_BIND: &str = "0.0.0.0:8000";
    pub(crate) const API_VERSION: &str = "v1";
}
