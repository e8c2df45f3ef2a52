use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A delivery stop as supplied by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct Stop {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub service_time_minutes: Option<f64>,
    #[serde(default)]
    pub time_window: Option<HashMap<String, String>>,
}

/// Optional anchor point, prepended as location 0 with id "depot".
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Depot {
    pub lat: f64,
    pub lng: f64,
}

/// Informational only: the engine surfaces `max_travel_time` overruns as
/// warnings and enforces nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub vehicle_capacity: Option<f64>,
    #[serde(default)]
    pub max_travel_time: Option<f64>,
    #[serde(default = "default_fleet_size")]
    pub fleet_size: usize,
    #[serde(default)]
    pub time_windows: bool,
}

fn default_fleet_size() -> usize {
    1
}

/// One row of the problem: either a stop or the synthetic depot.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingProfile {
    Driving,
    DrivingTraffic,
}

impl RoutingProfile {
    pub const ALL: [&'static str; 2] = ["driving", "driving-traffic"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingProfile::Driving => "driving",
            RoutingProfile::DrivingTraffic => "driving-traffic",
        }
    }
}

impl FromStr for RoutingProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driving" => Ok(RoutingProfile::Driving),
            "driving-traffic" => Ok(RoutingProfile::DrivingTraffic),
            other => Err(format!(
                "Invalid routing profile '{}'. Must be one of: {:?}",
                other,
                Self::ALL
            )),
        }
    }
}

impl fmt::Display for RoutingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Classical,
    Simulated,
    Qiea,
    Qaoa,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Classical,
        Algorithm::Simulated,
        Algorithm::Qiea,
        Algorithm::Qaoa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Classical => "classical",
            Algorithm::Simulated => "simulated",
            Algorithm::Qiea => "qiea",
            Algorithm::Qaoa => "qaoa",
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classical" => Ok(Algorithm::Classical),
            "simulated" => Ok(Algorithm::Simulated),
            "qiea" => Ok(Algorithm::Qiea),
            "qaoa" => Ok(Algorithm::Qaoa),
            other => Err(format!(
                "Invalid algorithm '{}'. Valid options: {:?}",
                other,
                Algorithm::ALL.map(|a| a.as_str())
            )),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The immutable problem the optimizers consume. Built once per request,
/// then shared read-only across the solver tasks.
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub locations: Vec<Location>,
    pub distance_matrix: Vec<Vec<f64>>,
    pub time_matrix: Vec<Vec<f64>>,
    pub seed: Option<u64>,
}

impl ProblemInstance {
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Translate an index tour into stop ids.
    pub fn ids_for(&self, order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| self.locations[i].id.clone()).collect()
    }
}
