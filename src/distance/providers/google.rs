use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, trace, warn};

use crate::config::constant::{PROVIDER_RETRIES, PROVIDER_TIMEOUT_SECS};
use crate::distance::matrix::{haversine_km, haversine_time_min, MatrixData, MatrixProvider};
use crate::domain::types::{Location, RoutingProfile};
use crate::error::ProviderError;

const BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Cached outcome of a single origin→destination lookup.
#[derive(Debug, Clone)]
pub struct PairRoute {
    pub distance_km: f64,
    pub time_min: f64,
    pub polyline: String,
}

/// Process-wide pairwise cache. Entries are pure functions of their key,
/// so stale reads are harmless.
pub type PairCache = RwLock<HashMap<String, PairRoute>>;

pub fn new_pair_cache() -> Arc<PairCache> {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Google Maps implementation of [`MatrixProvider`]. Constructed per
/// request around the caller-supplied API key; the pair cache is shared
/// across requests.
pub struct GoogleMatrixProvider {
    client: Client,
    api_key: String,
    cache: Arc<PairCache>,
}

impl GoogleMatrixProvider {
    pub fn new(api_key: String, cache: Arc<PairCache>) -> Self {
        GoogleMatrixProvider {
            client: Client::new(),
            api_key,
            cache,
        }
    }

    fn cache_key(origin: (f64, f64), destination: (f64, f64), profile: RoutingProfile) -> String {
        format!(
            "{:.6},{:.6}-{:.6},{:.6}-{}",
            origin.0, origin.1, destination.0, destination.1, profile
        )
    }

    /// GET with the per-call timeout, retried once on transport errors.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let mut last_err = None;
        for attempt in 0..=PROVIDER_RETRIES {
            let request = self
                .client
                .get(url)
                .query(params)
                .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS));

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(ProviderError::Rejected(format!(
                            "HTTP {} from {}",
                            status, url
                        )));
                    }
                    return Ok(response.json::<T>().await?);
                }
                Err(e) => {
                    warn!("request to {} failed (attempt {}): {}", url, attempt + 1, e);
                    last_err = Some(e);
                }
            }
        }
        Err(ProviderError::Request(
            last_err.expect("at least one attempt was made"),
        ))
    }

    fn profile_params(profile: RoutingProfile) -> Vec<(&'static str, String)> {
        match profile {
            RoutingProfile::Driving => vec![],
            RoutingProfile::DrivingTraffic => vec![
                ("departure_time", "now".to_string()),
                ("traffic_model", "best_guess".to_string()),
            ],
        }
    }

    /// Full-matrix call against the Distance Matrix API. Per-element
    /// failures fall back to Haversine; whole-call failures bubble up so
    /// the caller can switch to per-pair lookups.
    async fn batch_matrices(
        &self,
        locations: &[Location],
        profile: RoutingProfile,
    ) -> Result<MatrixData, ProviderError> {
        let coordinates: String = locations
            .iter()
            .map(|l| format!("{},{}", l.lat, l.lng))
            .collect::<Vec<_>>()
            .join("|");

        let mut params = vec![
            ("origins", coordinates.clone()),
            ("destinations", coordinates),
            ("mode", "driving".to_string()),
            ("units", "metric".to_string()),
            ("key", self.api_key.clone()),
        ];
        params.extend(Self::profile_params(profile));

        let url = format!("{}/distancematrix/json", BASE_URL);
        let response: DistanceMatrixResponse = self.get_json(&url, &params).await?;

        if response.status != "OK" {
            return Err(ProviderError::Rejected(format!(
                "Distance Matrix API error: {}",
                response
                    .error_message
                    .unwrap_or_else(|| response.status.clone())
            )));
        }

        let n = locations.len();
        if response.rows.len() != n {
            return Err(ProviderError::Rejected(format!(
                "Distance Matrix API returned {} rows for {} origins",
                response.rows.len(),
                n
            )));
        }

        let mut distance = vec![vec![0.0; n]; n];
        let mut time = vec![vec![0.0; n]; n];
        let mut warnings = vec![];

        for (i, row) in response.rows.iter().enumerate() {
            for (j, element) in row.elements.iter().enumerate() {
                if i == j {
                    continue;
                }
                match (element.status.as_str(), &element.distance, &element.duration) {
                    ("OK", Some(d), Some(t)) => {
                        distance[i][j] = d.value as f64 / 1000.0;
                        time[i][j] = t.value as f64 / 60.0;
                    }
                    _ => {
                        let km = haversine_km(
                            (locations[i].lat, locations[i].lng),
                            (locations[j].lat, locations[j].lng),
                        );
                        distance[i][j] = km;
                        time[i][j] = haversine_time_min(km);
                        warnings.push(format!(
                            "pair {}->{} unavailable upstream ({}), using Haversine estimate",
                            locations[i].id, locations[j].id, element.status
                        ));
                    }
                }
            }
        }

        info!("batch distance matrix retrieved ({}x{})", n, n);
        Ok(MatrixData {
            distance_matrix: distance,
            time_matrix: time,
            polyline_fragments: HashMap::new(),
            source: "Google Maps Distance Matrix API".to_string(),
            warnings,
        })
    }

    /// Single origin→destination lookup via the Directions API.
    async fn pair_route(
        &self,
        origin: (f64, f64),
        destination: (f64, f64),
        profile: RoutingProfile,
    ) -> Result<PairRoute, ProviderError> {
        let mut params = vec![
            ("origin", format!("{},{}", origin.0, origin.1)),
            ("destination", format!("{},{}", destination.0, destination.1)),
            ("mode", "driving".to_string()),
            ("key", self.api_key.clone()),
        ];
        params.extend(Self::profile_params(profile));

        let url = format!("{}/directions/json", BASE_URL);
        let response: DirectionsResponse = self.get_json(&url, &params).await?;

        if response.status != "OK" {
            return Err(ProviderError::Rejected(format!(
                "Directions API error: {}",
                response.status
            )));
        }

        let route = response
            .routes
            .first()
            .ok_or_else(|| ProviderError::Rejected("Directions API returned no routes".into()))?;
        let leg = route
            .legs
            .first()
            .ok_or_else(|| ProviderError::Rejected("Directions API returned no legs".into()))?;

        Ok(PairRoute {
            distance_km: leg.distance.value as f64 / 1000.0,
            time_min: leg.duration.value as f64 / 60.0,
            polyline: route.overview_polyline.points.clone(),
        })
    }

    /// Per-pair fallback path with the shared cache. Individual failures
    /// degrade to Haversine; if nothing ever succeeds the upstream is
    /// considered unavailable.
    async fn pairwise_matrices(
        &self,
        locations: &[Location],
        profile: RoutingProfile,
    ) -> Result<MatrixData, ProviderError> {
        let n = locations.len();
        let mut distance = vec![vec![0.0; n]; n];
        let mut time = vec![vec![0.0; n]; n];
        let mut fragments = HashMap::new();
        let mut warnings = vec![];
        let mut any_upstream = false;

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let origin = (locations[i].lat, locations[i].lng);
                let destination = (locations[j].lat, locations[j].lng);
                let key = Self::cache_key(origin, destination, profile);

                let cached = {
                    let cache = self.cache.read().expect("pair cache poisoned");
                    cache.get(&key).cloned()
                };

                if let Some(pair) = cached {
                    trace!("pair cache hit for {}", key);
                    distance[i][j] = pair.distance_km;
                    time[i][j] = pair.time_min;
                    fragments.insert((i, j), pair.polyline);
                    any_upstream = true;
                    continue;
                }

                match self.pair_route(origin, destination, profile).await {
                    Ok(pair) => {
                        distance[i][j] = pair.distance_km;
                        time[i][j] = pair.time_min;
                        fragments.insert((i, j), pair.polyline.clone());
                        any_upstream = true;
                        let mut cache = self.cache.write().expect("pair cache poisoned");
                        cache.insert(key, pair);
                    }
                    Err(e) => {
                        debug!("pair {}->{} lookup failed: {}", i, j, e);
                        let km = haversine_km(origin, destination);
                        distance[i][j] = km;
                        time[i][j] = haversine_time_min(km);
                        warnings.push(format!(
                            "pair {}->{} unavailable upstream, using Haversine estimate",
                            locations[i].id, locations[j].id
                        ));
                    }
                }
            }
        }

        if !any_upstream && n > 1 {
            return Err(ProviderError::Unavailable(
                "no origin-destination pair could be resolved upstream".into(),
            ));
        }

        Ok(MatrixData {
            distance_matrix: distance,
            time_matrix: time,
            polyline_fragments: fragments,
            source: "Google Maps Directions API".to_string(),
            warnings,
        })
    }
}

impl MatrixProvider for GoogleMatrixProvider {
    async fn build_matrices(
        &self,
        locations: &[Location],
        profile: RoutingProfile,
    ) -> Result<MatrixData, ProviderError> {
        match self.batch_matrices(locations, profile).await {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(
                    "batch distance matrix failed, falling back to individual requests: {}",
                    e
                );
                self.pairwise_matrices(locations, profile).await
            }
        }
    }

    async fn full_polyline(&self, ordered: &[Location]) -> Result<String, ProviderError> {
        if ordered.len() < 2 {
            return Ok(String::new());
        }

        let first = &ordered[0];
        let last = &ordered[ordered.len() - 1];
        let mut params = vec![
            ("origin", format!("{},{}", first.lat, first.lng)),
            ("destination", format!("{},{}", last.lat, last.lng)),
            ("mode", "driving".to_string()),
            ("key", self.api_key.clone()),
        ];

        if ordered.len() > 2 {
            let waypoints = ordered[1..ordered.len() - 1]
                .iter()
                .map(|l| format!("{},{}", l.lat, l.lng))
                .collect::<Vec<_>>()
                .join("|");
            params.push(("waypoints", waypoints));
        }

        let url = format!("{}/directions/json", BASE_URL);
        let response: Result<DirectionsResponse, ProviderError> = self.get_json(&url, &params).await;

        // A missing polyline never fails the request.
        match response {
            Ok(r) if r.status == "OK" => Ok(r
                .routes
                .first()
                .map(|route| route.overview_polyline.points.clone())
                .unwrap_or_default()),
            Ok(r) => {
                error!("route polyline request rejected: {}", r.status);
                Ok(String::new())
            }
            Err(e) => {
                error!("route polyline request failed: {}", e);
                Ok(String::new())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    legs: Vec<DirectionsLeg>,
    overview_polyline: OverviewPolyline,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: ValueField,
    duration: ValueField,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: i64,
}
