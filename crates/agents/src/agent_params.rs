//! Data-driven agent parameters.
//!
//! Collects every tunable of the agent populations into one [`AgentParams`]
//! resource so hosts can adjust traffic density, dispatch throughput or
//! aircraft cadence without recompiling. Ranges are `(min, max)` pairs in
//! seconds, tiles/second or screen pixels/second as noted.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::world_state::DeviceProfile;

// ---------------------------------------------------------------------------
// Road vehicles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarParams {
    /// Seconds between spawn attempts.
    pub spawn_interval: (f32, f32),
    /// Tiles per second.
    pub speed: (f32, f32),
    /// Seconds before a car is retired.
    pub max_age: (f32, f32),
    pub min_capacity: usize,
    pub max_capacity: usize,
    /// Capacity per tile of grid side length.
    pub capacity_per_grid_tile: usize,
    pub color_variants: u8,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            spawn_interval: (0.9, 2.2),
            speed: (0.6, 1.1),
            max_age: (15.0, 35.0),
            min_capacity: 16,
            max_capacity: 160,
            capacity_per_grid_tile: 2,
            color_variants: 6,
        }
    }
}

impl CarParams {
    /// `min(160, max(16, 2 × grid_size))` with the default tunables.
    pub fn capacity(&self, grid_size: usize) -> usize {
        (grid_size * self.capacity_per_grid_tile)
            .max(self.min_capacity)
            .min(self.max_capacity)
    }
}

// ---------------------------------------------------------------------------
// Pedestrians
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedestrianParams {
    pub spawn_interval: (f32, f32),
    /// Spawn attempts each time the timer fires.
    pub spawn_batch: usize,
    pub speed: (f32, f32),
    /// Multiple of the expected walking time a leg may take before the
    /// walker is considered stalled.
    pub leg_slack: f32,
    /// Hard ceiling on any single leg, whatever its length.
    pub max_age: f32,
    /// Below this zoom the whole population is suspended.
    pub min_zoom: f32,
    pub desktop_floor: usize,
    pub desktop_per_road_tile: usize,
    pub constrained_floor: usize,
    pub constrained_per_road_tile: usize,
    pub skin_variants: u8,
}

impl Default for PedestrianParams {
    fn default() -> Self {
        Self {
            spawn_interval: (0.2, 0.6),
            spawn_batch: 2,
            speed: (0.25, 0.45),
            leg_slack: 3.0,
            max_age: 900.0,
            min_zoom: 0.5,
            desktop_floor: 200,
            desktop_per_road_tile: 3,
            constrained_floor: 60,
            constrained_per_road_tile: 1,
            skin_variants: 8,
        }
    }
}

impl PedestrianParams {
    /// Seconds a walker at `speed` gets to cover `steps` tiles.
    pub fn leg_time_limit(&self, steps: usize, speed: f32) -> f32 {
        if speed <= 0.0 {
            return self.max_age;
        }
        (self.leg_slack * steps.max(1) as f32 / speed).min(self.max_age)
    }

    /// Population cap derived from the cached road-tile count.
    pub fn capacity(&self, road_tiles: usize, device: DeviceProfile) -> usize {
        match device {
            DeviceProfile::Desktop => self
                .desktop_floor
                .max(road_tiles * self.desktop_per_road_tile),
            DeviceProfile::Constrained => self
                .constrained_floor
                .max(road_tiles * self.constrained_per_road_tile),
        }
    }
}

// ---------------------------------------------------------------------------
// Emergency services
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyParams {
    /// Seconds of scaled time between incident detection sweeps.
    pub detection_interval: f32,
    pub fire_truck_speed: f32,
    pub police_car_speed: f32,
    /// On-scene service time for fire trucks.
    pub fire_service_time: f32,
    /// On-scene service time for police cars.
    pub police_service_time: f32,
    pub police_quota_min: usize,
    pub police_quota_max: usize,
    pub police_quota_per_station: usize,
}

impl Default for EmergencyParams {
    fn default() -> Self {
        Self {
            detection_interval: 1.5,
            fire_truck_speed: 1.25,
            police_car_speed: 1.5,
            fire_service_time: 8.0,
            police_service_time: 5.0,
            police_quota_min: 3,
            police_quota_max: 6,
            police_quota_per_station: 2,
        }
    }
}

impl EmergencyParams {
    /// Police dispatches allowed per detection sweep:
    /// `max(3, min(6, 2 × stations))` with the default tunables.
    pub fn police_quota(&self, stations: usize) -> usize {
        (stations * self.police_quota_per_station)
            .min(self.police_quota_max)
            .max(self.police_quota_min)
    }
}

// ---------------------------------------------------------------------------
// Crime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrimeParams {
    pub spawn_interval: (f32, f32),
    /// Incidents allowed per this many residents (at least `min_active`).
    pub residents_per_incident: u64,
    pub min_active: usize,
    /// Spawn attempts per generator cycle, each gated by the band probability.
    pub spawn_attempts: usize,
    /// Candidate tiles sampled per spawn attempt.
    pub placement_tries: usize,
    /// `(coverage upper bound, probability)` bands, checked in order.
    pub probability_bands: Vec<(f32, f32)>,
    /// Probability when average coverage exceeds every band.
    pub base_probability: f32,
    pub min_placement_weight: f32,
    pub robbery_duration: f32,
    pub burglary_duration: f32,
    pub disturbance_duration: f32,
    pub traffic_duration: f32,
    /// Chance that an escaped robbery or burglary sets its building alight.
    pub escalation_fire_chance: f32,
}

impl Default for CrimeParams {
    fn default() -> Self {
        Self {
            spawn_interval: (3.0, 5.0),
            residents_per_incident: 500,
            min_active: 2,
            spawn_attempts: 3,
            placement_tries: 8,
            probability_bands: vec![(20.0, 0.4), (40.0, 0.25), (60.0, 0.15)],
            base_probability: 0.08,
            min_placement_weight: 0.1,
            robbery_duration: 30.0,
            burglary_duration: 30.0,
            disturbance_duration: 20.0,
            traffic_duration: 15.0,
            escalation_fire_chance: 0.05,
        }
    }
}

impl CrimeParams {
    pub fn spawn_probability(&self, average_coverage: f32) -> f32 {
        self.probability_bands
            .iter()
            .find(|(bound, _)| average_coverage < *bound)
            .map_or(self.base_probability, |(_, p)| *p)
    }

    pub fn max_active(&self, total_population: u64) -> usize {
        let by_population = total_population / self.residents_per_incident.max(1);
        (by_population as usize).max(self.min_active)
    }

    /// Acceptance probability for placing an incident on a tile.
    pub fn placement_weight(&self, coverage: f32) -> f32 {
        (1.0 - coverage / 100.0).max(self.min_placement_weight)
    }
}

// ---------------------------------------------------------------------------
// Aircraft
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftParams {
    pub min_zoom: f32,
    pub airplane_min_population: u64,
    pub airplane_spawn_interval: (f32, f32),
    pub airplanes_per_airport: usize,
    pub airplane_max: usize,
    /// Screen pixels per second at cruise.
    pub airplane_speed: f32,
    pub takeoff_time: f32,
    pub flight_time: (f32, f32),
    pub airplane_max_age: f32,
    /// Radians per second.
    pub airplane_turn_rate: f32,
    /// Distance over which a landing airplane descends to the runway.
    pub glide_distance: f32,
    pub helicopter_min_population: u64,
    pub helicopter_spawn_interval: (f32, f32),
    pub helicopter_max: usize,
    pub helicopter_speed: f32,
    /// Vertical climb / descent time at either end of a hop.
    pub hover_time: f32,
    pub helicopter_max_age: f32,
    pub color_variants: u8,
}

impl Default for AircraftParams {
    fn default() -> Self {
        Self {
            min_zoom: 0.25,
            airplane_min_population: 2000,
            airplane_spawn_interval: (6.0, 14.0),
            airplanes_per_airport: 2,
            airplane_max: 6,
            airplane_speed: 90.0,
            takeoff_time: 3.0,
            flight_time: (12.0, 24.0),
            airplane_max_age: 60.0,
            airplane_turn_rate: 1.2,
            glide_distance: 400.0,
            helicopter_min_population: 500,
            helicopter_spawn_interval: (4.0, 9.0),
            helicopter_max: 5,
            helicopter_speed: 55.0,
            hover_time: 1.5,
            helicopter_max_age: 45.0,
            color_variants: 4,
        }
    }
}

impl AircraftParams {
    pub fn airplane_capacity(&self, airports: usize) -> usize {
        (airports * self.airplanes_per_airport).min(self.airplane_max)
    }

    pub fn helicopter_capacity(&self, heliports: usize) -> usize {
        heliports.min(self.helicopter_max)
    }
}

// ---------------------------------------------------------------------------
// Boats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoatParams {
    pub min_zoom: f32,
    pub min_population: u64,
    pub spawn_interval: (f32, f32),
    pub boats_per_marina: usize,
    pub max_boats: usize,
    pub speed: (f32, f32),
    pub lifetime: (f32, f32),
    /// Waypoints per tour, inclusive range.
    pub waypoints: (usize, usize),
    /// Tour waypoints are water tiles within this Manhattan radius of the marina.
    pub tour_radius: usize,
    pub turn_rate: f32,
    pub color_variants: u8,
}

impl Default for BoatParams {
    fn default() -> Self {
        Self {
            min_zoom: 0.3,
            min_population: 300,
            spawn_interval: (3.0, 7.0),
            boats_per_marina: 3,
            max_boats: 12,
            speed: (18.0, 28.0),
            lifetime: (40.0, 80.0),
            waypoints: (2, 4),
            tour_radius: 10,
            turn_rate: 2.5,
            color_variants: 5,
        }
    }
}

impl BoatParams {
    pub fn capacity(&self, marinas: usize) -> usize {
        (marinas * self.boats_per_marina).min(self.max_boats)
    }
}

// ---------------------------------------------------------------------------
// Top-level resource
// ---------------------------------------------------------------------------

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentParams {
    pub cars: CarParams,
    pub pedestrians: PedestrianParams,
    pub emergency: EmergencyParams,
    pub crime: CrimeParams,
    pub aircraft: AircraftParams,
    pub boats: BoatParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_capacity_bounds() {
        let p = CarParams::default();
        assert_eq!(p.capacity(4), 16);
        assert_eq!(p.capacity(40), 80);
        assert_eq!(p.capacity(256), 160);
    }

    #[test]
    fn test_pedestrian_capacity_by_device() {
        let p = PedestrianParams::default();
        assert_eq!(p.capacity(10, DeviceProfile::Desktop), 200);
        assert_eq!(p.capacity(100, DeviceProfile::Desktop), 300);
        assert_eq!(p.capacity(10, DeviceProfile::Constrained), 60);
        assert_eq!(p.capacity(100, DeviceProfile::Constrained), 100);
    }

    #[test]
    fn test_pedestrian_leg_limit_scales_with_route() {
        let p = PedestrianParams::default();
        // 40 tiles at 0.25 tiles/s is 160 s of walking.
        assert_eq!(p.leg_time_limit(40, 0.25), 480.0);
        assert!(p.leg_time_limit(80, 0.25) > p.leg_time_limit(40, 0.25));
        assert_eq!(p.leg_time_limit(1000, 0.25), p.max_age);
        assert_eq!(p.leg_time_limit(10, 0.0), p.max_age);
    }

    #[test]
    fn test_police_quota_bounds() {
        let p = EmergencyParams::default();
        assert_eq!(p.police_quota(0), 3);
        assert_eq!(p.police_quota(1), 3);
        assert_eq!(p.police_quota(2), 4);
        assert_eq!(p.police_quota(10), 6);
    }

    #[test]
    fn test_crime_probability_bands() {
        let p = CrimeParams::default();
        assert_eq!(p.spawn_probability(0.0), 0.4);
        assert_eq!(p.spawn_probability(19.9), 0.4);
        assert_eq!(p.spawn_probability(20.0), 0.25);
        assert_eq!(p.spawn_probability(45.0), 0.15);
        assert_eq!(p.spawn_probability(60.0), 0.08);
        assert_eq!(p.spawn_probability(100.0), 0.08);
    }

    #[test]
    fn test_crime_caps_and_weights() {
        let p = CrimeParams::default();
        assert_eq!(p.max_active(0), 2);
        assert_eq!(p.max_active(999), 2);
        assert_eq!(p.max_active(5_000), 10);
        assert_eq!(p.placement_weight(0.0), 1.0);
        assert!((p.placement_weight(50.0) - 0.5).abs() < 1e-6);
        assert_eq!(p.placement_weight(100.0), 0.1);
    }
}
