use crate::grid::{BuildingKind, TileCoord};
use crate::integration_tests::{no_random_crime, port_city, run_until, small_town};

// ---------------------------------------------------------------------------
// Aircraft
// ---------------------------------------------------------------------------

#[test]
fn test_port_city_gets_airplanes_and_helicopters() {
    let mut world = port_city();
    let (mut planes, mut helis) = (0, 0);
    for _ in 0..300 {
        world.tick(1);
        let aircraft = world.aircraft();
        planes += aircraft.airplanes().len();
        helis += aircraft.helicopters().len();
        for plane in aircraft.airplanes() {
            assert_eq!(plane.airport, TileCoord::new(16, 16));
            assert!(plane.x.is_finite() && plane.y.is_finite());
            assert!((0.0..=1.0).contains(&plane.altitude));
        }
        for heli in aircraft.helicopters() {
            assert_ne!(heli.origin, heli.destination);
        }
    }
    assert!(planes > 0);
    assert!(helis > 0);
}

#[test]
fn test_aircraft_capacity_over_a_long_run() {
    let mut world = port_city();
    for _ in 0..1200 {
        world.tick(1);
        // One airport: two airplanes. Three helipads: three helicopters.
        assert!(world.aircraft().airplanes().len() <= 2);
        assert!(world.aircraft().helicopters().len() <= 3);
    }
}

#[test]
fn test_small_town_has_no_air_traffic() {
    let mut world = small_town()
        .with_params(no_random_crime())
        .with_building(16, 16, BuildingKind::Airport, 0, 40);
    // 120 residents: below both the airplane and the helicopter threshold.
    world.run_for(30.0);
    assert!(world.aircraft().is_empty());
}

#[test]
fn test_losing_population_grounds_aircraft() {
    let mut world = port_city();
    assert!(run_until(&mut world, 300, |w| !w.aircraft().airplanes().is_empty()));

    world.grid_mut().clear(6, 19);
    world.tick(1);
    assert!(world.aircraft().airplanes().is_empty());
}

// ---------------------------------------------------------------------------
// Boats
// ---------------------------------------------------------------------------

#[test]
fn test_marina_launches_boats_onto_the_lake() {
    let mut world = port_city();
    let mut launched = 0;
    for _ in 0..300 {
        world.tick(1);
        let boats = world.boats().boats();
        // One marina: three boats at most.
        assert!(boats.len() <= 3);
        launched += boats.len();
        for boat in boats {
            assert_eq!(boat.marina, TileCoord::new(22, 25));
            assert_eq!(boat.dock, TileCoord::new(23, 25));
            assert!(boat.waypoints.iter().all(|&w| world.grid().is_water(w)));
        }
    }
    assert!(launched > 0);
}

#[test]
fn test_landlocked_marina_launches_nothing() {
    let mut world = small_town()
        .with_params(no_random_crime())
        .with_building(6, 19, BuildingKind::Residential, 2500, 0)
        .with_building(22, 25, BuildingKind::Marina, 0, 4);
    world.run_for(20.0);
    assert!(world.boats().is_empty());
}

// ---------------------------------------------------------------------------
// Zoom
// ---------------------------------------------------------------------------

#[test]
fn test_far_zoom_clears_aircraft_and_boats() {
    let mut world = port_city();
    assert!(run_until(&mut world, 300, |w| {
        !w.aircraft().is_empty() && !w.boats().is_empty()
    }));

    world.set_zoom(0.2);
    world.tick(1);
    assert!(world.aircraft().is_empty());
    assert!(world.boats().is_empty());
    assert!(world.pedestrians().is_empty());
    assert!(!world.cars().is_empty());
}

#[test]
fn test_mid_zoom_keeps_aircraft_but_not_boats() {
    let mut world = port_city().with_zoom(0.28);
    assert!(run_until(&mut world, 300, |w| !w.aircraft().is_empty()));
    world.run_for(10.0);
    assert!(world.boats().is_empty());
}
