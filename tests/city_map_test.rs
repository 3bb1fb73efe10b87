//! Layout validation and street topology tests

use std::collections::HashSet;

use city_traffic::simulation::{
    Cell, CityLayout, Direction, ParkingId, SimConfig, SimWorld, CITY_HEIGHT, CITY_WIDTH,
};

fn build(layout: &CityLayout) -> anyhow::Result<SimWorld> {
    let config = SimConfig {
        cars: 0,
        seed: Some(1),
        ..SimConfig::default()
    };
    SimWorld::from_layout(layout, config)
}

#[test]
fn test_downtown_layout_is_valid() {
    let layout = CityLayout::downtown();
    layout.validate().unwrap();

    assert_eq!((layout.width(), layout.height()), (CITY_WIDTH, CITY_HEIGHT));
    assert_eq!(layout.parking_lots().len(), 17);
    assert_eq!(layout.lights().len(), 12);
    assert_eq!(layout.pairs().len(), 6);

    let ids: HashSet<ParkingId> = layout.parking_lots().iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, (1..=17).map(ParkingId).collect());
    assert!(layout.parking_lots().contains(&(ParkingId(1), Cell::new(2, 20))));
}

#[test]
fn test_downtown_lots_sit_on_streets_inside_buildings() {
    let world = build(&CityLayout::downtown()).unwrap();
    for (id, cell) in world.parking_lots() {
        let contents = world.grid().get(cell).unwrap();
        assert!(contents.street().is_some(), "lot {:?} at {} has no street", id, cell);
        assert!(contents.has_building(), "lot {:?} at {} is not inside a building", id, cell);
    }
}

#[test]
fn test_downtown_pairs_are_disjoint() {
    let world = build(&CityLayout::downtown()).unwrap();
    let mut seen = HashSet::new();
    for pair in world.lights().pairs() {
        assert!(seen.insert(pair.first));
        assert!(seen.insert(pair.second));
    }
    assert_eq!(seen.len(), 12);

    let first = world.lights().pairs().next().unwrap();
    let light = world.lights().light(first.first).unwrap();
    assert_eq!(light.positions, vec![Cell::new(0, 12), Cell::new(1, 12)]);
    assert_eq!(light.orientation, Direction::Down);
}

#[test]
fn test_turns_only_apply_to_streets() {
    let mut layout = CityLayout::new(3, 1);
    layout
        .street(Cell::new(0, 0), &[Direction::Right])
        .street(Cell::new(0, 0), &[Direction::Up])
        .turn(Cell::new(0, 0), Direction::Down)
        .turn(Cell::new(2, 0), Direction::Left);

    let streets: Vec<_> = layout.streets().collect();
    assert_eq!(streets.len(), 1);
    let (cell, street) = streets[0];
    assert_eq!(cell, Cell::new(0, 0));
    assert_eq!(street.exits().len(), 3);
    assert!(!street.allows(Direction::Left));
}

#[test]
fn test_duplicate_lot_id_rejected() {
    let mut layout = CityLayout::new(3, 1);
    layout
        .parking_lot(ParkingId(1), Cell::new(0, 0))
        .parking_lot(ParkingId(1), Cell::new(2, 0));
    let err = layout.validate().unwrap_err();
    assert!(err.to_string().contains("more than once"), "{}", err);
    assert!(build(&layout).is_err());
}

#[test]
fn test_two_lots_on_one_cell_rejected() {
    let mut layout = CityLayout::new(3, 1);
    layout
        .parking_lot(ParkingId(1), Cell::new(0, 0))
        .parking_lot(ParkingId(2), Cell::new(0, 0));
    assert!(layout.validate().is_err());
}

#[test]
fn test_out_of_bounds_entities_rejected() {
    let mut street = CityLayout::new(3, 3);
    street.street(Cell::new(3, 0), &[Direction::Up]);
    assert!(street.validate().is_err());

    let mut building = CityLayout::new(3, 3);
    building.building(Cell::new(0, -1));
    assert!(building.validate().is_err());

    let mut light = CityLayout::new(3, 3);
    light.light(vec![Cell::new(1, 1), Cell::new(1, 5)], Direction::Up);
    assert!(light.validate().is_err());

    assert!(CityLayout::new(0, 4).validate().is_err());
}

#[test]
fn test_bad_light_pairing_rejected() {
    let mut missing = CityLayout::new(3, 3);
    missing.light(vec![Cell::new(0, 0)], Direction::Up).pair(0, 1);
    let err = missing.validate().unwrap_err();
    assert!(err.to_string().contains("undefined light"), "{}", err);

    let mut reused = CityLayout::new(3, 3);
    reused
        .light(vec![Cell::new(0, 0)], Direction::Up)
        .light(vec![Cell::new(1, 0)], Direction::Up)
        .light(vec![Cell::new(2, 0)], Direction::Up)
        .pair(0, 1)
        .pair(1, 2);
    assert!(reused.validate().is_err());

    let mut overlapping = CityLayout::new(3, 3);
    overlapping
        .light(vec![Cell::new(0, 0)], Direction::Up)
        .light(vec![Cell::new(0, 0)], Direction::Left);
    assert!(overlapping.validate().is_err());

    let mut empty = CityLayout::new(3, 3);
    empty.light(Vec::new(), Direction::Up);
    assert!(empty.validate().is_err());
}

/// A right-bound corridor with lot 1 at the start and lot 2 at the end
fn one_way_corridor() -> CityLayout {
    let mut layout = CityLayout::new(5, 1);
    for x in 0..5 {
        layout.street(Cell::new(x, 0), &[Direction::Right]);
    }
    layout
        .parking_lot(ParkingId(1), Cell::new(0, 0))
        .parking_lot(ParkingId(2), Cell::new(4, 0));
    layout
}

#[test]
fn test_topology_follows_street_direction() {
    let world = build(&one_way_corridor()).unwrap();
    let topology = world.topology();

    assert_eq!(topology.node_count(), 5);
    assert!(topology.has_route(Cell::new(0, 0), Cell::new(4, 0)));
    assert!(!topology.has_route(Cell::new(4, 0), Cell::new(2, 0)));
    assert!(!topology.has_route(Cell::new(0, 0), Cell::new(9, 9)));

    // Lots are enterable from any side
    let exits = topology.exits_from(Cell::new(1, 0));
    assert_eq!(exits.len(), 2);
    assert!(exits.contains(&(Direction::Right, Cell::new(2, 0))));
    assert!(exits.contains(&(Direction::Left, Cell::new(0, 0))));

    assert_eq!(
        topology.unreachable_lot_pairs(),
        vec![(ParkingId(2), ParkingId(1))]
    );
}

#[test]
fn test_downtown_topology_covers_every_lot() {
    let world = build(&CityLayout::downtown()).unwrap();
    let topology = world.topology();
    for (_, cell) in world.parking_lots() {
        assert!(!topology.exits_from(cell).is_empty(), "lot {} has no way out", cell);
    }
    let drivable = world
        .grid()
        .cells()
        .filter(|(_, contents)| contents.street().is_some() || contents.parking().is_some())
        .count();
    assert_eq!(topology.node_count(), drivable);

    // Building next to lot 1, never a place a car stands
    assert!(topology.exits_from(Cell::new(3, 20)).is_empty());
}

#[test]
fn test_topology_ignores_cells_no_car_can_stand_on() {
    let mut layout = CityLayout::new(3, 2);
    layout
        .street(Cell::new(0, 0), &[Direction::Right])
        .street(Cell::new(1, 0), &[Direction::Right])
        .parking_lot(ParkingId(1), Cell::new(2, 0))
        .building(Cell::new(2, 1));
    let world = build(&layout).unwrap();
    let topology = world.topology();

    assert_eq!(topology.node_count(), 3);
    assert_eq!(topology.edge_count(), 2);
    assert!(topology.exits_from(Cell::new(2, 1)).is_empty());
    assert!(topology.exits_from(Cell::new(1, 1)).is_empty());
    assert!(!topology.has_route(Cell::new(2, 1), Cell::new(2, 0)));
}
