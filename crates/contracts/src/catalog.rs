//! Blueprint catalog used as the default phantom population.

/// Static props that can be dropped next to the road
pub const STATIC_PROPS: [&str; 7] = [
    "static.prop.trafficcone01",
    "static.prop.trafficcone02",
    "static.prop.trafficwarning",
    "static.prop.streetbarrier",
    "static.prop.constructioncone",
    "static.prop.warningconstruction",
    "static.prop.warningaccident",
];

/// Parked vehicles
pub const VEHICLES: [&str; 15] = [
    "vehicle.tesla.model3",
    "vehicle.lincoln.mkz_2020",
    "vehicle.dodge.charger_2020",
    "vehicle.ford.crown",
    "vehicle.mercedes.coupe_2020",
    "vehicle.nissan.patrol_2021",
    "vehicle.audi.a2",
    "vehicle.audi.tt",
    "vehicle.bmw.grandtourer",
    "vehicle.chevrolet.impala",
    "vehicle.citroen.c3",
    "vehicle.jeep.wrangler_rubicon",
    "vehicle.mini.cooper_s",
    "vehicle.toyota.prius",
    "vehicle.volkswagen.t2",
];

/// Full default catalog: static props first, then vehicles
pub fn default_catalog() -> Vec<String> {
    STATIC_PROPS
        .iter()
        .chain(VEHICLES.iter())
        .map(|id| id.to_string())
        .collect()
}

pub fn is_known_blueprint(id: &str) -> bool {
    STATIC_PROPS.contains(&id) || VEHICLES.contains(&id)
}
