//! Behavioural tests for auditing a whole city network.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use transit_audit_core::{
    City, CityMeta, Element, ElementId, EntranceUsage, Member, Tags, TransportCategory,
};

const FIRST_MASTER: i64 = 1000;
const SECOND_MASTER: i64 = 2000;

#[fixture]
fn record_fields() -> RefCell<Vec<String>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn elements() -> RefCell<Vec<Element>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn audited() -> RefCell<Option<(City, EntranceUsage)>> {
    RefCell::new(None)
}

fn station(id: i64) -> Element {
    Element::node(
        id,
        Tags::from_pairs([
            ("railway", "station"),
            ("station", "subway"),
            ("name", "Station"),
        ]),
    )
}

fn stop_area(id: i64, members: &[ElementId]) -> Element {
    Element::relation(
        id,
        Tags::from_pairs([("type", "public_transport"), ("public_transport", "stop_area")]),
        members.iter().map(|target| Member::new(*target, "")).collect(),
    )
}

fn route(id: i64, line: &str, stops: &[i64]) -> Element {
    Element::relation(
        id,
        Tags::from_pairs([
            ("type", "route"),
            ("route", "subway"),
            ("ref", line),
            ("from", "Start"),
            ("to", "End"),
        ]),
        stops
            .iter()
            .map(|stop| Member::new(ElementId::node(*stop), "stop"))
            .collect(),
    )
}

/// A route master with a route each way through `stops`.
fn line(master: i64, line: &str, stops: &[i64]) -> Vec<Element> {
    let reversed: Vec<i64> = stops.iter().rev().copied().collect();
    let forward = route(master + 1, line, stops);
    let backward = route(master + 2, line, &reversed);
    let relation = Element::relation(
        master,
        Tags::from_pairs([
            ("type", "route_master"),
            ("route_master", "subway"),
            ("ref", line),
        ]),
        vec![Member::new(forward.id, ""), Member::new(backward.id, "")],
    );
    vec![relation, forward, backward]
}

fn with_city<T>(
    audited: &RefCell<Option<(City, EntranceUsage)>>,
    check: impl FnOnce(&City, &EntranceUsage) -> T,
) -> T {
    let guard = audited.borrow();
    let (city, entrances) = guard.as_ref().expect("city audited");
    check(city, entrances)
}

fn error_mentions(city: &City, needle: &str) -> bool {
    city.report().errors.iter().any(|error| error.contains(needle))
}

fn warning_mentions(city: &City, needle: &str) -> bool {
    city.report()
        .warnings
        .iter()
        .any(|warning| warning.contains(needle))
}

#[given("a rapid city expecting {stations} stations and {interchanges} interchanges")]
fn rapid_city(
    stations: u32,
    interchanges: u32,
    #[from(record_fields)] fields: &RefCell<Vec<String>>,
) {
    *fields.borrow_mut() = [
        "1",
        "Testville",
        "Testland",
        "Europe",
        &stations.to_string(),
        "1",
        "0",
        &interchanges.to_string(),
        "",
    ]
    .iter()
    .map(|field| (*field).to_owned())
    .collect();
}

#[given("a subway line through {count} stations")]
fn long_line(count: i64, #[from(elements)] elements: &RefCell<Vec<Element>>) {
    let stops: Vec<i64> = (1..=count).collect();
    let mut data = elements.borrow_mut();
    data.extend(stops.iter().map(|id| station(*id)));
    data.extend(line(FIRST_MASTER, "1", &stops));
}

#[given("two lines meeting at a grouped interchange")]
fn interchange_lines(
    #[from(record_fields)] fields: &RefCell<Vec<String>>,
    #[from(elements)] elements: &RefCell<Vec<Element>>,
) {
    if let Some(lines) = fields.borrow_mut().get_mut(5) {
        "2".clone_into(lines);
    }
    let mut data = elements.borrow_mut();
    data.extend((1..=4).map(station));
    data.push(stop_area(20, &[ElementId::node(2)]));
    data.push(stop_area(30, &[ElementId::node(3)]));
    data.push(Element::relation(
        100,
        Tags::from_pairs([
            ("type", "public_transport"),
            ("public_transport", "stop_area_group"),
        ]),
        vec![
            Member::new(ElementId::relation(20), ""),
            Member::new(ElementId::relation(30), ""),
        ],
    ));
    data.extend(line(FIRST_MASTER, "1", &[1, 2]));
    data.extend(line(SECOND_MASTER, "2", &[3, 4]));
}

#[given("the second line is removed")]
fn remove_second_line(#[from(elements)] elements: &RefCell<Vec<Element>>) {
    let second = SECOND_MASTER..=SECOND_MASTER + 2;
    elements
        .borrow_mut()
        .retain(|element| !second.contains(&element.id.id));
}

#[given("a subway line under construction")]
fn construction_line(#[from(elements)] elements: &RefCell<Vec<Element>>) {
    let mut data = elements.borrow_mut();
    data.extend([station(1), station(2)]);
    let mut planned = route(FIRST_MASTER + 1, "1", &[1, 2]);
    planned.tags.insert("construction", "yes");
    data.push(planned);
}

#[given("a subway line with one entrance in a stop area and one stray entrance")]
fn line_with_entrances(#[from(elements)] elements: &RefCell<Vec<Element>>) {
    let entrance = |id| Element::node(id, Tags::from_pairs([("railway", "subway_entrance")]));
    let mut data = elements.borrow_mut();
    data.extend([station(1), station(2), entrance(501), entrance(502)]);
    data.push(stop_area(10, &[ElementId::node(1), ElementId::node(501)]));
    data.extend(line(FIRST_MASTER, "1", &[1, 2]));
}

#[given("{lines} one-way lines over {count} stations")]
fn one_way_lines(lines: i64, count: i64, #[from(elements)] elements: &RefCell<Vec<Element>>) {
    let mut data = elements.borrow_mut();
    data.extend((1..=count).map(station));
    for index in 1..=lines {
        let first = index * 2 - 1;
        data.push(route(100 + index, &index.to_string(), &[first, first + 1]));
    }
}

#[when("the city is audited")]
fn audit_city(
    #[from(record_fields)] fields: &RefCell<Vec<String>>,
    #[from(elements)] elements: &RefCell<Vec<Element>>,
    #[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>,
) {
    let fields = fields.borrow();
    let borrowed: Vec<&str> = fields.iter().map(String::as_str).collect();
    let record = CityMeta::from_record(&borrowed, TransportCategory::Rapid).expect("valid record");
    let mut city = City::new(record);
    for element in elements.borrow_mut().drain(..) {
        city.add(element);
    }
    city.extract_routes();
    let entrances = city.validate();
    *audited.borrow_mut() = Some((city, entrances));
}

#[then("{count} stations are found")]
fn stations_found(count: usize, #[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        assert_eq!(city.report().stations_found, count, "station count");
    });
}

#[then("the station count is reported as a warning")]
fn station_warning(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        assert!(warning_mentions(city, "stations in routes, expected 100"));
        assert!(!error_mentions(city, "stations in routes"));
    });
}

#[then("the station count is reported as an error")]
fn station_error(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        assert!(error_mentions(city, "Found 97 stations in routes, expected 100"));
        assert!(!city.is_good());
    });
}

#[then("{count} interchanges are found")]
fn interchanges_found(
    count: usize,
    #[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>,
) {
    with_city(audited, |city, _| {
        assert_eq!(city.report().transfers_found, count, "interchange count");
    });
}

#[then("the city passes")]
fn city_passes(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        let report = city.report();
        assert!(report.is_good(), "unexpected errors: {:?}", report.errors);
    });
}

#[then("the interchange count is reported as an error")]
fn interchange_error(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        assert!(error_mentions(city, "Found 0 interchanges, expected 1"));
    });
}

#[then("each line is flagged for a missing return route")]
fn missing_return_routes(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        let lines = city.network().masters.len();
        let flagged = city
            .report()
            .errors
            .iter()
            .filter(|error| error.contains("Only one route in route_master"))
            .count();
        assert_eq!(lines, 2);
        assert_eq!(flagged, lines);
    });
}

#[then("1 station is reported unused")]
fn one_unused_station(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        assert_eq!(city.found().unused_stations, 1);
        assert!(warning_mentions(city, "1 unused stations: n5"));
    });
}

#[then("no route has been built")]
fn no_routes(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |city, _| {
        assert!(city.network().masters.is_empty());
    });
}

#[then("{count} entrances are unused")]
fn unused_entrances(
    count: usize,
    #[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>,
) {
    with_city(audited, |city, _| {
        assert_eq!(city.report().unused_entrances, count, "unused entrances");
        assert!(warning_mentions(city, "n502"));
    });
}

#[then("the stop-area entrance is reported as used")]
fn entrance_used(#[from(audited)] audited: &RefCell<Option<(City, EntranceUsage)>>) {
    with_city(audited, |_, entrances| {
        assert!(entrances.contains(&ElementId::node(501)));
        assert!(!entrances.contains(&ElementId::node(502)));
    });
}

#[scenario(path = "tests/features/city_audit.feature", index = 0)]
fn tolerating_small_shortfall(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}

#[scenario(path = "tests/features/city_audit.feature", index = 1)]
fn rejecting_large_shortfall(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}

#[scenario(path = "tests/features/city_audit.feature", index = 2)]
fn counting_interchanges(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}

#[scenario(path = "tests/features/city_audit.feature", index = 3)]
fn dropping_unserved_interchanges(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}

#[scenario(path = "tests/features/city_audit.feature", index = 4)]
fn ignoring_construction(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}

#[scenario(path = "tests/features/city_audit.feature", index = 5)]
fn counting_entrances(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}

#[scenario(path = "tests/features/city_audit.feature", index = 6)]
fn flagging_one_way_lines(
    record_fields: RefCell<Vec<String>>,
    elements: RefCell<Vec<Element>>,
    audited: RefCell<Option<(City, EntranceUsage)>>,
) {
    let _ = (record_fields, elements, audited);
}
