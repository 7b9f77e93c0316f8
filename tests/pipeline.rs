use std::fs;
use std::path::PathBuf;

use bus_routing::config::Config;
use bus_routing::layers::city::City;
use bus_routing::layers::road_network::GraphNode;
use bus_routing::layers::transit_network::stitched_segment_count;
use bus_routing::layers::zone::Zone;

const STOPS: &str = "stop_id,stop_lat,stop_lon,stop_name
A,28.65,77.25,Shastri Park
B,28.65,77.15,Kashmere Gate
C,28.55,77.25,Nehru Place
D,28.55,77.15,Dhaula Kuan
E,28.45,77.15,Gurgaon Border
F,28.45,77.25,Badarpur
G,28.75,77.35,Loni
H,28.50,76.80,Outside
bad,,77.2,Missing latitude
";

const STOP_TIMES: &str = "trip_id,stop_id
T1,A
T1,B
T1,C
R1,B
R1,D
R1,E
R1,F
R1,C
R2,C
R2,D
R2,H
R2,B
R2,A
R3,G
R3,H
";

const ROSTER: &str = "Driver ID,Driver Name,Zone,Bus Assigned,Shift
1,Asha,NE,,morning
2,Ravi,NE,,evening
3,Kiran,NW,,morning
4,Meena,SE,,night
5,Dev,north,,night
";

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bus-routing-pipeline-{}", std::process::id()));
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_full_run() {
    let dir = scratch_dir();
    let stops = dir.join("stops.csv");
    let stop_times = dir.join("stop_times.csv");
    let roster = dir.join("drivers.csv");
    fs::write(&stops, STOPS).unwrap();
    fs::write(&stop_times, STOP_TIMES).unwrap();
    fs::write(&roster, ROSTER).unwrap();

    let city = City::load(Config::default(), &stops, &stop_times).unwrap();
    assert_eq!(city.gtfs.rejected.len(), 1);
    assert_eq!(city.gtfs.stops.len(), 8);

    // R3 keeps only G, H is outside the box
    let trip_ids: Vec<&str> = city.network.trips.iter().map(|t| t.trip_id.as_str()).collect();
    assert_eq!(trip_ids, vec!["T1", "R1", "R2"]);
    assert_eq!(city.network.trips[2].stop_ids, vec!["C", "D", "B", "A"]);
    assert!(city.network.is_orphan("G"));
    assert!(city.network.is_orphan("H"));

    let report = city.stitch_routes();
    assert!(report.failures.is_empty());
    assert_eq!(report.routes.len(), 3);
    for (route, trip) in report.routes.iter().zip(city.network.trips.iter()) {
        assert_eq!(route.segments, stitched_segment_count(trip.stop_ids.len()));
    }

    // Three stops, nothing stitched
    assert!(report.routes[0].nodes.is_empty());

    let node = |id: &str| GraphNode::from(city.gtfs.stops.get(id).unwrap());
    // B-D, D-E routed; E-F and F-C left out
    assert_eq!(report.routes[1].nodes, vec![node("B"), node("D"), node("E")]);
    // C-D routed; D-B and B-A left out
    assert_eq!(report.routes[2].nodes, vec![node("C"), node("D")]);

    let pool = city.bus_pool();
    assert_eq!(pool.buses(Zone::NE), ["T1"]);
    assert_eq!(pool.buses(Zone::NW), ["R1"]);
    assert_eq!(pool.buses(Zone::SE), ["R2"]);

    let assignments = city.driver_assigner().assign_and_persist(&roster).unwrap();
    assert_eq!(assignments.len(), 3);
    assert_eq!(assignments["1"].bus_id, "T1");
    assert!(!assignments.contains_key("2"));
    assert_eq!(assignments["3"].bus_id, "R1");
    assert_eq!(assignments["4"].bus_id, "R2");

    assert_eq!(
        fs::read_to_string(&roster).unwrap(),
        "Driver ID,Driver Name,Zone,Bus Assigned,Shift
1,Asha,NE,T1,morning
2,Ravi,NE,,evening
3,Kiran,NW,R1,morning
4,Meena,SE,R2,night
5,Dev,north,,night
"
    );

    fs::remove_dir_all(&dir).ok();
}
