use crate::gtfs::error::Error;
use crate::gtfs::structs::*;

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::{fs::File, io::Read, path::Path, str::FromStr};

const STOPS_FILE: &str = "stops.txt";
const STOP_TIMES_FILE: &str = "stop_times.txt";
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Helper function to deserialize optional fields that might fail to parse
pub fn deserialize_opt<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: FromStr,
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => match T::from_str(s.trim()) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Ok(None), // Instead of failing, just return None
        },
        None => Ok(None),
    }
}

/// Every stop of the feed, keyed by `stop_id`, in file order.
#[derive(Debug, Default, Clone)]
pub struct StopCatalog {
    stops: Vec<Stop>,
    index: HashMap<String, usize>,
}

impl StopCatalog {
    pub fn new() -> Self {
        StopCatalog::default()
    }

    /// Insert a stop. A stop id seen before keeps its position but takes the new values.
    pub fn insert(&mut self, stop: Stop) {
        match self.index.get(stop.id()) {
            Some(&i) => self.stops[i] = stop,
            None => {
                self.index.insert(stop.stop_id.clone(), self.stops.len());
                self.stops.push(stop);
            }
        }
    }

    pub fn get(&self, stop_id: &str) -> Option<&Stop> {
        self.index.get(stop_id).map(|&i| &self.stops[i])
    }

    pub fn contains(&self, stop_id: &str) -> bool {
        self.index.contains_key(stop_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    fn from_records(records: Vec<(u64, StopRecord)>, file_name: &str) -> (StopCatalog, Vec<Error>) {
        let mut catalog = StopCatalog::new();
        let mut rejected = Vec::new();
        for (line, record) in records {
            let malformed = |reason: &str| Error::MalformedRow {
                file_name: file_name.to_owned(),
                line,
                reason: reason.to_owned(),
            };
            let (stop_id, stop_lat, stop_lon) =
                match (record.stop_id, record.stop_lat, record.stop_lon) {
                    (None, _, _) => {
                        rejected.push(malformed("missing stop_id"));
                        continue;
                    }
                    (Some(_), None, _) => {
                        rejected.push(malformed("missing or invalid stop_lat"));
                        continue;
                    }
                    (Some(_), _, None) => {
                        rejected.push(malformed("missing or invalid stop_lon"));
                        continue;
                    }
                    (Some(id), Some(lat), Some(lon)) => (id, lat, lon),
                };
            // Stops without a display name are labelled with their id
            let stop_name = record.stop_name.unwrap_or_else(|| stop_id.clone());
            catalog.insert(Stop {
                stop_id,
                stop_lat,
                stop_lon,
                stop_name,
            });
        }
        (catalog, rejected)
    }
}

impl FromIterator<Stop> for StopCatalog {
    fn from_iter<I: IntoIterator<Item = Stop>>(iter: I) -> Self {
        let mut catalog = StopCatalog::new();
        for stop in iter {
            catalog.insert(stop);
        }
        catalog
    }
}

/// Ordered stop sequence of every trip. Trips are kept in order of first appearance.
#[derive(Debug, Default, Clone)]
pub struct TripRegistry {
    trips: Vec<Trip>,
    index: HashMap<String, usize>,
}

impl TripRegistry {
    pub fn new() -> Self {
        TripRegistry::default()
    }

    /// Append `stop_id` to the end of the sequence of `trip_id`, creating the trip if needed
    pub fn push_stop(&mut self, trip_id: &str, stop_id: &str) {
        let i = match self.index.get(trip_id) {
            Some(&i) => i,
            None => {
                self.index.insert(trip_id.to_owned(), self.trips.len());
                self.trips.push(Trip {
                    trip_id: trip_id.to_owned(),
                    stop_ids: Vec::new(),
                });
                self.trips.len() - 1
            }
        };
        self.trips[i].stop_ids.push(stop_id.to_owned());
    }

    pub fn get(&self, trip_id: &str) -> Option<&Trip> {
        self.index.get(trip_id).map(|&i| &self.trips[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trip> {
        self.trips.iter()
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    fn from_records(
        records: Vec<(u64, StopTimeRecord)>,
        file_name: &str,
    ) -> (TripRegistry, Vec<Error>) {
        let mut registry = TripRegistry::new();
        let mut rejected = Vec::new();
        for (line, record) in records {
            match (record.trip_id, record.stop_id) {
                (Some(trip_id), Some(stop_id)) => registry.push_stop(&trip_id, &stop_id),
                (trip_id, _) => rejected.push(Error::MalformedRow {
                    file_name: file_name.to_owned(),
                    line,
                    reason: if trip_id.is_none() {
                        "missing trip_id".to_owned()
                    } else {
                        "missing stop_id".to_owned()
                    },
                }),
            }
        }
        (registry, rejected)
    }
}

impl FromIterator<Trip> for TripRegistry {
    fn from_iter<I: IntoIterator<Item = Trip>>(iter: I) -> Self {
        let mut registry = TripRegistry::new();
        for trip in iter {
            for stop_id in trip.stop_ids.iter() {
                registry.push_stop(&trip.trip_id, stop_id);
            }
        }
        registry
    }
}

/// The stop and trip tables of one feed
pub struct Gtfs {
    pub stops: StopCatalog,
    pub trips: TripRegistry,
    /// Rows that were skipped while reading, one `MalformedRow` per row
    pub rejected: Vec<Error>,
}

impl Gtfs {
    /// Read `stops.txt` and `stop_times.txt` from a directory
    pub fn from_path<P>(path: P) -> Result<Gtfs, Error>
    where
        P: AsRef<Path>,
    {
        let p = path.as_ref();
        if p.is_dir() {
            Gtfs::from_files(p.join(STOPS_FILE), p.join(STOP_TIMES_FILE))
        } else {
            Err(Error::NotFileNorDirectory(format!("{}", p.display())))
        }
    }

    /// Read the stops table and the trip-stop table from explicit paths
    pub fn from_files<P, Q>(stops_path: P, stop_times_path: Q) -> Result<Gtfs, Error>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let stops_name = file_label(stops_path.as_ref());
        let stop_times_name = file_label(stop_times_path.as_ref());
        let stops_file = Gtfs::open(stops_path.as_ref(), &stops_name)?;
        let stop_times_file = Gtfs::open(stop_times_path.as_ref(), &stop_times_name)?;
        Gtfs::read_tables(stops_file, &stops_name, stop_times_file, &stop_times_name)
    }

    /// Read both tables from in-memory readers
    pub fn from_readers<S, T>(stops: S, stop_times: T) -> Result<Gtfs, Error>
    where
        S: Read,
        T: Read,
    {
        Gtfs::read_tables(stops, STOPS_FILE, stop_times, STOP_TIMES_FILE)
    }

    pub fn print_stats(&self) {
        println!("Feed data:");
        println!("  Stops: {}", self.stops.len());
        println!("  Trips: {}", self.trips.len());
        println!("  Rejected rows: {}", self.rejected.len());
    }

    fn read_tables<S, T>(
        stops: S,
        stops_name: &str,
        stop_times: T,
        stop_times_name: &str,
    ) -> Result<Gtfs, Error>
    where
        S: Read,
        T: Read,
    {
        let (stop_records, mut rejected) = Gtfs::read_obj::<_, StopRecord>(stops, stops_name)?;
        let (stop_time_records, rejected_times) =
            Gtfs::read_obj::<_, StopTimeRecord>(stop_times, stop_times_name)?;
        rejected.extend(rejected_times);

        let (stops, rejected_stops) = StopCatalog::from_records(stop_records, stops_name);
        let (trips, rejected_trips) = TripRegistry::from_records(stop_time_records, stop_times_name);
        rejected.extend(rejected_stops);
        rejected.extend(rejected_trips);

        for error in rejected.iter() {
            log::warn!("{}", error);
        }

        Ok(Gtfs {
            stops,
            trips,
            rejected,
        })
    }

    fn open(path: &Path, file_name: &str) -> Result<File, Error> {
        if !path.exists() {
            return Err(Error::MissingFile(file_name.to_owned()));
        }
        File::open(path).map_err(|e| Error::NamedFileIO {
            file_name: file_name.to_owned(),
            source: Box::new(e),
        })
    }

    /// Deserialize every row of a CSV table.
    /// Rows that cannot be deserialized are returned as `MalformedRow` errors, the others with their line number.
    fn read_obj<T, O>(mut reader: T, file_name: &str) -> Result<(Vec<(u64, O)>, Vec<Error>), Error>
    where
        for<'de> O: Deserialize<'de>,
        T: Read,
    {
        let mut bom = Vec::with_capacity(UTF8_BOM.len());
        reader
            .by_ref()
            .take(UTF8_BOM.len() as u64)
            .read_to_end(&mut bom)
            .map_err(|e| Error::NamedFileIO {
                file_name: file_name.to_owned(),
                source: Box::new(e),
            })?;

        let prefix: &[u8] = if bom == UTF8_BOM { &[] } else { &bom };
        let chained = prefix.chain(reader);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(chained);
        let headers = reader
            .headers()
            .map_err(|e| Error::CSVError {
                file_name: file_name.to_owned(),
                source: e,
            })?
            .clone()
            .into_iter()
            .map(|x| x.trim())
            .collect::<csv::StringRecord>();

        // Rows are read as bytes so that a row with invalid UTF-8 only rejects itself
        let mut raw = csv::ByteRecord::new();
        let mut objs = Vec::new();
        let mut rejected = Vec::new();

        while reader.read_byte_record(&mut raw).map_err(|e| Error::CSVError {
            file_name: file_name.to_owned(),
            source: e,
        })? {
            let line = raw.position().map(|p| p.line()).unwrap_or_default();
            let parsed = csv::StringRecord::from_byte_record(raw.clone())
                .map_err(|e| format!("invalid UTF-8: {}", e))
                .and_then(|rec| rec.deserialize::<O>(Some(&headers)).map_err(|e| e.to_string()));
            match parsed {
                Ok(obj) => objs.push((line, obj)),
                Err(reason) => {
                    log::debug!("Row {} of {} could not be read: {}", line, file_name, reason);
                    rejected.push(Error::MalformedRow {
                        file_name: file_name.to_owned(),
                        line,
                        reason,
                    });
                }
            }
        }
        Ok((objs, rejected))
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOPS: &str = "\u{feff}stop_id,stop_lat,stop_lon,stop_name
A,28.65,77.25,Kashmere Gate
B,28.65,77.15,
C,not-a-number,77.25,Broken
,28.50,77.10,No id
D,28.55,77.25,Nehru Place
";

    const STOP_TIMES: &str = "trip_id,arrival_time,stop_id
T1,08:00:00,A
T2,08:00:00,D
T1,08:05:00,B
T1,08:10:00,D
,08:10:00,A
T2,08:20:00,
T2,08:25:00,A
";

    fn load() -> Gtfs {
        Gtfs::from_readers(STOPS.as_bytes(), STOP_TIMES.as_bytes()).unwrap()
    }

    #[test]
    fn test_stops_are_loaded_in_file_order() {
        let gtfs = load();
        let ids: Vec<&str> = gtfs.stops.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "D"]);
        let a = gtfs.stops.get("A").unwrap();
        assert_eq!(a.stop_name, "Kashmere Gate");
        assert_eq!(a.geom().x(), 77.25);
        assert_eq!(a.geom().y(), 28.65);
    }

    #[test]
    fn test_blank_stop_name_falls_back_to_id() {
        let gtfs = load();
        assert_eq!(gtfs.stops.get("B").unwrap().stop_name, "B");
    }

    #[test]
    fn test_malformed_rows_are_rejected_and_reading_continues() {
        let gtfs = load();
        // bad latitude, missing stop id, missing trip id, missing stop id in stop_times
        assert_eq!(gtfs.rejected.len(), 4);
        assert!(gtfs
            .rejected
            .iter()
            .all(|e| matches!(e, Error::MalformedRow { .. })));
        assert!(!gtfs.stops.contains("C"));
    }

    #[test]
    fn test_trip_sequence_follows_row_order() {
        let gtfs = load();
        let trip_ids: Vec<&str> = gtfs.trips.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(trip_ids, vec!["T1", "T2"]);
        assert_eq!(gtfs.trips.get("T1").unwrap().stop_ids, vec!["A", "B", "D"]);
        assert_eq!(gtfs.trips.get("T2").unwrap().stop_ids, vec!["D", "A"]);
    }

    #[test]
    fn test_duplicate_stop_id_keeps_first_position() {
        let catalog: StopCatalog = vec![
            Stop::new("A", 1.0, 1.0, "first"),
            Stop::new("B", 2.0, 2.0, "b"),
            Stop::new("A", 3.0, 3.0, "second"),
        ]
        .into_iter()
        .collect();
        assert_eq!(catalog.len(), 2);
        let first = catalog.iter().next().unwrap();
        assert_eq!(first.stop_id, "A");
        assert_eq!(first.stop_name, "second");
    }

    #[test]
    fn test_undecodable_row_only_rejects_itself() {
        let stops: &[u8] = b"stop_id,stop_lat,stop_lon,stop_name
A,28.65,77.25,Kashmere Gate
B,28.65,77.15,bad\xff
D,28.55,77.25,Nehru Place
";
        let stop_times: &[u8] = b"trip_id,stop_id
T1,A
T\xff,B
T1,D
";
        let gtfs = Gtfs::from_readers(stops, stop_times).unwrap();
        let ids: Vec<&str> = gtfs.stops.iter().map(|s| s.stop_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "D"]);
        assert_eq!(gtfs.trips.get("T1").unwrap().stop_ids, vec!["A", "D"]);
        assert_eq!(gtfs.rejected.len(), 2);
        assert!(matches!(
            &gtfs.rejected[0],
            Error::MalformedRow { file_name, line: 3, .. } if file_name == "stops.txt"
        ));
        assert!(matches!(
            &gtfs.rejected[1],
            Error::MalformedRow { file_name, line: 3, .. } if file_name == "stop_times.txt"
        ));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let result = Gtfs::from_path("/definitely/not/a/feed");
        assert!(matches!(result, Err(Error::NotFileNorDirectory(_))));
    }

    #[test]
    fn test_empty_table_yields_no_rows() {
        let gtfs = Gtfs::from_readers("".as_bytes(), "trip_id,stop_id\n".as_bytes()).unwrap();
        assert!(gtfs.stops.is_empty());
        assert!(gtfs.trips.is_empty());
    }
}
