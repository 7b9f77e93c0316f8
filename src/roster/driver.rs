use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use csv::{ByteRecord, StringRecord, Terminator};

use crate::layers::zone::Zone;

use super::assign::Assignments;
use super::error::Error;

pub const DRIVER_ID: &str = "Driver ID";
pub const DRIVER_NAME: &str = "Driver Name";
pub const ZONE: &str = "Zone";
pub const BUS_ASSIGNED: &str = "Bus Assigned";

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// A driver as declared in the roster
#[derive(Debug, Clone, PartialEq)]
pub struct Driver {
    pub driver_id: String,
    pub driver_name: String,
    pub zone: Zone,
    pub assigned_bus: Option<String>,
}

impl Driver {
    pub fn new(driver_id: &str, driver_name: &str, zone: Zone) -> Driver {
        Driver {
            driver_id: driver_id.to_owned(),
            driver_name: driver_name.to_owned(),
            zone,
            assigned_bus: None,
        }
    }
}

/// Positions of the columns the assigner reads and writes
#[derive(Debug, Clone, Copy)]
struct Columns {
    id: usize,
    name: usize,
    zone: usize,
    bus: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Columns, Error> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or_else(|| Error::MissingColumn(name.to_owned()))
        };
        Ok(Columns {
            id: find(DRIVER_ID)?,
            name: find(DRIVER_NAME)?,
            zone: find(ZONE)?,
            bus: find(BUS_ASSIGNED)?,
        })
    }
}

/// The driver roster table.
///
/// Every row is kept as read, including rows that could not be parsed into a `Driver`,
/// so that a rewrite only touches the `Bus Assigned` and `Zone` cells of assigned drivers.
/// A leading BOM and CRLF line endings are written back as found. Quoting is normalized.
pub struct Roster {
    headers: StringRecord,
    records: Vec<ByteRecord>,
    columns: Columns,
    /// Parsed drivers in roster order, with the index of their row. Driver ids are unique.
    drivers: Vec<(usize, Driver)>,
    bom: bool,
    terminator: Terminator,
    /// Rows that are kept for the rewrite but take no part in the assignment
    pub rejected: Vec<Error>,
}

impl Roster {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Roster, Error> {
        let contents = fs::read(path.as_ref()).map_err(|source| Error::IOFailure {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Roster::from_bytes(&contents)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Roster, Error> {
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(csv::Error::from)?;
        Roster::from_bytes(&contents)
    }

    fn from_bytes(contents: &[u8]) -> Result<Roster, Error> {
        let bom = contents.starts_with(&UTF8_BOM);
        let body = if bom { &contents[UTF8_BOM.len()..] } else { contents };
        let terminator = if ends_with_crlf(body) {
            Terminator::CRLF
        } else {
            Terminator::Any(b'\n')
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(body);
        let headers = reader.headers()?.clone();
        let columns = Columns::locate(&headers)?;

        let mut records = Vec::new();
        let mut drivers = Vec::new();
        let mut rejected = Vec::new();
        let mut seen = HashSet::new();
        for record in reader.byte_records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let parsed = parse_driver(&record, line, &columns).and_then(|driver| {
                if seen.insert(driver.driver_id.clone()) {
                    Ok(driver)
                } else {
                    Err(Error::DuplicateDriver {
                        line,
                        driver_id: driver.driver_id,
                    })
                }
            });
            match parsed {
                Ok(driver) => drivers.push((records.len(), driver)),
                Err(e) => {
                    log::warn!("{}", e);
                    rejected.push(e);
                }
            }
            records.push(record);
        }

        Ok(Roster {
            headers,
            records,
            columns,
            drivers,
            bom,
            terminator,
            rejected,
        })
    }

    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.iter().map(|(_, driver)| driver)
    }

    /// Number of data rows, parsed or not
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn print_stats(&self) {
        println!("Driver roster:");
        println!("  Rows: {}", self.records.len());
        println!("  Drivers: {}", self.drivers.len());
        println!("  Rejected rows: {}", self.rejected.len());
    }

    /// Write the assigned bus and zone into the row of every assigned driver.
    /// Drivers absent from `assignments` and rejected rows keep their row unchanged.
    pub fn apply(&mut self, assignments: &Assignments) {
        let columns = self.columns;
        let width = self.headers.len();
        for (row, driver) in self.drivers.iter_mut() {
            let Some(assignment) = assignments.get(&driver.driver_id) else {
                continue;
            };
            driver.assigned_bus = Some(assignment.bus_id.clone());
            driver.zone = assignment.zone;

            let mut values: Vec<Vec<u8>> = self.records[*row].iter().map(<[u8]>::to_vec).collect();
            if values.len() < width {
                values.resize(width, Vec::new());
            }
            values[columns.bus] = assignment.bus_id.as_bytes().to_vec();
            values[columns.zone] = assignment.zone.as_str().as_bytes().to_vec();
            self.records[*row] = ByteRecord::from(values);
        }
    }

    /// Serialize the whole table
    pub fn to_csv(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        if self.bom {
            out.extend_from_slice(&UTF8_BOM);
        }
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(self.terminator)
            .from_writer(out);
        writer.write_record(&self.headers)?;
        for record in self.records.iter() {
            writer.write_record(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Csv(e.into_error().into()))
    }

    /// Replace the file at `path` with this roster.
    ///
    /// The table is serialized in memory and written to a sibling temporary file which is
    /// then renamed over `path`. On failure the temporary file is removed and `path` is untouched.
    pub fn write_atomic<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let contents = self.to_csv()?;
        let tmp = temp_path(path);
        let written = write_synced(&tmp, &contents).and_then(|_| fs::rename(&tmp, path));
        if let Err(source) = written {
            if tmp.is_file() {
                fs::remove_file(&tmp).ok();
            }
            return Err(Error::IOFailure {
                path: path.to_path_buf(),
                source,
            });
        }
        log::debug!("Roster written to {}", path.display());
        Ok(())
    }
}

fn parse_driver(record: &ByteRecord, line: u64, columns: &Columns) -> Result<Driver, Error> {
    let malformed = |reason: String| Error::MalformedRow { line, reason };
    let record = StringRecord::from_byte_record(record.clone())
        .map_err(|e| malformed(format!("invalid UTF-8: {}", e)))?;

    let driver_id = record
        .get(columns.id)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| malformed(format!("missing {}", DRIVER_ID)))?;
    let driver_name = record
        .get(columns.name)
        .ok_or_else(|| malformed(format!("missing {}", DRIVER_NAME)))?;
    let zone = record
        .get(columns.zone)
        .ok_or_else(|| malformed(format!("missing {}", ZONE)))?
        .parse::<Zone>()
        .map_err(malformed)?;
    let assigned_bus = record
        .get(columns.bus)
        .map(str::trim)
        .filter(|bus| !bus.is_empty())
        .map(String::from);

    Ok(Driver {
        driver_id: driver_id.to_owned(),
        driver_name: driver_name.trim().to_owned(),
        zone,
        assigned_bus,
    })
}

/// Whether the header line ends with CRLF
fn ends_with_crlf(body: &[u8]) -> bool {
    match body.iter().position(|&b| b == b'\n') {
        Some(i) => i > 0 && body[i - 1] == b'\r',
        None => false,
    }
}

/// Temporary file next to `path`, so that the final rename stays on one filesystem
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "roster".to_owned());
    path.with_file_name(format!(".{}.tmp", name))
}

fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::assign::Assignment;
    use std::collections::BTreeMap;

    const ROSTER: &str = "Driver ID,Driver Name,Phone,Zone,Bus Assigned
1,Asha,98100,NE,
2,Ravi,98101,sw,old-bus
,Nobody,98102,NE,
3,Meena,98103,Центр,
4,Kiran,98104,NW
";

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bus-routing-{}-{}", name, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn assignments(entries: &[(&str, &str, Zone)]) -> Assignments {
        entries
            .iter()
            .map(|(driver, bus, zone)| {
                (
                    driver.to_string(),
                    Assignment {
                        bus_id: bus.to_string(),
                        zone: *zone,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>()
    }

    #[test]
    fn test_parse_roster() {
        let roster = Roster::from_reader(ROSTER.as_bytes()).unwrap();
        assert_eq!(roster.len(), 5);
        let drivers: Vec<&Driver> = roster.drivers().collect();
        assert_eq!(drivers.len(), 3);
        assert_eq!(drivers[0], &Driver::new("1", "Asha", Zone::NE));
        assert_eq!(drivers[1].zone, Zone::SW);
        assert_eq!(drivers[1].assigned_bus.as_deref(), Some("old-bus"));
        // short row without the bus cell is still a valid driver
        assert_eq!(drivers[2].driver_id, "4");
        assert_eq!(drivers[2].assigned_bus, None);
    }

    #[test]
    fn test_malformed_rows_are_rejected() {
        let roster = Roster::from_reader(ROSTER.as_bytes()).unwrap();
        assert_eq!(roster.rejected.len(), 2);
        assert!(matches!(roster.rejected[0], Error::MalformedRow { line: 4, .. }));
        assert!(matches!(roster.rejected[1], Error::MalformedRow { line: 5, .. }));
    }

    #[test]
    fn test_missing_column() {
        let result = Roster::from_reader("Driver ID,Driver Name,Zone\n1,Asha,NE\n".as_bytes());
        assert!(matches!(result, Err(Error::MissingColumn(c)) if c == BUS_ASSIGNED));
    }

    #[test]
    fn test_apply_only_touches_assigned_rows() {
        let mut roster = Roster::from_reader(ROSTER.as_bytes()).unwrap();
        roster.apply(&assignments(&[("1", "T9", Zone::NE), ("4", "T2", Zone::NW)]));
        let output = String::from_utf8(roster.to_csv().unwrap()).unwrap();
        assert_eq!(
            output,
            "Driver ID,Driver Name,Phone,Zone,Bus Assigned
1,Asha,98100,NE,T9
2,Ravi,98101,sw,old-bus
,Nobody,98102,NE,
3,Meena,98103,Центр,
4,Kiran,98104,NW,T2
"
        );
        let asha = roster.drivers().next().unwrap();
        assert_eq!(asha.assigned_bus.as_deref(), Some("T9"));
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = scratch_dir("write-atomic");
        let path = dir.join("drivers.csv");
        fs::write(&path, ROSTER).unwrap();

        let mut roster = Roster::from_path(&path).unwrap();
        roster.apply(&assignments(&[("2", "T1", Zone::SW)]));
        roster.write_atomic(&path).unwrap();

        let reread = Roster::from_path(&path).unwrap();
        let ravi = reread.drivers().find(|d| d.driver_id == "2").unwrap();
        assert_eq!(ravi.assigned_bus.as_deref(), Some("T1"));
        assert_eq!(ravi.zone, Zone::SW);
        assert_eq!(reread.len(), 5);
        assert!(!temp_path(&path).exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_failed_write_leaves_original_untouched() {
        let dir = scratch_dir("write-fails");
        let path = dir.join("drivers.csv");
        fs::write(&path, ROSTER).unwrap();
        // A directory where the temporary file should go makes the write fail
        fs::create_dir_all(temp_path(&path)).unwrap();

        let mut roster = Roster::from_path(&path).unwrap();
        roster.apply(&assignments(&[("1", "T1", Zone::NE)]));
        let result = roster.write_atomic(&path);

        assert!(matches!(result, Err(Error::IOFailure { .. })));
        assert_eq!(fs::read(&path).unwrap(), ROSTER.as_bytes());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_roster_file() {
        let result = Roster::from_path("/definitely/not/a/roster.csv");
        assert!(matches!(result, Err(Error::IOFailure { .. })));
    }

    #[test]
    fn test_repeated_driver_id_keeps_first_row_only() {
        let input = "Driver ID,Driver Name,Zone,Bus Assigned\n1,Asha,NE,\n1,Asha,SW,\n2,Ravi,SW,\n";
        let mut roster = Roster::from_reader(input.as_bytes()).unwrap();
        let drivers: Vec<&Driver> = roster.drivers().collect();
        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].zone, Zone::NE);
        assert_eq!(drivers[1].driver_id, "2");
        assert!(matches!(
            &roster.rejected[..],
            [Error::DuplicateDriver { line: 3, driver_id }] if driver_id == "1"
        ));

        roster.apply(&assignments(&[("1", "ne1", Zone::NE)]));
        let output = String::from_utf8(roster.to_csv().unwrap()).unwrap();
        assert_eq!(
            output,
            "Driver ID,Driver Name,Zone,Bus Assigned\n1,Asha,NE,ne1\n1,Asha,SW,\n2,Ravi,SW,\n"
        );
    }

    #[test]
    fn test_undecodable_row_is_rejected_and_kept() {
        let input: &[u8] =
            b"Driver ID,Driver Name,Zone,Bus Assigned\n1,Asha,NE,\n2,R\xffvi,NE,\n3,Kiran,NE,\n";
        let mut roster = Roster::from_reader(input).unwrap();
        let ids: Vec<&str> = roster.drivers().map(|d| d.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(matches!(roster.rejected[..], [Error::MalformedRow { line: 3, .. }]));

        roster.apply(&assignments(&[("3", "T1", Zone::NE)]));
        assert_eq!(
            roster.to_csv().unwrap(),
            b"Driver ID,Driver Name,Zone,Bus Assigned\n1,Asha,NE,\n2,R\xffvi,NE,\n3,Kiran,NE,T1\n".to_vec()
        );
    }

    #[test]
    fn test_bom_and_crlf_survive_rewrite() {
        let input = "\u{feff}Driver ID,Driver Name,Zone,Bus Assigned\r\n1,Asha,NE,\r\n2,Ravi,SW,\r\n";
        let mut roster = Roster::from_reader(input.as_bytes()).unwrap();
        assert_eq!(roster.drivers().count(), 2);
        roster.apply(&assignments(&[("2", "sw1", Zone::SW)]));
        let output = String::from_utf8(roster.to_csv().unwrap()).unwrap();
        assert_eq!(
            output,
            "\u{feff}Driver ID,Driver Name,Zone,Bus Assigned\r\n1,Asha,NE,\r\n2,Ravi,SW,sw1\r\n"
        );
    }
}
