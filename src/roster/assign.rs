use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::layers::zone::{BusPool, Zone};

use super::driver::{Driver, Roster};
use super::error::Error;

/// Bus given to a driver, and the zone it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub bus_id: String,
    pub zone: Zone,
}

/// Assignments keyed by driver id
pub type Assignments = BTreeMap<String, Assignment>;

/// Pairs drivers with buses of their own zone
pub struct DriverAssigner {
    pool: BusPool,
}

impl DriverAssigner {
    pub fn new(pool: BusPool) -> Self {
        DriverAssigner { pool }
    }

    pub fn pool(&self) -> &BusPool {
        &self.pool
    }

    /// Give the i-th driver of a zone (in roster order) the i-th bus of that zone.
    ///
    /// Drivers left over once a zone runs out of buses are not assigned.
    /// A driver id that appears twice only takes part once, with its first occurrence.
    pub fn assign<'a, I>(&self, drivers: I) -> Assignments
    where
        I: IntoIterator<Item = &'a Driver>,
    {
        let mut next_bus: HashMap<Zone, usize> = HashMap::new();
        let mut assignments = Assignments::new();
        let mut seen = HashSet::new();
        for driver in drivers {
            if !seen.insert(driver.driver_id.as_str()) {
                log::warn!("Driver {} is listed more than once", driver.driver_id);
                continue;
            }
            let taken = next_bus.entry(driver.zone).or_insert(0);
            match self.pool.buses(driver.zone).get(*taken) {
                Some(bus_id) => {
                    *taken += 1;
                    assignments.insert(
                        driver.driver_id.clone(),
                        Assignment {
                            bus_id: bus_id.clone(),
                            zone: driver.zone,
                        },
                    );
                }
                None => log::debug!(
                    "No bus left in zone {} for driver {}",
                    driver.zone,
                    driver.driver_id
                ),
            }
        }
        assignments
    }

    /// Assign the drivers of the roster file and rewrite it in place.
    ///
    /// # Returns
    /// The assignments that were written. On `Error::IOFailure` the file is unchanged.
    pub fn assign_and_persist<P: AsRef<Path>>(&self, roster_path: P) -> Result<Assignments, Error> {
        let roster_path = roster_path.as_ref();
        let mut roster = Roster::from_path(roster_path)?;
        let assignments = self.assign(roster.drivers());
        roster.apply(&assignments);
        roster.write_atomic(roster_path)?;
        log::info!(
            "Assigned {} of {} drivers in {}",
            assignments.len(),
            roster.drivers().count(),
            roster_path.display()
        );
        Ok(assignments)
    }
}
