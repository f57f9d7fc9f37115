/// Record Store
///
/// Knows the three supported cities, the fixed column set of each city's
/// trip file, and how to load that file into a `Table`.
///
/// Chicago and New York City files carry `Gender` and `Birth Year`;
/// Washington's do not. Nothing is inferred from the file: a schema column
/// missing from the header, or a cell that does not parse as its column's
/// type, fails the load.

use crate::column::ColumnType;
use crate::error::{Result, TripError};
use crate::table::{Schema, Table};
use crate::temporal::START_TIME;
use log::info;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const END_TIME: &str = "End Time";
pub const TRIP_DURATION: &str = "Trip Duration";
pub const START_STATION: &str = "Start Station";
pub const END_STATION: &str = "End Station";
pub const USER_TYPE: &str = "User Type";
pub const GENDER: &str = "Gender";
pub const BIRTH_YEAR: &str = "Birth Year";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum City {
    Chicago,
    NewYorkCity,
    Washington,
}

impl City {
    pub const ALL: [City; 3] = [City::Chicago, City::NewYorkCity, City::Washington];

    /// Lower-case selection key, as typed by the user.
    pub fn key(&self) -> &'static str {
        match self {
            City::Chicago => "chicago",
            City::NewYorkCity => "new york city",
            City::Washington => "washington",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            City::Chicago => "chicago.csv",
            City::NewYorkCity => "new_york_city.csv",
            City::Washington => "washington.csv",
        }
    }

    /// Whether this city's records carry `Gender` and `Birth Year`.
    pub fn has_demographics(&self) -> bool {
        !matches!(self, City::Washington)
    }

    pub fn schema(&self) -> Schema {
        let mut columns = vec![
            (START_TIME.to_string(), ColumnType::DateTime, false),
            (END_TIME.to_string(), ColumnType::DateTime, true),
            (TRIP_DURATION.to_string(), ColumnType::Float64, true),
            (START_STATION.to_string(), ColumnType::String, true),
            (END_STATION.to_string(), ColumnType::String, true),
            (USER_TYPE.to_string(), ColumnType::String, true),
        ];
        if self.has_demographics() {
            columns.push((GENDER.to_string(), ColumnType::String, true));
            columns.push((BIRTH_YEAR.to_string(), ColumnType::Float64, true));
        }
        Schema::new(columns)
    }
}

impl FromStr for City {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        City::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| TripError::DatasetNotFound {
                city: s.to_string(),
            })
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Loads city datasets from a directory holding one CSV file per city.
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        RecordStore {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, city: City) -> PathBuf {
        self.data_dir.join(city.file_name())
    }

    /// Load a city by its selection key ("chicago", "new york city", ...).
    pub fn load_key(&self, key: &str) -> Result<Table> {
        self.load(key.parse()?)
    }

    pub fn load(&self, city: City) -> Result<Table> {
        let path = self.path_for(city);
        let csv = match std::fs::read_to_string(&path) {
            Ok(csv) => csv,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TripError::DatasetNotFound {
                    city: city.key().to_string(),
                })
            }
            Err(source) => return Err(TripError::Io { path, source }),
        };

        let table = Self::load_from_str(city, &csv)?;
        info!("loaded {} rows for {} from {}", table.len(), city, path.display());
        Ok(table)
    }

    /// Parse an in-memory CSV source against the city's schema.
    pub fn load_from_str(city: City, csv: &str) -> Result<Table> {
        Table::from_csv(city.key(), csv, &city.schema())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CHICAGO: &str = "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type,Gender,Birth Year
1423854,2017-06-23 15:09:32,2017-06-23 15:14:53,321,Wood St & Hubbard St,Damen Ave & Chicago Ave,Subscriber,Male,1992.0
955915,2017-05-25 18:19:03,2017-05-25 18:45:53,1610,Theater on the Lake,Sheffield Ave & Waveland Ave,Subscriber,Female,1992.0
";

    const WASHINGTON: &str = "\
,Start Time,End Time,Trip Duration,Start Station,End Station,User Type
1621326,2017-06-21 08:36:34,2017-06-21 08:44:43,489.066,14th & Belmont St NW,15th & K St NW,Subscriber
";

    #[test]
    fn test_city_keys() {
        assert_eq!("Chicago".parse::<City>().unwrap(), City::Chicago);
        assert_eq!("new york city".parse::<City>().unwrap(), City::NewYorkCity);
        assert_eq!(" WASHINGTON ".parse::<City>().unwrap(), City::Washington);
        assert!(matches!(
            "boston".parse::<City>(),
            Err(TripError::DatasetNotFound { .. })
        ));
        assert_eq!(City::NewYorkCity.file_name(), "new_york_city.csv");
    }

    #[test]
    fn test_schema_per_city() {
        assert!(City::Chicago.schema().contains(GENDER));
        assert!(City::NewYorkCity.schema().contains(BIRTH_YEAR));
        assert!(!City::Washington.schema().contains(GENDER));
        assert!(!City::Washington.schema().contains(BIRTH_YEAR));
        assert_eq!(City::Washington.schema().len(), 6);
    }

    #[test]
    fn test_load_from_str() {
        let table = RecordStore::load_from_str(City::Chicago, CHICAGO).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(), "chicago");
        assert_eq!(table.get_value(1, BIRTH_YEAR).unwrap().as_f64(), Some(1992.0));

        let table = RecordStore::load_from_str(City::Washington, WASHINGTON).unwrap();
        assert_eq!(table.get_value(0, TRIP_DURATION).unwrap().as_f64(), Some(489.066));
        assert!(!table.has_column(GENDER));
    }

    #[test]
    fn test_load_rejects_missing_demographics() {
        // Washington's file does not satisfy Chicago's schema
        assert!(matches!(
            RecordStore::load_from_str(City::Chicago, WASHINGTON),
            Err(TripError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chicago.csv"), CHICAGO).unwrap();

        let store = RecordStore::new(dir.path());
        let table = store.load(City::Chicago).unwrap();
        assert_eq!(table.len(), 2);

        let table = store.load_key("CHICAGO").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_dataset_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        match store.load(City::Washington) {
            Err(TripError::DatasetNotFound { city }) => assert_eq!(city, "washington"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            store.load_key("atlantis"),
            Err(TripError::DatasetNotFound { .. })
        ));
    }
}
