//! CSV exchange of facility sites.
//!
//! Input rows carry an optional `name`, `id` and `weight`, plus a location given
//! either as a `wkt` point (in its `SRID=` CRS, else the public CRS) or as
//! `lon`/`lat` columns in WGS84 degrees. Output rows list ranked sites with both
//! a WKT point in the public CRS and WGS84 `lon`/`lat`.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use siteopt::core::io::wkt;
use siteopt::core::models::point::{Crs, GeoPoint};
use siteopt::core::models::site::{FacilitySite, ScoredSite};
use siteopt::core::projection::CoordTransformer;
use siteopt::engine::error::EngineError;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SiteRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    wkt: Option<String>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    weight: Option<f64>,
}

#[derive(Debug, Serialize)]
struct RankedRecord<'a> {
    rank: usize,
    name: &'a str,
    id: &'a str,
    wkt: String,
    lon: f64,
    lat: f64,
    score: f64,
}

/// A data row left out of a site table, numbered from 1 after the header.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

impl fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site row {} skipped: {}", self.row, self.reason)
    }
}

#[derive(Debug, Default)]
pub struct LoadedSites {
    pub sites: Vec<FacilitySite>,
    pub skipped: Vec<SkippedRow>,
}

/// Reads facility sites, setting aside rows that carry no usable location.
pub fn read_sites(path: &Path, public_crs: Crs) -> Result<LoadedSites> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

    let mut loaded = LoadedSites::default();
    for (index, result) in reader.deserialize::<SiteRecord>().enumerate() {
        let row = index + 1;
        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(|record| record_to_site(record, public_crs));
        match parsed {
            Ok(site) => loaded.sites.push(site),
            Err(reason) => {
                debug!(row, %reason, "Skipping site row.");
                loaded.skipped.push(SkippedRow { row, reason });
            }
        }
    }

    info!(
        count = loaded.sites.len(),
        skipped = loaded.skipped.len(),
        path = %path.display(),
        "Loaded sites."
    );
    Ok(loaded)
}

fn record_to_site(record: SiteRecord, public_crs: Crs) -> std::result::Result<FacilitySite, String> {
    let location = match (record.wkt.as_deref().filter(|t| !t.is_empty()), record.lon, record.lat) {
        (Some(text), _, _) => {
            let (x, y, srid) = wkt::parse_point(text).map_err(|e| e.to_string())?;
            GeoPoint::new(x, y, srid.map(Crs::new).unwrap_or(public_crs))
        }
        (None, Some(lon), Some(lat)) => GeoPoint::lon_lat(lon, lat),
        _ => return Err("row has neither a wkt point nor lon/lat".to_string()),
    };
    if !location.is_finite() {
        return Err("location is not finite".to_string());
    }

    let mut site = FacilitySite::new(location);
    site.name = record.name.filter(|n| !n.is_empty());
    site.id = record.id.filter(|i| !i.is_empty());
    site.weight = record.weight;
    Ok(site)
}

/// Writes ranked sites, best first.
pub fn write_sites(path: &Path, sites: &[ScoredSite]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut to_wgs84: Option<CoordTransformer> = None;

    for (i, scored) in sites.iter().enumerate() {
        let location = scored.location();
        let (lon, lat) = if location.crs() == Crs::WGS84 {
            (location.x(), location.y())
        } else {
            let transformer = match to_wgs84.take() {
                Some(t) if t.source() == location.crs() => t,
                _ => CoordTransformer::new(location.crs(), Crs::WGS84)
                    .map_err(EngineError::from)?,
            };
            let lon_lat = transformer
                .transform(location.x(), location.y())
                .map_err(EngineError::from)?;
            to_wgs84 = Some(transformer);
            lon_lat
        };

        writer.serialize(RankedRecord {
            rank: i + 1,
            name: scored.site.name.as_deref().unwrap_or(""),
            id: scored.site.id.as_deref().unwrap_or(""),
            wkt: format!(
                "SRID={};{}",
                location.crs().code(),
                wkt::format_point(location.x(), location.y())
            ),
            lon,
            lat,
            score: scored.score,
        })?;
    }
    writer.flush()?;
    debug!(count = sites.len(), path = %path.display(), "Wrote sites.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_wkt_and_lon_lat_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.csv");
        fs::write(
            &path,
            "name,id,wkt,lon,lat,weight\n\
             Depot,d1,POINT(10 20),,,2.5\n\
             Kiosk,,,8.5,47.25,\n\
             Metric,m1,SRID=3035;POINT(4000000 3000000),,,\n",
        )
        .unwrap();

        let sites = read_sites(&path, Crs::WGS84).unwrap().sites;
        assert_eq!(sites.len(), 3);
        assert_eq!(sites[0].location, GeoPoint::lon_lat(10.0, 20.0));
        assert_eq!(sites[0].name.as_deref(), Some("Depot"));
        assert_eq!(sites[0].weight, Some(2.5));
        assert_eq!(sites[1].location, GeoPoint::lon_lat(8.5, 47.25));
        assert_eq!(sites[1].id, None);
        assert_eq!(sites[2].location.crs(), Crs::LAEA_EUROPE);
    }

    #[test]
    fn wkt_without_srid_uses_the_public_crs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projected.csv");
        fs::write(&path, "wkt\nPOINT(100 200)\n").unwrap();

        let sites = read_sites(&path, Crs::WORLD_MOLLWEIDE).unwrap().sites;
        assert_eq!(
            sites[0].location,
            GeoPoint::new(100.0, 200.0, Crs::WORLD_MOLLWEIDE)
        );
    }

    #[test]
    fn unusable_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "name,wkt,lon,lat\n\
             no-location,,,\n\
             bad-wkt,POINT(1),,\n\
             bad-number,,abc,3\n\
             good,,1,2\n",
        )
        .unwrap();

        let loaded = read_sites(&path, Crs::WGS84).unwrap();
        assert_eq!(loaded.sites.len(), 1);
        assert_eq!(loaded.sites[0].name.as_deref(), Some("good"));

        let rows: Vec<usize> = loaded.skipped.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(
            loaded.skipped[0].reason,
            "row has neither a wkt point nor lon/lat"
        );
        assert!(loaded.skipped.iter().all(|s| !s.reason.is_empty()));
        assert!(loaded.skipped[2].to_string().starts_with("site row 3 skipped: "));
    }

    #[test]
    fn missing_file_is_a_parsing_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_sites(&dir.path().join("absent.csv"), Crs::WGS84);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn written_rows_are_ranked_with_wgs84_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sites = vec![
            ScoredSite::new(
                FacilitySite::new(GeoPoint::lon_lat(5.0, 6.0)).with_name("a"),
                42.0,
            ),
            ScoredSite::new(
                FacilitySite::new(GeoPoint::new(0.0, 0.0, Crs::WORLD_MOLLWEIDE)).with_id("b"),
                7.5,
            ),
        ];

        write_sites(&path, &sites).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "rank,name,id,wkt,lon,lat,score");
        assert_eq!(lines[1], "1,a,,SRID=4326;POINT(5 6),5.0,6.0,42.0");
        assert!(lines[2].starts_with("2,,b,SRID=54009;POINT(0 0),"));
        let fields: Vec<&str> = lines[2].split(',').collect();
        let lon: f64 = fields[4].parse().unwrap();
        let lat: f64 = fields[5].parse().unwrap();
        assert!(lon.abs() < 1e-9 && lat.abs() < 1e-9);
    }
}
