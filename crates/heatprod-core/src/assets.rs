//! Asset table loading and schema validation.
//!
//! Required columns are located by name, case-insensitively, accepting the
//! aliases used by upstream asset registers ("Asset ID", "Premise Type", ...).
//! Any missing or unparsable required value fails the load with every
//! offending asset listed; duplicate identifiers keep the first row.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};

use crate::coords::LatLon;
use crate::error::{Error, Result};

/// One input asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub asset_id: String,
    pub location: LatLon,
    pub category: String,
}

/// A required column and the header spellings accepted for it.
struct Column {
    name: &'static str,
    aliases: &'static [&'static str],
}

const ASSET_ID: Column = Column { name: "asset_id", aliases: &["asset_id", "id", "assetid"] };
const LATITUDE: Column = Column { name: "latitude", aliases: &["latitude", "lat"] };
const LONGITUDE: Column = Column { name: "longitude", aliases: &["longitude", "lon", "lng"] };
const CATEGORY: Column = Column { name: "category", aliases: &["asset_type", "category", "premise_type"] };

/// Normalise a header: trimmed, lowercase, spaces and hyphens as underscores.
pub(crate) fn normalise_header(h: &str) -> String {
    h.trim()
        .trim_start_matches('\u{feff}')
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Position of the first header matching any of `aliases`.
pub(crate) fn find_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    let normalised: Vec<String> = headers.iter().map(normalise_header).collect();
    aliases.iter().find_map(|a| normalised.iter().position(|h| h == a))
}

/// Decode file bytes as UTF-8, falling back to Latin-1 for legacy exports.
fn decode(bytes: Vec<u8>, path: &Path) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!("{} is not valid UTF-8, decoding as Latin-1", path.display());
            e.into_bytes().iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Load and validate the asset table at `path`.
pub fn load_assets(path: &Path) -> Result<Vec<Asset>> {
    if !path.is_file() {
        return Err(Error::MissingInputFile { path: path.to_path_buf() });
    }
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let text = decode(bytes, path);
    let assets = parse_assets(text.as_bytes(), path)?;
    info!("Loaded {} assets from {}", assets.len(), path.display());
    Ok(assets)
}

/// Parse and validate an asset table. `path` names the source in errors.
pub fn parse_assets<R: Read>(reader: R, path: &Path) -> Result<Vec<Asset>> {
    // Short rows are reported as missing values, not as CSV errors.
    let mut rdr = ReaderBuilder::new().trim(Trim::All).flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(|e| Error::csv(path, e))?.clone();

    let required = [&ASSET_ID, &LATITUDE, &LONGITUDE, &CATEGORY];
    let positions: Vec<Option<usize>> = required.iter().map(|c| find_column(&headers, c.aliases)).collect();
    let absent: Vec<&str> = required
        .iter()
        .zip(&positions)
        .filter(|(_, p)| p.is_none())
        .map(|(c, _)| c.name)
        .collect();
    if !absent.is_empty() {
        return Err(Error::schema(path, format!("missing required columns: {}", absent.join(", "))));
    }
    let [id_col, lat_col, lon_col, cat_col] = [positions[0], positions[1], positions[2], positions[3]]
        .map(|p| p.unwrap_or_default());

    let mut missing: Vec<(&str, Vec<String>)> = required.iter().map(|c| (c.name, Vec::new())).collect();
    let mut invalid: Vec<String> = Vec::new();
    let mut assets = Vec::new();
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| Error::csv(path, e))?;
        // Header is line 1.
        let line = i + 2;
        let field = |col: usize| record.get(col).unwrap_or("");

        let id = field(id_col);
        let label = if id.is_empty() { format!("line {line}") } else { id.to_string() };

        let mut complete = true;
        for (slot, col) in [id_col, lat_col, lon_col, cat_col].into_iter().enumerate() {
            if field(col).is_empty() {
                missing[slot].1.push(label.clone());
                complete = false;
            }
        }
        if !complete {
            continue;
        }

        let lat = parse_coord(field(lat_col), -90.0..=90.0);
        let lon = parse_coord(field(lon_col), -180.0..=360.0);
        let (Some(lat), Some(lon)) = (lat, lon) else {
            invalid.push(format!("{label} (latitude '{}', longitude '{}')", field(lat_col), field(lon_col)));
            continue;
        };

        if !seen.insert(id.to_string()) {
            duplicates += 1;
            continue;
        }
        assets.push(Asset {
            asset_id: id.to_string(),
            location: LatLon::new(lat, lon),
            category: field(cat_col).to_string(),
        });
    }

    let missing: Vec<String> = missing
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(name, ids)| format!("{name}: [{}]", ids.join(", ")))
        .collect();
    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing values in {}", missing.join("; ")));
    }
    if !invalid.is_empty() {
        problems.push(format!("invalid coordinates for {}", invalid.join(", ")));
    }
    if !problems.is_empty() {
        return Err(Error::schema(path, problems.join(". ")));
    }
    if assets.is_empty() {
        return Err(Error::schema(path, "table contains no asset rows"));
    }
    if duplicates > 0 {
        info!("Dropped {duplicates} duplicate asset rows from {} (first occurrence kept)", path.display());
    }
    Ok(assets)
}

fn parse_coord(s: &str, range: std::ops::RangeInclusive<f64>) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite() && range.contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Vec<Asset>> {
        parse_assets(text.as_bytes(), Path::new("assets.csv"))
    }

    #[test]
    fn parses_canonical_headers_and_ignores_extras() {
        let assets = parse(
            "asset_id,latitude,longitude,asset_type,owner\n\
             A1,10.0,20.0,Warehouse,Acme\n\
             A2,-5.5,100.25,Office,Acme\n",
        )
        .unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].asset_id, "A1");
        assert_eq!(assets[0].location, LatLon::new(10.0, 20.0));
        assert_eq!(assets[1].category, "Office");
    }

    #[test]
    fn accepts_register_style_headers() {
        let assets = parse(
            "Asset ID,Parent Name,Premise Type,Latitude,Longitude\n\
             X9,Parent,Factory,1.5,2.5\n",
        )
        .unwrap();
        assert_eq!(assets[0].asset_id, "X9");
        assert_eq!(assets[0].category, "Factory");
        assert_eq!(assets[0].location, LatLon::new(1.5, 2.5));
    }

    #[test]
    fn duplicate_ids_keep_first_row() {
        let assets = parse(
            "asset_id,latitude,longitude,asset_type\n\
             A1,10.0,20.0,Warehouse\n\
             A1,50.0,60.0,Office\n\
             B2,0.0,0.0,Office\n",
        )
        .unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].location, LatLon::new(10.0, 20.0));
        assert_eq!(assets[0].category, "Warehouse");
    }

    #[test]
    fn missing_columns_reported_by_name() {
        let err = parse("asset_id,latitude\nA1,1.0\n").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::SchemaValidation { .. }));
        assert!(msg.contains("longitude, category"), "{msg}");
    }

    #[test]
    fn missing_values_list_offending_assets() {
        let err = parse(
            "asset_id,latitude,longitude,asset_type\n\
             A1,,20.0,Warehouse\n\
             A2,1.0,2.0,\n\
             ,1.0,2.0,Office\n",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("latitude: [A1]"), "{msg}");
        assert!(msg.contains("category: [A2]"), "{msg}");
        assert!(msg.contains("asset_id: [line 4]"), "{msg}");
    }

    #[test]
    fn truncated_rows_are_schema_errors() {
        let err = parse(
            "asset_id,latitude,longitude,asset_type\n\
             A1,10.0,20.0,Warehouse\n\
             A2,1.0\n",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::SchemaValidation { .. }), "{err:?}");
        assert!(msg.contains("longitude: [A2]"), "{msg}");
        assert!(msg.contains("category: [A2]"), "{msg}");
    }

    #[test]
    fn unparsable_coordinates_rejected() {
        let err = parse(
            "asset_id,latitude,longitude,asset_type\n\
             A1,north,20.0,Warehouse\n\
             A2,95.0,20.0,Warehouse\n",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("A1 (latitude 'north'"), "{msg}");
        assert!(msg.contains("A2 (latitude '95.0'"), "{msg}");
    }

    #[test]
    fn empty_table_rejected() {
        let err = parse("asset_id,latitude,longitude,asset_type\n").unwrap_err();
        assert!(err.to_string().contains("no asset rows"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_assets(Path::new("/no/such/assets.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingInputFile { .. }));
    }

    #[test]
    fn latin1_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"asset_id,latitude,longitude,asset_type\nM\xfcnchen-1,48.1,11.6,Office\n").unwrap();
        drop(f);
        let assets = load_assets(&path).unwrap();
        assert_eq!(assets[0].asset_id, "München-1");
    }

    #[test]
    fn bundled_fixture_validates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/test_assets.csv");
        let assets = load_assets(&path).unwrap();
        assert_eq!(assets.len(), 5);
        assert_eq!(assets[0].asset_id, "A1");
    }
}
