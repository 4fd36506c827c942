//! Serialized form of a world's regions.
//!
//! Decoding is lenient below the document level: a region whose geometry or
//! id cannot be used is skipped, and a bad field inside an otherwise good
//! region is dropped on its own. Every skip is logged.

use crate::error::StorageError;
use region_core::geometry::{Cuboid, Polygon};
use region_core::{
    BlockVector2, BlockVector3, Domain, FlagRegistry, Geometry, PlayerId, Region, RegionGroup, GLOBAL_REGION,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Newest document version this crate writes and understands.
pub const FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// Top-level document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub regions: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GeometryRecord {
    Cuboid {
        min: BlockVector3,
        max: BlockVector3,
    },
    Polygon {
        points: Vec<BlockVector2>,
        min_y: i32,
        max_y: i32,
    },
    Global,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub geometry: GeometryRecord,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub owners: DomainRecord,
    #[serde(default)]
    pub members: DomainRecord,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, String>,
}

impl From<&Geometry> for GeometryRecord {
    fn from(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Cuboid(c) => GeometryRecord::Cuboid { min: c.min(), max: c.max() },
            Geometry::Polygon(p) => GeometryRecord::Polygon {
                points: p.points().to_vec(),
                min_y: p.min_y(),
                max_y: p.max_y(),
            },
            Geometry::Global => GeometryRecord::Global,
        }
    }
}

impl GeometryRecord {
    fn into_geometry(self) -> Result<Geometry, StorageError> {
        match self {
            GeometryRecord::Cuboid { min, max } => Ok(Geometry::Cuboid(Cuboid::new(min, max))),
            GeometryRecord::Polygon { points, min_y, max_y } => {
                Ok(Geometry::Polygon(Polygon::new(points, min_y, max_y)?))
            }
            GeometryRecord::Global => Ok(Geometry::Global),
        }
    }
}

impl From<&Domain> for DomainRecord {
    fn from(domain: &Domain) -> Self {
        Self {
            players: domain.players().map(PlayerId::to_string).collect(),
            groups: domain.groups().map(str::to_string).collect(),
        }
    }
}

impl DomainRecord {
    fn into_domain(self, region: &str, field: &str) -> Domain {
        let mut domain = Domain::new();
        for raw in self.players {
            match PlayerId::from_str(&raw) {
                Ok(player) => {
                    domain.add_player(player);
                }
                Err(e) => warn!(region = %region, field, player = %raw, "⚠️ Dropping unparsable player id: {}", e),
            }
        }
        for group in self.groups {
            domain.add_group(&group);
        }
        domain
    }
}

impl From<&Region> for RegionRecord {
    fn from(region: &Region) -> Self {
        Self {
            geometry: region.geometry().into(),
            priority: region.priority(),
            parent: region.parent().map(str::to_string),
            owners: region.owners().into(),
            members: region.members().into(),
            flags: region.flags().iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            groups: region
                .groups()
                .iter()
                .map(|(k, g)| (k.clone(), g.as_str().to_string()))
                .collect(),
        }
    }
}

/// Builds the document for `regions`.
pub fn encode(regions: &[Region]) -> Result<StoreDocument, StorageError> {
    let mut out = BTreeMap::new();
    for region in regions {
        let record = RegionRecord::from(region);
        out.insert(region.id().to_string(), serde_json::to_value(record)?);
    }
    Ok(StoreDocument {
        version: FORMAT_VERSION,
        regions: out,
    })
}

/// Parses a document from raw JSON.
///
/// # Errors
///
/// - [`StorageError::Json`] if `raw` is not JSON at all
/// - [`StorageError::Malformed`] if it is JSON of the wrong shape or a newer
///   format version
pub fn parse_document(raw: &str) -> Result<StoreDocument, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    let document = StoreDocument::deserialize(value).map_err(|e| StorageError::Malformed(e.to_string()))?;
    if document.version > FORMAT_VERSION {
        return Err(StorageError::Malformed(format!(
            "unsupported format version {} (newest known is {})",
            document.version, FORMAT_VERSION
        )));
    }
    Ok(document)
}

/// Turns a document back into regions, dropping what cannot be used.
pub fn decode(document: StoreDocument, registry: &FlagRegistry) -> Vec<Region> {
    document
        .regions
        .into_iter()
        .filter_map(|(id, raw)| match decode_region(&id, raw, registry) {
            Ok(region) => Some(region),
            Err(e) => {
                warn!(region = %id, "⚠️ Skipping region that could not be loaded: {}", e);
                None
            }
        })
        .collect()
}

fn decode_region(id: &str, raw: Value, registry: &FlagRegistry) -> Result<Region, StorageError> {
    let record: RegionRecord = serde_json::from_value(raw)?;
    let geometry = record.geometry.into_geometry()?;

    let mut region = if id.eq_ignore_ascii_case(GLOBAL_REGION) {
        Region::global()
    } else if geometry.is_physical() {
        Region::new(id, geometry)?
    } else {
        return Err(StorageError::Malformed(format!("only {GLOBAL_REGION} may have global geometry")));
    };

    region.set_priority(record.priority);
    region = region.with_parent_id(record.parent.as_deref());
    region.set_owners(record.owners.into_domain(id, "owners"));
    region.set_members(record.members.into_domain(id, "members"));

    for (name, raw) in &record.flags {
        let applied = registry
            .unmarshal(name, raw)
            .and_then(|(flag, value)| region.set_flag(&flag, Some(value)));
        if let Err(e) = applied {
            warn!(region = %id, flag = %name, "⚠️ Dropping flag value: {}", e);
        }
    }

    for (name, raw) in &record.groups {
        let Some(flag) = registry.get(name) else {
            warn!(region = %id, flag = %name, "⚠️ Dropping group for unknown flag");
            continue;
        };
        match raw.parse::<RegionGroup>() {
            Ok(group) => region.set_group(&flag, Some(group)),
            Err(e) => warn!(region = %id, flag = %name, "⚠️ Dropping group: {}", e),
        }
    }

    region.set_dirty(false);
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_core::flags::defaults::{BUILD, GREETING, PVP};
    use region_core::{FlagValue, StateValue};
    use serde_json::json;

    fn sample() -> Vec<Region> {
        let mut parent = Region::new(
            "castle",
            Geometry::cuboid(BlockVector3::new(0, 0, 0), BlockVector3::new(100, 255, 100)),
        )
        .unwrap();
        parent.set_priority(5);
        parent.owners_mut().add_player(PlayerId::new());
        parent.members_mut().add_group("builders");
        parent.set_flag(&BUILD, Some(StateValue::Deny.into())).unwrap();
        parent.set_group(&BUILD, Some(RegionGroup::NonOwners));
        parent.set_flag(&GREETING, Some("Welcome".into())).unwrap();

        let child = Region::new(
            "tower",
            Geometry::polygon(
                vec![BlockVector2::new(10, 10), BlockVector2::new(20, 10), BlockVector2::new(15, 20)],
                0,
                128,
            )
            .unwrap(),
        )
        .unwrap()
        .with_parent_id(Some("castle"));

        vec![parent, child, Region::global()]
    }

    #[test]
    fn test_encode_decode_preserves_regions() {
        let registry = FlagRegistry::with_defaults();
        let regions = sample();
        let document = encode(&regions).unwrap();
        let raw = serde_json::to_string(&document).unwrap();

        let mut loaded = decode(parse_document(&raw).unwrap(), &registry);
        loaded.sort_by(|a, b| a.id().cmp(b.id()));
        assert_eq!(loaded.len(), 3);

        let castle = loaded.iter().find(|r| r.id() == "castle").unwrap();
        let original = &regions[0];
        assert_eq!(castle.priority(), 5);
        assert_eq!(castle.owners(), original.owners());
        assert_eq!(castle.members(), original.members());
        assert_eq!(castle.flags(), original.flags());
        assert_eq!(castle.group(&BUILD), Some(RegionGroup::NonOwners));
        assert!(!castle.is_dirty());

        let tower = loaded.iter().find(|r| r.id() == "tower").unwrap();
        assert_eq!(tower.parent(), Some("castle"));
        assert_eq!(tower.geometry(), regions[1].geometry());

        assert!(loaded.iter().any(Region::is_global));
    }

    #[test]
    fn test_bad_fields_are_dropped_individually() {
        let registry = FlagRegistry::with_defaults();
        let raw = json!({
            "version": 1,
            "regions": {
                "spawn": {
                    "geometry": { "type": "cuboid", "min": {"x": 0, "y": 0, "z": 0}, "max": {"x": 9, "y": 9, "z": 9} },
                    "owners": { "players": ["not-a-uuid"] },
                    "flags": { "pvp": "deny", "build": 42, "no-such-flag": "allow" },
                    "groups": { "pvp": "wizards", "mystery": "members" }
                }
            }
        })
        .to_string();

        let loaded = decode(parse_document(&raw).unwrap(), &registry);
        assert_eq!(loaded.len(), 1);
        let spawn = &loaded[0];
        assert!(spawn.owners().is_empty());
        assert_eq!(spawn.flag(&PVP), Some(&FlagValue::State(StateValue::Deny)));
        assert_eq!(spawn.flag(&BUILD), None);
        assert_eq!(spawn.flags().len(), 1);
        assert_eq!(spawn.group(&PVP), None);
    }

    #[test]
    fn test_bad_regions_are_skipped() {
        let registry = FlagRegistry::with_defaults();
        let raw = json!({
            "regions": {
                "ok": { "geometry": { "type": "cuboid", "min": {"x": 0, "y": 0, "z": 0}, "max": {"x": 1, "y": 1, "z": 1} } },
                "two-points": { "geometry": { "type": "polygon", "points": [{"x": 0, "z": 0}, {"x": 1, "z": 1}], "min_y": 0, "max_y": 5 } },
                "no-geometry": { "priority": 3 },
                "bad id!": { "geometry": { "type": "cuboid", "min": {"x": 0, "y": 0, "z": 0}, "max": {"x": 1, "y": 1, "z": 1} } },
                "fake-global": { "geometry": { "type": "global" } }
            }
        })
        .to_string();

        let loaded = decode(parse_document(&raw).unwrap(), &registry);
        let ids: Vec<&str> = loaded.iter().map(Region::id).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn test_document_shape_errors() {
        assert!(matches!(parse_document("{ nope"), Err(StorageError::Json(_))));
        assert!(matches!(parse_document("[1, 2, 3]"), Err(StorageError::Malformed(_))));
        assert!(matches!(
            parse_document(r#"{"version": 99, "regions": {}}"#),
            Err(StorageError::Malformed(_))
        ));
        assert!(parse_document("{}").unwrap().regions.is_empty());
    }
}
