use serde::{Deserialize, Serialize};

/// One level of the administrative nesting, plus the unrestricted `All`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JurisdictionLevel {
    All,
    Region,
    District,
    SubArea,
    Station,
    Beat,
}

impl JurisdictionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JurisdictionLevel::All => "ALL",
            JurisdictionLevel::Region => "REGION",
            JurisdictionLevel::District => "DISTRICT",
            JurisdictionLevel::SubArea => "SUB_AREA",
            JurisdictionLevel::Station => "STATION",
            JurisdictionLevel::Beat => "BEAT",
        }
    }

    /// Parse a level code; accepts the legacy spellings used by role tables
    /// (`STATE` for all, `RANGE` for region, `SUBDIVISION`, `POLICE_STATION`).
    pub fn parse(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        match norm.as_str() {
            "ALL" | "STATE" => Some(JurisdictionLevel::All),
            "REGION" | "RANGE" => Some(JurisdictionLevel::Region),
            "DISTRICT" => Some(JurisdictionLevel::District),
            "SUBAREA" | "SUBDIVISION" => Some(JurisdictionLevel::SubArea),
            "STATION" | "POLICESTATION" => Some(JurisdictionLevel::Station),
            "BEAT" => Some(JurisdictionLevel::Beat),
            _ => None,
        }
    }
}

impl std::fmt::Display for JurisdictionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized hierarchy tags carried by people, officers, visits and alerts
///
/// Any level may be absent (an officer bound only to a district, a person
/// not yet placed in a beat).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyPath {
    pub region_id: Option<String>,
    pub district_id: Option<String>,
    pub sub_area_id: Option<String>,
    pub station_id: Option<String>,
    pub beat_id: Option<String>,
}

impl HierarchyPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full path derived from a station node, optionally narrowed to a beat
    pub fn from_station(node: &StationNode, beat_id: Option<String>) -> Self {
        Self {
            region_id: Some(node.region_id.clone()),
            district_id: Some(node.district_id.clone()),
            sub_area_id: Some(node.sub_area_id.clone()),
            station_id: Some(node.station_id.clone()),
            beat_id,
        }
    }

    /// Id stored at the given level (`None` for `All`)
    pub fn id_at(&self, level: JurisdictionLevel) -> Option<&str> {
        match level {
            JurisdictionLevel::All => None,
            JurisdictionLevel::Region => self.region_id.as_deref(),
            JurisdictionLevel::District => self.district_id.as_deref(),
            JurisdictionLevel::SubArea => self.sub_area_id.as_deref(),
            JurisdictionLevel::Station => self.station_id.as_deref(),
            JurisdictionLevel::Beat => self.beat_id.as_deref(),
        }
    }

    /// True when the beat, station, sub-area or district differs
    ///
    /// These are the fields whose change makes the current officer and the
    /// current verification stale. Officers are drawn from the beat pool
    /// first, so a move between beats of one station counts too.
    pub fn location_changed(&self, other: &HierarchyPath) -> bool {
        self.beat_id != other.beat_id
            || self.station_id != other.station_id
            || self.sub_area_id != other.sub_area_id
            || self.district_id != other.district_id
    }

    /// Check that the stored ids agree with the station's position in the tree
    pub fn is_consistent_with(&self, node: &StationNode) -> bool {
        self.station_id.as_deref() == Some(node.station_id.as_str())
            && self.sub_area_id.as_deref() == Some(node.sub_area_id.as_str())
            && self.district_id.as_deref() == Some(node.district_id.as_str())
            && self.region_id.as_deref() == Some(node.region_id.as_str())
    }
}

/// A station together with the ancestors it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationNode {
    pub station_id: String,
    pub name: String,
    pub sub_area_id: String,
    pub district_id: String,
    pub region_id: String,
}

/// A beat and its owning station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatNode {
    pub beat_id: String,
    pub name: String,
    pub station_id: String,
    pub is_active: bool,
}
