//! Route documents and their projection into flat records.
//!
//! A document holds any number of `Placemark` elements. Each becomes one
//! [`SummaryRecord`]; each `RouteInfo/ViaPoints/ViaPoint` under it becomes one
//! [`DetailRecord`] and one element of the summary's embedded JSON array.

use crate::error::SourceError;
use crate::geo_distance::{round_km, total_distance_km};
use crate::xml_fields::{self, Field};
use serde::{Deserialize, Serialize};

const PLACEMARK_FIELDS: [Field; 4] = [
    Field::new("name", &["name"]),
    Field::new("description", &["description"]),
    Field::new("CreationTimeUTC", &["CreationTimeUTC"]),
    Field::new("IsManuallyCorrected", &["IsManuallyCorrected"]),
];

const ROUTE_INFO_FIELDS: [Field; 4] = [
    Field::new("RouteInfo_IgnoringRestrictions", &["IgnoringRestrictions"]),
    Field::new(
        "RouteInfo_MapCorrectionInfo_DatasetInfo_ImageInfo_ImageName",
        &["MapCorrectionInfo", "DatasetInfo", "ImageInfo", "ImageName"],
    ),
    Field::new(
        "RouteInfo_MapCorrectionInfo_DatasetInfo_ImageInfo_StartMapId",
        &["MapCorrectionInfo", "DatasetInfo", "ImageInfo", "StartMapId"],
    ),
    Field::new("RouteInfo_ViaPoints_NumVia", &["ViaPoints", "NumVia"]),
];

const VIA_POINT_FIELDS: [Field; 13] = [
    Field::new("Position", &["Position"]),
    Field::new("GroupID", &["GroupID"]),
    Field::new("Segment", &["Segment"]),
    Field::new("Heading", &["Heading"]),
    Field::new("Type", &["Type"]),
    Field::new("LinkToGeom", &["LinkToGeom"]),
    Field::new("Direction", &["Direction"]),
    Field::new("TTSRemark", &["TTSRemark"]),
    Field::new("WorkType", &["WorkType"]),
    Field::new("MMRule", &["MMRule"]),
    Field::new("ManeuverID", &["ManeuverID"]),
    Field::new("ManeuverNumber", &["ManeuverNumber"]),
    Field::new("IsDeadEnd", &["IsDeadEnd"]),
];

/// Route-level metadata carried by each placemark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteMetadata {
    pub name: String,
    pub description: String,
    pub creation_time_utc: String,
    pub is_manually_corrected: String,
}

/// Values read from a placemark's `RouteInfo` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteInfo {
    pub ignoring_restrictions: String,
    pub image_name: String,
    pub start_map_id: String,
    pub num_via: String,
}

/// One via-point, every field kept as exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViaPoint {
    pub seq: usize,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "Lat")]
    pub lat: Option<f64>,
    #[serde(rename = "Lon")]
    pub lon: Option<f64>,
    #[serde(rename = "GroupID")]
    pub group_id: String,
    #[serde(rename = "Segment")]
    pub segment: String,
    #[serde(rename = "Heading")]
    pub heading: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "LinkToGeom")]
    pub link_to_geom: String,
    #[serde(rename = "Direction")]
    pub direction: String,
    #[serde(rename = "TTSRemark")]
    pub tts_remark: String,
    #[serde(rename = "WorkType")]
    pub work_type: String,
    #[serde(rename = "MMRule")]
    pub mm_rule: String,
    #[serde(rename = "ManeuverID")]
    pub maneuver_id: String,
    #[serde(rename = "ManeuverNumber")]
    pub maneuver_number: String,
    #[serde(rename = "IsDeadEnd")]
    pub is_dead_end: String,
}

impl ViaPoint {
    /// `(lat, lon)` when both halves of `Position` parsed.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// `Position` is written as `"lon, lat"`.
fn parse_position(position: &str) -> (Option<f64>, Option<f64>) {
    let parts: Vec<&str> = position.split(',').map(str::trim).collect();
    let &[lon, lat] = parts.as_slice() else {
        return (None, None);
    };
    let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    (parse(lat), parse(lon))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placemark {
    pub metadata: RouteMetadata,
    pub route_info: RouteInfo,
    pub via_points: Vec<ViaPoint>,
}

impl Placemark {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let [name, description, creation_time_utc, is_manually_corrected] =
            xml_fields::extract(Some(node), &PLACEMARK_FIELDS);
        let route_info_node = xml_fields::child(node, "RouteInfo");
        let [ignoring_restrictions, image_name, start_map_id, num_via] =
            xml_fields::extract(route_info_node, &ROUTE_INFO_FIELDS);

        let via_points = route_info_node
            .and_then(|n| xml_fields::child(n, "ViaPoints"))
            .map(|parent| {
                xml_fields::children(parent, "ViaPoint")
                    .enumerate()
                    .map(|(i, vp)| via_point_from_node(i + 1, vp))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            metadata: RouteMetadata {
                name,
                description,
                creation_time_utc,
                is_manually_corrected,
            },
            route_info: RouteInfo {
                ignoring_restrictions,
                image_name,
                start_map_id,
                num_via,
            },
            via_points,
        }
    }

    /// Distance over the via-points that carry coordinates, in `seq` order.
    pub fn total_distance_km(&self) -> f64 {
        let points: Vec<(f64, f64)> = self
            .via_points
            .iter()
            .filter_map(ViaPoint::coordinates)
            .collect();
        round_km(total_distance_km(&points))
    }

    /// The declared `NumVia` when it is a non-zero integer, else the element count.
    pub fn num_via(&self) -> i64 {
        match self.route_info.num_via.parse::<i64>() {
            Ok(n) if n != 0 => n,
            _ => self.via_points.len() as i64,
        }
    }
}

fn via_point_from_node(seq: usize, node: roxmltree::Node<'_, '_>) -> ViaPoint {
    let [
        position,
        group_id,
        segment,
        heading,
        kind,
        link_to_geom,
        direction,
        tts_remark,
        work_type,
        mm_rule,
        maneuver_id,
        maneuver_number,
        is_dead_end,
    ] = xml_fields::extract(Some(node), &VIA_POINT_FIELDS);
    let (lat, lon) = parse_position(&position);
    ViaPoint {
        seq,
        position,
        lat,
        lon,
        group_id,
        segment,
        heading,
        kind,
        link_to_geom,
        direction,
        tts_remark,
        work_type,
        mm_rule,
        maneuver_id,
        maneuver_number,
        is_dead_end,
    }
}

/// One parsed input source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDocument {
    pub placemarks: Vec<Placemark>,
}

impl RouteDocument {
    pub fn parse(text: &str) -> Result<Self, SourceError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)?;
        let root = doc.root_element();
        let placemarks = root
            .descendants()
            .filter(|n| *n != root && n.is_element() && n.tag_name().name() == "Placemark")
            .map(Placemark::from_node)
            .collect();
        Ok(Self { placemarks })
    }
}

/// A row of the summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub metadata: RouteMetadata,
    pub total_distance_km: f64,
    pub ignoring_restrictions: String,
    pub image_name: String,
    pub start_map_id: String,
    pub num_via: i64,
    pub via_points_json: String,
}

impl SummaryRecord {
    pub const HEADER: [&'static str; 10] = [
        PLACEMARK_FIELDS[0].column,
        PLACEMARK_FIELDS[1].column,
        PLACEMARK_FIELDS[2].column,
        PLACEMARK_FIELDS[3].column,
        "TotalDistanceKm",
        ROUTE_INFO_FIELDS[0].column,
        ROUTE_INFO_FIELDS[1].column,
        ROUTE_INFO_FIELDS[2].column,
        ROUTE_INFO_FIELDS[3].column,
        "RouteInfo_ViaPoints_ViaPoint",
    ];

    pub fn to_row(&self) -> [String; 10] {
        [
            self.metadata.name.clone(),
            self.metadata.description.clone(),
            self.metadata.creation_time_utc.clone(),
            self.metadata.is_manually_corrected.clone(),
            format!("{:.6}", self.total_distance_km),
            self.ignoring_restrictions.clone(),
            self.image_name.clone(),
            self.start_map_id.clone(),
            self.num_via.to_string(),
            self.via_points_json.clone(),
        ]
    }
}

/// A row of the detail table.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRecord {
    /// Row of the parent placemark in the summary table.
    pub placemark_index: usize,
    pub placemark_name: String,
    pub via_point: ViaPoint,
}

impl DetailRecord {
    pub const HEADER: [&'static str; 18] = [
        "placemark_index",
        "placemark_name",
        "seq",
        VIA_POINT_FIELDS[0].column,
        "Lat",
        "Lon",
        VIA_POINT_FIELDS[1].column,
        VIA_POINT_FIELDS[2].column,
        VIA_POINT_FIELDS[3].column,
        VIA_POINT_FIELDS[4].column,
        VIA_POINT_FIELDS[5].column,
        VIA_POINT_FIELDS[6].column,
        VIA_POINT_FIELDS[7].column,
        VIA_POINT_FIELDS[8].column,
        VIA_POINT_FIELDS[9].column,
        VIA_POINT_FIELDS[10].column,
        VIA_POINT_FIELDS[11].column,
        VIA_POINT_FIELDS[12].column,
    ];

    pub fn to_row(&self) -> [String; 18] {
        let vp = &self.via_point;
        let coordinate = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        [
            self.placemark_index.to_string(),
            self.placemark_name.clone(),
            vp.seq.to_string(),
            vp.position.clone(),
            coordinate(vp.lat),
            coordinate(vp.lon),
            vp.group_id.clone(),
            vp.segment.clone(),
            vp.heading.clone(),
            vp.kind.clone(),
            vp.link_to_geom.clone(),
            vp.direction.clone(),
            vp.tts_remark.clone(),
            vp.work_type.clone(),
            vp.mm_rule.clone(),
            vp.maneuver_id.clone(),
            vp.maneuver_number.clone(),
            vp.is_dead_end.clone(),
        ]
    }
}

/// Records produced from one document. `placemark_index` on the detail
/// records is relative to this document until the batch rebases it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub summaries: Vec<SummaryRecord>,
    pub details: Vec<DetailRecord>,
}

/// Single-line JSON for the summary's via-point column.
pub fn via_points_json(via_points: &[ViaPoint]) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(via_points)?;
    Ok(json.replace(['\r', '\n'], ""))
}

/// Projects a document into summary and detail records.
pub fn extract(document: &RouteDocument) -> Result<Extraction, SourceError> {
    let mut extraction = Extraction::default();
    for (index, placemark) in document.placemarks.iter().enumerate() {
        extraction.summaries.push(SummaryRecord {
            metadata: placemark.metadata.clone(),
            total_distance_km: placemark.total_distance_km(),
            ignoring_restrictions: placemark.route_info.ignoring_restrictions.clone(),
            image_name: placemark.route_info.image_name.clone(),
            start_map_id: placemark.route_info.start_map_id.clone(),
            num_via: placemark.num_via(),
            via_points_json: via_points_json(&placemark.via_points)?,
        });
        extraction
            .details
            .extend(placemark.via_points.iter().map(|vp| DetailRecord {
                placemark_index: index,
                placemark_name: placemark.metadata.name.clone(),
                via_point: vp.clone(),
            }));
    }
    Ok(extraction)
}
