use serde::{Deserialize, Deserializer, Serialize};

/// One row of the legacy `tpl` table. Everything except the numeric id is
/// optional in practice; old rows are frequently missing metadata and the
/// hash column can be an empty string.
#[derive(Debug, Clone)]
pub struct LegacyTemplate {
    pub id: i64,
    pub title: Option<String>,
    pub hash: String,
    #[allow(dead_code)]
    pub size: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub source_json: String,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub is_public: String,
}

/// The JSON blob embedded in a legacy row. `sz` holds canvas dimensions as
/// strings (sometimes numbers); `s` is the scene list, of which only the
/// first scene is ever converted.
#[derive(Debug, Deserialize)]
pub struct LegacyDocument {
    #[serde(default, rename = "sz")]
    pub canvas_size: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "s")]
    pub scenes: Vec<LegacyScene>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegacyScene {
    #[serde(default, rename = "bg")]
    pub background: Option<LegacyBackground>,
    #[serde(default, rename = "e")]
    pub elements: Vec<LegacyElement>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyBackground {
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyElement {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prop: Option<LegacyElementProps>,
}

/// Per-element payload. Numeric fields use lenient deserialization: any
/// value that is not a JSON number reads as absent, matching the legacy
/// format's loose typing. A string "10" in a numeric slot therefore counts
/// as missing, not as 10.
#[derive(Debug, Default, Deserialize)]
pub struct LegacyElementProps {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub noshow: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub z: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub left: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub top: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub w: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub h: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub r: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub sym: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size: Option<f64>,
    #[serde(default, rename = "type")]
    pub type_marker: Option<String>,
    #[serde(default)]
    pub align: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub line: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spacing: Option<f64>,
    #[serde(default)]
    pub background: Option<LegacyBackground>,
    #[serde(default)]
    pub src: Option<String>,
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_f64())
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_i64())
}

/// The normalized output document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Design {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub data: DesignData,
    pub layers: Vec<Layer>,
    pub thumbnail: Option<String>,
    pub width: i64,
    pub height: i64,
    pub user_id: String,
    pub project_id: Option<String>,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignData {
    pub background_color: String,
    pub background: DesignBackground,
    pub grid_settings: GridSettings,
    pub viewport_settings: ViewportSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DesignBackground {
    #[serde(rename = "type")]
    pub kind: BackgroundType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<serde_json::Value>,
}

/// The target schema also supports gradient backgrounds; the legacy format
/// only ever produces solid ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    Solid,
    Linear,
    Radial,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    pub grid_size: i64,
    pub show_grid: bool,
    pub snap_to_grid: bool,
    pub snap_to_objects: bool,
    pub snap_tolerance: i64,
}

impl Default for GridSettings {
    fn default() -> Self {
        GridSettings {
            grid_size: 20,
            show_grid: false,
            snap_to_grid: true,
            snap_to_objects: true,
            snap_tolerance: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSettings {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        ViewportSettings {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

/// One visual element on the canvas. The `type`/`properties` pair is a
/// closed union; the target schema's group/video/audio/svg variants are
/// never produced from the legacy format.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: i64,
    pub name: String,
    pub visible: bool,
    pub locked: bool,
    pub transform: Transform,
    pub z_index: i64,
    #[serde(flatten)]
    pub body: LayerBody,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "lowercase")]
pub enum LayerBody {
    Text(TextProperties),
    Image(ImageProperties),
    Shape(ShapeProperties),
}

/// Pixel coordinates in the destination canvas space.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub opacity: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperties {
    pub text: String,
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: String,
    pub font_style: String,
    pub text_align: String,
    pub color: String,
    pub line_height: f64,
    pub letter_spacing: f64,
    pub text_decoration: String,
    pub auto_resize: AutoResize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoResize {
    pub enabled: bool,
    pub mode: String,
    pub padding: Padding,
}

impl Default for AutoResize {
    fn default() -> Self {
        AutoResize {
            enabled: true,
            mode: "both".to_string(),
            padding: Padding::default(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProperties {
    pub src: String,
    pub alt: String,
    pub object_position: String,
    pub preserve_aspect_ratio: bool,
    pub quality: i64,
    pub scale_mode: String,
    pub blur: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub hue: f64,
    pub sepia: f64,
    pub grayscale: f64,
    pub invert: f64,
    pub shadow: ImageShadow,
    pub flip_x: bool,
    pub flip_y: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ImageShadow {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeProperties {
    pub shape_type: String,
    pub fill: ShapeFill,
    pub stroke: String,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    pub corner_radius: f64,
    pub sides: i64,
    pub points: i64,
    pub inner_radius: f64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeFill {
    #[serde(rename = "type")]
    pub kind: BackgroundType,
    pub color: String,
    pub opacity: f64,
}
