use chrono::{SecondsFormat, Utc};
use tracing::warn;

use crate::assets::AssetResolver;
use crate::model::{
    AutoResize, BackgroundType, Design, DesignBackground, DesignData, GridSettings,
    ImageProperties, ImageShadow, Layer, LayerBody, LegacyDocument, LegacyElement,
    LegacyElementProps, LegacyScene, LegacyTemplate, ShapeFill, ShapeProperties, TextProperties,
    Transform, ViewportSettings,
};

pub const DEFAULT_CANVAS_WIDTH: i64 = 1920;
pub const DEFAULT_CANVAS_HEIGHT: i64 = 1080;

/// Legacy documents can contain multiple scenes; only this one is
/// converted. Carried over from the original migration, not a bug.
pub const SCENE_INDEX: usize = 0;

/// The legacy encoding for a fully-transparent background.
pub const TRANSPARENT_SENTINEL: &str = "#0000";

/// Owner recorded on every migrated design.
pub const LEGACY_USER_ID: &str = "legacy_import";

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The embedded source JSON of one record failed to parse. Per-record:
    /// the caller counts it and moves on to the next row.
    #[error("template {template_id}: malformed source JSON: {reason}")]
    MalformedSource { template_id: i64, reason: String },
}

/// Converts one legacy row into a normalized `Design`.
///
/// Deterministic for identical input and filesystem state. Image elements
/// trigger exactly one resolver call each; every other failure mode inside
/// an element drops that layer without failing the record.
pub fn convert_template(
    record: &LegacyTemplate,
    resolver: &AssetResolver,
) -> Result<Design, ConvertError> {
    let doc: LegacyDocument =
        serde_json::from_str(&record.source_json).map_err(|e| ConvertError::MalformedSource {
            template_id: record.id,
            reason: e.to_string(),
        })?;

    let (width, height) = canvas_dimensions(&doc);
    let scene = doc.scenes.get(SCENE_INDEX);

    let hash = record.hash.trim();
    let id = if hash.is_empty() {
        format!("template_{}", record.id)
    } else {
        hash.to_string()
    };
    let template_ctx = (!hash.is_empty()).then_some(hash);

    let name = record
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("Template {}", record.id));

    let layers = match scene {
        Some(s) => convert_layers(record.id, s, width, height, template_ctx, resolver),
        None => Vec::new(),
    };

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let created = record
        .created_at
        .clone()
        .filter(|t| !t.trim().is_empty());
    let modified = record
        .modified_at
        .clone()
        .filter(|t| !t.trim().is_empty());
    let created_at = created.clone().unwrap_or_else(|| now.clone());
    let updated_at = modified.or(created).unwrap_or(now);

    Ok(Design {
        id,
        name: name.clone(),
        title: name,
        description: build_description(record.category.as_deref(), record.tags.as_deref()),
        data: convert_design_data(scene),
        layers,
        thumbnail: template_ctx.map(|h| format!("/cache/tpl/previews/{}.jpg", h)),
        width,
        height,
        user_id: LEGACY_USER_ID.to_string(),
        project_id: None,
        is_public: record.is_public == "1",
        created_at,
        updated_at,
    })
}

/// Canvas size from the document's `sz` pair, defaulting to 1920x1080 when
/// the pair is absent. Entries that fail to parse become 0; the legacy data
/// genuinely contains such rows and they must convert rather than crash.
fn canvas_dimensions(doc: &LegacyDocument) -> (i64, i64) {
    let Some(sz) = doc.canvas_size.as_ref() else {
        return (DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT);
    };
    (parse_dimension(sz.first()), parse_dimension(sz.get(1)))
}

fn parse_dimension(v: Option<&serde_json::Value>) -> i64 {
    let Some(v) = v else { return 0 };
    if let Some(n) = v.as_i64() {
        return n;
    }
    if let Some(f) = v.as_f64() {
        return f as i64;
    }
    v.as_str()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

pub fn build_description(category: Option<&str>, tags: Option<&str>) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(cat) = category.filter(|c| !c.trim().is_empty()) {
        parts.push(format!("Category: {}", cat));
    }
    if let Some(tags) = tags.filter(|t| !t.trim().is_empty()) {
        parts.push(format!("Tags: {}", tags));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

fn convert_design_data(scene: Option<&LegacyScene>) -> DesignData {
    let bg = scene.and_then(|s| s.background.as_ref());
    let raw_color = bg.and_then(|b| b.color.as_deref());
    DesignData {
        background_color: raw_color.unwrap_or("#ffffff").to_string(),
        background: convert_background(raw_color),
        grid_settings: GridSettings::default(),
        viewport_settings: ViewportSettings::default(),
    }
}

/// Absent backgrounds become solid white; the legacy transparent sentinel
/// maps to the semantic value; any other literal passes through untouched.
fn convert_background(color: Option<&str>) -> DesignBackground {
    let color = match color {
        None => "#ffffff".to_string(),
        Some(TRANSPARENT_SENTINEL) => "transparent".to_string(),
        Some(c) => c.to_string(),
    };
    DesignBackground {
        kind: BackgroundType::Solid,
        color: Some(color),
        gradient: None,
    }
}

fn convert_layers(
    template_id: i64,
    scene: &LegacyScene,
    canvas_w: i64,
    canvas_h: i64,
    template_ctx: Option<&str>,
    resolver: &AssetResolver,
) -> Vec<Layer> {
    let mut layers = Vec::with_capacity(scene.elements.len());
    for (index, element) in scene.elements.iter().enumerate() {
        if let Some(layer) = convert_element(
            template_id,
            element,
            index,
            canvas_w,
            canvas_h,
            template_ctx,
            resolver,
        ) {
            layers.push(layer);
        }
    }
    layers
}

/// Dispatch on the element kind. Skip-don't-fail: unknown kinds and
/// unresolvable images log a warning and return None; the record keeps
/// converting with one fewer layer.
fn convert_element(
    template_id: i64,
    element: &LegacyElement,
    index: usize,
    canvas_w: i64,
    canvas_h: i64,
    template_ctx: Option<&str>,
    resolver: &AssetResolver,
) -> Option<Layer> {
    let props = element.prop.as_ref()?;

    let name = element
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Layer {}", index + 1));

    let body = match element.alias.as_deref() {
        Some("shape") if props.sym.as_deref() == Some("text") => {
            LayerBody::Text(convert_text_properties(props))
        }
        Some("shape") => LayerBody::Shape(convert_shape_properties(props)),
        Some("images") => {
            let Some(src) = props.src.as_deref() else {
                warn!(template = template_id, index, "image element has no source, dropping layer");
                return None;
            };
            match resolver.resolve(src, template_ctx) {
                Ok(public) => LayerBody::Image(convert_image_properties(public, &name)),
                Err(e) => {
                    warn!(
                        template = template_id,
                        index,
                        src,
                        reason = %e,
                        "image source unresolvable, dropping layer"
                    );
                    return None;
                }
            }
        }
        other => {
            warn!(
                template = template_id,
                index,
                kind = other.unwrap_or("<none>"),
                "unknown element kind, skipping"
            );
            return None;
        }
    };

    Some(Layer {
        id: layer_id(props.uid.as_deref(), index),
        name,
        visible: props.noshow != Some(1),
        locked: false,
        transform: convert_transform(props, canvas_w, canvas_h),
        // An explicit z of 0 is a real position, only absence falls back.
        z_index: props.z.unwrap_or(index as i64),
        body,
    })
}

/// Layer ids come from the `<prefix>_<number>` uid field. Absent,
/// unparsable or zero suffixes fall back to index+1 (the original treated a
/// parsed 0 as missing).
fn layer_id(uid: Option<&str>, index: usize) -> i64 {
    uid.and_then(|u| u.split('_').nth(1))
        .and_then(|n| n.parse::<i64>().ok())
        .filter(|n| *n != 0)
        .unwrap_or(index as i64 + 1)
}

fn convert_transform(props: &LegacyElementProps, canvas_w: i64, canvas_h: i64) -> Transform {
    Transform {
        x: percent_to_pixel(props.left, canvas_w),
        y: percent_to_pixel(props.top, canvas_h),
        width: percent_to_pixel(props.w, canvas_w),
        height: percent_to_pixel(props.h, canvas_h),
        rotation: props.r.unwrap_or(0.0),
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        skew_y: 0.0,
        // Raw 0 stays 0.0 (fully transparent); only absence defaults to 10.
        opacity: props.opacity.unwrap_or(10.0) / 10.0,
    }
}

/// Legacy positions are percentages of the canvas (0-100). Missing or
/// non-numeric values yield 0.
pub fn percent_to_pixel(percent: Option<f64>, canvas: i64) -> i64 {
    match percent {
        Some(p) => (p / 100.0 * canvas as f64).round() as i64,
        None => 0,
    }
}

/// Colors either pass through (`#...` and `rgba(...)` literals), map the
/// transparent sentinel, or collapse to black. No hex-length validation.
pub fn normalize_color(raw: Option<&str>, default: &str) -> String {
    match raw {
        None => default.to_string(),
        Some(TRANSPARENT_SENTINEL) => "transparent".to_string(),
        Some(c) if c.starts_with("rgba(") => c.to_string(),
        Some(c) if c.starts_with('#') => c.to_string(),
        Some(_) => "#000000".to_string(),
    }
}

fn convert_text_properties(props: &LegacyElementProps) -> TextProperties {
    let raw_color = props
        .color
        .as_deref()
        .or_else(|| props.background.as_ref().and_then(|b| b.color.as_deref()));
    TextProperties {
        text: props.text.clone().unwrap_or_default(),
        font_family: props.font.clone().unwrap_or_else(|| "Arial".to_string()),
        font_size: props.size.unwrap_or(16.0),
        font_weight: if props.type_marker.as_deref() == Some("bold") {
            "bold".to_string()
        } else {
            "normal".to_string()
        },
        font_style: "normal".to_string(),
        text_align: props.align.clone().unwrap_or_else(|| "left".to_string()),
        color: normalize_color(raw_color, "#000000"),
        line_height: props.line.unwrap_or(1.2),
        letter_spacing: props.spacing.unwrap_or(0.0),
        text_decoration: "none".to_string(),
        auto_resize: AutoResize::default(),
    }
}

/// Legacy shapes carry no usable stroke or border data, so every shape
/// becomes a zero-stroke rectangle.
fn convert_shape_properties(props: &LegacyElementProps) -> ShapeProperties {
    let fill_color = props.background.as_ref().and_then(|b| b.color.as_deref());
    ShapeProperties {
        shape_type: "rectangle".to_string(),
        fill: ShapeFill {
            kind: BackgroundType::Solid,
            color: normalize_color(fill_color, "#000000"),
            opacity: 1.0,
        },
        stroke: "#000000".to_string(),
        stroke_width: 0.0,
        stroke_opacity: 1.0,
        corner_radius: 0.0,
        sides: 4,
        points: 5,
        inner_radius: 0.5,
        x1: 0.0,
        y1: 0.0,
        x2: 100.0,
        y2: 100.0,
    }
}

fn convert_image_properties(src: String, alt: &str) -> ImageProperties {
    ImageProperties {
        src,
        alt: alt.to_string(),
        object_position: "center".to_string(),
        preserve_aspect_ratio: true,
        quality: 80,
        scale_mode: "fill".to_string(),
        blur: 0.0,
        brightness: 1.0,
        contrast: 1.0,
        saturation: 1.0,
        hue: 0.0,
        sepia: 0.0,
        grayscale: 0.0,
        invert: 0.0,
        shadow: ImageShadow::default(),
        flip_x: false,
        flip_y: false,
    }
}
