//! SVG to PNG/JPEG rasterization for exports of embedded-library renders.

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid background color `{0}`")]
    Background(String),
    #[error("JPEG export requires an opaque background color (e.g. white)")]
    JpegOpaqueBackgroundRequired,
    #[error("failed to encode JPEG")]
    JpegEncode,
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: f32,
    /// Fill color behind the drawing; `None` keeps PNG exports transparent.
    pub background: Option<String>,
    pub jpeg_quality: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Some("white".to_string()),
            jpeg_quality: 90,
        }
    }
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let background = match options.background.as_deref() {
        Some(bg) => Some(parse_color(bg).ok_or_else(|| RasterError::Background(bg.to_string()))?),
        None => None,
    };
    let pixmap = rasterize(svg, options.scale, background)?;
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

pub fn svg_to_jpeg(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let bg = options.background.as_deref().unwrap_or("white");
    let color = parse_color(bg).ok_or_else(|| RasterError::Background(bg.to_string()))?;
    if color.alpha() != 1.0 {
        return Err(RasterError::JpegOpaqueBackgroundRequired);
    }

    let pixmap = rasterize(svg, options.scale, Some(color))?;
    let (width, height) = (pixmap.width(), pixmap.height());

    // Opaque fill means alpha is always 255 here.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, options.jpeg_quality)
        .encode(&rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|_| RasterError::JpegEncode)?;
    Ok(out)
}

/// Width and height of the root `viewBox`, if it is present and positive.
fn root_viewbox_size(svg: &str) -> Option<(f32, f32)> {
    let start = svg.find("viewBox=\"")? + "viewBox=\"".len();
    let rest = &svg[start..];
    let raw = &rest[..rest.find('"')?];
    let nums: Vec<f32> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match nums.as_slice() {
        [_, _, w, h] if w.is_finite() && h.is_finite() && *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

fn rasterize(
    svg: &str,
    scale: f32,
    background: Option<tiny_skia::Color>,
) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

    // usvg already maps the viewBox origin to (0,0).
    let (width, height) = root_viewbox_size(svg).unwrap_or_else(|| {
        let size = tree.size();
        (size.width(), size.height())
    });

    let width_px = (width * scale).ceil().max(1.0) as u32;
    let height_px = (height * scale).ceil().max(1.0) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;

    if let Some(color) = background {
        pixmap.fill(color);
    }

    tracing::debug!(width_px, height_px, "rasterizing SVG");
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Named colors (`white`, `black`, `transparent`) and `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`.
fn parse_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()?;
    let channels: Vec<u8> = match digits.len() {
        3 | 4 => digits.iter().map(|d| (d << 4) | d).collect(),
        6 | 8 => digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect(),
        _ => return None,
    };
    let alpha = channels.get(3).copied().unwrap_or(255);
    Some(tiny_skia::Color::from_rgba8(
        channels[0],
        channels[1],
        channels[2],
        alpha,
    ))
}
