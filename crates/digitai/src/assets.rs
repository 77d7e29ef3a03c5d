//! Offline generation of PWA assets: icons and splash screens rendered from
//! SVG templates to PNG, plus the web app manifest.
//!
//! `digitai assets --out public` writes:
//!
//! ```text
//! public/
//!   manifest.webmanifest
//!   icons/icon-192.png  icon-512.png  icon-180.png
//!   splash/splash-640x1136.png ... splash-1284x2778.png
//! ```

use std::path::{Path, PathBuf};

use resvg::{tiny_skia, usvg};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const APP_NAME: &str = "DigitAI - Agentes de IA para WhatsApp";
pub const APP_SHORT_NAME: &str = "DigitAI";
pub const APP_DESCRIPTION: &str = "Transforme seu atendimento no WhatsApp com agentes de inteligência artificial. Automatize respostas, agendamentos e conversões 24/7.";
pub const TAGLINE: &str = "Agentes de IA para WhatsApp";

/// Background colour of the app shell.
pub const BACKGROUND_COLOR: &str = "#020617";
/// Theme colour used by the browser chrome.
pub const THEME_COLOR: &str = "#0f172a";

/// Square icon sizes in pixels. 180 is the Apple touch icon.
pub const ICON_SIZES: [u32; 3] = [192, 512, 180];

/// iOS splash-screen sizes in pixels (width, height).
pub const SPLASH_SIZES: [(u32, u32); 5] = [
    (640, 1136),
    (750, 1334),
    (1125, 2436),
    (1170, 2532),
    (1284, 2778),
];

pub fn icon_path(size: u32) -> String {
    format!("icons/icon-{size}.png")
}

pub fn splash_path(width: u32, height: u32) -> String {
    format!("splash/splash-{width}x{height}.png")
}

/// Rounded-square brand icon: gradient tile, letter "D", three accent dots.
pub fn icon_svg(size: u32) -> String {
    let s = f64::from(size);
    format!(
        r##"<svg width="{size}" height="{size}" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:#1e40af"/>
      <stop offset="100%" style="stop-color:#0891b2"/>
    </linearGradient>
  </defs>
  <rect width="{size}" height="{size}" rx="{rx}" fill="url(#bg)"/>
  <text x="{tx}" y="{ty}" font-family="Arial, sans-serif" font-size="{fs}" font-weight="bold" fill="white">D</text>
  <circle cx="{c1x}" cy="{c1y}" r="{r1}" fill="#22d3ee"/>
  <circle cx="{c2x}" cy="{c2y}" r="{r2}" fill="#22d3ee"/>
  <circle cx="{c1x}" cy="{c3y}" r="{r3}" fill="#22d3ee"/>
</svg>
"##,
        rx = s * 0.2,
        tx = s * 0.35,
        ty = s * 0.62,
        fs = s * 0.55,
        c1x = s * 0.72,
        c1y = s * 0.35,
        r1 = s * 0.055,
        c2x = s * 0.8,
        c2y = s * 0.5,
        r2 = s * 0.04,
        c3y = s * 0.65,
        r3 = s * 0.03,
    )
}

/// Dark splash screen with the icon tile centred above brand name and tagline.
pub fn splash_svg(width: u32, height: u32) -> String {
    let (w, h) = (f64::from(width), f64::from(height));
    let icon = w.min(h) * 0.25;
    let cx = w / 2.0;
    let cy = h / 2.0 - 50.0;
    let text_y = cy + icon / 2.0 + 60.0;

    format!(
        r##"<svg width="{width}" height="{height}" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <linearGradient id="bg" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:#020617"/>
      <stop offset="50%" style="stop-color:#0f172a"/>
      <stop offset="100%" style="stop-color:#020617"/>
    </linearGradient>
    <linearGradient id="icon" x1="0%" y1="0%" x2="100%" y2="100%">
      <stop offset="0%" style="stop-color:#1e40af"/>
      <stop offset="100%" style="stop-color:#0891b2"/>
    </linearGradient>
  </defs>
  <rect width="{width}" height="{height}" fill="url(#bg)"/>
  <rect x="{ix}" y="{iy}" width="{icon}" height="{icon}" rx="{irx}" fill="url(#icon)"/>
  <text x="{dx}" y="{dy}" font-family="Arial, sans-serif" font-size="{dfs}" font-weight="bold" fill="white">D</text>
  <circle cx="{ax}" cy="{a1y}" r="{r1}" fill="#22d3ee"/>
  <circle cx="{bx}" cy="{cy}" r="{r2}" fill="#22d3ee"/>
  <circle cx="{ax}" cy="{a3y}" r="{r3}" fill="#22d3ee"/>
  <text x="{cx}" y="{text_y}" font-family="Arial, sans-serif" font-size="{nfs}" font-weight="bold" fill="white" text-anchor="middle">Digit<tspan fill="#3b82f6">AI</tspan></text>
  <text x="{cx}" y="{tag_y}" font-family="Arial, sans-serif" font-size="{tfs}" fill="#64748b" text-anchor="middle">{TAGLINE}</text>
</svg>
"##,
        ix = cx - icon / 2.0,
        iy = cy - icon / 2.0,
        irx = icon * 0.2,
        dx = cx - icon * 0.08,
        dy = cy + icon * 0.12,
        dfs = icon * 0.55,
        ax = cx + icon * 0.22,
        a1y = cy - icon * 0.15,
        a3y = cy + icon * 0.15,
        bx = cx + icon * 0.30,
        r1 = icon * 0.055,
        r2 = icon * 0.04,
        r3 = icon * 0.03,
        nfs = icon * 0.25,
        tag_y = text_y + icon * 0.15,
        tfs = icon * 0.1,
    )
}

/// One entry of the manifest `icons` list.
#[derive(Serialize, Debug, Clone)]
pub struct ManifestIcon {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub purpose: String,
}

/// The web app manifest served as `/manifest.webmanifest`.
#[derive(Serialize, Debug, Clone)]
pub struct WebManifest {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub start_url: String,
    pub scope: String,
    pub display: String,
    pub orientation: String,
    pub background_color: String,
    pub theme_color: String,
    pub lang: String,
    pub icons: Vec<ManifestIcon>,
}

impl Default for WebManifest {
    fn default() -> Self {
        let icons = ICON_SIZES
            .iter()
            .map(|&size| ManifestIcon {
                src: format!("/{}", icon_path(size)),
                sizes: format!("{size}x{size}"),
                mime: "image/png".into(),
                purpose: "any maskable".into(),
            })
            .collect();
        Self {
            name: APP_NAME.into(),
            short_name: APP_SHORT_NAME.into(),
            description: APP_DESCRIPTION.into(),
            start_url: "/".into(),
            scope: "/".into(),
            display: "standalone".into(),
            orientation: "portrait".into(),
            background_color: BACKGROUND_COLOR.into(),
            theme_color: THEME_COLOR.into(),
            lang: "pt-BR".into(),
            icons,
        }
    }
}

/// Rasterises SVG templates to PNG. Holds the font database so system fonts
/// are loaded once per batch.
pub struct PngRenderer {
    options: usvg::Options<'static>,
}

impl PngRenderer {
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        debug!("loaded {} font faces", options.fontdb.len());
        Self { options }
    }

    /// Render `svg` onto a `width` x `height` canvas and encode it as PNG.
    pub fn render(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let tree = usvg::Tree::from_str(svg, &self.options)
            .map_err(|e| Error::Render(e.to_string()))?;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("invalid canvas size {width}x{height}")))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
        pixmap
            .encode_png()
            .map_err(|e| Error::Render(e.to_string()))
    }
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the manifest, icons and splash screens under `out_dir`.
///
/// Existing files are overwritten. Returns every path written.
pub fn write_assets(out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir.join("icons"))?;
    std::fs::create_dir_all(out_dir.join("splash"))?;

    let renderer = PngRenderer::new();
    let mut written = Vec::new();

    for size in ICON_SIZES {
        let path = out_dir.join(icon_path(size));
        std::fs::write(&path, renderer.render(&icon_svg(size), size, size)?)?;
        info!("generated {}", path.display());
        written.push(path);
    }

    for (width, height) in SPLASH_SIZES {
        let path = out_dir.join(splash_path(width, height));
        std::fs::write(&path, renderer.render(&splash_svg(width, height), width, height)?)?;
        info!("generated {}", path.display());
        written.push(path);
    }

    let manifest_path = out_dir.join("manifest.webmanifest");
    std::fs::write(
        &manifest_path,
        serde_json::to_string_pretty(&WebManifest::default())?,
    )?;
    written.push(manifest_path);

    Ok(written)
}
