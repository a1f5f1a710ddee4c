//! Color legend: a display bar with label layout, and a 256-sample lookup strip
//! for value-to-color mapping on the GPU.
//!
//! Both outputs are built on first request and cached until [`ColorLegend::set_colors`].

use field_common::{FieldError, FieldResult};
use image::{Rgba, RgbaImage};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{gradient_color, parse_color, stepped_color, GradientStop};
use crate::png;

/// Samples in the lookup strip.
pub const STRIP_SAMPLES: usize = 256;

/// Side of the square texture the strip is reshaped into.
pub const STRIP_TEXTURE_SIZE: u32 = 16;

/// Horizontal inset of the units label inside its slot.
const UNITS_INSET: f64 = 5.0;

/// Approximate glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// Continuous or flat-per-segment ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendType {
    #[default]
    Gradual,
    Stepped,
}

impl LegendType {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "stepped" | "step" => Self::Stepped,
            _ => Self::Gradual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gradual => "gradual",
            Self::Stepped => "stepped",
        }
    }
}

/// Legend bar orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowType {
    #[default]
    Horizontal,
    #[serde(alias = "veritical")]
    Vertical,
}

impl ShowType {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "vertical" | "veritical" => Self::Vertical,
            _ => Self::Horizontal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

/// Legend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegendOptions {
    /// `(breakpoint, color)` pairs with strictly increasing breakpoints
    pub colors: Vec<(f64, String)>,
    pub legend_type: LegendType,
    pub show_type: ShowType,
    pub show: bool,
    pub dom_width: u32,
    pub dom_height: u32,
    pub units: String,
    /// Width of the units slot in a horizontal legend
    pub units_width: u32,
    pub font_size: f64,
    pub font_color: String,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            legend_type: LegendType::Gradual,
            show_type: ShowType::Horizontal,
            show: true,
            dom_width: 300,
            dom_height: 25,
            units: String::new(),
            units_width: 40,
            font_size: 14.0,
            font_color: "#FFFFFF".to_string(),
        }
    }
}

impl LegendOptions {
    pub fn with_colors(mut self, colors: Vec<(f64, String)>) -> Self {
        self.colors = colors;
        self
    }

    pub fn with_legend_type(mut self, legend_type: LegendType) -> Self {
        self.legend_type = legend_type;
        self
    }

    pub fn with_show_type(mut self, show_type: ShowType) -> Self {
        self.show_type = show_type;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.dom_width = width;
        self.dom_height = height;
        self
    }

    /// Check sizes and the font color. Breakpoints are checked by [`Ramp::new`].
    pub fn validate(&self) -> FieldResult<()> {
        if self.dom_width == 0 || self.dom_height == 0 {
            return Err(FieldError::invalid_legend(format!(
                "legend size must be positive, got {}x{}",
                self.dom_width, self.dom_height
            )));
        }
        if self.show_type == ShowType::Horizontal && self.units_width >= self.dom_width {
            return Err(FieldError::invalid_legend(format!(
                "units slot ({}) leaves no room in a {} wide legend",
                self.units_width, self.dom_width
            )));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(FieldError::invalid_legend(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if parse_color(&self.font_color).is_none() {
            return Err(FieldError::invalid_legend(format!(
                "unparsable font color {:?}",
                self.font_color
            )));
        }
        Ok(())
    }
}

/// Validated breakpoints with parsed colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Ramp {
    entries: Vec<(f64, Rgba<u8>)>,
}

impl Ramp {
    /// Parse colors and check that breakpoints are finite and strictly increasing.
    pub fn new(colors: &[(f64, String)]) -> FieldResult<Self> {
        if colors.is_empty() {
            return Err(FieldError::invalid_legend("ramp has no breakpoints"));
        }

        let mut entries = Vec::with_capacity(colors.len());
        for (value, hex) in colors {
            if !value.is_finite() {
                return Err(FieldError::invalid_legend(format!(
                    "breakpoint {} is not finite",
                    value
                )));
            }
            if let Some((previous, _)) = entries.last() {
                if *value <= *previous {
                    return Err(FieldError::invalid_legend(format!(
                        "breakpoints must increase strictly, {} follows {}",
                        value, previous
                    )));
                }
            }
            let color = parse_color(hex)
                .ok_or_else(|| FieldError::invalid_legend(format!("unparsable color {:?}", hex)))?;
            entries.push((*value, color));
        }
        Ok(Self { entries })
    }

    /// `[min breakpoint, max breakpoint]`.
    pub fn domain(&self) -> [f64; 2] {
        let min = self.entries.first().map(|(v, _)| *v).unwrap_or(0.0);
        let max = self.entries.last().map(|(v, _)| *v).unwrap_or(0.0);
        [min, max]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(f64, Rgba<u8>)] {
        &self.entries
    }

    /// Breakpoints mapped onto `[0, 1]`; a single breakpoint sits at 0.
    pub fn normalized_stops(&self) -> Vec<GradientStop> {
        let [min, max] = self.domain();
        let span = max - min;
        self.entries
            .iter()
            .map(|(value, color)| GradientStop {
                offset: if span > 0.0 { (value - min) / span } else { 0.0 },
                color: *color,
            })
            .collect()
    }
}

/// 256-sample color ramp for GPU lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupStrip {
    pixels: Vec<u8>,
    range: [f64; 2],
}

impl LookupStrip {
    /// Sample `ramp` at `t = p / 255` for each of the 256 positions.
    pub fn build(ramp: &Ramp, legend_type: LegendType) -> Self {
        let stops = ramp.normalized_stops();
        let mut pixels = Vec::with_capacity(STRIP_SAMPLES * 4);
        for p in 0..STRIP_SAMPLES {
            let t = p as f64 / (STRIP_SAMPLES - 1) as f64;
            let color = match legend_type {
                LegendType::Gradual => gradient_color(&stops, t),
                LegendType::Stepped => stepped_color(&stops, t),
            };
            pixels.extend_from_slice(&color.0);
        }
        Self {
            pixels,
            range: ramp.domain(),
        }
    }

    /// RGBA bytes, 256 × 4.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Numeric domain `[min, max]` of the ramp.
    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    /// Color at normalized position `t ∈ [0, 1]` (clamped).
    pub fn sample(&self, t: f64) -> Rgba<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        self.texel((t * (STRIP_SAMPLES - 1) as f64).round() as usize)
    }

    /// Color for a data value, mapped through the ramp domain.
    pub fn sample_value(&self, value: f64) -> Rgba<u8> {
        let [min, max] = self.range;
        if max > min {
            self.sample((value - min) / (max - min))
        } else {
            self.sample(0.0)
        }
    }

    fn texel(&self, index: usize) -> Rgba<u8> {
        let i = index.min(STRIP_SAMPLES - 1) * 4;
        Rgba([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// The strip reshaped row by row into a 16×16 texture.
    pub fn texture(&self) -> RgbaImage {
        RgbaImage::from_fn(STRIP_TEXTURE_SIZE, STRIP_TEXTURE_SIZE, |x, y| {
            self.texel((y * STRIP_TEXTURE_SIZE + x) as usize)
        })
    }

    /// PNG of the 16×16 texture.
    pub fn to_png(&self) -> FieldResult<Vec<u8>> {
        png::encode_image(&self.texture())
    }
}

/// What a legend label shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Units,
    Breakpoint,
}

/// Label text with its anchor, left edge and vertical middle, in legend pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub kind: LabelKind,
}

/// Rendered legend bar plus the label layout for the UI collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendDisplay {
    pub image: RgbaImage,
    pub labels: Vec<LegendLabel>,
    pub font_size: f64,
    pub font_color: Rgba<u8>,
    pub visible: bool,
}

impl LegendDisplay {
    pub fn to_png(&self) -> FieldResult<Vec<u8>> {
        png::encode_image(&self.image)
    }
}

/// A color ramp definition with cached display and lookup outputs.
#[derive(Debug)]
pub struct ColorLegend {
    options: LegendOptions,
    ramp: Ramp,
    font_color: Rgba<u8>,
    display: OnceCell<LegendDisplay>,
    strip: OnceCell<LookupStrip>,
}

impl ColorLegend {
    pub fn new(options: LegendOptions) -> FieldResult<Self> {
        options.validate()?;
        let ramp = Ramp::new(&options.colors)?;
        let font_color = parse_color(&options.font_color).unwrap_or(Rgba([255, 255, 255, 255]));
        Ok(Self {
            options,
            ramp,
            font_color,
            display: OnceCell::new(),
            strip: OnceCell::new(),
        })
    }

    pub fn options(&self) -> &LegendOptions {
        &self.options
    }

    pub fn colors(&self) -> &[(f64, String)] {
        &self.options.colors
    }

    pub fn ramp(&self) -> &Ramp {
        &self.ramp
    }

    pub fn is_visible(&self) -> bool {
        self.options.show
    }

    /// Replace the ramp and drop cached outputs.
    ///
    /// On error the previous ramp and caches are kept.
    pub fn set_colors(&mut self, colors: Vec<(f64, String)>) -> FieldResult<()> {
        self.ramp = Ramp::new(&colors)?;
        self.options.colors = colors;
        self.display = OnceCell::new();
        self.strip = OnceCell::new();
        Ok(())
    }

    /// `[min, max]` of the breakpoints.
    pub fn color_range(&self) -> [f64; 2] {
        self.lookup_strip().range()
    }

    pub fn lookup_strip(&self) -> &LookupStrip {
        self.strip.get_or_init(|| {
            debug!(
                breakpoints = self.ramp.len(),
                legend_type = self.options.legend_type.as_str(),
                "Building lookup strip"
            );
            LookupStrip::build(&self.ramp, self.options.legend_type)
        })
    }

    pub fn display(&self) -> &LegendDisplay {
        self.display.get_or_init(|| {
            debug!(
                width = self.options.dom_width,
                height = self.options.dom_height,
                show_type = self.options.show_type.as_str(),
                "Rendering legend"
            );
            self.render_display()
        })
    }

    /// Slot colors: the units slot repeats the first color.
    fn slot_colors(&self) -> Vec<Rgba<u8>> {
        let entries = self.ramp.entries();
        let mut colors = Vec::with_capacity(entries.len() + 1);
        if let Some((_, first)) = entries.first() {
            colors.push(*first);
        }
        colors.extend(entries.iter().map(|(_, color)| *color));
        colors
    }

    /// Start of each slot along the bar axis, in pixels.
    fn slot_starts(&self, slots: usize) -> (Vec<f64>, f64) {
        let options = &self.options;
        match options.show_type {
            ShowType::Horizontal => {
                let units_width = options.units_width as f64;
                let step = (options.dom_width as f64 - units_width) / (slots - 1) as f64;
                let starts = (0..slots)
                    .map(|i| if i == 0 { 0.0 } else { units_width + (i - 1) as f64 * step })
                    .collect();
                (starts, step)
            }
            ShowType::Vertical => {
                let step = options.dom_height as f64 / slots as f64;
                ((0..slots).map(|i| i as f64 * step).collect(), step)
            }
        }
    }

    fn render_display(&self) -> LegendDisplay {
        let options = &self.options;
        let colors = self.slot_colors();
        let (starts, step) = self.slot_starts(colors.len());

        let (axis_len, width, height) = match options.show_type {
            ShowType::Horizontal => (options.dom_width as f64, options.dom_width, options.dom_height),
            ShowType::Vertical => (options.dom_height as f64, options.dom_width, options.dom_height),
        };

        let stops: Vec<GradientStop> = starts
            .iter()
            .zip(&colors)
            .map(|(start, color)| GradientStop {
                offset: start / axis_len,
                color: *color,
            })
            .collect();

        let color_at = |position: f64| match options.legend_type {
            LegendType::Gradual => gradient_color(&stops, position / axis_len),
            LegendType::Stepped => {
                let slot = starts.iter().take_while(|start| **start <= position).count();
                colors[slot.saturating_sub(1)]
            }
        };

        let image = RgbaImage::from_fn(width, height, |x, y| {
            let position = match options.show_type {
                ShowType::Horizontal => x as f64 + 0.5,
                ShowType::Vertical => y as f64 + 0.5,
            };
            color_at(position)
        });

        LegendDisplay {
            image,
            labels: self.layout_labels(&starts, step),
            font_size: options.font_size,
            font_color: self.font_color,
            visible: options.show,
        }
    }

    fn layout_labels(&self, starts: &[f64], step: f64) -> Vec<LegendLabel> {
        let options = &self.options;
        let text_width = |text: &str| text.chars().count() as f64 * GLYPH_ADVANCE * options.font_size;

        let mut labels = Vec::with_capacity(starts.len());
        for (slot, start) in starts.iter().enumerate() {
            let (text, kind) = if slot == 0 {
                (options.units.clone(), LabelKind::Units)
            } else {
                (format_breakpoint(self.ramp.entries()[slot - 1].0), LabelKind::Breakpoint)
            };
            let width = text_width(&text);

            let (x, y) = match options.show_type {
                ShowType::Horizontal => {
                    let slot_width = if slot == 0 { options.units_width as f64 } else { step };
                    let x = match (options.legend_type, kind) {
                        (LegendType::Stepped, _) => start + (slot_width - width) / 2.0,
                        (LegendType::Gradual, LabelKind::Units) => start + UNITS_INSET,
                        (LegendType::Gradual, LabelKind::Breakpoint) => *start,
                    };
                    (x, options.dom_height as f64 / 2.0)
                }
                ShowType::Vertical => (
                    options.dom_width as f64 / 2.0 - width / 2.0,
                    start + options.font_size / 2.0,
                ),
            };

            labels.push(LegendLabel { text, x, y, kind });
        }
        labels
    }
}

/// Shortest decimal form of a breakpoint (`-40`, `0.5`).
pub fn format_breakpoint(value: f64) -> String {
    format!("{}", value)
}
