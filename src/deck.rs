//! Slide-deck builder.
//!
//! The deck is an OOXML workbook with one worksheet per slide: a heading,
//! an embedded native chart (or text body), and a caption. The builder
//! exclusively owns the accumulating workbook; slide builders receive
//! `&mut Deck` and never a copy, so there is a single writer for the whole
//! export.

use rust_xlsxwriter::{Chart, ChartType, Color, Format, Workbook};

use crate::errors::AppError;
use crate::models::ThemeOverrides;

/// First row of the chart source-data region, below the inserted chart.
const DATA_ROW: u32 = 24;

/// Chart families available for statistic slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Single-series pie breakdown.
    Pie,
    /// Single-series doughnut breakdown.
    Doughnut,
    /// Clustered column comparison, one series per outcome category.
    Column,
}

/// Deck color palette.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Heading/accent color.
    pub accent: Color,
    /// Caption text color.
    pub caption: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::RGB(0x1F4E79),
            caption: Color::RGB(0x595959),
        }
    }
}

impl Theme {
    /// Applies hex-color overrides on top of the default palette.
    /// Unparseable overrides are ignored with a warning.
    pub fn with_overrides(overrides: Option<&ThemeOverrides>) -> Self {
        let mut theme = Theme::default();
        let Some(overrides) = overrides else {
            return theme;
        };

        if let Some(accent) = overrides.accent.as_deref() {
            match parse_hex_color(accent) {
                Some(color) => theme.accent = color,
                None => tracing::warn!("Ignoring invalid accent color override: {}", accent),
            }
        }
        if let Some(caption) = overrides.caption.as_deref() {
            match parse_hex_color(caption) {
                Some(color) => theme.caption = color,
                None => tracing::warn!("Ignoring invalid caption color override: {}", caption),
            }
        }
        theme
    }
}

/// Parses a "#RRGGBB" or "RRGGBB" hex color.
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let digits = value.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(Color::RGB)
}

/// The accumulating slide-deck document.
pub struct Deck {
    workbook: Workbook,
    slide_count: usize,
    title_format: Format,
    heading_format: Format,
    body_format: Format,
    caption_format: Format,
}

impl Deck {
    pub fn new(theme: Theme) -> Self {
        Self {
            workbook: Workbook::new(),
            slide_count: 0,
            title_format: Format::new()
                .set_bold()
                .set_font_size(28)
                .set_font_color(theme.accent),
            heading_format: Format::new()
                .set_bold()
                .set_font_size(18)
                .set_font_color(theme.accent),
            body_format: Format::new().set_font_size(12),
            caption_format: Format::new()
                .set_italic()
                .set_font_size(11)
                .set_font_color(theme.caption),
        }
    }

    /// Number of slides added so far.
    pub fn slide_count(&self) -> usize {
        self.slide_count
    }

    /// Worksheet name for the next slide: ordinal prefix plus a sanitized,
    /// truncated title (sheet names cap at 31 characters).
    fn next_sheet_name(&self, title: &str) -> String {
        let sanitized: String = title
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' | '\'' => ' ',
                _ => c,
            })
            .collect();
        let name = format!("{:02} {}", self.slide_count + 1, sanitized.trim());
        name.chars().take(31).collect::<String>().trim_end().to_string()
    }

    /// Opening slide: campaign title, period subtitle and metadata lines.
    pub fn add_title_slide(
        &mut self,
        title: &str,
        subtitle: &str,
        lines: &[String],
    ) -> Result<(), AppError> {
        let name = self.next_sheet_name("Title");
        self.slide_count += 1;

        let sheet = self.workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        sheet.set_column_width(0, 90)?;
        sheet.write_string_with_format(1, 0, title, &self.title_format)?;
        sheet.write_string_with_format(3, 0, subtitle, &self.heading_format)?;
        for (idx, line) in lines.iter().enumerate() {
            sheet.write_string_with_format(5 + idx as u32, 0, line.as_str(), &self.body_format)?;
        }
        Ok(())
    }

    /// Single-series chart slide (pie or doughnut) with a caption.
    pub fn add_chart_slide(
        &mut self,
        title: &str,
        kind: ChartKind,
        labels: &[String],
        values: &[f64],
        caption: &str,
    ) -> Result<(), AppError> {
        debug_assert_eq!(labels.len(), values.len());
        let name = self.next_sheet_name(title);
        self.slide_count += 1;

        let sheet = self.workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        sheet.set_column_width(0, 40)?;
        sheet.write_string_with_format(0, 0, title, &self.heading_format)?;
        sheet.write_string_with_format(1, 0, caption, &self.caption_format)?;

        if labels.is_empty() {
            sheet.write_string_with_format(3, 0, "No data available", &self.body_format)?;
            return Ok(());
        }

        for (idx, (label, value)) in labels.iter().zip(values).enumerate() {
            let row = DATA_ROW + idx as u32;
            sheet.write_string(row, 0, label.as_str())?;
            sheet.write_number(row, 1, *value)?;
        }
        let last_row = DATA_ROW + labels.len() as u32 - 1;

        let chart_type = match kind {
            ChartKind::Pie => ChartType::Pie,
            ChartKind::Doughnut => ChartType::Doughnut,
            ChartKind::Column => ChartType::Column,
        };
        let mut chart = Chart::new(chart_type);
        chart
            .add_series()
            .set_categories((name.as_str(), DATA_ROW, 0, last_row, 0))
            .set_values((name.as_str(), DATA_ROW, 1, last_row, 1))
            .set_name("Responses");
        chart.title().set_name(title);
        chart.set_width(640).set_height(400);
        sheet.insert_chart(3, 0, &chart)?;

        Ok(())
    }

    /// Clustered column comparison slide: one category tick per group
    /// label, one series per outcome category.
    pub fn add_column_slide(
        &mut self,
        title: &str,
        categories: &[String],
        series: &[(String, Vec<f64>)],
        caption: &str,
    ) -> Result<(), AppError> {
        let name = self.next_sheet_name(title);
        self.slide_count += 1;

        let sheet = self.workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        sheet.set_column_width(0, 40)?;
        sheet.write_string_with_format(0, 0, title, &self.heading_format)?;
        sheet.write_string_with_format(1, 0, caption, &self.caption_format)?;

        if categories.is_empty() || series.is_empty() {
            sheet.write_string_with_format(3, 0, "No data available", &self.body_format)?;
            return Ok(());
        }

        for (idx, category) in categories.iter().enumerate() {
            sheet.write_string(DATA_ROW + idx as u32, 0, category.as_str())?;
        }
        let last_row = DATA_ROW + categories.len() as u32 - 1;

        let mut chart = Chart::new(ChartType::Column);
        for (series_idx, (series_name, values)) in series.iter().enumerate() {
            debug_assert_eq!(values.len(), categories.len());
            let col = 1 + series_idx as u16;
            for (idx, value) in values.iter().enumerate() {
                sheet.write_number(DATA_ROW + idx as u32, col, *value)?;
            }
            chart
                .add_series()
                .set_categories((name.as_str(), DATA_ROW, 0, last_row, 0))
                .set_values((name.as_str(), DATA_ROW, col, last_row, col))
                .set_name(series_name.as_str());
        }
        chart.title().set_name(title);
        chart.set_width(720).set_height(400);
        sheet.insert_chart(3, 0, &chart)?;

        Ok(())
    }

    /// Plain text slide (sample responses, completion notes).
    pub fn add_text_slide(&mut self, title: &str, lines: &[String]) -> Result<(), AppError> {
        let name = self.next_sheet_name(title);
        self.slide_count += 1;

        let sheet = self.workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        sheet.set_column_width(0, 90)?;
        sheet.write_string_with_format(0, 0, title, &self.heading_format)?;
        for (idx, line) in lines.iter().enumerate() {
            sheet.write_string_with_format(2 + idx as u32, 0, line.as_str(), &self.body_format)?;
        }
        Ok(())
    }

    /// Placeholder slide for a question whose data could not be produced;
    /// the export continues past it.
    pub fn add_placeholder_slide(&mut self, title: &str) -> Result<(), AppError> {
        let name = self.next_sheet_name(title);
        self.slide_count += 1;

        let sheet = self.workbook.add_worksheet();
        sheet.set_name(name.as_str())?;
        sheet.set_column_width(0, 90)?;
        sheet.write_string_with_format(0, 0, title, &self.heading_format)?;
        sheet.write_string_with_format(
            2,
            0,
            "Data not available for this question",
            &self.caption_format,
        )?;
        Ok(())
    }

    /// Serializes the deck to bytes. Consumes the builder: a deck is
    /// written exactly once, at the end of the export.
    pub fn save_to_buffer(mut self) -> Result<Vec<u8>, AppError> {
        Ok(self.workbook.save_to_buffer()?)
    }
}
