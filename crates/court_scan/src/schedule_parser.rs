use chrono::NaiveDate;
use scraper::{Html, Selector};

use crate::scan_types::{ScanError, SlotId};

/// Schedule rows, free (`state_F`) or reserved (`state_R`)
const ROW_SELECTOR: &str = "tr.state_F, tr.state_R";
/// Leading label cell holding the time of day
const LABEL_SELECTOR: &str = "th.datarow";
/// One cell per resource
const CELL_SELECTOR: &str = "td";
/// Marker class of a bookable cell
const SUCCESS_CLASS: &str = "res_success";

/// Half-open hour range `[from_hour, to_hour)` of slots worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    /// First hour included
    pub from_hour: u32,
    /// First hour excluded
    pub to_hour: u32,
}

impl HourWindow {
    /// Whether `hour` falls inside the window
    pub fn contains(&self, hour: u32) -> bool {
        self.from_hour <= hour && hour < self.to_hour
    }
}

/// Extracts available slots from one day's schedule page
pub struct ScheduleParser {
    rows: Selector,
    label: Selector,
    cells: Selector,
    window: HourWindow,
    resource_label: String,
}

impl ScheduleParser {
    /// Create a parser keeping rows inside `window`
    pub fn new(window: HourWindow, resource_label: impl Into<String>) -> Result<Self, ScanError> {
        Ok(Self {
            rows: selector(ROW_SELECTOR)?,
            label: selector(LABEL_SELECTOR)?,
            cells: selector(CELL_SELECTOR)?,
            window,
            resource_label: resource_label.into(),
        })
    }

    /// Parse the page for `date` into its available slots, in page order
    ///
    /// Any malformed schedule row fails the whole page, so a date never
    /// contributes a partial result.
    pub fn parse(&self, html: &str, date: NaiveDate) -> Result<Vec<SlotId>, ScanError> {
        let document = Html::parse_document(html);
        let mut slots = Vec::new();

        for row in document.select(&self.rows) {
            let time_label = row
                .select(&self.label)
                .next()
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .ok_or_else(|| ScanError::Parse("schedule row without a time label".to_string()))?;

            let hour = parse_hour(&time_label)?;
            if !self.window.contains(hour) {
                continue;
            }

            for (index, cell) in row.select(&self.cells).enumerate() {
                if cell.value().classes().any(|class| class == SUCCESS_CLASS) {
                    slots.push(SlotId::new(
                        date,
                        &self.resource_label,
                        index + 1,
                        &time_label,
                    ));
                }
            }
        }

        Ok(slots)
    }
}

fn selector(css: &str) -> Result<Selector, ScanError> {
    Selector::parse(css).map_err(|e| ScanError::Parse(format!("invalid selector {}: {}", css, e)))
}

/// Hour of a `HH:MM` label
fn parse_hour(time_label: &str) -> Result<u32, ScanError> {
    time_label
        .split(':')
        .next()
        .and_then(|hour| hour.trim().parse::<u32>().ok())
        .ok_or_else(|| ScanError::Parse(format!("invalid time label '{}'", time_label)))
}
