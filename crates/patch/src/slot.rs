//! Record slots inside speedrun infobox templates.
//!
//! A slot is one `|<field>=<value>` line of the infobox. The value holds
//! zero, one, or two tokens depending on the page layout.

use std::ops::Range;

use regex::Regex;
use wrsync_core::{Feed, Record, SyncError, SyncResult};

pub const INFOBOX: &str = "{{speedrun_infobox";
pub const BOWSER_INFOBOX: &str = "{{speedrun_infobox_bowser_level";
pub const DEFAULT_DELIMITER: &str = "<br>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotLayout {
    /// One token.
    Single,
    /// Real-time token, then in-game token (multi-part Bowser courses).
    DualCourse { delimiter: String },
    /// Strategy 1 token, then strategy 2 token.
    MultiStrategy { delimiter: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDescriptor {
    pub field: String,
    pub layout: SlotLayout,
}

impl SlotDescriptor {
    pub fn new(field: impl Into<String>, layout: SlotLayout) -> Self {
        Self { field: field.into(), layout }
    }

    /// Infobox field a feed publishes into.
    pub fn field_for(feed: Feed) -> &'static str {
        match feed {
            Feed::Ss => "ss_record",
            Feed::Rta => "rta_record",
        }
    }

    /// Pick the layout from the page's infobox and the records to publish.
    pub fn detect(text: &str, feed: Feed, proposed: &[Record]) -> SyncResult<Self> {
        let field = Self::field_for(feed);
        if !text.contains(INFOBOX) {
            return Err(SyncError::TemplateSlotNotFound {
                entity_id: entity_of(proposed),
                field: INFOBOX.trim_start_matches("{{").to_string(),
            });
        }
        let layout = if text.contains(BOWSER_INFOBOX) {
            SlotLayout::DualCourse { delimiter: DEFAULT_DELIMITER.into() }
        } else if proposed.iter().any(|r| r.variant.is_some()) {
            SlotLayout::MultiStrategy { delimiter: DEFAULT_DELIMITER.into() }
        } else {
            SlotLayout::Single
        };
        Ok(Self::new(field, layout))
    }

    pub fn delimiter(&self) -> Option<&str> {
        match &self.layout {
            SlotLayout::Single => None,
            SlotLayout::DualCourse { delimiter } | SlotLayout::MultiStrategy { delimiter } => {
                Some(delimiter)
            }
        }
    }

    /// Token position a record goes into.
    pub fn position(&self, record: &Record) -> SyncResult<usize> {
        match &self.layout {
            SlotLayout::Single => Ok(0),
            SlotLayout::DualCourse { .. } => Ok(usize::from(record.time.timing().is_in_game())),
            SlotLayout::MultiStrategy { .. } => match record.variant {
                None | Some(1) => Ok(0),
                Some(2) => Ok(1),
                Some(v) => Err(SyncError::parse_ambiguity(
                    format!("'{}' slot on '{}'", self.field, record.entity_id),
                    format!("no position for variant {v}"),
                )),
            },
        }
    }
}

/// Located slot: byte range of the value within the page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub value: Range<usize>,
}

impl Slot {
    pub fn locate(text: &str, field: &str) -> Option<Slot> {
        let pattern = format!(
            r"(?m)^[ \t]*\|?[ \t]*{}[ \t]*=[ \t]*(?P<value>[^\r\n]*?)[ \t]*\r?$",
            regex::escape(field)
        );
        let re = Regex::new(&pattern).ok()?;
        let value = re.captures(text)?.name("value")?;
        Some(Slot { value: value.range() })
    }

    pub fn value<'t>(&self, text: &'t str) -> &'t str {
        &text[self.value.clone()]
    }
}

fn entity_of(proposed: &[Record]) -> String {
    proposed.first().map(|r| r.entity_id.clone()).unwrap_or_default()
}
