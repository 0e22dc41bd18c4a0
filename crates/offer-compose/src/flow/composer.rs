//! Page-break state machine for the extended pages
//!
//! Elements are grouped into units (a maximal run of consecutive elements
//! sharing a protection group, or a single ungrouped element) and placed top
//! to bottom. A unit is never split across pages unless it cannot fit on an
//! empty page. Element order is never changed.

use super::element::FlowElement;
use super::measure::{Block, Measurer};
use crate::constants::mm_to_pt;
use crate::options::RenderOptions;
use crate::pipeline::Deadline;
use crate::types::*;

// =============================================================================
// Output Types
// =============================================================================

/// A measured block positioned on a page
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub element_id: String,
    /// PDF-space y of the block's top edge
    pub top: f32,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutPage {
    /// 1-based page number within the flow pages
    pub index: usize,
    pub items: Vec<PlacedBlock>,
}

/// Why an element landed where it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionDecision {
    /// Fitted on the current page
    Placed,
    /// The unit did not fit; the page was closed before it
    BreakBefore,
    /// A trailing heading was moved to keep it with the following content
    DeferredHeading,
    /// The unit exceeded a whole page and was split naturally
    OversizedSplit,
    /// A piece of a split element continued on a new page
    Continued,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionEntry {
    pub element_id: String,
    pub page: usize,
    pub decision: ProtectionDecision,
}

/// Result of one layout pass
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLayout {
    pub pages: Vec<LaidOutPage>,
    pub page_count: usize,
    pub protection_log: Vec<ProtectionEntry>,
    pub warnings: Vec<ComposeWarning>,
}

// =============================================================================
// State
// =============================================================================

/// Composer states; every change is logged at trace level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    /// Between units
    Idle,
    /// Placing the elements of a unit
    Accumulating,
    /// The next unit does not fit the open page
    PageFull,
    /// The full page was closed and a fresh one opened
    Flushed,
}

/// Vertical position on the open page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageState {
    /// 1-based flow page number
    pub page_index: usize,
    /// PDF-space y where the next element's top goes
    pub cursor_y: f32,
    /// Distance from the cursor down to the bottom page edge
    pub remaining: f32,
}

struct MeasuredElement {
    id: String,
    is_heading: bool,
    block: Block,
}

struct Unit {
    elements: Vec<MeasuredElement>,
    group: Option<String>,
    financing: bool,
}

impl Unit {
    fn height(&self, spacing: f32) -> f32 {
        let blocks: f32 = self.elements.iter().map(|e| e.block.height()).sum();
        blocks + spacing * self.elements.len().saturating_sub(1) as f32
    }

    /// Smallest height that must fit for the unit to start on a page
    fn min_slice(&self) -> f32 {
        self.elements
            .first()
            .map(|e| e.block.min_slice())
            .unwrap_or(0.0)
    }

    fn ends_with_heading(&self) -> bool {
        self.elements.last().is_some_and(|e| e.is_heading)
    }

    fn name(&self) -> String {
        match &self.group {
            Some(g) => g.clone(),
            None => self
                .elements
                .first()
                .map(|e| e.id.clone())
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Composer
// =============================================================================

/// Lays flow elements out onto pages.
///
/// Layout is deterministic: the same elements and options always produce
/// the same pages.
pub struct FlowComposer<'a> {
    options: &'a RenderOptions,
}

impl<'a> FlowComposer<'a> {
    pub fn new(options: &'a RenderOptions) -> Self {
        Self { options }
    }

    pub fn layout(&self, elements: &[FlowElement], deadline: &Deadline) -> Result<FlowLayout> {
        let layout = &self.options.layout;
        let top_y = layout.page_size.height - mm_to_pt(layout.margin_top_mm);
        let min_margin = mm_to_pt(layout.min_bottom_space_mm);
        let financing_margin = mm_to_pt(layout.financing_bottom_space_mm);

        let mut composer = Composer {
            state: ComposerState::Idle,
            page: PageState {
                page_index: 1,
                cursor_y: top_y,
                remaining: top_y,
            },
            top_y,
            spacing: layout.element_spacing,
            items: Vec::new(),
            pages: Vec::new(),
            log: Vec::new(),
            warnings: Vec::new(),
        };

        let measurer = Measurer::new(layout, (top_y - min_margin).max(1.0));
        let units = composer.build_units(elements, &measurer, min_margin, financing_margin);
        let margins: Vec<f32> = units
            .iter()
            .map(|u| if u.financing { financing_margin } else { min_margin })
            .collect();

        for (i, unit) in units.iter().enumerate() {
            deadline.check()?;
            let next = units.get(i + 1).map(|u| (u, margins[i + 1]));
            composer.place_unit(unit, margins[i], next);
        }

        Ok(composer.finish())
    }
}

struct Composer {
    state: ComposerState,
    page: PageState,
    top_y: f32,
    spacing: f32,
    items: Vec<PlacedBlock>,
    pages: Vec<LaidOutPage>,
    log: Vec<ProtectionEntry>,
    warnings: Vec<ComposeWarning>,
}

impl Composer {
    fn transition(&mut self, to: ComposerState) {
        log::trace!(
            "flow page {}: {:?} -> {:?}",
            self.page.page_index,
            self.state,
            to
        );
        self.state = to;
    }

    fn build_units(
        &mut self,
        elements: &[FlowElement],
        measurer: &Measurer<'_>,
        min_margin: f32,
        financing_margin: f32,
    ) -> Vec<Unit> {
        let mut units: Vec<Unit> = Vec::new();
        for element in elements {
            let block = match measurer.measure(element) {
                Ok(block) => block,
                Err(reason) => {
                    log::warn!("Skipping flow element '{}': {}", element.id, reason);
                    self.warnings.push(ComposeWarning::UnresolvedToken {
                        page: 0,
                        token: element.id.clone(),
                        reason,
                    });
                    continue;
                }
            };
            let measured = MeasuredElement {
                id: element.id.clone(),
                is_heading: element.is_heading(),
                block,
            };

            let joins_previous = match (&element.group, units.last()) {
                (Some(group), Some(last)) => last.group.as_ref() == Some(group),
                _ => false,
            };
            if joins_previous {
                if let Some(last) = units.last_mut() {
                    last.financing |= element.is_financing();
                    last.elements.push(measured);
                }
            } else {
                units.push(Unit {
                    elements: vec![measured],
                    group: element.group.clone(),
                    financing: element.is_financing(),
                });
            }
        }
        log::debug!(
            "Flow content: {} elements in {} units (margins {:.1}pt / {:.1}pt)",
            elements.len(),
            units.len(),
            min_margin,
            financing_margin
        );
        units
    }

    fn page_is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Gap needed before the next element on the open page
    fn gap(&self) -> f32 {
        if self.page_is_empty() { 0.0 } else { self.spacing }
    }

    /// Whether `height` fits on the open page above `margin`
    fn fits(&self, height: f32, margin: f32) -> bool {
        self.page.remaining - self.gap() - height >= margin
    }

    /// Close the open page and start a fresh one
    fn break_page(&mut self) {
        self.transition(ComposerState::PageFull);
        let items = std::mem::take(&mut self.items);
        self.pages.push(LaidOutPage {
            index: self.page.page_index,
            items,
        });
        self.page = PageState {
            page_index: self.page.page_index + 1,
            cursor_y: self.top_y,
            remaining: self.top_y,
        };
        self.transition(ComposerState::Flushed);
    }

    fn put(&mut self, id: &str, block: Block, decision: ProtectionDecision) {
        let gap = self.gap();
        let top = self.page.cursor_y - gap;
        let height = block.height();
        self.page.cursor_y = top - height;
        self.page.remaining = self.page.cursor_y;
        self.log.push(ProtectionEntry {
            element_id: id.to_string(),
            page: self.page.page_index,
            decision,
        });
        self.items.push(PlacedBlock {
            element_id: id.to_string(),
            top,
            block,
        });
    }

    fn place_unit(&mut self, unit: &Unit, margin: f32, next: Option<(&Unit, f32)>) {
        self.transition(ComposerState::Accumulating);

        let height = unit.height(self.spacing);
        let capacity = self.top_y - margin;

        if height > capacity {
            self.place_oversized(unit, margin, height, capacity);
            self.transition(ComposerState::Idle);
            return;
        }

        // A trailing heading must be followed on the same page by at least
        // the start of the next unit
        let mut lookahead = None;
        if unit.ends_with_heading() {
            if let Some((next_unit, next_margin)) = next {
                let next_height = next_unit.height(self.spacing);
                let next_need = if next_height > self.top_y - next_margin {
                    next_unit.min_slice()
                } else {
                    next_height
                };
                let combined = height + self.spacing + next_need;
                // Never demand more than an empty page can give
                if combined <= self.top_y - next_margin.max(margin) {
                    lookahead = Some((combined, next_margin.max(margin)));
                }
            }
        }

        let fits_alone = self.fits(height, margin);
        let fits_with_next = lookahead.is_none_or(|(h, m)| self.fits(h, m));

        let mut decision = ProtectionDecision::Placed;
        if !self.page_is_empty() && !(fits_alone && fits_with_next) {
            decision = if fits_alone {
                log::debug!(
                    "Deferring heading unit '{}' to keep it with its content",
                    unit.name()
                );
                ProtectionDecision::DeferredHeading
            } else {
                ProtectionDecision::BreakBefore
            };
            self.break_page();
            self.transition(ComposerState::Accumulating);
        }

        for (i, element) in unit.elements.iter().enumerate() {
            let d = if i == 0 { decision } else { ProtectionDecision::Placed };
            self.put(&element.id, element.block.clone(), d);
        }
        self.transition(ComposerState::Idle);
    }

    /// Place a unit taller than a page element by element, splitting where
    /// needed
    fn place_oversized(&mut self, unit: &Unit, margin: f32, height: f32, capacity: f32) {
        let name = unit.name();
        log::warn!(
            "Protection group '{}' ({:.1}pt) exceeds page capacity ({:.1}pt), splitting",
            name,
            height,
            capacity
        );
        self.warnings.push(ComposeWarning::OversizedProtectionGroup {
            group: name,
            height,
            capacity,
        });

        if !self.page_is_empty() && !self.fits(unit.min_slice(), margin) {
            self.break_page();
            self.transition(ComposerState::Accumulating);
        }

        let mut first = true;
        for element in &unit.elements {
            let mut block = element.block.clone();
            let mut decision = if first {
                ProtectionDecision::OversizedSplit
            } else {
                ProtectionDecision::Placed
            };
            first = false;

            loop {
                if self.fits(block.height(), margin) {
                    self.put(&element.id, block, decision);
                    break;
                }

                let available = self.page.remaining - self.gap() - margin;
                if let Some((head, rest)) = block.split(available) {
                    self.put(&element.id, head, decision);
                    self.break_page();
                    self.transition(ComposerState::Accumulating);
                    block = rest;
                    decision = ProtectionDecision::Continued;
                } else if !self.page_is_empty() {
                    self.break_page();
                    self.transition(ComposerState::Accumulating);
                    if decision == ProtectionDecision::Placed {
                        decision = ProtectionDecision::BreakBefore;
                    }
                } else {
                    // Cannot shrink any further; an empty page always takes it
                    self.put(&element.id, block, decision);
                    break;
                }
            }
        }
    }

    fn finish(mut self) -> FlowLayout {
        if !self.items.is_empty() {
            let items = std::mem::take(&mut self.items);
            self.pages.push(LaidOutPage {
                index: self.page.page_index,
                items,
            });
        }
        self.transition(ComposerState::Idle);
        let page_count = self.pages.len();
        FlowLayout {
            pages: self.pages,
            page_count,
            protection_log: self.log,
            warnings: self.warnings,
        }
    }
}
