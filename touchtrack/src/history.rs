//! Frame history of the tracker.
//!
//! Three windows are kept: `pointer` (matched identities), `stretch` (damped
//! coordinates) and `report` (filtered coordinates). All of them live in one
//! arena and are addressed through per-window index tables that are rebuilt on
//! every [`History::advance`], so that depth 0 is always the newest frame.

use core::ops::Index;

use touchtrack_types::POINT_MAX;
use touchtrack_types::point::Point;

/// Depth of the pointer window
pub(crate) const PP_DEEP: usize = 10;
/// Depth of the stretch window
pub(crate) const PS_DEEP: usize = 10;
/// Depth of the report window
pub(crate) const PR_DEEP: usize = 10;
pub(crate) const PRESSURE_DEEP: usize = 8;
/// Frames in the arena
pub(crate) const POINT_DEEP: usize = PP_DEEP + PS_DEEP + PR_DEEP;
/// The frame counter wraps here
pub(crate) const COUNTER_WRAP: usize = PP_DEEP * PS_DEEP * PR_DEEP * PRESSURE_DEEP;

pub(crate) type Frame = [Point; POINT_MAX];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Window {
    Pointer,
    Stretch,
    Report,
}

impl Window {
    const fn base(self) -> usize {
        match self {
            Window::Pointer => 0,
            Window::Stretch => PP_DEEP,
            Window::Report => PP_DEEP + PS_DEEP,
        }
    }

    const fn depth(self) -> usize {
        match self {
            Window::Pointer => PP_DEEP,
            Window::Stretch => PS_DEEP,
            Window::Report => PR_DEEP,
        }
    }
}

/// Read-only view over one window, indexed by recency
#[derive(Clone, Copy)]
pub(crate) struct WindowView<'a> {
    arena: &'a [Frame; POINT_DEEP],
    index: &'a [usize],
}

impl<'a> WindowView<'a> {
    pub(crate) fn depth(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn frame(&self, depth: usize) -> &'a Frame {
        &self.arena[self.index[depth]]
    }

    /// Point of `slot` at `depth`; an empty point past the window end
    pub(crate) fn at(&self, depth: usize, slot: usize) -> Point {
        match self.index.get(depth) {
            Some(&physical) => self.arena[physical][slot],
            None => Point::EMPTY,
        }
    }

    /// Number of leading frames in which `slot` is empty
    pub(crate) fn clear_len(&self, slot: usize) -> usize {
        (0..self.depth()).take_while(|&n| self.at(n, slot).is_empty()).count()
    }

    /// Number of leading frames in which `slot` holds a point, up to `limit`
    pub(crate) fn run_len(&self, slot: usize, limit: usize) -> usize {
        (0..self.depth().min(limit))
            .take_while(|&n| self.at(n, slot).is_present())
            .count()
    }
}

impl Index<usize> for WindowView<'_> {
    type Output = Frame;

    fn index(&self, depth: usize) -> &Frame {
        self.frame(depth)
    }
}

pub(crate) struct History {
    arena: [Frame; POINT_DEEP],
    counter: usize,
    pointer: [usize; PP_DEEP],
    stretch: [usize; PS_DEEP],
    report: [usize; PR_DEEP],
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub(crate) fn new() -> Self {
        let mut history = Self {
            arena: [[Point::EMPTY; POINT_MAX]; POINT_DEEP],
            counter: 0,
            pointer: [0; PP_DEEP],
            stretch: [0; PS_DEEP],
            report: [0; PR_DEEP],
        };
        history.rebuild_views();
        history
    }

    /// Drop every stored frame and restart the counter
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn counter(&self) -> usize {
        self.counter
    }

    /// Rotate to a new frame and clear it in all three windows
    pub(crate) fn advance(&mut self) {
        self.counter += 1;
        if self.counter >= COUNTER_WRAP {
            self.counter = 0;
        }
        self.rebuild_views();
        for window in [Window::Pointer, Window::Stretch, Window::Report] {
            *self.current_mut(window) = [Point::EMPTY; POINT_MAX];
        }
    }

    fn rebuild_views(&mut self) {
        let counter = self.counter;
        fill_index(&mut self.pointer, counter, Window::Pointer);
        fill_index(&mut self.stretch, counter, Window::Stretch);
        fill_index(&mut self.report, counter, Window::Report);
    }

    fn index(&self, window: Window) -> &[usize] {
        match window {
            Window::Pointer => &self.pointer,
            Window::Stretch => &self.stretch,
            Window::Report => &self.report,
        }
    }

    pub(crate) fn view(&self, window: Window) -> WindowView<'_> {
        WindowView {
            arena: &self.arena,
            index: self.index(window),
        }
    }

    pub(crate) fn pointer(&self) -> WindowView<'_> {
        self.view(Window::Pointer)
    }

    pub(crate) fn stretch(&self) -> WindowView<'_> {
        self.view(Window::Stretch)
    }

    pub(crate) fn report(&self) -> WindowView<'_> {
        self.view(Window::Report)
    }

    /// The newest frame of `window`, the only writable one
    pub(crate) fn current_mut(&mut self, window: Window) -> &mut Frame {
        let physical = self.index(window)[0];
        &mut self.arena[physical]
    }
}

/// Depth 0 maps to `counter % depth`, older frames walk backwards and wrap
fn fill_index(index: &mut [usize], counter: usize, window: Window) {
    let depth = window.depth();
    let mut pn = counter % depth;
    for slot in index.iter_mut() {
        *slot = window.base() + pn;
        pn = if pn == 0 { depth - 1 } else { pn - 1 };
    }
}
